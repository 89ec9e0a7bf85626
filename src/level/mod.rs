use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::board::Board;
use crate::config::{LevelConfig, LevelOptions};
use crate::constants::{
    initial_spawn_delay_secs, BULLET_MOVE_INTERVAL_MS, FIRE_COOLDOWN_MS, FISH_PARALYSIS_MS,
    FRUIT_LIFETIME_MS, GHOST_ACCELERATION_MS, GHOST_EXPLODE_MS, INVINCIBILITY_MS,
    PELLET_POINTS, POMEGRANATE_RADIUS, SHOOTING_MS, SPEED_BOOST_MS, SPEED_UP_PERIOD_MS,
    SUPER_PELLET_POINTS,
};
use crate::entity::{BulletState, Entity, FruitState, GhostPhase, GhostState, PlayerState, Role};
use crate::error::{LevelError, MapError};
use crate::map::LevelLayout;
use crate::rng::Rng;
use crate::scheduler::{Job, Scheduler};
use crate::types::{
    BoardView, CellId, Direction, EffectKind, EntityId, EntityKind, FruitKind, GhostPersonality,
    HunterView, LevelEvent, LevelOutcome, LevelSnapshot, LevelState, MoveOutcome, PlayerView,
    Terrain, Vec2,
};

mod collision;
mod effects_system;
mod growth_system;
mod hunter_system;
mod movement;
mod navigation;
mod spawn_system;

#[cfg(test)]
mod testing;

pub use self::collision::{CollisionHandler, CollisionTable};
pub use self::hunter_system::HunterMode;

pub trait LevelObserver: Send {
    fn on_event(&mut self, event: &LevelEvent);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub struct Level {
    config: LevelConfig,
    board: Board,
    entities: BTreeMap<EntityId, Entity>,
    players: Vec<EntityId>,
    collisions: CollisionTable,
    scheduler: Scheduler,
    observers: Vec<(ObserverId, Box<dyn LevelObserver>)>,
    rng: Rng,
    state: LevelState,
    outcome: Option<LevelOutcome>,
    hunter: HunterMode,
    now_ms: u64,
    events: Vec<LevelEvent>,

    player_starts: Vec<CellId>,
    ghost_starts: Vec<CellId>,
    fruit_cells: Vec<CellId>,
    chunks: Vec<LevelLayout>,
    chunk_width: i32,
    chunk_height: i32,
    ghost_speed: f32,

    next_entity_id: u64,
    next_observer_id: u64,
    next_player_start: usize,
}

impl Level {
    pub fn new(layout: LevelLayout, options: LevelOptions) -> Result<Self, LevelError> {
        Self::build(layout, Vec::new(), options)
    }

    pub fn growable(
        layout: LevelLayout,
        chunks: Vec<LevelLayout>,
        options: LevelOptions,
    ) -> Result<Self, LevelError> {
        if chunks.is_empty() {
            return Err(MapError::NoChunks.into());
        }
        for chunk in &chunks {
            chunk.ensure_size(layout.width, layout.height)?;
        }
        let options = LevelOptions {
            growable: true,
            ..options
        };
        Self::build(layout, chunks, options)
    }

    fn build(
        layout: LevelLayout,
        chunks: Vec<LevelLayout>,
        options: LevelOptions,
    ) -> Result<Self, LevelError> {
        let config = LevelConfig::resolve(&options, !layout.fruit_cells.is_empty());
        let board = Board::new(layout.width as i32, layout.height as i32, &layout.terrain)?;
        let mut level = Self {
            rng: Rng::new(config.seed),
            config,
            board,
            entities: BTreeMap::new(),
            players: Vec::new(),
            collisions: CollisionTable::standard(),
            scheduler: Scheduler::new(),
            observers: Vec::new(),
            state: LevelState::NotStarted,
            outcome: None,
            hunter: HunterMode::Inactive,
            now_ms: 0,
            events: Vec::new(),
            player_starts: Vec::new(),
            ghost_starts: Vec::new(),
            fruit_cells: Vec::new(),
            chunks,
            chunk_width: layout.width as i32,
            chunk_height: layout.height as i32,
            ghost_speed: 1.0,
            next_entity_id: 1,
            next_observer_id: 1,
            next_player_start: 0,
        };
        level.populate(&layout, Vec2::new(0, 0), true)?;
        Ok(level)
    }

    fn populate(
        &mut self,
        layout: &LevelLayout,
        origin: Vec2,
        initial: bool,
    ) -> Result<(), LevelError> {
        for bridge in &layout.bridges {
            let cell = self.layout_cell(origin, bridge.at)?;
            let id = self.add_entity(Role::Bridge { axis: bridge.axis }, bridge.axis.direction());
            self.place(id, cell);
            if bridge.pellet {
                self.add_pellet(cell, false);
            }
        }
        for teleport in &layout.teleports {
            let cell = self.layout_cell(origin, teleport.at)?;
            let target = self.layout_cell(origin, teleport.target)?;
            let id = self.add_entity(
                Role::Teleport {
                    target: Some(target),
                },
                Direction::North,
            );
            self.place(id, cell);
        }
        for at in &layout.holes {
            let cell = self.layout_cell(origin, *at)?;
            let id = self.add_entity(
                Role::Hole {
                    trap_ms: self.config.hole_trap_ms,
                },
                Direction::North,
            );
            self.place(id, cell);
        }
        for at in &layout.pellets {
            let cell = self.layout_cell(origin, *at)?;
            self.add_pellet(cell, false);
        }
        for at in &layout.super_pellets {
            let cell = self.layout_cell(origin, *at)?;
            self.add_pellet(cell, true);
        }
        for at in &layout.fruit_cells {
            let cell = self.layout_cell(origin, *at)?;
            self.fruit_cells.push(cell);
        }
        for (index, at) in layout.ghost_starts.iter().enumerate() {
            let cell = self.layout_cell(origin, *at)?;
            self.ghost_starts.push(cell);
            if initial {
                let personality =
                    GhostPersonality::CLASSIC[index % GhostPersonality::CLASSIC.len()];
                self.add_ghost(personality, cell);
            }
        }
        if initial {
            for at in &layout.player_starts {
                let cell = self.layout_cell(origin, *at)?;
                self.player_starts.push(cell);
            }
        }
        Ok(())
    }

    fn layout_cell(&self, origin: Vec2, at: Vec2) -> Result<CellId, LevelError> {
        let position = origin.offset(at.x, at.y);
        self.board.cell_at(position.x, position.y).ok_or_else(|| {
            LevelError::Invariant(format!("layout reference {position:?} is off the board"))
        })
    }

    fn add_pellet(&mut self, cell: CellId, super_pellet: bool) -> EntityId {
        let points = if super_pellet {
            SUPER_PELLET_POINTS
        } else {
            PELLET_POINTS
        };
        let id = self.add_entity(
            Role::Pellet {
                points,
                super_pellet,
            },
            Direction::North,
        );
        self.place(id, cell);
        id
    }

    fn add_ghost(&mut self, personality: GhostPersonality, cell: CellId) -> EntityId {
        let facing = Direction::ALL[self.rng.pick_index(Direction::ALL.len())];
        let id = self.add_entity(
            Role::Ghost(GhostState::new(personality, self.ghost_speed)),
            facing,
        );
        self.place(id, cell);
        if self.hunter.is_active() {
            if let Some(ghost) = self.entities.get_mut(&id).and_then(Entity::ghost_mut) {
                ghost.feared = true;
            }
        }
        id
    }

    pub fn register_player(&mut self) -> Result<EntityId, LevelError> {
        if self.player_starts.is_empty() {
            return Err(LevelError::NoPlayerStart);
        }
        let cell = self.player_starts[self.next_player_start % self.player_starts.len()];
        self.next_player_start += 1;
        let id = self.add_entity(Role::Player(PlayerState::new()), Direction::East);
        self.place(id, cell);
        self.players.push(id);
        if self.state == LevelState::InProgress {
            self.schedule_first_move(id);
        }
        debug!(player = id.0, "player registered");
        Ok(id)
    }

    pub fn add_observer(&mut self, observer: Box<dyn LevelObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub fn start(&mut self, now_ms: u64) {
        if self.state == LevelState::InProgress || self.outcome.is_some() {
            return;
        }
        self.now_ms = self.now_ms.max(now_ms);
        self.state = LevelState::InProgress;

        let movers: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| entity.is_mover() && entity.is_on_board())
            .map(|entity| entity.id)
            .collect();
        for id in movers {
            self.schedule_first_move(id);
        }
        if self.config.growable {
            let delay = initial_spawn_delay_secs(self.rng.int(0, 10)) * 1_000;
            self.scheduler.schedule(Job::SpawnGhost, self.now_ms + delay);
            self.scheduler
                .schedule(Job::SpeedUp, self.now_ms + SPEED_UP_PERIOD_MS);
        }
        if self.config.fruit_spawning {
            let delay = initial_spawn_delay_secs(self.rng.int(0, 10)) * 1_000;
            self.scheduler.schedule(Job::SpawnFruit, self.now_ms + delay);
        }

        info!(
            now_ms = self.now_ms,
            players = self.players.len(),
            growable = self.config.growable,
            "level started"
        );
        self.emit(LevelEvent::LevelStarted);
    }

    pub fn stop(&mut self) {
        if self.state != LevelState::InProgress {
            return;
        }
        self.state = LevelState::Stopped;
        self.scheduler.clear();
        info!(now_ms = self.now_ms, "level stopped");
        self.emit(LevelEvent::LevelStopped);
    }

    pub fn advance(&mut self, now_ms: u64) {
        if self.state != LevelState::InProgress {
            return;
        }
        let now_ms = now_ms.max(self.now_ms);
        while self.state == LevelState::InProgress {
            let Some((due_ms, job)) = self.scheduler.pop_due(now_ms) else {
                break;
            };
            self.now_ms = due_ms.max(self.now_ms);
            self.poll_timers();
            if let Err(error) = self.run_job(job) {
                warn!(?job, %error, "scheduled job failed");
            }
        }
        self.now_ms = now_ms;
        if self.state == LevelState::InProgress {
            self.poll_timers();
        }
    }

    fn run_job(&mut self, job: Job) -> Result<(), LevelError> {
        match job {
            Job::Move(id) => self.run_move_job(id),
            Job::SpawnGhost => {
                self.spawn_ghost_tick();
                Ok(())
            }
            Job::SpawnFruit => {
                self.spawn_fruit_tick();
                Ok(())
            }
            Job::SpeedUp => {
                self.speed_up_ghosts();
                Ok(())
            }
        }
    }

    fn schedule_first_move(&mut self, id: EntityId) {
        let delay = self.move_interval(id) / 2;
        self.scheduler.schedule(Job::Move(id), self.now_ms + delay);
    }

    /// Evaluated after every move attempt, in this order: lost, won, hunter
    /// mode requested, shooting players, cleanup of dead bullets.
    fn evaluate_conditions(&mut self) {
        if self.state != LevelState::InProgress {
            return;
        }
        let any_alive = self.players.iter().any(|id| {
            self.entities
                .get(id)
                .and_then(Entity::player)
                .is_some_and(|player| player.alive)
        });
        if !self.players.is_empty() && !any_alive {
            self.finish(LevelOutcome::Lost);
            return;
        }
        if !self.config.growable && self.remaining_pellets() == 0 {
            self.finish(LevelOutcome::Won);
            return;
        }

        let hunter_requested = self.players.iter().any(|id| {
            self.entities
                .get(id)
                .and_then(Entity::player)
                .is_some_and(|player| player.hunter_requested)
        });
        if hunter_requested {
            self.start_hunter_mode();
        }

        let shooters: Vec<EntityId> = self
            .players
            .iter()
            .copied()
            .filter(|id| {
                self.entities
                    .get(id)
                    .and_then(Entity::player)
                    .is_some_and(|player| player.alive && player.shooting.is_active())
            })
            .collect();
        for shooter in shooters {
            self.fire(shooter);
        }

        let dead_bullets: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| entity.bullet().is_some_and(|bullet| !bullet.alive))
            .map(|entity| entity.id)
            .collect();
        for bullet in dead_bullets {
            self.retire_bullet(bullet);
        }
    }

    fn finish(&mut self, outcome: LevelOutcome) {
        self.outcome = Some(outcome);
        self.stop();
        info!(?outcome, now_ms = self.now_ms, "level finished");
        self.emit(match outcome {
            LevelOutcome::Won => LevelEvent::LevelWon,
            LevelOutcome::Lost => LevelEvent::LevelLost,
        });
    }

    fn emit(&mut self, event: LevelEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer.on_event(&event);
        }
        self.events.push(event);
    }

    fn add_entity(&mut self, role: Role, facing: Direction) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.insert(id, Entity::new(id, role, facing));
        id
    }

    fn place(&mut self, id: EntityId, cell: CellId) {
        self.take_off_board(id);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.cell = Some(cell);
            self.board.add_occupant(cell, id);
        }
    }

    fn take_off_board(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        if let Some(cell) = entity.cell.take() {
            self.board.remove_occupant(cell, id);
        }
    }

    fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.take_off_board(id);
        self.scheduler.cancel(Job::Move(id));
        self.entities.remove(&id)
    }

    fn retire_bullet(&mut self, id: EntityId) {
        if self.despawn(id).is_some() {
            self.emit(LevelEvent::BulletRetired { bullet: id });
        }
    }

    fn cell_position(&self, id: EntityId) -> Option<Vec2> {
        let cell = self.entities.get(&id)?.cell?;
        Some(self.board.position(cell))
    }

    pub fn state(&self) -> LevelState {
        self.state
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == LevelState::InProgress
    }

    pub fn outcome(&self) -> Option<LevelOutcome> {
        self.outcome
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn hunter_mode(&self) -> HunterMode {
        self.hunter
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn players(&self) -> &[EntityId] {
        &self.players
    }

    pub fn ghosts(&self) -> Vec<EntityId> {
        self.ids_of(EntityKind::Ghost)
    }

    pub fn bullets(&self) -> Vec<EntityId> {
        self.ids_of(EntityKind::Bullet)
    }

    fn ids_of(&self, kind: EntityKind) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|entity| entity.kind() == kind)
            .map(|entity| entity.id)
            .collect()
    }

    pub fn score(&self, player: EntityId) -> Option<i32> {
        Some(self.entities.get(&player)?.player()?.score)
    }

    pub fn remaining_pellets(&self) -> usize {
        self.entities
            .values()
            .filter(|entity| matches!(entity.role, Role::Pellet { .. }) && entity.is_on_board())
            .count()
    }

    pub fn remaining_super_pellets(&self) -> usize {
        self.entities
            .values()
            .filter(|entity| {
                matches!(
                    entity.role,
                    Role::Pellet {
                        super_pellet: true,
                        ..
                    }
                ) && entity.is_on_board()
            })
            .count()
    }

    pub fn occupants_at(&self, x: i32, y: i32) -> Vec<&Entity> {
        let Some(cell) = self.board.cell_at(x, y) else {
            return Vec::new();
        };
        self.board
            .occupants(cell)
            .iter()
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    pub fn drain_events(&mut self) -> Vec<LevelEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn board_view(&self) -> BoardView {
        let tiles = (0..self.board.height())
            .map(|y| {
                (0..self.board.width())
                    .map(|x| match self.board.cell_at(x, y) {
                        Some(cell) if self.board.cell(cell).terrain == Terrain::Ground => ' ',
                        _ => '#',
                    })
                    .collect()
            })
            .collect();
        BoardView {
            width: self.board.width(),
            height: self.board.height(),
            tiles,
            config: self.config.clone(),
        }
    }

    pub fn snapshot(&mut self, include_events: bool) -> LevelSnapshot {
        let mut entities = Vec::new();
        for cell in self.board.cell_ids() {
            let position = self.board.position(cell);
            for id in self.board.occupants(cell) {
                if let Some(entity) = self.entities.get(id) {
                    entities.push(entity.view(position));
                }
            }
        }
        let players = self
            .players
            .iter()
            .filter_map(|id| {
                let entity = self.entities.get(id)?;
                let player = entity.player()?;
                Some(PlayerView {
                    id: *id,
                    score: player.score,
                    alive: player.alive,
                    position: entity.cell.map(|cell| self.board.position(cell)),
                    facing: entity.facing,
                    effects: player.active_effects(),
                })
            })
            .collect();
        let hunter = match self.hunter {
            HunterMode::Active {
                warning_at,
                ends_at,
                eaten,
                ..
            } => Some(HunterView {
                ends_at_ms: ends_at,
                warning_at_ms: warning_at,
                eaten,
            }),
            HunterMode::Inactive => None,
        };
        LevelSnapshot {
            now_ms: self.now_ms,
            state: self.state,
            outcome: self.outcome,
            width: self.board.width(),
            height: self.board.height(),
            pellets_left: self.remaining_pellets(),
            hunter,
            players,
            entities,
            events: if include_events {
                self.drain_events()
            } else {
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::testing::{level_from, pos_of, RecordingObserver};
    use super::*;

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut level = level_from(&["#####", "#P..#", "#####"]);
        level.register_player().expect("player");
        level.start(0);
        level.start(50);
        assert_eq!(level.state(), LevelState::InProgress);
        assert_eq!(
            level
                .drain_events()
                .iter()
                .filter(|event| **event == LevelEvent::LevelStarted)
                .count(),
            1
        );
        level.stop();
        level.stop();
        assert_eq!(level.state(), LevelState::Stopped);
        assert!(level.scheduler.is_empty());
    }

    #[test]
    fn scheduler_drives_player_movement() {
        let mut level = level_from(&["######", "#P...#", "######"]);
        let player = level.register_player().expect("player");
        level.start(0);
        level.advance(124);
        assert_eq!(pos_of(&level, player), Vec2::new(1, 1));
        level.advance(125);
        assert_eq!(pos_of(&level, player), Vec2::new(2, 1));
        level.advance(375);
        assert_eq!(pos_of(&level, player), Vec2::new(3, 1));
        assert_eq!(level.score(player), Some(20));
    }

    #[test]
    fn no_move_applies_after_stop() {
        let mut level = level_from(&["######", "#P...#", "######"]);
        let player = level.register_player().expect("player");
        level.start(0);
        level.stop();
        level.advance(10_000);
        assert_eq!(pos_of(&level, player), Vec2::new(1, 1));
        let outcome = level
            .move_entity(player, Direction::East)
            .expect("move");
        assert_eq!(outcome, MoveOutcome::Ignored);
        assert_eq!(pos_of(&level, player), Vec2::new(1, 1));
    }

    #[test]
    fn eating_last_pellet_wins_and_stops() {
        let mut level = level_from(&["#####", "#P. #", "#####"]);
        let player = level.register_player().expect("player");
        let seen = Arc::new(Mutex::new(Vec::new()));
        level.add_observer(Box::new(RecordingObserver(seen.clone())));
        level.start(0);
        level.move_entity(player, Direction::East).expect("move");
        assert_eq!(level.outcome(), Some(LevelOutcome::Won));
        assert_eq!(level.state(), LevelState::Stopped);
        let events = seen.lock().expect("events").clone();
        assert!(events.contains(&LevelEvent::LevelWon));
        level.start(100);
        assert_eq!(level.state(), LevelState::Stopped);
    }

    #[test]
    fn removed_observer_stops_receiving() {
        let mut level = level_from(&["#####", "#P..#", "#####"]);
        level.register_player().expect("player");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = level.add_observer(Box::new(RecordingObserver(seen.clone())));
        level.start(0);
        assert!(level.remove_observer(id));
        assert!(!level.remove_observer(id));
        level.stop();
        let events = seen.lock().expect("events").clone();
        assert_eq!(events, vec![LevelEvent::LevelStarted]);
    }

    #[test]
    fn register_without_start_cell_fails() {
        let mut level = level_from(&["####", "#..#", "####"]);
        assert!(matches!(
            level.register_player(),
            Err(LevelError::NoPlayerStart)
        ));
    }

    #[test]
    fn players_take_start_cells_round_robin() {
        let mut level = level_from(&["#####", "#P.P#", "#####"]);
        let a = level.register_player().expect("a");
        let b = level.register_player().expect("b");
        let c = level.register_player().expect("c");
        assert_eq!(pos_of(&level, a), Vec2::new(1, 1));
        assert_eq!(pos_of(&level, b), Vec2::new(3, 1));
        assert_eq!(pos_of(&level, c), Vec2::new(1, 1));
    }

    #[test]
    fn bridge_precedes_pellet_in_occupant_order() {
        let level = level_from(&["#####", "#PB.#", "#####", "-", "-", "H P"]);
        let kinds: Vec<EntityKind> = level
            .occupants_at(2, 1)
            .iter()
            .map(|entity| entity.kind())
            .collect();
        assert_eq!(kinds, vec![EntityKind::Bridge, EntityKind::Pellet]);
    }

    #[test]
    fn snapshot_drains_events_when_requested() {
        let mut level = level_from(&["#####", "#P..#", "#####"]);
        level.register_player().expect("player");
        level.start(0);
        let kept = level.snapshot(false);
        assert!(kept.events.is_empty());
        let drained = level.snapshot(true);
        assert_eq!(drained.events, vec![LevelEvent::LevelStarted]);
        assert!(level.snapshot(true).events.is_empty());
        assert_eq!(drained.players.len(), 1);
        assert_eq!(drained.pellets_left, 2);
        let json = serde_json::to_value(&drained).expect("serialize");
        assert_eq!(json["state"], "in_progress");
    }

    #[test]
    fn board_view_marks_walls() {
        let level = level_from(&["###", "#P#", "###"]);
        let view = level.board_view();
        assert_eq!(view.tiles, vec!["###", "# #", "###"]);
        assert_eq!(view.width, 3);
    }
}
