use super::*;
use crate::constants::{
    GHOST_FEARED_MOVE_INTERVAL_MS, GHOST_INTERVAL_JITTER_MS, GHOST_MOVE_INTERVAL_MS,
    PLAYER_BOOSTED_MOVE_INTERVAL_MS, PLAYER_MOVE_INTERVAL_MS, WANDERER_MOVE_INTERVAL_MS,
};
use crate::types::BridgePosition;

impl Level {
    /// Applies one move. Requests while the level is not running, or for an
    /// entity that cannot move, are ignored. The facing is updated even when
    /// the destination turns out to be blocked.
    pub fn move_entity(
        &mut self,
        id: EntityId,
        direction: Direction,
    ) -> Result<MoveOutcome, LevelError> {
        if self.state != LevelState::InProgress {
            return Ok(MoveOutcome::Ignored);
        }
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(LevelError::UnknownEntity(id))?;
        let Some(from) = entity.cell else {
            return Ok(MoveOutcome::Ignored);
        };
        if !entity.movable || entity.player().is_some_and(|player| !player.alive) {
            return Ok(MoveOutcome::Ignored);
        }
        if entity.bullet().is_none() {
            entity.facing = direction;
        }
        let kind = entity.kind();

        let destination = self.board.neighbor(from, direction);
        if !self.board.is_accessible(destination) || self.blocked_by_bridge(id, from, direction) {
            self.evaluate_conditions();
            return Ok(MoveOutcome::Blocked);
        }

        let arrivals: Vec<EntityId> = self.board.occupants(destination).to_vec();
        self.relocate(id, destination);
        if let Some(ghost) = self.entities.get_mut(&id).and_then(Entity::ghost_mut) {
            ghost.came_from = Some(direction.opposite());
        }

        let mut result = Ok(());
        // Every occupant present at entry collides, even after a warp moved
        // the mover on.
        for occupant in arrivals {
            if occupant == id || !self.entities.contains_key(&occupant) {
                continue;
            }
            if let Err(error) = self.collide(id, occupant) {
                result = Err(error);
                break;
            }
        }
        if result.is_ok() && kind == EntityKind::Player && self.config.growable {
            result = self.grow_around(id);
        }
        self.evaluate_conditions();
        result.map(|_| MoveOutcome::Moved)
    }

    pub fn steer(&mut self, player: EntityId, direction: Direction) -> Result<(), LevelError> {
        let entity = self
            .entities
            .get_mut(&player)
            .ok_or(LevelError::UnknownEntity(player))?;
        if entity.player().is_some_and(|state| state.alive) {
            entity.facing = direction;
        }
        Ok(())
    }

    pub(super) fn relocate(&mut self, id: EntityId, cell: CellId) {
        self.place(id, cell);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.bridge = BridgePosition::Off;
        }
    }

    pub(super) fn blocked_by_bridge(&self, id: EntityId, from: CellId, direction: Direction) -> bool {
        let axis = self.board.occupants(from).iter().find_map(|occupant| {
            match self.entities.get(occupant).map(|entity| &entity.role) {
                Some(Role::Bridge { axis }) => Some(*axis),
                _ => None,
            }
        });
        let Some(axis) = axis else {
            return false;
        };
        let on_top = self
            .entities
            .get(&id)
            .is_some_and(|entity| entity.bridge.is_on_top());
        let parallel = axis.is_parallel(direction);
        (on_top && !parallel) || (!on_top && parallel)
    }

    pub fn next_move(&mut self, id: EntityId) -> Option<Direction> {
        let entity = self.entities.get(&id)?;
        match entity.kind() {
            EntityKind::Player => {
                let player = entity.player()?;
                (player.alive && entity.is_on_board()).then_some(entity.facing)
            }
            EntityKind::Ghost => self.ghost_next_move(id),
            EntityKind::Bullet => self.bullet_next_move(id),
            _ => None,
        }
    }

    fn bullet_next_move(&mut self, id: EntityId) -> Option<Direction> {
        let entity = self.entities.get(&id)?;
        let bullet = entity.bullet()?;
        if !bullet.alive {
            return None;
        }
        let cell = entity.cell?;
        let heading = bullet.heading;
        let next = self.board.neighbor(cell, heading);
        if self.board.is_accessible(next) && !self.blocked_by_bridge(id, cell, heading) {
            return Some(heading);
        }
        if let Some(bullet) = self.entities.get_mut(&id).and_then(Entity::bullet_mut) {
            bullet.alive = false;
        }
        None
    }

    pub(super) fn move_interval(&mut self, id: EntityId) -> u64 {
        let Some(entity) = self.entities.get(&id) else {
            return PLAYER_MOVE_INTERVAL_MS;
        };
        match &entity.role {
            Role::Player(player) => {
                if player.speed_boost.is_active() {
                    PLAYER_BOOSTED_MOVE_INTERVAL_MS
                } else {
                    PLAYER_MOVE_INTERVAL_MS
                }
            }
            Role::Ghost(ghost) => {
                let base = if ghost.feared {
                    GHOST_FEARED_MOVE_INTERVAL_MS
                } else if ghost.personality == GhostPersonality::Wanderer {
                    WANDERER_MOVE_INTERVAL_MS
                } else {
                    GHOST_MOVE_INTERVAL_MS
                };
                let accelerated = ghost.acceleration.is_active();
                let speed = ghost.speed.max(0.1);
                let jitter = self.rng.int(0, GHOST_INTERVAL_JITTER_MS - 1) as u64;
                let mut interval = (base + jitter) as f32 / speed;
                if accelerated {
                    interval /= 2.0;
                }
                interval.round().max(1.0) as u64
            }
            Role::Bullet(_) => BULLET_MOVE_INTERVAL_MS,
            _ => PLAYER_MOVE_INTERVAL_MS,
        }
    }

    pub(super) fn run_move_job(&mut self, id: EntityId) -> Result<(), LevelError> {
        let Some(entity) = self.entities.get(&id) else {
            return Ok(());
        };
        if entity.bullet().is_some_and(|bullet| !bullet.alive) {
            self.retire_bullet(id);
            return Ok(());
        }
        if !entity.is_on_board() {
            return Ok(());
        }

        let result = match self.next_move(id) {
            Some(direction) => self.move_entity(id, direction).map(|_| ()),
            None => Ok(()),
        };

        let still_placed = self
            .entities
            .get(&id)
            .is_some_and(|entity| entity.is_on_board());
        if self.state == LevelState::InProgress && still_placed {
            let delay = self.move_interval(id);
            self.scheduler.schedule(Job::Move(id), self.now_ms + delay);
        }
        result
    }

    pub fn fire(&mut self, player: EntityId) -> Option<EntityId> {
        if self.state != LevelState::InProgress {
            return None;
        }
        let now = self.now_ms;
        let entity = self.entities.get_mut(&player)?;
        let cell = entity.cell?;
        let facing = entity.facing;
        let bridge = entity.bridge;
        let state = entity.player_mut()?;
        if !state.alive || !state.shooting.is_active() || state.fire_cooldown.is_active() {
            return None;
        }
        state.fire_cooldown.activate(now, FIRE_COOLDOWN_MS);

        let bullet = self.add_entity(
            Role::Bullet(BulletState {
                owner: player,
                heading: facing,
                alive: true,
            }),
            facing,
        );
        if let Some(entity) = self.entities.get_mut(&bullet) {
            entity.bridge = bridge;
        }
        self.place(bullet, cell);
        self.scheduler
            .schedule(Job::Move(bullet), now + BULLET_MOVE_INTERVAL_MS / 2);
        debug!(player = player.0, bullet = bullet.0, ?facing, "bullet fired");
        self.emit(LevelEvent::BulletFired { bullet, by: player });
        Some(bullet)
    }
}
