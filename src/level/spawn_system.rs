use super::*;
use crate::constants::{
    next_fruit_spawn_delay_secs, next_ghost_spawn_delay_secs, SPAWN_ATTEMPTS, SPEED_UP_STEP,
};
use crate::types::BridgePosition;

const MIN_PLAYER_DISTANCE: i32 = 3;

impl Level {
    pub(super) fn respawn_ghost(&mut self, ghost: EntityId) {
        let center = self.board.center();
        let cell = if self.board.is_accessible(center) {
            Some(center)
        } else {
            self.board.nearest_accessible(center)
        };
        let Some(cell) = cell else {
            warn!(ghost = ghost.0, "no accessible cell to respawn on");
            return;
        };
        let speed = self.ghost_speed;
        let Some(entity) = self.entities.get_mut(&ghost) else {
            return;
        };
        let Some(state) = entity.ghost_mut() else {
            return;
        };
        state.phase = GhostPhase::Roaming;
        state.feared = false;
        state.blink = false;
        state.paralysis.cancel();
        state.acceleration.cancel();
        state.came_from = None;
        state.speed = speed;
        entity.movable = true;
        entity.bridge = BridgePosition::Off;

        self.place(ghost, cell);
        let position = self.board.position(cell);
        debug!(ghost = ghost.0, x = position.x, y = position.y, "ghost respawned");
        self.emit(LevelEvent::GhostRespawned {
            ghost,
            x: position.x,
            y: position.y,
        });
        if self.state == LevelState::InProgress {
            self.schedule_first_move(ghost);
        }
    }

    pub(super) fn spawn_ghost_tick(&mut self) {
        if self.state != LevelState::InProgress {
            return;
        }
        let ghost_count = self.ghosts().len();
        if ghost_count < self.config.max_ghosts {
            if let Some(cell) = self.ghost_spawn_cell() {
                let personality = self
                    .rng
                    .pick(&GhostPersonality::ALL)
                    .unwrap_or(GhostPersonality::Chaser);
                let ghost = self.add_ghost(personality, cell);
                self.schedule_first_move(ghost);
                let position = self.board.position(cell);
                info!(
                    ghost = ghost.0,
                    ?personality,
                    x = position.x,
                    y = position.y,
                    "ghost spawned"
                );
                self.emit(LevelEvent::GhostSpawned {
                    ghost,
                    personality,
                    x: position.x,
                    y: position.y,
                });
            }
        }
        let delay = next_ghost_spawn_delay_secs(self.rng.int(0, 5), self.ghosts().len());
        self.scheduler
            .schedule(Job::SpawnGhost, self.now_ms + delay * 1_000);
    }

    fn ghost_spawn_cell(&mut self) -> Option<CellId> {
        let players = self.alive_player_positions();
        if let Some(anchor) = players.first().copied() {
            for _ in 0..SPAWN_ATTEMPTS {
                let Some(cell) = self.random_cell_near(anchor) else {
                    continue;
                };
                let position = self.board.position(cell);
                let far_enough = players
                    .iter()
                    .all(|player| player.manhattan(position) >= MIN_PLAYER_DISTANCE);
                if far_enough && !self.cell_has(cell, EntityKind::Ghost) {
                    return Some(cell);
                }
            }
        }
        let starts: Vec<CellId> = self
            .ghost_starts
            .iter()
            .copied()
            .filter(|cell| self.board.is_accessible(*cell))
            .collect();
        if let Some(cell) = self.rng.pick(&starts) {
            return Some(cell);
        }
        let center = self.board.center();
        if self.board.is_accessible(center) {
            return Some(center);
        }
        self.board.nearest_accessible(center)
    }

    pub(super) fn spawn_fruit_tick(&mut self) {
        if self.state != LevelState::InProgress {
            return;
        }
        if let Some(cell) = self.fruit_spawn_cell() {
            let kind = self.rng.pick(&FruitKind::ALL).unwrap_or(FruitKind::BellPepper);
            self.spawn_fruit(kind, cell);
        }
        let delay = next_fruit_spawn_delay_secs(self.rng.int(0, 5));
        self.scheduler
            .schedule(Job::SpawnFruit, self.now_ms + delay * 1_000);
    }

    fn fruit_spawn_cell(&mut self) -> Option<CellId> {
        let reachable: Vec<Vec<Option<usize>>> = self
            .players
            .iter()
            .filter_map(|id| {
                let entity = self.entities.get(id)?;
                let cell = entity.cell?;
                entity
                    .player()
                    .is_some_and(|player| player.alive)
                    .then(|| self.board.distances_from(cell))
            })
            .collect();
        if reachable.is_empty() {
            return None;
        }
        let is_candidate = |level: &Level, cell: CellId| {
            level.board.is_accessible(cell)
                && level.board.occupants(cell).iter().all(|id| {
                    level.entities.get(id).is_some_and(|entity| {
                        !matches!(
                            entity.kind(),
                            EntityKind::Fruit | EntityKind::Player | EntityKind::Ghost
                        )
                    })
                })
                && reachable.iter().any(|distances| distances[cell.0].is_some())
        };

        if self.config.growable {
            let anchor = self.alive_player_positions().first().copied()?;
            for _ in 0..SPAWN_ATTEMPTS {
                let Some(cell) = self.random_cell_near(anchor) else {
                    continue;
                };
                if is_candidate(&*self, cell) {
                    return Some(cell);
                }
            }
            return None;
        }
        let candidates: Vec<CellId> = self
            .fruit_cells
            .iter()
            .copied()
            .filter(|cell| is_candidate(&*self, *cell))
            .collect();
        self.rng.pick(&candidates)
    }

    pub fn spawn_fruit(&mut self, kind: FruitKind, cell: CellId) -> EntityId {
        let fruit = self.add_entity(
            Role::Fruit(FruitState {
                kind,
                despawn_at: Some(self.now_ms + FRUIT_LIFETIME_MS),
            }),
            Direction::North,
        );
        self.place(fruit, cell);
        let position = self.board.position(cell);
        debug!(fruit = fruit.0, ?kind, x = position.x, y = position.y, "fruit spawned");
        self.emit(LevelEvent::FruitSpawned {
            fruit,
            kind,
            x: position.x,
            y: position.y,
        });
        fruit
    }

    pub(super) fn speed_up_ghosts(&mut self) {
        self.ghost_speed += SPEED_UP_STEP;
        let speed = self.ghost_speed;
        for entity in self.entities.values_mut() {
            if let Some(ghost) = entity.ghost_mut() {
                ghost.speed = speed;
            }
        }
        debug!(speed, "ghosts sped up");
        self.emit(LevelEvent::GhostsSpedUp { speed });
        if self.state == LevelState::InProgress {
            self.scheduler
                .schedule(Job::SpeedUp, self.now_ms + SPEED_UP_PERIOD_MS);
        }
    }

    fn alive_player_positions(&self) -> Vec<Vec2> {
        self.players
            .iter()
            .filter_map(|id| {
                let entity = self.entities.get(id)?;
                if !entity.player()?.alive {
                    return None;
                }
                Some(self.board.position(entity.cell?))
            })
            .collect()
    }

    fn random_cell_near(&mut self, anchor: Vec2) -> Option<CellId> {
        let x = anchor.x + self.rng.int(-self.chunk_width, self.chunk_width);
        let y = anchor.y + self.rng.int(-self.chunk_height, self.chunk_height);
        let cell = self.board.cell_at(x, y)?;
        self.board.is_accessible(cell).then_some(cell)
    }

    fn cell_has(&self, cell: CellId, kind: EntityKind) -> bool {
        self.board
            .occupants(cell)
            .iter()
            .any(|id| self.entities.get(id).is_some_and(|entity| entity.kind() == kind))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{level_from, pos_of};
    use super::*;

    #[test]
    fn spawned_ghost_keeps_distance_and_timer_rearms() {
        let mut level = level_from(&["###########", "#P........#", "###########"]);
        let player = level.register_player().expect("player");
        level.start(0);
        level.spawn_ghost_tick();
        let ghosts = level.ghosts();
        assert_eq!(ghosts.len(), 1);
        let ghost_at = pos_of(&level, ghosts[0]);
        assert!(ghost_at.manhattan(pos_of(&level, player)) >= MIN_PLAYER_DISTANCE);
        assert!(level.scheduler.is_scheduled(Job::SpawnGhost));
        assert!(level.scheduler.is_scheduled(Job::Move(ghosts[0])));
        assert!(level
            .drain_events()
            .iter()
            .any(|event| matches!(event, LevelEvent::GhostSpawned { .. })));
    }

    #[test]
    fn ghost_cap_is_respected() {
        let mut level = level_from(&["###########", "#P...G....#", "###########"]);
        level.register_player().expect("player");
        level.config.max_ghosts = 1;
        level.start(0);
        level.spawn_ghost_tick();
        assert_eq!(level.ghosts().len(), 1);
        assert!(level.scheduler.is_scheduled(Job::SpawnGhost));
    }

    #[test]
    fn fruit_spawns_on_free_reachable_fruit_cell() {
        let mut level = level_from(&["######", "#PF..#", "######"]);
        level.register_player().expect("player");
        assert!(level.config.fruit_spawning);
        level.start(0);
        assert!(level.scheduler.is_scheduled(Job::SpawnFruit));
        level.spawn_fruit_tick();
        level.spawn_fruit_tick();
        let fruits: Vec<&Entity> = level
            .entities()
            .filter(|entity| entity.kind() == EntityKind::Fruit)
            .collect();
        assert_eq!(fruits.len(), 1);
        assert_eq!(
            fruits[0].cell().map(|cell| level.board.position(cell)),
            Some(Vec2::new(2, 1))
        );
    }

    #[test]
    fn unreachable_fruit_cell_stays_empty() {
        let mut level = level_from(&["######", "#P#F.#", "#.####", "######"]);
        level.register_player().expect("player");
        level.start(0);
        level.spawn_fruit_tick();
        assert!(level
            .entities()
            .all(|entity| entity.kind() != EntityKind::Fruit));
        assert!(level.scheduler.is_scheduled(Job::SpawnFruit));
    }

    #[test]
    fn speed_up_applies_to_every_ghost() {
        let mut level = level_from(&["#######", "#PG.G.#", "#######"]);
        level.start(0);
        level.speed_up_ghosts();
        for ghost in level.ghosts() {
            let speed = level.entity(ghost).and_then(Entity::ghost).map(|g| g.speed);
            assert_eq!(speed, Some(1.0 + SPEED_UP_STEP));
        }
        assert!(level.scheduler.is_scheduled(Job::SpeedUp));
    }

    #[test]
    fn respawn_falls_back_to_nearest_accessible_cell() {
        let mut level = level_from(&["#######", "#P.#.G#", "#######"]);
        let ghost = level.ghosts()[0];
        level.take_off_board(ghost);
        if let Some(state) = level.entities.get_mut(&ghost).and_then(Entity::ghost_mut) {
            state.phase = GhostPhase::Respawning { respawn_at: 0 };
            state.feared = true;
        }
        level.respawn_ghost(ghost);
        assert_eq!(pos_of(&level, ghost), Vec2::new(4, 1));
        let state = level.entity(ghost).and_then(Entity::ghost).expect("ghost");
        assert_eq!(state.phase, GhostPhase::Roaming);
        assert!(!state.feared);
    }
}
