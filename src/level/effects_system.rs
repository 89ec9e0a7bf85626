use super::*;

impl Level {
    pub(super) fn poll_timers(&mut self) {
        let now = self.now_ms;
        let mut ended: Vec<(EntityId, EffectKind)> = Vec::new();
        let mut removals: Vec<EntityId> = Vec::new();
        let mut respawns: Vec<EntityId> = Vec::new();
        let mut expired_fruits: Vec<EntityId> = Vec::new();

        for entity in self.entities.values_mut() {
            let id = entity.id;
            match &mut entity.role {
                Role::Player(player) => {
                    if player.speed_boost.poll(now) {
                        ended.push((id, EffectKind::SpeedBoost));
                    }
                    if player.paralysis.poll(now) {
                        entity.movable = true;
                        ended.push((id, EffectKind::Paralysis));
                    }
                    if player.invincibility.poll(now) {
                        ended.push((id, EffectKind::Invincibility));
                    }
                    if player.shooting.poll(now) {
                        ended.push((id, EffectKind::Shooting));
                    }
                    player.fire_cooldown.poll(now);
                }
                Role::Ghost(ghost) => {
                    if ghost.paralysis.poll(now) {
                        entity.movable = true;
                        ended.push((id, EffectKind::Paralysis));
                    }
                    if ghost.acceleration.poll(now) {
                        ended.push((id, EffectKind::Acceleration));
                    }
                    match ghost.phase {
                        GhostPhase::Exploding { remove_at } if now >= remove_at => {
                            removals.push(id);
                        }
                        GhostPhase::Respawning { respawn_at } if now >= respawn_at => {
                            respawns.push(id);
                        }
                        _ => {}
                    }
                }
                Role::Fruit(fruit) => {
                    if fruit.despawn_at.is_some_and(|at| now >= at) {
                        expired_fruits.push(id);
                    }
                }
                _ => {}
            }
        }

        for (entity, effect) in ended {
            self.emit(LevelEvent::EffectEnded { entity, effect });
        }
        for ghost in removals {
            self.remove_exploded_ghost(ghost);
        }
        for ghost in respawns {
            self.respawn_ghost(ghost);
        }
        for fruit in expired_fruits {
            if self.despawn(fruit).is_some() {
                debug!(fruit = fruit.0, "fruit expired");
                self.emit(LevelEvent::FruitExpired { fruit });
            }
        }
        self.poll_hunter();
    }

    fn remove_exploded_ghost(&mut self, ghost: EntityId) {
        let respawn_ms = self.config.ghost_respawn_ms;
        self.take_off_board(ghost);
        self.scheduler.cancel(Job::Move(ghost));
        let Some(state) = self.entities.get_mut(&ghost).and_then(Entity::ghost_mut) else {
            return;
        };
        let GhostPhase::Exploding { remove_at } = state.phase else {
            return;
        };
        state.phase = GhostPhase::Respawning {
            respawn_at: remove_at + respawn_ms,
        };
        self.emit(LevelEvent::GhostRemoved { ghost });
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::level_from;
    use super::*;

    #[test]
    fn effects_end_once_and_restore_movement() {
        let mut level = level_from(&["#####", "#P..#", "#####"]);
        let player = level.register_player().expect("player");
        level.start(0);
        if let Some(entity) = level.entities.get_mut(&player) {
            entity.movable = false;
            if let Some(state) = entity.player_mut() {
                state.paralysis.activate(0, 2_000);
                state.invincibility.activate(0, 1_000);
            }
        }
        level.drain_events();

        level.now_ms = 1_000;
        level.poll_timers();
        level.poll_timers();
        assert_eq!(
            level.drain_events(),
            vec![LevelEvent::EffectEnded {
                entity: player,
                effect: EffectKind::Invincibility
            }]
        );
        assert!(!level.entity(player).is_some_and(|entity| entity.movable));

        level.now_ms = 2_000;
        level.poll_timers();
        assert!(level.entity(player).is_some_and(|entity| entity.movable));
        assert_eq!(
            level.drain_events(),
            vec![LevelEvent::EffectEnded {
                entity: player,
                effect: EffectKind::Paralysis
            }]
        );
    }

    #[test]
    fn unpicked_fruit_expires() {
        let mut level = level_from(&["######", "#P ..#", "######"]);
        level.register_player().expect("player");
        let cell = level.board.cell_at(2, 1).expect("cell");
        let fruit = level.spawn_fruit(FruitKind::Tomato, cell);
        level.now_ms = FRUIT_LIFETIME_MS - 1;
        level.poll_timers();
        assert!(level.entity(fruit).is_some());
        level.now_ms = FRUIT_LIFETIME_MS;
        level.poll_timers();
        assert!(level.entity(fruit).is_none());
        assert!(level
            .drain_events()
            .contains(&LevelEvent::FruitExpired { fruit }));
    }

    #[test]
    fn exploded_ghost_leaves_then_returns() {
        let mut level = level_from(&["#######", "#P.G..#", "#######"]);
        let ghost = level.ghosts()[0];
        level.explode_ghost(ghost);
        level.now_ms = GHOST_EXPLODE_MS;
        level.poll_timers();
        assert!(level.entity(ghost).is_some_and(|entity| !entity.is_on_board()));
        let events = level.drain_events();
        assert!(events.contains(&LevelEvent::GhostRemoved { ghost }));

        level.now_ms = GHOST_EXPLODE_MS + level.config.ghost_respawn_ms;
        level.poll_timers();
        assert!(level.entity(ghost).is_some_and(Entity::is_on_board));
        assert!(level
            .drain_events()
            .iter()
            .any(|event| matches!(event, LevelEvent::GhostRespawned { .. })));
    }
}
