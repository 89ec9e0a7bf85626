use super::*;
use crate::constants::{ghost_eat_points, hunter_window_ms, WARNING_BLINK_MS};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HunterMode {
    #[default]
    Inactive,
    Active {
        warning_at: u64,
        ends_at: u64,
        next_blink_at: u64,
        eaten: usize,
    },
}

impl HunterMode {
    pub fn is_active(&self) -> bool {
        matches!(self, HunterMode::Active { .. })
    }

    pub fn eaten(&self) -> usize {
        match self {
            HunterMode::Active { eaten, .. } => *eaten,
            HunterMode::Inactive => 0,
        }
    }

    pub(super) fn record_eat(&mut self) -> i32 {
        match self {
            HunterMode::Active { eaten, .. } => {
                let points = ghost_eat_points(*eaten);
                *eaten += 1;
                points
            }
            HunterMode::Inactive => ghost_eat_points(0),
        }
    }
}

impl Level {
    pub(super) fn start_hunter_mode(&mut self) {
        for id in &self.players {
            if let Some(player) = self.entities.get_mut(id).and_then(Entity::player_mut) {
                player.hunter_requested = false;
            }
        }
        let (duration_ms, warning_ms) = hunter_window_ms(self.remaining_super_pellets());
        let warning_at = self.now_ms + warning_ms;
        self.hunter = HunterMode::Active {
            warning_at,
            ends_at: self.now_ms + duration_ms,
            next_blink_at: warning_at,
            eaten: 0,
        };
        for entity in self.entities.values_mut() {
            if let Some(ghost) = entity.ghost_mut() {
                ghost.blink = false;
                if !ghost.is_out_of_play() {
                    ghost.feared = true;
                }
            }
        }
        info!(duration_ms, warning_ms, "hunter mode started");
        self.emit(LevelEvent::HunterModeStarted {
            duration_ms,
            warning_ms,
        });
    }

    pub(super) fn poll_hunter(&mut self) {
        let HunterMode::Active {
            warning_at,
            ends_at,
            next_blink_at,
            eaten,
        } = self.hunter
        else {
            return;
        };
        if self.now_ms >= ends_at {
            self.end_hunter_mode();
            return;
        }
        if self.now_ms < next_blink_at {
            return;
        }

        let first_blink = next_blink_at == warning_at;
        let steps = (self.now_ms - next_blink_at) / WARNING_BLINK_MS + 1;
        self.hunter = HunterMode::Active {
            warning_at,
            ends_at,
            next_blink_at: next_blink_at + steps * WARNING_BLINK_MS,
            eaten,
        };
        if steps % 2 == 1 {
            for entity in self.entities.values_mut() {
                if let Some(ghost) = entity.ghost_mut() {
                    if ghost.feared {
                        ghost.blink = !ghost.blink;
                    }
                }
            }
        }
        if first_blink {
            debug!(now_ms = self.now_ms, "hunter mode warning");
            self.emit(LevelEvent::HunterModeWarning);
        }
    }

    fn end_hunter_mode(&mut self) {
        self.hunter = HunterMode::Inactive;
        for entity in self.entities.values_mut() {
            if let Some(ghost) = entity.ghost_mut() {
                ghost.feared = false;
                ghost.blink = false;
            }
        }
        info!(now_ms = self.now_ms, "hunter mode ended");
        self.emit(LevelEvent::HunterModeEnded);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{first_of, level_from};
    use super::*;

    fn hunter_level(rows: &[&str]) -> (Level, EntityId) {
        let mut level = level_from(rows);
        let ghost = first_of(&level, EntityKind::Ghost);
        if let Some(entity) = level.entities.get_mut(&ghost) {
            entity.movable = false;
        }
        let player = level.register_player().expect("player");
        if let Some(entity) = level.entities.get_mut(&player) {
            entity.movable = false;
        }
        level.start(0);
        (level, ghost)
    }

    fn is_feared(level: &Level, ghost: EntityId) -> bool {
        level
            .entity(ghost)
            .and_then(Entity::ghost)
            .is_some_and(|state| state.feared)
    }

    #[test]
    fn window_depends_on_super_pellets_left() {
        let (mut level, _) = hunter_level(&["########", "#P G oo#", "########"]);
        level.start_hunter_mode();
        assert_eq!(
            level.hunter_mode(),
            HunterMode::Active {
                warning_at: 5_000,
                ends_at: 7_000,
                next_blink_at: 5_000,
                eaten: 0
            }
        );

        let (mut level, _) = hunter_level(&["########", "#P G o.#", "########"]);
        level.start_hunter_mode();
        assert!(matches!(
            level.hunter_mode(),
            HunterMode::Active {
                warning_at: 3_000,
                ends_at: 5_000,
                ..
            }
        ));
    }

    #[test]
    fn super_pellet_starts_hunter_mode_and_fears_ghosts() {
        let (mut level, ghost) = hunter_level(&["########", "#PoG ..#", "########"]);
        let player = level.players()[0];
        if let Some(entity) = level.entities.get_mut(&player) {
            entity.movable = true;
        }
        level.move_entity(player, Direction::East).expect("move");
        assert!(level.hunter_mode().is_active());
        assert!(is_feared(&level, ghost));
        assert_eq!(level.score(player), Some(50));
        assert!(level.drain_events().iter().any(|event| matches!(
            event,
            LevelEvent::HunterModeStarted {
                duration_ms: 5_000,
                ..
            }
        )));
    }

    #[test]
    fn replacing_activation_does_not_end_early() {
        let (mut level, ghost) = hunter_level(&["########", "#P G ..#", "########"]);
        level.start_hunter_mode();
        level.advance(4_000);
        level.start_hunter_mode();
        level.advance(5_500);
        assert!(level.hunter_mode().is_active());
        assert!(is_feared(&level, ghost));
        level.advance(9_000);
        assert!(!level.hunter_mode().is_active());
        assert!(!is_feared(&level, ghost));
    }

    #[test]
    fn warning_blinks_then_mode_ends() {
        let (mut level, ghost) = hunter_level(&["########", "#P G ..#", "########"]);
        level.start_hunter_mode();
        let blink = |level: &Level| {
            level
                .entity(ghost)
                .and_then(Entity::ghost)
                .is_some_and(|state| state.blink)
        };
        level.advance(2_999);
        assert!(!blink(&level));
        level.advance(3_000);
        assert!(blink(&level));
        level.advance(3_250);
        assert!(!blink(&level));
        level.advance(3_500);
        assert!(blink(&level));

        let warnings = level
            .drain_events()
            .iter()
            .filter(|event| **event == LevelEvent::HunterModeWarning)
            .count();
        assert_eq!(warnings, 1);

        level.advance(5_000);
        assert!(!level.hunter_mode().is_active());
        assert!(!is_feared(&level, ghost));
        assert!(!blink(&level));
        assert!(level.drain_events().contains(&LevelEvent::HunterModeEnded));
    }

    #[test]
    fn fifth_eat_in_a_window_scores_nothing() {
        let mut mode = HunterMode::Active {
            warning_at: 0,
            ends_at: 10,
            next_blink_at: 0,
            eaten: 0,
        };
        let points: Vec<i32> = (0..5).map(|_| mode.record_eat()).collect();
        assert_eq!(points, vec![200, 400, 800, 1_600, 0]);
        assert_eq!(mode.eaten(), 5);
    }
}
