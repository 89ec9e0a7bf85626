use crate::effect::Timed;
use crate::types::{
    Axis, BridgePosition, CellId, Direction, EffectKind, EntityId, EntityKind, EntityView,
    FruitKind, GhostPersonality, Sprite, Vec2,
};

#[derive(Clone, Debug, Default)]
pub struct PlayerState {
    pub score: i32,
    pub alive: bool,
    pub hunter_requested: bool,
    pub speed_boost: Timed,
    pub paralysis: Timed,
    pub invincibility: Timed,
    pub shooting: Timed,
    pub fire_cooldown: Timed,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            alive: true,
            ..Self::default()
        }
    }

    pub fn active_effects(&self) -> Vec<EffectKind> {
        let mut effects = Vec::new();
        if self.speed_boost.is_active() {
            effects.push(EffectKind::SpeedBoost);
        }
        if self.paralysis.is_active() {
            effects.push(EffectKind::Paralysis);
        }
        if self.invincibility.is_active() {
            effects.push(EffectKind::Invincibility);
        }
        if self.shooting.is_active() {
            effects.push(EffectKind::Shooting);
        }
        effects
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GhostPhase {
    Roaming,
    Exploding { remove_at: u64 },
    Respawning { respawn_at: u64 },
}

#[derive(Clone, Debug)]
pub struct GhostState {
    pub personality: GhostPersonality,
    pub phase: GhostPhase,
    pub feared: bool,
    pub blink: bool,
    pub paralysis: Timed,
    pub acceleration: Timed,
    pub speed: f32,
    pub came_from: Option<Direction>,
}

impl GhostState {
    pub fn new(personality: GhostPersonality, speed: f32) -> Self {
        Self {
            personality,
            phase: GhostPhase::Roaming,
            feared: false,
            blink: false,
            paralysis: Timed::Inactive,
            acceleration: Timed::Inactive,
            speed,
            came_from: None,
        }
    }

    pub fn is_out_of_play(&self) -> bool {
        !matches!(self.phase, GhostPhase::Roaming)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BulletState {
    pub owner: EntityId,
    pub heading: Direction,
    pub alive: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct FruitState {
    pub kind: FruitKind,
    pub despawn_at: Option<u64>,
}

#[derive(Clone, Debug)]
pub enum Role {
    Player(PlayerState),
    Ghost(GhostState),
    Bullet(BulletState),
    Pellet { points: i32, super_pellet: bool },
    Fruit(FruitState),
    Hole { trap_ms: u64 },
    Teleport { target: Option<CellId> },
    Bridge { axis: Axis },
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub role: Role,
    pub(crate) cell: Option<CellId>,
    pub facing: Direction,
    pub movable: bool,
    pub bridge: BridgePosition,
}

impl Entity {
    pub fn new(id: EntityId, role: Role, facing: Direction) -> Self {
        Self {
            id,
            role,
            cell: None,
            facing,
            movable: true,
            bridge: BridgePosition::Off,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self.role {
            Role::Player(_) => EntityKind::Player,
            Role::Ghost(_) => EntityKind::Ghost,
            Role::Bullet(_) => EntityKind::Bullet,
            Role::Pellet { .. } => EntityKind::Pellet,
            Role::Fruit(_) => EntityKind::Fruit,
            Role::Hole { .. } => EntityKind::Hole,
            Role::Teleport { .. } => EntityKind::Teleport,
            Role::Bridge { .. } => EntityKind::Bridge,
        }
    }

    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }

    pub fn is_on_board(&self) -> bool {
        self.cell.is_some()
    }

    pub fn is_mover(&self) -> bool {
        matches!(
            self.role,
            Role::Player(_) | Role::Ghost(_) | Role::Bullet(_)
        )
    }

    pub fn player(&self) -> Option<&PlayerState> {
        match &self.role {
            Role::Player(state) => Some(state),
            _ => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.role {
            Role::Player(state) => Some(state),
            _ => None,
        }
    }

    pub fn ghost(&self) -> Option<&GhostState> {
        match &self.role {
            Role::Ghost(state) => Some(state),
            _ => None,
        }
    }

    pub fn ghost_mut(&mut self) -> Option<&mut GhostState> {
        match &mut self.role {
            Role::Ghost(state) => Some(state),
            _ => None,
        }
    }

    pub fn bullet(&self) -> Option<&BulletState> {
        match &self.role {
            Role::Bullet(state) => Some(state),
            _ => None,
        }
    }

    pub fn bullet_mut(&mut self) -> Option<&mut BulletState> {
        match &mut self.role {
            Role::Bullet(state) => Some(state),
            _ => None,
        }
    }

    pub fn sprite(&self) -> Sprite {
        match &self.role {
            Role::Player(player) => {
                if !player.alive {
                    Sprite::PacmanDead
                } else if player.paralysis.is_active() {
                    Sprite::PacmanParalyzed
                } else if player.invincibility.is_active() {
                    Sprite::PacmanInvincible
                } else if player.shooting.is_active() {
                    Sprite::PacmanShooting
                } else {
                    Sprite::Pacman
                }
            }
            Role::Ghost(ghost) => match ghost.phase {
                GhostPhase::Exploding { .. } | GhostPhase::Respawning { .. } => {
                    Sprite::GhostExploding
                }
                GhostPhase::Roaming if ghost.feared && ghost.blink => Sprite::GhostFearedBlink,
                GhostPhase::Roaming if ghost.feared => Sprite::GhostFeared,
                GhostPhase::Roaming if ghost.paralysis.is_active() => Sprite::GhostParalyzed,
                GhostPhase::Roaming => Sprite::Ghost {
                    personality: ghost.personality,
                },
            },
            Role::Bullet(_) => Sprite::Bullet,
            Role::Pellet { super_pellet, .. } => {
                if *super_pellet {
                    Sprite::SuperPellet
                } else {
                    Sprite::Pellet
                }
            }
            Role::Fruit(fruit) => Sprite::Fruit { kind: fruit.kind },
            Role::Hole { .. } => Sprite::Hole,
            Role::Teleport { .. } => Sprite::Teleport,
            Role::Bridge { axis } => Sprite::Bridge { axis: *axis },
        }
    }

    pub fn view(&self, position: Vec2) -> EntityView {
        EntityView {
            id: self.id,
            kind: self.kind(),
            x: position.x,
            y: position.y,
            facing: self.facing,
            bridge: self.bridge,
            sprite: self.sprite(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_role() {
        let ghost = Entity::new(
            EntityId(1),
            Role::Ghost(GhostState::new(GhostPersonality::Chaser, 1.0)),
            Direction::West,
        );
        assert_eq!(ghost.kind(), EntityKind::Ghost);
        assert!(ghost.is_mover());
        let hole = Entity::new(EntityId(2), Role::Hole { trap_ms: 1_000 }, Direction::North);
        assert_eq!(hole.kind(), EntityKind::Hole);
        assert!(!hole.is_mover());
    }

    #[test]
    fn ghost_sprite_tracks_fear_and_blink() {
        let mut ghost = Entity::new(
            EntityId(1),
            Role::Ghost(GhostState::new(GhostPersonality::Shy, 1.0)),
            Direction::West,
        );
        assert_eq!(
            ghost.sprite(),
            Sprite::Ghost {
                personality: GhostPersonality::Shy
            }
        );
        if let Some(state) = ghost.ghost_mut() {
            state.feared = true;
        }
        assert_eq!(ghost.sprite(), Sprite::GhostFeared);
        if let Some(state) = ghost.ghost_mut() {
            state.blink = true;
        }
        assert_eq!(ghost.sprite(), Sprite::GhostFearedBlink);
    }

    #[test]
    fn player_effects_are_listed() {
        let mut player = PlayerState::new();
        assert!(player.alive);
        player.shooting.activate(0, 100);
        player.invincibility.activate(0, 100);
        assert_eq!(
            player.active_effects(),
            vec![EffectKind::Invincibility, EffectKind::Shooting]
        );
    }
}
