use serde::{Deserialize, Serialize};

use crate::config::LevelConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "north" | "up" => Some(Self::North),
            "east" | "right" => Some(Self::East),
            "south" | "down" => Some(Self::South),
            "west" | "left" => Some(Self::West),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Self::East | Self::West => Axis::Horizontal,
            Self::North | Self::South => Axis::Vertical,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn is_parallel(self, direction: Direction) -> bool {
        direction.axis() == self
    }

    pub fn direction(self) -> Direction {
        match self {
            Self::Horizontal => Direction::East,
            Self::Vertical => Direction::North,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn manhattan(self, other: Vec2) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Ground,
    Wall,
}

impl Terrain {
    pub fn is_accessible(self) -> bool {
        self == Terrain::Ground
    }
}

/// Where a unit stands relative to a bridge in its cell. `Off` and `Under`
/// share a level; only `OnTop` is elevated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgePosition {
    #[default]
    Off,
    OnTop,
    Under,
}

impl BridgePosition {
    pub fn is_on_top(self) -> bool {
        self == BridgePosition::OnTop
    }

    pub fn same_level(self, other: BridgePosition) -> bool {
        self.is_on_top() == other.is_on_top()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Ghost,
    Bullet,
    Pellet,
    Fruit,
    Hole,
    Teleport,
    Bridge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FruitKind {
    BellPepper,
    Fish,
    Tomato,
    KidneyBean,
    Pomegranate,
    Potato,
}

impl FruitKind {
    pub const ALL: [FruitKind; 6] = [
        FruitKind::BellPepper,
        FruitKind::Fish,
        FruitKind::Tomato,
        FruitKind::KidneyBean,
        FruitKind::Pomegranate,
        FruitKind::Potato,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostPersonality {
    Chaser,
    Ambusher,
    Fickle,
    Shy,
    Wanderer,
}

impl GhostPersonality {
    pub const CLASSIC: [GhostPersonality; 4] = [
        GhostPersonality::Chaser,
        GhostPersonality::Fickle,
        GhostPersonality::Ambusher,
        GhostPersonality::Shy,
    ];

    pub const ALL: [GhostPersonality; 5] = [
        GhostPersonality::Chaser,
        GhostPersonality::Ambusher,
        GhostPersonality::Fickle,
        GhostPersonality::Shy,
        GhostPersonality::Wanderer,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "sprite", rename_all = "snake_case")]
pub enum Sprite {
    Pacman,
    PacmanDead,
    PacmanParalyzed,
    PacmanInvincible,
    PacmanShooting,
    Ghost { personality: GhostPersonality },
    GhostFeared,
    GhostFearedBlink,
    GhostExploding,
    GhostParalyzed,
    Bullet,
    Pellet,
    SuperPellet,
    Fruit { kind: FruitKind },
    Hole,
    Teleport,
    Bridge { axis: Axis },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    SpeedBoost,
    Paralysis,
    Invincibility,
    Shooting,
    Acceleration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelState {
    NotStarted,
    InProgress,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelOutcome {
    Won,
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Ignored,
    Blocked,
    Moved,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LevelEvent {
    LevelStarted,
    LevelStopped,
    LevelWon,
    LevelLost,
    PelletEaten {
        by: EntityId,
        points: i32,
        x: i32,
        y: i32,
        #[serde(rename = "superPellet")]
        super_pellet: bool,
    },
    HunterModeStarted {
        #[serde(rename = "durationMs")]
        duration_ms: u64,
        #[serde(rename = "warningMs")]
        warning_ms: u64,
    },
    HunterModeWarning,
    HunterModeEnded,
    GhostEaten {
        ghost: EntityId,
        by: EntityId,
        points: i32,
    },
    GhostExploded {
        ghost: EntityId,
    },
    GhostRemoved {
        ghost: EntityId,
    },
    GhostRespawned {
        ghost: EntityId,
        x: i32,
        y: i32,
    },
    GhostSpawned {
        ghost: EntityId,
        personality: GhostPersonality,
        x: i32,
        y: i32,
    },
    GhostsSpedUp {
        speed: f32,
    },
    PlayerDied {
        player: EntityId,
    },
    FruitSpawned {
        fruit: EntityId,
        kind: FruitKind,
        x: i32,
        y: i32,
    },
    FruitEaten {
        fruit: EntityId,
        kind: FruitKind,
        by: EntityId,
    },
    FruitExpired {
        fruit: EntityId,
    },
    EffectStarted {
        entity: EntityId,
        effect: EffectKind,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    EffectEnded {
        entity: EntityId,
        effect: EffectKind,
    },
    Trapped {
        entity: EntityId,
        x: i32,
        y: i32,
    },
    Teleported {
        entity: EntityId,
        x: i32,
        y: i32,
    },
    BulletFired {
        bullet: EntityId,
        by: EntityId,
    },
    BulletRetired {
        bullet: EntityId,
    },
    BoardExtended {
        direction: Direction,
        width: i32,
        height: i32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
    pub bridge: BridgePosition,
    pub sprite: Sprite,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub id: EntityId,
    pub score: i32,
    pub alive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
    pub facing: Direction,
    pub effects: Vec<EffectKind>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HunterView {
    #[serde(rename = "endsAtMs")]
    pub ends_at_ms: u64,
    #[serde(rename = "warningAtMs")]
    pub warning_at_ms: u64,
    pub eaten: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct BoardView {
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<String>,
    pub config: LevelConfig,
}

#[derive(Clone, Debug, Serialize)]
pub struct LevelSnapshot {
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub state: LevelState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<LevelOutcome>,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "pelletsLeft")]
    pub pellets_left: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hunter: Option<HunterView>,
    pub players: Vec<PlayerView>,
    pub entities: Vec<EntityView>,
    pub events: Vec<LevelEvent>,
}
