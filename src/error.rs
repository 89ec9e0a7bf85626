use thiserror::Error;

use crate::types::EntityId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map is empty")]
    Empty,

    #[error("row {row} is {found} wide, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid tile {tile:?} at ({x}, {y})")]
    InvalidTile { tile: char, x: usize, y: usize },

    #[error("map has {expected} teleports but {found} teleport references")]
    TeleportCount { expected: usize, found: usize },

    #[error("map has {expected} bridges but {found} bridge references")]
    BridgeCount { expected: usize, found: usize },

    #[error("malformed teleport reference {0:?}")]
    TeleportFormat(String),

    #[error("malformed bridge reference {0:?}")]
    BridgeFormat(String),

    #[error("teleport reference ({x}, {y}) is outside the map")]
    TeleportOutOfBounds { x: i64, y: i64 },

    #[error("chunk map is {found_width}x{found_height}, expected {width}x{height}")]
    ChunkSize {
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },

    #[error("growable level needs at least one chunk map")]
    NoChunks,
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("configuration error: {0}")]
    Config(#[from] MapError),

    #[error("no player start cell available")]
    NoPlayerStart,

    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),

    #[error("invariant violated: {0}")]
    Invariant(String),
}
