use serde::{Deserialize, Serialize};

use crate::constants::{GHOST_RESPAWN_MS, GROWTH_MARGIN, HOLE_TRAP_MS, MAX_GHOSTS, TICK_RATE};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LevelOptions {
    pub seed: Option<u32>,
    pub growable: bool,
    pub fruit_spawning: Option<bool>,
    pub max_ghosts: Option<usize>,
    pub growth_margin: Option<i32>,
    pub ghost_respawn_ms: Option<u64>,
    pub hole_trap_ms: Option<u64>,
}

impl LevelOptions {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelConfig {
    #[serde(rename = "tickRate")]
    pub tick_rate: u32,
    pub seed: u32,
    pub growable: bool,
    #[serde(rename = "fruitSpawning")]
    pub fruit_spawning: bool,
    #[serde(rename = "maxGhosts")]
    pub max_ghosts: usize,
    #[serde(rename = "growthMargin")]
    pub growth_margin: i32,
    #[serde(rename = "ghostRespawnMs")]
    pub ghost_respawn_ms: u64,
    #[serde(rename = "holeTrapMs")]
    pub hole_trap_ms: u64,
}

impl LevelConfig {
    pub fn resolve(options: &LevelOptions, has_fruit_cells: bool) -> Self {
        Self {
            tick_rate: TICK_RATE,
            seed: options.seed.unwrap_or(1),
            growable: options.growable,
            fruit_spawning: options
                .fruit_spawning
                .unwrap_or(options.growable || has_fruit_cells),
            max_ghosts: options.max_ghosts.unwrap_or(MAX_GHOSTS),
            growth_margin: options.growth_margin.unwrap_or(GROWTH_MARGIN).max(1),
            ghost_respawn_ms: options.ghost_respawn_ms.unwrap_or(GHOST_RESPAWN_MS),
            hole_trap_ms: options.hole_trap_ms.unwrap_or(HOLE_TRAP_MS),
        }
    }
}
