pub const TICK_RATE: u32 = 100;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const PLAYER_MOVE_INTERVAL_MS: u64 = 250;
pub const PLAYER_BOOSTED_MOVE_INTERVAL_MS: u64 = 125;

pub const GHOST_MOVE_INTERVAL_MS: u64 = 250;
pub const WANDERER_MOVE_INTERVAL_MS: u64 = 175;
pub const GHOST_FEARED_MOVE_INTERVAL_MS: u64 = 500;
pub const GHOST_INTERVAL_JITTER_MS: i32 = 50;

pub const BULLET_MOVE_INTERVAL_MS: u64 = 100;
pub const FIRE_COOLDOWN_MS: u64 = 1_000;

pub const PELLET_POINTS: i32 = 10;
pub const SUPER_PELLET_POINTS: i32 = 50;
pub const GHOST_EAT_POINTS: [i32; 4] = [200, 400, 800, 1_600];

pub const HUNTER_LONG_MS: u64 = 7_000;
pub const HUNTER_LONG_WARNING_MS: u64 = 5_000;
pub const HUNTER_SHORT_MS: u64 = 5_000;
pub const HUNTER_SHORT_WARNING_MS: u64 = 3_000;
pub const HUNTER_LONG_MIN_SUPER_PELLETS: usize = 2;
pub const WARNING_BLINK_MS: u64 = 250;

pub const GHOST_EXPLODE_MS: u64 = 1_000;
pub const GHOST_RESPAWN_MS: u64 = 5_000;
pub const HOLE_TRAP_MS: u64 = 1_000;

pub const FRUIT_LIFETIME_MS: u64 = 10_000;
pub const SPEED_BOOST_MS: u64 = 4_000;
pub const FISH_PARALYSIS_MS: u64 = 2_000;
pub const INVINCIBILITY_MS: u64 = 4_000;
pub const SHOOTING_MS: u64 = 4_000;
pub const GHOST_ACCELERATION_MS: u64 = 2_000;
pub const POMEGRANATE_RADIUS: usize = 4;

pub const MAX_GHOSTS: usize = 10;
pub const SPEED_UP_PERIOD_MS: u64 = 10_000;
pub const SPEED_UP_STEP: f32 = 0.05;
pub const GROWTH_MARGIN: i32 = 2;

pub const SPAWN_ATTEMPTS: usize = 24;

pub fn initial_spawn_delay_secs(roll: i32) -> u64 {
    (10 + roll.clamp(0, 10)) as u64
}

pub fn next_ghost_spawn_delay_secs(roll: i32, ghost_count: usize) -> u64 {
    (4 + roll.clamp(0, 5)) as u64 + ghost_count as u64
}

pub fn next_fruit_spawn_delay_secs(roll: i32) -> u64 {
    (10 + roll.clamp(0, 5)) as u64
}

/// Eats past the fourth in one hunter window score nothing.
pub fn ghost_eat_points(eaten_before: usize) -> i32 {
    GHOST_EAT_POINTS.get(eaten_before).copied().unwrap_or(0)
}

pub fn hunter_window_ms(super_pellets_left: usize) -> (u64, u64) {
    if super_pellets_left >= HUNTER_LONG_MIN_SUPER_PELLETS {
        return (HUNTER_LONG_MS, HUNTER_LONG_WARNING_MS);
    }
    (HUNTER_SHORT_MS, HUNTER_SHORT_WARNING_MS)
}
