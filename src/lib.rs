pub mod board;
pub mod config;
pub mod constants;
pub mod effect;
pub mod entity;
pub mod error;
pub mod level;
pub mod map;
pub mod rng;
pub mod runtime;
pub mod scheduler;
pub mod types;
