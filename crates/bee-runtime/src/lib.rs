//! Bee Runtime - Frame loop infrastructure
//!
//! Provides the pieces a host loop wires together:
//! - `GameClock` / `Timing` - engine ticks, frame delta and target frame rate
//! - `EngineConfig` - TOML configuration for rooms, physics and particles
//! - `logger` - `env_logger` bootstrap for the `log` facade

mod clock;
mod config;
pub mod logger;

pub use clock::{GameClock, Timing};
pub use config::{EngineConfig, ParticleSettings, RoomSettings};
