//! Bee Core - Foundational types for the Bee engine
//!
//! This crate provides the types every other Bee crate depends on:
//! - `InstanceId`, `ObjectId`, `PathId`, `ParticleTypeId` - identifiers
//! - `Vec3`, `Rect`, `Velocity`, `Color` - spatial and common types
//! - `geometry` - rectangle overlap and screen-space angle math
//! - `Renderer` / `PositionSource` - collaborator interfaces
//! - Error types and Result alias

mod error;
pub mod geometry;
mod id;
mod lookup;
pub mod render;
pub mod spline;
mod types;

pub use error::{BeeError, Result};
pub use id::{IdAllocator, InstanceId, ObjectId, ParticleTypeId, PathId};
pub use lookup::{NoPositions, PositionSource};
pub use render::{BorderMode, DrawCall, DrawRect, RecordingRenderer, Renderer, Sprite};
pub use types::{Color, Flip, Rect, Ticks, Vec3, Velocity};
