//! Bee Particles - 2D particle effects
//!
//! A `ParticleSystem` owns its particle types, a live particle population
//! and five kinds of modifier:
//! - emitters spawn particles inside a region at a rate or in bursts
//! - attractors pull particles toward (or push away from) an anchor
//! - destroyers kill particles entering a region
//! - deflectors bounce particles back out of a region
//! - changers alter particles passing through a region
//!
//! Each frame applies the modifiers, then the drawing pass submits one
//! batch per particle type and retires particles whose lifetime ran out.

pub mod attractor;
pub mod changer;
pub mod deflector;
pub mod destroyer;
pub mod emitter;
pub mod particle;
pub mod rand;
mod system;

pub use attractor::{Falloff, ParticleAttractor};
pub use changer::{ChangeAction, ParticleChanger};
pub use deflector::ParticleDeflector;
pub use destroyer::ParticleDestroyer;
pub use emitter::{EmitterConfig, Emission, ParticleEmitter};
pub use particle::{DeathCallback, ParticleData, ParticleType, SpawnQueue};
pub use system::ParticleSystem;
