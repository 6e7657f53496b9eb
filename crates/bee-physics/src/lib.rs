//! Bee Physics - rigid bodies behind a pluggable backend
//!
//! Instances never integrate their own motion. They own a [`BodyHandle`] and
//! translate game-level requests ("move 5 units toward 30 degrees") into
//! solver calls on a [`PhysicsBackend`]:
//! - `RapierPhysics` - wraps the Rapier 3D pipeline, body and collider sets
//! - `MockPhysics` - deterministic explicit-Euler bodies for tests and headless runs

pub mod mock;
pub mod world;

use bee_core::{Result, Vec3};
use serde::Deserialize;
use std::fmt;

pub use mock::MockPhysics;
pub use world::RapierPhysics;

/// Opaque handle to a body owned by a backend
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct BodyHandle(pub u64);

impl fmt::Debug for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BodyHandle({})", self.0)
    }
}

/// Collision shape of a body, in world units
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PhysicsShape {
    /// A point mass without a collider
    None,
    Box { width: f64, height: f64, depth: f64 },
    Sphere { radius: f64 },
}

impl PhysicsShape {
    /// A flat box for a sprite-sized instance
    pub fn sprite_box(width: f64, height: f64) -> Self {
        if width > 0.0 && height > 0.0 {
            PhysicsShape::Box {
                width,
                height,
                depth: 1.0,
            }
        } else {
            PhysicsShape::None
        }
    }
}

/// A pair of bodies that started or stopped touching during the last step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub started: bool,
}

/// World-level physics settings
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Default gravity for new bodies, world units per second squared
    pub gravity: [f64; 3],
    /// World units per solver unit
    pub scale: f64,
    /// Mass given to bodies created without one. Zero makes them static.
    pub default_mass: f64,
    pub default_friction: f64,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0, 0.0],
            scale: 10.0,
            default_mass: 0.0,
            default_friction: 0.5,
        }
    }
}

impl PhysicsSettings {
    pub fn gravity_vec(&self) -> Vec3 {
        Vec3::from_array(self.gravity)
    }
}

/// Solver operations an instance needs.
///
/// Positions and velocities are in world units. Impulses are in solver
/// units, which is why [`scale`](PhysicsBackend::scale) exists: callers
/// divide world-sized impulses by it before applying them.
///
/// Queries return `None` and mutators return an error when the handle is
/// unknown, so a torn-down body never crashes the frame loop.
pub trait PhysicsBackend {
    fn create_body(&mut self, shape: PhysicsShape, mass: f64, position: Vec3) -> BodyHandle;

    /// Remove a body and its collider. Returns false for unknown handles.
    fn remove_body(&mut self, body: BodyHandle) -> bool;

    fn has_body(&self, body: BodyHandle) -> bool;

    fn shape(&self, body: BodyHandle) -> Option<PhysicsShape>;
    fn set_shape(&mut self, body: BodyHandle, shape: PhysicsShape) -> Result<()>;

    fn mass(&self, body: BodyHandle) -> Option<f64>;
    fn set_mass(&mut self, body: BodyHandle, mass: f64) -> Result<()>;

    fn position(&self, body: BodyHandle) -> Option<Vec3>;
    fn set_position(&mut self, body: BodyHandle, position: Vec3) -> Result<()>;

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3>;
    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<()>;

    fn angular_velocity(&self, body: BodyHandle) -> Option<Vec3>;

    /// Apply an impulse at the center of mass, waking the body
    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> Result<()>;

    fn friction(&self, body: BodyHandle) -> Option<f64>;
    fn set_friction(&mut self, body: BodyHandle, friction: f64) -> Result<()>;

    fn gravity(&self, body: BodyHandle) -> Option<Vec3>;
    fn set_gravity(&mut self, body: BodyHandle, gravity: Vec3) -> Result<()>;

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f64);

    /// Contacts reported since the last drain
    fn drain_contacts(&mut self) -> Vec<Contact>;

    fn settings(&self) -> &PhysicsSettings;

    /// World units per solver unit
    fn world_scale(&self) -> f64 {
        self.settings().scale
    }

    /// Scale factor for impulses on this body.
    ///
    /// Shaped bodies live in solver units; collider-less point bodies are
    /// moved in world units directly.
    fn scale(&self, body: BodyHandle) -> f64 {
        match self.shape(body) {
            Some(PhysicsShape::Box { .. }) | Some(PhysicsShape::Sphere { .. }) => {
                self.world_scale()
            }
            _ => 1.0,
        }
    }
}
