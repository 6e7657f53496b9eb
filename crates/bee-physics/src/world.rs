//! Physics backend wrapping Rapier 3D

use crate::{BodyHandle, Contact, PhysicsBackend, PhysicsSettings, PhysicsShape};
use bee_core::{BeeError, Result, Vec3};
use rapier3d::prelude::*;
use std::collections::HashMap;

/// Per-body bookkeeping Rapier has no slot for
struct BodyEntry {
    rigid: RigidBodyHandle,
    shape: PhysicsShape,
    mass: f64,
    friction: f64,
    gravity: Vec3,
}

/// Wraps Rapier's physics pipeline and body/collider sets.
///
/// The solver works in world units divided by the configured scale. World
/// gravity is zero; each body's own gravity is applied as a force before
/// every step so instances can fall at different rates.
pub struct RapierPhysics {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    settings: PhysicsSettings,
    bodies: HashMap<BodyHandle, BodyEntry>,
    by_rigid: HashMap<RigidBodyHandle, BodyHandle>,
    next: u64,

    /// Collision events from the last step
    collision_recv: crossbeam::channel::Receiver<CollisionEvent>,
    _contact_force_recv: crossbeam::channel::Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,
}

impl RapierPhysics {
    pub fn new(settings: PhysicsSettings) -> Self {
        let (collision_send, collision_recv) = crossbeam::channel::unbounded();
        let (contact_force_send, contact_force_recv) = crossbeam::channel::unbounded();
        let event_handler = ChannelEventCollector::new(collision_send, contact_force_send);

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            settings,
            bodies: HashMap::new(),
            by_rigid: HashMap::new(),
            next: 1,
            collision_recv,
            _contact_force_recv: contact_force_recv,
            event_handler,
        }
    }

    fn to_solver(&self, v: Vec3) -> Vector<Real> {
        let s = self.settings.scale;
        vector![(v.x / s) as Real, (v.y / s) as Real, (v.z / s) as Real]
    }

    fn to_world(&self, v: &Vector<Real>) -> Vec3 {
        let s = self.settings.scale;
        Vec3::new(f64::from(v.x) * s, f64::from(v.y) * s, f64::from(v.z) * s)
    }

    fn entry(&self, body: BodyHandle) -> Result<&BodyEntry> {
        self.bodies
            .get(&body)
            .ok_or_else(|| BeeError::PhysicsError(format!("unknown {body:?}")))
    }

    fn rigid(&self, body: BodyHandle) -> Option<&RigidBody> {
        let entry = self.bodies.get(&body)?;
        self.rigid_body_set.get(entry.rigid)
    }

    fn rigid_mut(&mut self, body: BodyHandle) -> Result<&mut RigidBody> {
        let handle = self.entry(body)?.rigid;
        self.rigid_body_set
            .get_mut(handle)
            .ok_or_else(|| BeeError::PhysicsError(format!("{body:?} lost its rigid body")))
    }

    fn build_collider(&self, shape: PhysicsShape, friction: f64) -> Option<Collider> {
        let s = self.settings.scale;
        let builder = match shape {
            PhysicsShape::None => return None,
            PhysicsShape::Box {
                width,
                height,
                depth,
            } => {
                let (hx, hy, hz) = (width / s / 2.0, height / s / 2.0, depth / s / 2.0);
                // Body translation is the top-left corner
                ColliderBuilder::cuboid(hx as Real, hy as Real, hz as Real)
                    .translation(vector![hx as Real, hy as Real, 0.0])
            }
            PhysicsShape::Sphere { radius } => {
                let r = radius / s;
                ColliderBuilder::ball(r as Real).translation(vector![r as Real, r as Real, 0.0])
            }
        };
        Some(
            builder
                .density(0.0)
                .friction(friction as Real)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
        )
    }

    fn detach_colliders(&mut self, rigid: RigidBodyHandle) {
        let colliders: Vec<ColliderHandle> = self
            .rigid_body_set
            .get(rigid)
            .map(|b| b.colliders().to_vec())
            .unwrap_or_default();
        for collider in colliders {
            self.collider_set.remove(
                collider,
                &mut self.island_manager,
                &mut self.rigid_body_set,
                true,
            );
        }
    }

    fn body_of_collider(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        let parent = self.collider_set.get(collider)?.parent()?;
        self.by_rigid.get(&parent).copied()
    }
}

impl Default for RapierPhysics {
    fn default() -> Self {
        Self::new(PhysicsSettings::default())
    }
}

impl PhysicsBackend for RapierPhysics {
    fn create_body(&mut self, shape: PhysicsShape, mass: f64, position: Vec3) -> BodyHandle {
        let builder = if mass > 0.0 {
            RigidBodyBuilder::dynamic().additional_mass(mass as Real)
        } else {
            RigidBodyBuilder::fixed()
        };
        let rigid = self
            .rigid_body_set
            .insert(builder.translation(self.to_solver(position)).build());

        let friction = self.settings.default_friction;
        if let Some(collider) = self.build_collider(shape, friction) {
            self.collider_set
                .insert_with_parent(collider, rigid, &mut self.rigid_body_set);
        }

        let handle = BodyHandle(self.next);
        self.next += 1;
        self.bodies.insert(
            handle,
            BodyEntry {
                rigid,
                shape,
                mass,
                friction,
                gravity: self.settings.gravity_vec(),
            },
        );
        self.by_rigid.insert(rigid, handle);
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        let Some(entry) = self.bodies.remove(&body) else {
            return false;
        };
        self.by_rigid.remove(&entry.rigid);
        self.rigid_body_set.remove(
            entry.rigid,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    fn has_body(&self, body: BodyHandle) -> bool {
        self.bodies.contains_key(&body)
    }

    fn shape(&self, body: BodyHandle) -> Option<PhysicsShape> {
        self.bodies.get(&body).map(|e| e.shape)
    }

    fn set_shape(&mut self, body: BodyHandle, shape: PhysicsShape) -> Result<()> {
        let (rigid, friction) = {
            let entry = self.entry(body)?;
            (entry.rigid, entry.friction)
        };
        self.detach_colliders(rigid);
        if let Some(collider) = self.build_collider(shape, friction) {
            self.collider_set
                .insert_with_parent(collider, rigid, &mut self.rigid_body_set);
        }
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.shape = shape;
        }
        Ok(())
    }

    fn mass(&self, body: BodyHandle) -> Option<f64> {
        self.bodies.get(&body).map(|e| e.mass)
    }

    fn set_mass(&mut self, body: BodyHandle, mass: f64) -> Result<()> {
        let rb = self.rigid_mut(body)?;
        if mass > 0.0 {
            rb.set_body_type(RigidBodyType::Dynamic, true);
            rb.set_additional_mass(mass as Real, true);
        } else {
            rb.set_body_type(RigidBodyType::Fixed, true);
        }
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.mass = mass;
        }
        Ok(())
    }

    fn position(&self, body: BodyHandle) -> Option<Vec3> {
        self.rigid(body).map(|rb| self.to_world(rb.translation()))
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec3) -> Result<()> {
        let t = self.to_solver(position);
        self.rigid_mut(body)?.set_translation(t, true);
        Ok(())
    }

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.rigid(body).map(|rb| self.to_world(rb.linvel()))
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<()> {
        let v = self.to_solver(velocity);
        self.rigid_mut(body)?.set_linvel(v, true);
        Ok(())
    }

    fn angular_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.rigid(body).map(|rb| {
            let w = rb.angvel();
            Vec3::new(f64::from(w.x), f64::from(w.y), f64::from(w.z))
        })
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> Result<()> {
        // Point bodies take world-sized impulses
        let factor = self.scale(body) / self.settings.scale;
        let j = vector![
            (impulse.x * factor) as Real,
            (impulse.y * factor) as Real,
            (impulse.z * factor) as Real
        ];
        self.rigid_mut(body)?.apply_impulse(j, true);
        Ok(())
    }

    fn friction(&self, body: BodyHandle) -> Option<f64> {
        self.bodies.get(&body).map(|e| e.friction)
    }

    fn set_friction(&mut self, body: BodyHandle, friction: f64) -> Result<()> {
        let rigid = self.entry(body)?.rigid;
        let colliders: Vec<ColliderHandle> = self
            .rigid_body_set
            .get(rigid)
            .map(|b| b.colliders().to_vec())
            .unwrap_or_default();
        for handle in colliders {
            if let Some(collider) = self.collider_set.get_mut(handle) {
                collider.set_friction(friction as Real);
            }
        }
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.friction = friction;
        }
        Ok(())
    }

    fn gravity(&self, body: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&body).map(|e| e.gravity)
    }

    fn set_gravity(&mut self, body: BodyHandle, gravity: Vec3) -> Result<()> {
        let rigid = self.entry(body)?.rigid;
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.gravity = gravity;
        }
        if let Some(rb) = self.rigid_body_set.get_mut(rigid) {
            rb.wake_up(true);
        }
        Ok(())
    }

    fn step(&mut self, dt: f64) {
        self.integration_parameters.dt = dt as Real;

        for entry in self.bodies.values() {
            if entry.mass <= 0.0 {
                continue;
            }
            let force = self.to_solver(entry.gravity * entry.mass);
            if let Some(rb) = self.rigid_body_set.get_mut(entry.rigid) {
                rb.reset_forces(false);
                rb.add_force(force, false);
            }
        }

        let no_gravity: Vector<Real> = vector![0.0, 0.0, 0.0];
        self.physics_pipeline.step(
            &no_gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_handler,
        );
    }

    fn drain_contacts(&mut self) -> Vec<Contact> {
        let mut contacts = Vec::new();
        while let Ok(event) = self.collision_recv.try_recv() {
            let (Some(a), Some(b)) = (
                self.body_of_collider(event.collider1()),
                self.body_of_collider(event.collider2()),
            ) else {
                log::debug!(target: "bee::physics", "dropping contact for a removed body");
                continue;
            };
            contacts.push(Contact {
                a: a.min(b),
                b: a.max(b),
                started: event.started(),
            });
        }
        contacts
    }

    fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }
}
