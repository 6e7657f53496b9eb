//! Deterministic physics backend
//!
//! Integrates with explicit Euler and reports box overlaps as contacts.
//! Nothing here is solver-accurate; it exists so instance logic can be
//! stepped and asserted exactly.

use crate::{BodyHandle, Contact, PhysicsBackend, PhysicsSettings, PhysicsShape};
use bee_core::geometry::check_collision;
use bee_core::{BeeError, Rect, Result, Vec3};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
struct MockBody {
    shape: PhysicsShape,
    mass: f64,
    position: Vec3,
    velocity: Vec3,
    angular_velocity: Vec3,
    friction: f64,
    gravity: Vec3,
}

impl MockBody {
    fn footprint(&self) -> Option<Rect> {
        let (w, h) = match self.shape {
            PhysicsShape::None => return None,
            PhysicsShape::Box { width, height, .. } => (width, height),
            PhysicsShape::Sphere { radius } => (radius * 2.0, radius * 2.0),
        };
        Some(Rect::new(
            self.position.x as i32,
            self.position.y as i32,
            w as i32,
            h as i32,
        ))
    }
}

/// Explicit-Euler bodies in world units
pub struct MockPhysics {
    settings: PhysicsSettings,
    bodies: BTreeMap<BodyHandle, MockBody>,
    next: u64,
    touching: BTreeSet<(BodyHandle, BodyHandle)>,
    contacts: Vec<Contact>,
}

impl MockPhysics {
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            settings,
            bodies: BTreeMap::new(),
            next: 1,
            touching: BTreeSet::new(),
            contacts: Vec::new(),
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body(&self, handle: BodyHandle) -> Result<&MockBody> {
        self.bodies
            .get(&handle)
            .ok_or_else(|| BeeError::PhysicsError(format!("unknown {handle:?}")))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut MockBody> {
        self.bodies
            .get_mut(&handle)
            .ok_or_else(|| BeeError::PhysicsError(format!("unknown {handle:?}")))
    }

    fn detect_contacts(&mut self) {
        let shaped: Vec<(BodyHandle, Rect)> = self
            .bodies
            .iter()
            .filter_map(|(h, b)| b.footprint().map(|r| (*h, r)))
            .collect();

        let mut now = BTreeSet::new();
        for (i, (ha, ra)) in shaped.iter().enumerate() {
            for (hb, rb) in &shaped[i + 1..] {
                if check_collision(ra, rb) {
                    now.insert((*ha, *hb));
                }
            }
        }

        for pair in now.difference(&self.touching) {
            self.contacts.push(Contact {
                a: pair.0,
                b: pair.1,
                started: true,
            });
        }
        for pair in self.touching.difference(&now) {
            self.contacts.push(Contact {
                a: pair.0,
                b: pair.1,
                started: false,
            });
        }
        self.touching = now;
    }
}

impl Default for MockPhysics {
    fn default() -> Self {
        Self::new(PhysicsSettings::default())
    }
}

impl PhysicsBackend for MockPhysics {
    fn create_body(&mut self, shape: PhysicsShape, mass: f64, position: Vec3) -> BodyHandle {
        let handle = BodyHandle(self.next);
        self.next += 1;
        self.bodies.insert(
            handle,
            MockBody {
                shape,
                mass,
                position,
                velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
                friction: self.settings.default_friction,
                gravity: self.settings.gravity_vec(),
            },
        );
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        if self.bodies.remove(&body).is_none() {
            return false;
        }
        self.touching.retain(|(a, b)| *a != body && *b != body);
        true
    }

    fn has_body(&self, body: BodyHandle) -> bool {
        self.bodies.contains_key(&body)
    }

    fn shape(&self, body: BodyHandle) -> Option<PhysicsShape> {
        self.bodies.get(&body).map(|b| b.shape)
    }

    fn set_shape(&mut self, body: BodyHandle, shape: PhysicsShape) -> Result<()> {
        self.body_mut(body)?.shape = shape;
        Ok(())
    }

    fn mass(&self, body: BodyHandle) -> Option<f64> {
        self.bodies.get(&body).map(|b| b.mass)
    }

    fn set_mass(&mut self, body: BodyHandle, mass: f64) -> Result<()> {
        let b = self.body_mut(body)?;
        b.mass = mass;
        if mass <= 0.0 {
            b.velocity = Vec3::ZERO;
        }
        Ok(())
    }

    fn position(&self, body: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&body).map(|b| b.position)
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec3) -> Result<()> {
        self.body_mut(body)?.position = position;
        Ok(())
    }

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&body).map(|b| b.velocity)
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<()> {
        self.body_mut(body)?.velocity = velocity;
        Ok(())
    }

    fn angular_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&body).map(|b| b.angular_velocity)
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> Result<()> {
        let scale = self.scale(body);
        let b = self.body_mut(body)?;
        // Static bodies ignore impulses
        if b.mass > 0.0 {
            b.velocity = b.velocity + impulse * (scale / b.mass);
        }
        Ok(())
    }

    fn friction(&self, body: BodyHandle) -> Option<f64> {
        self.bodies.get(&body).map(|b| b.friction)
    }

    fn set_friction(&mut self, body: BodyHandle, friction: f64) -> Result<()> {
        self.body_mut(body)?.friction = friction;
        Ok(())
    }

    fn gravity(&self, body: BodyHandle) -> Option<Vec3> {
        self.body(body).ok().map(|b| b.gravity)
    }

    fn set_gravity(&mut self, body: BodyHandle, gravity: Vec3) -> Result<()> {
        self.body_mut(body)?.gravity = gravity;
        Ok(())
    }

    fn step(&mut self, dt: f64) {
        for b in self.bodies.values_mut().filter(|b| b.mass > 0.0) {
            b.velocity = b.velocity + b.gravity * dt;
            b.position = b.position + b.velocity * dt;
        }
        self.detect_contacts();
    }

    fn drain_contacts(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.contacts)
    }

    fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn impulse_moves_point_body() {
        let mut physics = MockPhysics::default();
        let body = physics.create_body(PhysicsShape::None, 1.0, Vec3::ZERO);
        physics
            .apply_impulse(body, Vec3::new(5.0, 0.0, 0.0))
            .unwrap();
        physics.step(1.0);
        assert!(approx(
            physics.position(body).unwrap(),
            Vec3::new(5.0, 0.0, 0.0)
        ));
    }

    #[test]
    fn impulse_on_shaped_body_is_scaled() {
        let mut physics = MockPhysics::default();
        let body = physics.create_body(PhysicsShape::sprite_box(4.0, 4.0), 2.0, Vec3::ZERO);
        physics
            .apply_impulse(body, Vec3::new(1.0, 0.0, 0.0))
            .unwrap();
        assert!(approx(
            physics.linear_velocity(body).unwrap(),
            Vec3::new(5.0, 0.0, 0.0)
        ));
    }

    #[test]
    fn static_body_ignores_impulse_and_gravity() {
        let mut physics = MockPhysics::new(PhysicsSettings {
            gravity: [0.0, 10.0, 0.0],
            ..Default::default()
        });
        let body = physics.create_body(PhysicsShape::None, 0.0, Vec3::new(3.0, 3.0, 0.0));
        physics
            .apply_impulse(body, Vec3::new(1.0, 0.0, 0.0))
            .unwrap();
        physics.step(1.0);
        assert!(approx(
            physics.position(body).unwrap(),
            Vec3::new(3.0, 3.0, 0.0)
        ));
    }

    #[test]
    fn gravity_accelerates_dynamic_body() {
        let mut physics = MockPhysics::new(PhysicsSettings {
            gravity: [0.0, 10.0, 0.0],
            ..Default::default()
        });
        let body = physics.create_body(PhysicsShape::None, 1.0, Vec3::ZERO);
        physics.step(0.5);
        physics.step(0.5);
        let pos = physics.position(body).unwrap();
        assert!(pos.y > 0.0);
        assert!(approx(
            physics.linear_velocity(body).unwrap(),
            Vec3::new(0.0, 10.0, 0.0)
        ));
    }

    #[test]
    fn overlap_reports_start_then_stop() {
        let mut physics = MockPhysics::default();
        let a = physics.create_body(PhysicsShape::sprite_box(10.0, 10.0), 0.0, Vec3::ZERO);
        let b = physics.create_body(
            PhysicsShape::sprite_box(10.0, 10.0),
            0.0,
            Vec3::new(5.0, 5.0, 0.0),
        );

        physics.step(0.016);
        assert_eq!(
            physics.drain_contacts(),
            vec![Contact {
                a,
                b,
                started: true
            }]
        );

        physics.step(0.016);
        assert!(physics.drain_contacts().is_empty());

        physics
            .set_position(b, Vec3::new(10.0, 0.0, 0.0))
            .unwrap();
        physics.step(0.016);
        assert_eq!(
            physics.drain_contacts(),
            vec![Contact {
                a,
                b,
                started: false
            }]
        );
    }

    #[test]
    fn unknown_handle_is_an_error() {
        let mut physics = MockPhysics::default();
        let body = physics.create_body(PhysicsShape::None, 1.0, Vec3::ZERO);
        assert!(physics.remove_body(body));
        assert!(!physics.remove_body(body));
        assert!(physics.position(body).is_none());
        assert!(physics.set_position(body, Vec3::ONE).is_err());
    }
}
