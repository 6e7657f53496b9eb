//! Simulated entities bound to an object template

use crate::data::InstanceData;
use crate::object::ObjectTemplate;
use crate::path::PathFollower;
use bee_core::geometry::{direction_of, distance, polar_to_cartesian};
use bee_core::{
    BeeError, Color, DrawRect, Flip, InstanceId, ObjectId, Rect, Renderer, Result, Ticks, Vec3,
};
use bee_particles::rand::ParticleRng;
use bee_physics::{BodyHandle, PhysicsBackend, PhysicsShape};
use std::cmp::Reverse;
use std::sync::Arc;

/// Alarm slots per instance
pub const ALARM_COUNT: usize = 8;

/// Where another instance sits relative to this one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    None,
    Above,
    Right,
    Below,
    Left,
}

/// One simulated entity.
///
/// The position lives in the physics body. Until the first
/// [`set_position`](Instance::set_position) there is no body and the start
/// position is reported instead.
pub struct Instance {
    id: InstanceId,
    object_id: ObjectId,
    object: Arc<ObjectTemplate>,
    pub depth: i32,
    body: Option<BodyHandle>,
    start: Vec3,
    previous: Vec3,
    /// Absolute tick deadlines, `None` never fires
    alarms: [Option<Ticks>; ALARM_COUNT],
    path: Option<PathFollower>,
    pub is_path_drawn: bool,
    /// Path following halts while the room is paused
    pub is_path_pausable: bool,
    pub data: InstanceData,
    /// Tick the sprite animation counts from
    pub subimage_time: Ticks,
}

impl Instance {
    pub(crate) fn new(
        id: InstanceId,
        object_id: ObjectId,
        object: Arc<ObjectTemplate>,
        start: Vec3,
        now: Ticks,
    ) -> Self {
        Self {
            id,
            object_id,
            depth: object.depth,
            object,
            body: None,
            start,
            previous: start,
            alarms: [None; ALARM_COUNT],
            path: None,
            is_path_drawn: false,
            is_path_pausable: false,
            data: InstanceData::new(),
            subimage_time: now,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn object(&self) -> &ObjectTemplate {
        &self.object
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    fn require_body(&self) -> Result<BodyHandle> {
        self.body
            .ok_or_else(|| BeeError::BodyMissing(self.id.to_string()))
    }

    /// Update and draw order: deeper first, then older first
    pub fn sort_key(&self) -> (Reverse<i32>, InstanceId) {
        (Reverse(self.depth), self.id)
    }

    pub fn width(&self) -> u32 {
        self.object.mask_size().0
    }

    pub fn height(&self) -> u32 {
        self.object.mask_size().1
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    /// Position at the beginning of the current step
    pub fn previous(&self) -> Vec3 {
        self.previous
    }

    pub(crate) fn remember_position(&mut self, physics: &dyn PhysicsBackend) {
        self.previous = self.position(physics);
    }

    pub fn position(&self, physics: &dyn PhysicsBackend) -> Vec3 {
        self.body
            .and_then(|b| physics.position(b))
            .unwrap_or(self.start)
    }

    /// Move the instance, creating its body on first use
    pub fn set_position(&mut self, physics: &mut dyn PhysicsBackend, position: Vec3) -> Result<()> {
        match self.body {
            Some(body) => physics.set_position(body, position),
            None => {
                let shape =
                    PhysicsShape::sprite_box(f64::from(self.width()), f64::from(self.height()));
                let mass = self
                    .object
                    .mass
                    .unwrap_or(physics.settings().default_mass);
                self.body = Some(physics.create_body(shape, mass, position));
                Ok(())
            }
        }
    }

    pub(crate) fn take_body(&mut self) -> Option<BodyHandle> {
        self.body.take()
    }

    /// Footprint with its top-left corner at (x, y)
    pub fn aabb_at(&self, x: f64, y: f64) -> Rect {
        Rect::new(x as i32, y as i32, self.width() as i32, self.height() as i32)
    }

    pub fn aabb(&self, physics: &dyn PhysicsBackend) -> Rect {
        let p = self.position(physics);
        self.aabb_at(p.x, p.y)
    }

    // ── alarms ──

    fn alarm_slot(&mut self, index: usize) -> Result<&mut Option<Ticks>> {
        self.alarms.get_mut(index).ok_or(BeeError::IndexOutOfRange {
            what: "alarm",
            index,
            len: ALARM_COUNT,
        })
    }

    /// Fire alarm `index` once `ticks` have passed after `now`
    pub fn set_alarm(&mut self, index: usize, ticks: Ticks, now: Ticks) -> Result<()> {
        *self.alarm_slot(index)? = Some(now + ticks);
        Ok(())
    }

    pub fn clear_alarm(&mut self, index: usize) -> Result<()> {
        *self.alarm_slot(index)? = None;
        Ok(())
    }

    pub fn alarm(&self, index: usize) -> Option<Ticks> {
        self.alarms.get(index).copied().flatten()
    }

    /// Reset every alarm due at `now` and return their slots
    pub(crate) fn take_due_alarms(&mut self, now: Ticks) -> Vec<usize> {
        let mut due = Vec::new();
        for (i, slot) in self.alarms.iter_mut().enumerate() {
            if slot.is_some_and(|deadline| deadline <= now) {
                *slot = None;
                due.push(i);
            }
        }
        due
    }

    // ── movement ──

    /// Push the body with a polar impulse. A negative magnitude pushes the
    /// opposite way.
    pub fn move_by(
        &self,
        physics: &mut dyn PhysicsBackend,
        magnitude: f64,
        direction: f64,
    ) -> Result<()> {
        let body = self.require_body()?;
        let (magnitude, direction) = if magnitude < 0.0 {
            (-magnitude, direction + 180.0)
        } else {
            (magnitude, direction)
        };
        let (dx, dy) = polar_to_cartesian(magnitude, direction);
        let scale = physics.scale(body);
        physics.apply_impulse(body, Vec3::new(dx / scale, dy / scale, 0.0))
    }

    /// Move toward (x, y). Not applicable once closer than `magnitude`.
    pub fn move_to(
        &self,
        physics: &mut dyn PhysicsBackend,
        magnitude: f64,
        x: f64,
        y: f64,
    ) -> Result<()> {
        let p = self.position(physics);
        if distance(p.x, p.y, x, y) < magnitude {
            return Err(BeeError::NotApplicable(format!(
                "instance {} reached ({x}, {y})",
                self.id
            )));
        }
        self.move_by(physics, magnitude, direction_of(p.x, p.y, x, y))
    }

    pub fn move_away(
        &self,
        physics: &mut dyn PhysicsBackend,
        magnitude: f64,
        x: f64,
        y: f64,
    ) -> Result<()> {
        let p = self.position(physics);
        self.move_by(physics, magnitude, direction_of(p.x, p.y, x, y) + 180.0)
    }

    pub fn set_velocity(
        &self,
        physics: &mut dyn PhysicsBackend,
        magnitude: f64,
        direction: f64,
    ) -> Result<()> {
        let body = self.require_body()?;
        let (dx, dy) = polar_to_cartesian(magnitude, direction);
        physics.set_linear_velocity(body, Vec3::new(dx, dy, 0.0))
    }

    pub fn velocity(&self, physics: &dyn PhysicsBackend) -> Vec3 {
        self.body
            .and_then(|b| physics.linear_velocity(b))
            .unwrap_or(Vec3::ZERO)
    }

    /// Planar speed in world units per second
    pub fn speed(&self, physics: &dyn PhysicsBackend) -> f64 {
        let v = self.velocity(physics);
        distance(0.0, 0.0, v.x, v.y)
    }

    pub fn angular_velocity(&self, physics: &dyn PhysicsBackend) -> Vec3 {
        self.body
            .and_then(|b| physics.angular_velocity(b))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn mass(&self, physics: &dyn PhysicsBackend) -> Option<f64> {
        self.body.and_then(|b| physics.mass(b))
    }

    pub fn set_mass(&self, physics: &mut dyn PhysicsBackend, mass: f64) -> Result<()> {
        physics.set_mass(self.require_body()?, mass)
    }

    pub fn friction(&self, physics: &dyn PhysicsBackend) -> Option<f64> {
        self.body.and_then(|b| physics.friction(b))
    }

    pub fn set_friction(&self, physics: &mut dyn PhysicsBackend, friction: f64) -> Result<()> {
        physics.set_friction(self.require_body()?, friction)
    }

    pub fn gravity(&self, physics: &dyn PhysicsBackend) -> Option<Vec3> {
        self.body.and_then(|b| physics.gravity(b))
    }

    pub fn set_gravity(&self, physics: &mut dyn PhysicsBackend, gravity: Vec3) -> Result<()> {
        physics.set_gravity(self.require_body()?, gravity)
    }

    // ── grid snapping ──

    pub fn is_snapped(&self, physics: &dyn PhysicsBackend, hsnap: u32, vsnap: u32) -> bool {
        let p = self.position(physics);
        let on_grid = |v: f64, snap: u32| snap == 0 || (v.floor() as i64).rem_euclid(i64::from(snap)) == 0;
        on_grid(p.x, hsnap) && on_grid(p.y, vsnap)
    }

    /// Position rounded to the nearest grid point, halves rounding up
    pub fn snapped(&self, physics: &dyn PhysicsBackend, hsnap: u32, vsnap: u32) -> Vec3 {
        let p = self.position(physics);
        let snap = |v: f64, snap: u32| {
            if snap == 0 {
                return v;
            }
            let s = f64::from(snap);
            (v / s + 0.5).floor() * s
        };
        Vec3::new(snap(p.x, hsnap), snap(p.y, vsnap), p.z)
    }

    pub fn move_snap(&mut self, physics: &mut dyn PhysicsBackend, hsnap: u32, vsnap: u32) -> Result<()> {
        let p = self.snapped(physics, hsnap, vsnap);
        self.set_position(physics, p)
    }

    /// Grid cell of the object's sprite
    fn sprite_grid(&self) -> Option<(u32, u32)> {
        self.object.sprite.as_ref().map(|s| (s.width, s.height))
    }

    /// Snapped to a grid the size of the object's sprite. Without a sprite
    /// the position is returned as is.
    pub fn snapped_to_sprite(&self, physics: &dyn PhysicsBackend) -> Vec3 {
        match self.sprite_grid() {
            Some((w, h)) => self.snapped(physics, w, h),
            None => self.position(physics),
        }
    }

    pub fn move_snap_to_sprite(&mut self, physics: &mut dyn PhysicsBackend) -> Result<()> {
        let (w, h) = self.sprite_grid().ok_or_else(|| {
            BeeError::NotApplicable(format!("object \"{}\" has no sprite", self.object.name))
        })?;
        self.move_snap(physics, w, h)
    }

    /// Jump to a random point in a `width` x `height` area, then snap
    pub fn move_random(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        rng: &mut ParticleRng,
        width: f64,
        height: f64,
        hsnap: u32,
        vsnap: u32,
    ) -> Result<()> {
        let z = self.position(physics).z;
        let x = rng.range(0.0, width);
        let y = rng.range(0.0, height);
        self.set_position(physics, Vec3::new(x, y, z))?;
        self.move_snap(physics, hsnap, vsnap)
    }

    /// Wrap around a `width` x `height` area once more than `margin` past an
    /// edge. Returns whether the instance moved.
    pub fn move_wrap(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        horizontal: bool,
        vertical: bool,
        margin: f64,
        width: f64,
        height: f64,
    ) -> Result<bool> {
        let wrap = |v: f64, size: f64| {
            if v < -margin {
                v + size + 2.0 * margin
            } else if v > size + margin {
                v - size - 2.0 * margin
            } else {
                v
            }
        };
        let p = self.position(physics);
        let mut next = p;
        if horizontal {
            next.x = wrap(p.x, width);
        }
        if vertical {
            next.y = wrap(p.y, height);
        }
        if next == p {
            return Ok(false);
        }
        self.set_position(physics, next)?;
        Ok(true)
    }

    // ── geometry queries ──

    pub fn distance_to_point(&self, physics: &dyn PhysicsBackend, x: f64, y: f64) -> f64 {
        let p = self.position(physics);
        distance(p.x, p.y, x, y)
    }

    pub fn direction_to_point(&self, physics: &dyn PhysicsBackend, x: f64, y: f64) -> f64 {
        let p = self.position(physics);
        direction_of(p.x, p.y, x, y)
    }

    /// Classify `other` against this instance's horizontal and vertical
    /// bands. Checked top, right, bottom, left; the first match wins.
    pub fn relation_to(&self, physics: &dyn PhysicsBackend, other: &Instance) -> Relation {
        let a = self.position(physics);
        let b = other.position(physics);
        let half_w = (f64::from(self.width()) + f64::from(other.width())) / 2.0;
        let half_h = (f64::from(self.height()) + f64::from(other.height())) / 2.0;
        let in_column = (b.x - a.x).abs() < half_w;
        let in_row = (b.y - a.y).abs() < half_h;

        if b.y < a.y && in_column {
            Relation::Above
        } else if b.x > a.x && in_row {
            Relation::Right
        } else if b.y > a.y && in_column {
            Relation::Below
        } else if b.x < a.x && in_row {
            Relation::Left
        } else {
            Relation::None
        }
    }

    // ── paths ──

    pub fn path(&self) -> Option<&PathFollower> {
        self.path.as_ref()
    }

    pub fn path_mut(&mut self) -> Option<&mut PathFollower> {
        self.path.as_mut()
    }

    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    /// Replace the path state, dropping whatever was being followed
    pub(crate) fn set_path(&mut self, path: Option<PathFollower>) -> Option<PathFollower> {
        std::mem::replace(&mut self.path, path)
    }

    // ── drawing ──

    /// Draw the object's sprite at the instance position
    pub fn draw(&self, physics: &dyn PhysicsBackend, renderer: &mut dyn Renderer) -> Result<()> {
        let (w, h) = match &self.object.sprite {
            Some(s) => (s.width as i32, s.height as i32),
            None => (0, 0),
        };
        self.draw_ext(physics, renderer, w, h, 0.0, Color::WHITE)
    }

    /// Draw the object's sprite stretched to `w` x `h`, rotated and tinted
    pub fn draw_ext(
        &self,
        physics: &dyn PhysicsBackend,
        renderer: &mut dyn Renderer,
        w: i32,
        h: i32,
        angle: f64,
        color: Color,
    ) -> Result<()> {
        let Some(sprite) = &self.object.sprite else {
            return Err(BeeError::NotApplicable(format!(
                "object \"{}\" has no sprite",
                self.object.name
            )));
        };
        if !sprite.is_loaded {
            return Err(BeeError::SpriteNotLoaded(sprite.name.clone()));
        }
        let p = self.position(physics);
        renderer.draw_sprite(
            sprite,
            DrawRect {
                x: p.x as i32,
                y: p.y as i32,
                w,
                h,
                angle,
                subimage_time: self.subimage_time,
            },
            color,
            Flip::None,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bee_core::{DrawCall, RecordingRenderer, Sprite};
    use bee_physics::{MockPhysics, PhysicsSettings};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn instance(id: u64, object: ObjectTemplate) -> Instance {
        Instance::new(InstanceId(id), ObjectId(0), Arc::new(object), Vec3::ZERO, 0)
    }

    fn placed(
        physics: &mut MockPhysics,
        id: u64,
        object: ObjectTemplate,
        x: f64,
        y: f64,
    ) -> Instance {
        let mut inst = instance(id, object);
        inst.set_position(physics, Vec3::new(x, y, 0.0)).unwrap();
        inst
    }

    fn mover() -> ObjectTemplate {
        ObjectTemplate::new("obj_mover")
            .with_sprite(Sprite::new("spr_mover", 16, 16))
            .with_mass(1.0)
    }

    #[test]
    fn body_is_created_on_first_position() {
        let mut physics = MockPhysics::default();
        let mut inst = instance(1, mover());
        assert!(inst.body().is_none());
        assert_eq!(inst.position(&physics), Vec3::ZERO);
        assert!(matches!(
            inst.move_by(&mut physics, 1.0, 0.0),
            Err(BeeError::BodyMissing(_))
        ));

        inst.set_position(&mut physics, Vec3::new(3.0, 4.0, 0.0)).unwrap();
        let body = inst.body().unwrap();
        assert_eq!(physics.shape(body), Some(PhysicsShape::sprite_box(16.0, 16.0)));
        assert_eq!(physics.mass(body), Some(1.0));

        inst.set_position(&mut physics, Vec3::new(5.0, 4.0, 0.0)).unwrap();
        assert_eq!(inst.body(), Some(body));
        assert_eq!(physics.body_count(), 1);
    }

    #[test]
    fn maskless_instances_get_point_bodies_with_default_mass() {
        let mut physics = MockPhysics::new(PhysicsSettings {
            default_mass: 2.0,
            ..PhysicsSettings::default()
        });
        let inst = placed(&mut physics, 1, ObjectTemplate::new("obj_point"), 0.0, 0.0);
        let body = inst.body().unwrap();
        assert_eq!(physics.shape(body), Some(PhysicsShape::None));
        assert_eq!(physics.mass(body), Some(2.0));
        assert_eq!(inst.aabb(&physics), Rect::new(0, 0, 0, 0));
    }

    #[test]
    fn ordering_is_depth_then_identity() {
        let deep = instance(5, ObjectTemplate::new("obj_deep").with_depth(10));
        let shallow = instance(1, ObjectTemplate::new("obj_shallow").with_depth(-3));
        let twin = instance(2, ObjectTemplate::new("obj_deep2").with_depth(10));

        let mut all = [&shallow, &deep, &twin];
        all.sort_by_key(|i| i.sort_key());
        let ids: Vec<_> = all.iter().map(|i| i.id().raw()).collect();
        assert_eq!(ids, vec![2, 5, 1]);
    }

    #[test]
    fn move_decomposes_polar_impulse() {
        let mut physics = MockPhysics::default();
        let inst = placed(&mut physics, 1, mover(), 0.0, 0.0);
        inst.move_by(&mut physics, 5.0, 90.0).unwrap();
        let v = inst.velocity(&physics);
        assert!(approx(v.x, 0.0));
        assert!(approx(v.y, -5.0));
    }

    #[test]
    fn negative_magnitude_turns_around() {
        let mut physics = MockPhysics::default();
        let inst = placed(&mut physics, 1, mover(), 0.0, 0.0);
        inst.move_by(&mut physics, -4.0, 0.0).unwrap();
        let v = inst.velocity(&physics);
        assert!(approx(v.x, -4.0));
        assert!(approx(inst.speed(&physics), 4.0));
    }

    #[test]
    fn move_to_trends_toward_target() {
        let mut physics = MockPhysics::default();
        let inst = placed(&mut physics, 1, mover(), 0.0, 0.0);
        inst.move_to(&mut physics, 5.0, 10.0, 0.0).unwrap();
        for _ in 0..10 {
            physics.step(0.1);
        }
        let p = inst.position(&physics);
        assert!(approx(p.x, 5.0), "x = {}", p.x);
        assert!(approx(p.y, 0.0));

        // Within reach now
        let err = inst.move_to(&mut physics, 6.0, 10.0, 0.0).unwrap_err();
        assert!(err.is_not_applicable());
    }

    #[test]
    fn move_away_heads_the_other_way() {
        let mut physics = MockPhysics::default();
        let inst = placed(&mut physics, 1, mover(), 10.0, 10.0);
        inst.move_away(&mut physics, 2.0, 20.0, 10.0).unwrap();
        assert!(approx(inst.velocity(&physics).x, -2.0));
    }

    #[test]
    fn static_body_ignores_impulses() {
        let mut physics = MockPhysics::default();
        let inst = placed(&mut physics, 1, ObjectTemplate::new("obj_wall"), 0.0, 0.0);
        inst.move_by(&mut physics, 5.0, 0.0).unwrap();
        assert_eq!(inst.velocity(&physics), Vec3::ZERO);
    }

    #[test]
    fn physics_properties_delegate() {
        let mut physics = MockPhysics::default();
        let inst = placed(&mut physics, 1, mover(), 0.0, 0.0);
        inst.set_friction(&mut physics, 0.25).unwrap();
        inst.set_gravity(&mut physics, Vec3::new(0.0, 9.8, 0.0)).unwrap();
        inst.set_mass(&mut physics, 3.0).unwrap();
        inst.set_velocity(&mut physics, 2.0, 180.0).unwrap();
        assert_eq!(inst.friction(&physics), Some(0.25));
        assert_eq!(inst.gravity(&physics), Some(Vec3::new(0.0, 9.8, 0.0)));
        assert_eq!(inst.mass(&physics), Some(3.0));
        assert!(approx(inst.velocity(&physics).x, -2.0));
        assert_eq!(inst.angular_velocity(&physics), Vec3::ZERO);
    }

    #[test]
    fn alarms_fire_once_and_reset() {
        let mut inst = instance(1, mover());
        inst.set_alarm(2, 100, 50).unwrap();
        assert_eq!(inst.alarm(2), Some(150));
        assert!(inst.take_due_alarms(149).is_empty());
        assert_eq!(inst.take_due_alarms(150), vec![2]);
        assert_eq!(inst.alarm(2), None);
        assert!(inst.take_due_alarms(10_000).is_empty());

        assert!(matches!(
            inst.set_alarm(ALARM_COUNT, 1, 0),
            Err(BeeError::IndexOutOfRange { what: "alarm", .. })
        ));
        inst.set_alarm(0, 5, 0).unwrap();
        inst.clear_alarm(0).unwrap();
        assert!(inst.take_due_alarms(100).is_empty());
    }

    #[test]
    fn snapping_rounds_to_nearest_grid_point() {
        let mut physics = MockPhysics::default();
        let mut inst = placed(&mut physics, 1, mover(), 37.0, -13.0);
        assert!(!inst.is_snapped(&physics, 16, 16));
        assert_eq!(inst.snapped(&physics, 16, 16), Vec3::new(32.0, -16.0, 0.0));
        inst.move_snap(&mut physics, 16, 16).unwrap();
        assert!(inst.is_snapped(&physics, 16, 16));
        assert_eq!(inst.position(&physics), Vec3::new(32.0, -16.0, 0.0));
    }

    #[test]
    fn sprite_sized_grid() {
        let mut physics = MockPhysics::default();
        let mut inst = placed(&mut physics, 1, mover(), 37.0, -13.0);
        assert_eq!(inst.snapped_to_sprite(&physics), Vec3::new(32.0, -16.0, 0.0));
        inst.move_snap_to_sprite(&mut physics).unwrap();
        assert_eq!(inst.position(&physics), Vec3::new(32.0, -16.0, 0.0));

        let mut bare = placed(&mut physics, 2, ObjectTemplate::new("obj_bare"), 7.0, 3.0);
        assert_eq!(bare.snapped_to_sprite(&physics), Vec3::new(7.0, 3.0, 0.0));
        assert!(bare.move_snap_to_sprite(&mut physics).unwrap_err().is_not_applicable());
        assert_eq!(bare.position(&physics), Vec3::new(7.0, 3.0, 0.0));
    }

    #[test]
    fn random_moves_land_on_the_grid() {
        let mut physics = MockPhysics::default();
        let mut rng = ParticleRng::new(5);
        let mut inst = placed(&mut physics, 1, mover(), 0.0, 0.0);
        for _ in 0..20 {
            inst.move_random(&mut physics, &mut rng, 100.0, 60.0, 10, 20).unwrap();
            let p = inst.position(&physics);
            assert!(inst.is_snapped(&physics, 10, 20), "{p:?}");
            assert!((0.0..=100.0).contains(&p.x) && (0.0..=60.0).contains(&p.y));
        }
    }

    #[test]
    fn wrap_moves_to_the_far_side() {
        let mut physics = MockPhysics::default();
        let mut inst = placed(&mut physics, 1, mover(), -25.0, 50.0);
        assert!(inst.move_wrap(&mut physics, true, true, 10.0, 100.0, 100.0).unwrap());
        assert_eq!(inst.position(&physics), Vec3::new(95.0, 50.0, 0.0));

        inst.set_position(&mut physics, Vec3::new(50.0, 115.0, 0.0)).unwrap();
        assert!(!inst.move_wrap(&mut physics, true, false, 10.0, 100.0, 100.0).unwrap());
        assert!(inst.move_wrap(&mut physics, false, true, 10.0, 100.0, 100.0).unwrap());
        assert_eq!(inst.position(&physics), Vec3::new(50.0, -5.0, 0.0));
    }

    #[test]
    fn relation_bands() {
        let mut physics = MockPhysics::default();
        let me = placed(&mut physics, 1, mover(), 100.0, 100.0);
        let at = |physics: &mut MockPhysics, x, y| placed(physics, 2, mover(), x, y);

        let above = at(&mut physics, 105.0, 50.0);
        let right = at(&mut physics, 150.0, 110.0);
        let below = at(&mut physics, 95.0, 150.0);
        let left = at(&mut physics, 50.0, 90.0);
        let far = at(&mut physics, 300.0, 300.0);
        assert_eq!(me.relation_to(&physics, &above), Relation::Above);
        assert_eq!(me.relation_to(&physics, &right), Relation::Right);
        assert_eq!(me.relation_to(&physics, &below), Relation::Below);
        assert_eq!(me.relation_to(&physics, &left), Relation::Left);
        assert_eq!(me.relation_to(&physics, &far), Relation::None);
    }

    #[test]
    fn distance_and_direction_to_points() {
        let mut physics = MockPhysics::default();
        let inst = placed(&mut physics, 1, mover(), 0.0, 0.0);
        assert!(approx(inst.distance_to_point(&physics, 3.0, 4.0), 5.0));
        assert!(approx(inst.direction_to_point(&physics, 0.0, -10.0), 90.0));
    }

    #[test]
    fn default_draw_needs_a_loaded_sprite() {
        let mut physics = MockPhysics::default();
        let mut r = RecordingRenderer::new();

        let inst = placed(&mut physics, 1, mover(), 4.0, 8.0);
        inst.draw(&physics, &mut r).unwrap();
        assert!(matches!(
            &r.calls[..],
            [DrawCall::Sprite { sprite, rect, .. }] if sprite == "spr_mover" && rect.x == 4 && rect.w == 16
        ));

        let bare = placed(&mut physics, 2, ObjectTemplate::new("obj_bare"), 0.0, 0.0);
        assert!(bare.draw(&physics, &mut r).unwrap_err().is_not_applicable());

        let deferred = ObjectTemplate::new("obj_later").with_sprite(Sprite::deferred("spr_later", 8, 8));
        let later = placed(&mut physics, 3, deferred, 0.0, 0.0);
        assert!(matches!(
            later.draw(&physics, &mut r),
            Err(BeeError::SpriteNotLoaded(_))
        ));
        assert_eq!(r.calls.len(), 1);
    }
}
