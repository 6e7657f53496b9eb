//! Particle types and per-particle simulation state

use bee_core::geometry::{absolute_angle, direction_of, distance, polar_to_cartesian};
use bee_core::{Color, ParticleTypeId, Rect, Sprite, Ticks, Velocity};
use std::sync::Arc;

/// Called once when a particle of this type dies
pub type DeathCallback = Arc<dyn Fn(&ParticleData, &mut SpawnQueue) + Send + Sync>;

/// Particles requested while the particle list is being walked.
///
/// They are added to the system once the walk is over, created at the tick
/// of the frame that queued them.
#[derive(Debug, Default)]
pub struct SpawnQueue {
    spawns: Vec<(ParticleTypeId, f64, f64)>,
}

impl SpawnQueue {
    pub fn push(&mut self, particle_type: ParticleTypeId, x: f64, y: f64) {
        self.spawns.push((particle_type, x, y));
    }

    pub fn len(&self) -> usize {
        self.spawns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty()
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, (ParticleTypeId, f64, f64)> {
        self.spawns.drain(..)
    }
}

/// Shared descriptor for a class of particles
#[derive(Clone)]
pub struct ParticleType {
    pub name: String,
    pub sprite: Option<Sprite>,
    /// Draw size relative to the sprite frame
    pub scale: f64,
    pub color: Color,
    /// Lifetime range in milliseconds, sampled per particle
    pub lifetime_min: Ticks,
    pub lifetime_max: Ticks,
    /// Velocity every new particle starts with
    pub velocity: Velocity,
    /// Draw rotation at creation, degrees
    pub angle: f64,
    /// Rotation rate, degrees per second
    pub angle_increase: f64,
    /// Hint that rotated geometry may be cached by the renderer
    pub rotation_cache: bool,
    pub is_lightable: bool,
    pub is_sprite_lightable: bool,
    /// Particles spawned where one of this type dies
    pub death_type: Option<ParticleTypeId>,
    pub death_amount: u32,
    pub on_death: Option<DeathCallback>,
}

impl ParticleType {
    pub fn new(name: impl Into<String>, sprite: Option<Sprite>) -> Self {
        Self {
            name: name.into(),
            sprite,
            scale: 1.0,
            color: Color::WHITE,
            lifetime_min: 1000,
            lifetime_max: 1000,
            velocity: Velocity::default(),
            angle: 0.0,
            angle_increase: 0.0,
            rotation_cache: false,
            is_lightable: true,
            is_sprite_lightable: true,
            death_type: None,
            death_amount: 0,
            on_death: None,
        }
    }

    pub fn with_lifetime(mut self, min: Ticks, max: Ticks) -> Self {
        self.lifetime_min = min;
        self.lifetime_max = max.max(min);
        self
    }

    pub fn with_velocity(mut self, magnitude: f64, direction: f64) -> Self {
        self.velocity = Velocity::new(magnitude, direction);
        self
    }

    pub fn with_rotation(mut self, angle: f64, angle_increase: f64) -> Self {
        self.angle = angle;
        self.angle_increase = angle_increase;
        self
    }

    pub fn with_death_particles(mut self, particle_type: ParticleTypeId, amount: u32) -> Self {
        self.death_type = Some(particle_type);
        self.death_amount = amount;
        self
    }

    pub fn with_death_callback(
        mut self,
        callback: impl Fn(&ParticleData, &mut SpawnQueue) + Send + Sync + 'static,
    ) -> Self {
        self.on_death = Some(Arc::new(callback));
        self
    }

    /// Draw rotation after `elapsed` ticks, in [0, 360)
    pub fn angle_at(&self, elapsed: Ticks) -> f64 {
        absolute_angle(self.angle + self.angle_increase * elapsed as f64 / 1000.0)
    }

    /// Size of one drawn particle
    pub fn draw_size(&self) -> (i32, i32) {
        match &self.sprite {
            Some(s) => (
                (f64::from(s.width) * self.scale) as i32,
                (f64::from(s.height) * self.scale) as i32,
            ),
            None => (1, 1),
        }
    }

    /// Run the death behaviour for a particle of this type
    pub(crate) fn handle_death(&self, particle: &ParticleData, spawns: &mut SpawnQueue) {
        if let Some(death_type) = self.death_type {
            for _ in 0..self.death_amount {
                spawns.push(death_type, particle.x, particle.y);
            }
        }
        if let Some(callback) = &self.on_death {
            callback(particle, spawns);
        }
    }
}

/// One live particle
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleData {
    pub particle_type: ParticleTypeId,
    pub x: f64,
    pub y: f64,
    /// Velocity components, summed every move
    pub velocity: Vec<Velocity>,
    pub w: i32,
    pub h: i32,
    creation: Ticks,
    lifetime: Ticks,
    is_old: bool,
}

impl ParticleData {
    pub fn new(
        particle_type: ParticleTypeId,
        x: f64,
        y: f64,
        creation: Ticks,
        lifetime: Ticks,
    ) -> Self {
        Self {
            particle_type,
            x,
            y,
            velocity: Vec::new(),
            w: 1,
            h: 1,
            creation,
            lifetime,
            is_old: false,
        }
    }

    /// Reinitialize recycled storage, keeping the velocity allocation
    pub(crate) fn reset(
        &mut self,
        particle_type: ParticleTypeId,
        x: f64,
        y: f64,
        creation: Ticks,
        lifetime: Ticks,
    ) {
        self.particle_type = particle_type;
        self.x = x;
        self.y = y;
        self.velocity.clear();
        self.creation = creation;
        self.lifetime = lifetime;
        self.is_old = false;
    }

    pub fn creation(&self) -> Ticks {
        self.creation
    }

    pub fn lifetime(&self) -> Ticks {
        self.lifetime
    }

    /// Ticks lived at `now`; zero if `now` is before creation
    pub fn elapsed(&self, now: Ticks) -> Ticks {
        now.saturating_sub(self.creation)
    }

    pub fn is_dead(&self, elapsed: Ticks) -> bool {
        elapsed >= self.lifetime
    }

    /// Already dead and waiting for removal
    pub fn is_old(&self) -> bool {
        self.is_old
    }

    pub(crate) fn mark_old(&mut self) {
        self.is_old = true;
    }

    /// Bounding box centered on the particle
    pub fn get_rect(&self) -> Rect {
        Rect::centered(self.x, self.y, self.w, self.h)
    }

    /// Advance by every velocity component over `delta` seconds
    pub fn move_by(&mut self, delta: f64) {
        for v in &self.velocity {
            let (dx, dy) = polar_to_cartesian(v.magnitude * delta, v.direction);
            self.x += dx;
            self.y += dy;
        }
    }

    /// Replace the most recent velocity component
    pub fn set_velocity(&mut self, magnitude: f64, direction: f64) {
        let v = Velocity::new(magnitude, direction);
        match self.velocity.last_mut() {
            Some(last) => *last = v,
            None => self.velocity.push(v),
        }
    }

    /// Add a vector onto the most recent velocity component
    pub fn add_velocity(&mut self, magnitude: f64, direction: f64) {
        let Some(last) = self.velocity.last_mut() else {
            self.velocity.push(Velocity::new(magnitude, direction));
            return;
        };
        let (x1, y1) = polar_to_cartesian(last.magnitude, last.direction);
        let (x2, y2) = polar_to_cartesian(magnitude, direction);
        let (x, y) = (x1 + x2, y1 + y2);
        *last = Velocity::new(distance(0.0, 0.0, x, y), direction_of(0.0, 0.0, x, y));
    }

    /// Start a new velocity component
    pub fn push_velocity(&mut self, magnitude: f64, direction: f64) {
        self.velocity.push(Velocity::new(magnitude, direction));
    }

    /// The most recent velocity component
    pub fn last_velocity(&self) -> Option<Velocity> {
        self.velocity.last().copied()
    }
}
