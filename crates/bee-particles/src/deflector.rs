//! Bounces particles back out of a region

use crate::particle::ParticleData;
use bee_core::geometry::{check_collision, direction_of};
use bee_core::{BorderMode, Color, InstanceId, Rect, Renderer};

/// An inelastic wall.
///
/// A particle that moves into the region has its newest velocity component
/// replaced by one pointing back along its path, scaled by `friction`.
#[derive(Debug, Clone)]
pub struct ParticleDeflector {
    /// Region, relative to the system origin
    pub x: f64,
    pub y: f64,
    pub w: u32,
    pub h: u32,
    pub friction: f64,
    pub following: Option<InstanceId>,
}

impl ParticleDeflector {
    pub fn new(x: f64, y: f64, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w: w.max(1),
            h: h.max(1),
            friction: 1.0,
            following: None,
        }
    }

    pub fn with_following(mut self, id: InstanceId) -> Self {
        self.following = Some(id);
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn region(&self, system_x: f64, system_y: f64) -> Rect {
        Rect::new(
            (system_x + self.x) as i32,
            (system_y + self.y) as i32,
            self.w as i32,
            self.h as i32,
        )
    }

    /// Deflect a particle that moved from (old_x, old_y) into the region.
    /// Returns whether it was deflected.
    pub fn handle(
        &self,
        pd: &mut ParticleData,
        old_x: f64,
        old_y: f64,
        system_x: f64,
        system_y: f64,
    ) -> bool {
        if !check_collision(&pd.get_rect(), &self.region(system_x, system_y)) {
            return false;
        }
        let magnitude = pd.last_velocity().map_or(0.0, |v| v.magnitude);
        let dir = direction_of(old_x, old_y, pd.x, pd.y);
        pd.set_velocity(magnitude * self.friction * -1.0, dir);
        true
    }

    pub fn draw_debug(&self, system_x: f64, system_y: f64, color: Color, renderer: &mut dyn Renderer) {
        renderer.draw_rectangle(self.region(system_x, system_y), BorderMode::Outline, color);
    }
}
