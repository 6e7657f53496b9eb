//! Pulls (or pushes) particles toward an anchor point

use crate::particle::ParticleData;
use bee_core::geometry::{direction_of, distance};
use bee_core::{BorderMode, Color, InstanceId, Rect, Renderer};

/// How the pull weakens with distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Falloff {
    #[default]
    Constant,
    Linear,
    Quadratic,
}

#[derive(Debug, Clone)]
pub struct ParticleAttractor {
    /// Anchor, relative to the system origin
    pub x: f64,
    pub y: f64,
    /// Velocity added per second at full strength. Negative repels.
    pub force: f64,
    /// Particles farther than this are unaffected
    pub max_distance: f64,
    pub falloff: Falloff,
    /// Anchor to this instance instead of the system origin
    pub following: Option<InstanceId>,
}

impl ParticleAttractor {
    pub fn new(x: f64, y: f64, force: f64, max_distance: f64) -> Self {
        Self {
            x,
            y,
            force,
            max_distance,
            falloff: Falloff::Constant,
            following: None,
        }
    }

    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.falloff = falloff;
        self
    }

    pub fn with_following(mut self, id: InstanceId) -> Self {
        self.following = Some(id);
        self
    }

    fn strength(&self, d: f64) -> f64 {
        if self.max_distance <= 0.0 {
            return 1.0;
        }
        let t = (1.0 - d / self.max_distance).clamp(0.0, 1.0);
        match self.falloff {
            Falloff::Constant => 1.0,
            Falloff::Linear => t,
            Falloff::Quadratic => t * t,
        }
    }

    /// Add a velocity contribution toward the anchor, scaled by `delta`
    pub fn handle(&self, pd: &mut ParticleData, system_x: f64, system_y: f64, delta: f64) {
        let (ax, ay) = (system_x + self.x, system_y + self.y);
        let d = distance(pd.x, pd.y, ax, ay);
        if d <= 0.0 || (self.max_distance > 0.0 && d > self.max_distance) {
            return;
        }
        let dir = direction_of(pd.x, pd.y, ax, ay);
        pd.add_velocity(self.force * self.strength(d) * delta, dir);
    }

    pub fn draw_debug(&self, system_x: f64, system_y: f64, color: Color, renderer: &mut dyn Renderer) {
        let r = self.max_distance.max(1.0);
        let rect = Rect::new(
            (system_x + self.x - r) as i32,
            (system_y + self.y - r) as i32,
            (r * 2.0) as i32,
            (r * 2.0) as i32,
        );
        renderer.draw_rectangle(rect, BorderMode::Outline, color);
    }
}
