//! Kills particles that enter a region

use crate::particle::ParticleData;
use bee_core::geometry::check_collision;
use bee_core::{BorderMode, Color, InstanceId, Rect, Renderer};

#[derive(Debug, Clone)]
pub struct ParticleDestroyer {
    /// Region, relative to the system origin
    pub x: f64,
    pub y: f64,
    pub w: u32,
    pub h: u32,
    /// Anchor the region to this instance instead of the system origin
    pub following: Option<InstanceId>,
}

impl ParticleDestroyer {
    pub fn new(x: f64, y: f64, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w: w.max(1),
            h: h.max(1),
            following: None,
        }
    }

    pub fn with_following(mut self, id: InstanceId) -> Self {
        self.following = Some(id);
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

    /// Whether the particle should die
    pub fn handle(&self, pd: &ParticleData, system_x: f64, system_y: f64) -> bool {
        check_collision(&pd.get_rect(), &self.region(system_x, system_y))
    }

    pub fn draw_debug(&self, system_x: f64, system_y: f64, color: Color, renderer: &mut dyn Renderer) {
        renderer.draw_rectangle(self.region(system_x, system_y), BorderMode::Outline, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bee_core::ParticleTypeId;

    #[test]
    fn hits_inside_region_only() {
        let d = ParticleDestroyer::new(0.0, 0.0, 10, 10);
        let inside = ParticleData::new(ParticleTypeId(0), 5.0, 5.0, 0, 100);
        let outside = ParticleData::new(ParticleTypeId(0), 20.0, 5.0, 0, 100);
        assert!(d.handle(&inside, 0.0, 0.0));
        assert!(!d.handle(&outside, 0.0, 0.0));
        // Moving the system moves the region
        assert!(d.handle(&outside, 15.0, 0.0));
    }

    #[test]
    fn empty_size_is_clamped() {
        let d = ParticleDestroyer::new(0.0, 0.0, 0, 0);
        assert_eq!(d.region(0.0, 0.0), Rect::new(0, 0, 1, 1));
    }
}
