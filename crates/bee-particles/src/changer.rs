//! Alters particles that pass through a region

use crate::particle::ParticleData;
use bee_core::geometry::check_collision;
use bee_core::{BorderMode, Color, InstanceId, ParticleTypeId, Rect, Renderer, Velocity};
use std::fmt;
use std::sync::Arc;

/// What happens to a particle inside the region
#[derive(Clone)]
pub enum ChangeAction {
    /// Switch the particle to another type
    Type(ParticleTypeId),
    /// Replace the newest velocity component
    Velocity(Velocity),
    Custom(Arc<dyn Fn(&mut ParticleData) + Send + Sync>),
}

impl fmt::Debug for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Type(t) => write!(f, "Type({t})"),
            ChangeAction::Velocity(v) => write!(f, "Velocity({v:?})"),
            ChangeAction::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticleChanger {
    /// Region, relative to the system origin
    pub x: f64,
    pub y: f64,
    pub w: u32,
    pub h: u32,
    pub action: ChangeAction,
    pub following: Option<InstanceId>,
}

impl ParticleChanger {
    pub fn new(x: f64, y: f64, w: u32, h: u32, action: ChangeAction) -> Self {
        Self {
            x,
            y,
            w: w.max(1),
            h: h.max(1),
            action,
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

    /// Apply the action if the particle is inside. Returns whether it was.
    pub fn handle(&self, pd: &mut ParticleData, system_x: f64, system_y: f64) -> bool {
        if !check_collision(&pd.get_rect(), &self.region(system_x, system_y)) {
            return false;
        }
        match &self.action {
            ChangeAction::Type(t) => pd.particle_type = *t,
            ChangeAction::Velocity(v) => pd.set_velocity(v.magnitude, v.direction),
            ChangeAction::Custom(f) => f(pd),
        }
        true
    }

    pub fn draw_debug(&self, system_x: f64, system_y: f64, color: Color, renderer: &mut dyn Renderer) {
        renderer.draw_rectangle(self.region(system_x, system_y), BorderMode::Outline, color);
    }
}
