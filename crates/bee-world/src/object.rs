//! Object templates: shared appearance and behaviour for many instances

use crate::instance::Instance;
use crate::room::Room;
use bee_core::{InstanceId, Renderer, Sprite};
use bitflags::bitflags;
use std::fmt;
use std::sync::Arc;

bitflags! {
    /// Events an object template implements
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventSet: u32 {
        const CREATE = 0x0001;
        const DESTROY = 0x0002;
        const ALARM = 0x0004;
        const STEP_BEGIN = 0x0008;
        const STEP_MID = 0x0010;
        const STEP_END = 0x0020;
        const PATH_END = 0x0040;
        const OUTSIDE_ROOM = 0x0080;
        const COLLISION = 0x0100;
        const DRAW = 0x0200;
    }
}

/// Hook receiving the room and the instance the event is for
pub type InstanceHook = Arc<dyn Fn(&mut Room, InstanceId) + Send + Sync>;
/// Alarm hook, also given the slot that fired
pub type AlarmHook = Arc<dyn Fn(&mut Room, InstanceId, usize) + Send + Sync>;
/// Collision hook, also given the other instance
pub type CollisionHook = Arc<dyn Fn(&mut Room, InstanceId, InstanceId) + Send + Sync>;
/// Draw hook, given the renderer for this frame
pub type DrawHook = Arc<dyn Fn(&mut Room, InstanceId, &mut dyn Renderer) + Send + Sync>;
/// Decides whether `self` (first) may collide with `other` (second)
pub type CollisionFilter = Arc<dyn Fn(&Instance, &Instance) -> bool + Send + Sync>;

#[derive(Clone, Default)]
struct Hooks {
    create: Option<InstanceHook>,
    destroy: Option<InstanceHook>,
    alarm: Option<AlarmHook>,
    step_begin: Option<InstanceHook>,
    step_mid: Option<InstanceHook>,
    step_end: Option<InstanceHook>,
    path_end: Option<InstanceHook>,
    outside_room: Option<InstanceHook>,
    collision: Option<CollisionHook>,
    draw: Option<DrawHook>,
}

/// The instance-level events that take no extra argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceEvent {
    Create,
    Destroy,
    StepBegin,
    StepMid,
    StepEnd,
    PathEnd,
    OutsideRoom,
}

impl InstanceEvent {
    pub fn flag(self) -> EventSet {
        match self {
            Self::Create => EventSet::CREATE,
            Self::Destroy => EventSet::DESTROY,
            Self::StepBegin => EventSet::STEP_BEGIN,
            Self::StepMid => EventSet::STEP_MID,
            Self::StepEnd => EventSet::STEP_END,
            Self::PathEnd => EventSet::PATH_END,
            Self::OutsideRoom => EventSet::OUTSIDE_ROOM,
        }
    }
}

/// A class of instances.
///
/// Only the hooks that were registered are declared in [`events`], and the
/// room checks that set before dispatching anything.
///
/// [`events`]: ObjectTemplate::events
#[derive(Clone)]
pub struct ObjectTemplate {
    pub name: String,
    pub sprite: Option<Sprite>,
    /// Collision footprint, defaults to the sprite
    pub mask: Option<Sprite>,
    pub is_solid: bool,
    pub is_visible: bool,
    pub is_persistent: bool,
    pub depth: i32,
    /// Mass given to new instance bodies; `None` uses the physics default
    pub mass: Option<f64>,
    events: EventSet,
    hooks: Hooks,
    collision_filter: Option<CollisionFilter>,
}

impl fmt::Debug for ObjectTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTemplate")
            .field("name", &self.name)
            .field("sprite", &self.sprite.as_ref().map(|s| &s.name))
            .field("is_solid", &self.is_solid)
            .field("depth", &self.depth)
            .field("events", &self.events)
            .finish()
    }
}

impl ObjectTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sprite: None,
            mask: None,
            is_solid: false,
            is_visible: true,
            is_persistent: false,
            depth: 0,
            mass: None,
            events: EventSet::empty(),
            hooks: Hooks::default(),
            collision_filter: None,
        }
    }

    pub fn with_sprite(mut self, sprite: Sprite) -> Self {
        self.sprite = Some(sprite);
        self
    }

    pub fn with_mask(mut self, mask: Sprite) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn solid(mut self, is_solid: bool) -> Self {
        self.is_solid = is_solid;
        self
    }

    pub fn visible(mut self, is_visible: bool) -> Self {
        self.is_visible = is_visible;
        self
    }

    /// Persistent instances survive [`Room::reset`]
    pub fn persistent(mut self, is_persistent: bool) -> Self {
        self.is_persistent = is_persistent;
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Register a hook for one of the argument-less events
    pub fn on(
        mut self,
        event: InstanceEvent,
        hook: impl Fn(&mut Room, InstanceId) + Send + Sync + 'static,
    ) -> Self {
        let hook: InstanceHook = Arc::new(hook);
        let slot = match event {
            InstanceEvent::Create => &mut self.hooks.create,
            InstanceEvent::Destroy => &mut self.hooks.destroy,
            InstanceEvent::StepBegin => &mut self.hooks.step_begin,
            InstanceEvent::StepMid => &mut self.hooks.step_mid,
            InstanceEvent::StepEnd => &mut self.hooks.step_end,
            InstanceEvent::PathEnd => &mut self.hooks.path_end,
            InstanceEvent::OutsideRoom => &mut self.hooks.outside_room,
        };
        *slot = Some(hook);
        self.events |= event.flag();
        self
    }

    pub fn on_alarm(
        mut self,
        hook: impl Fn(&mut Room, InstanceId, usize) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.alarm = Some(Arc::new(hook));
        self.events |= EventSet::ALARM;
        self
    }

    pub fn on_collision(
        mut self,
        hook: impl Fn(&mut Room, InstanceId, InstanceId) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.collision = Some(Arc::new(hook));
        self.events |= EventSet::COLLISION;
        self
    }

    /// Draw instances of this object instead of the default sprite draw
    pub fn on_draw(
        mut self,
        hook: impl Fn(&mut Room, InstanceId, &mut dyn Renderer) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.draw = Some(Arc::new(hook));
        self.events |= EventSet::DRAW;
        self
    }

    /// Restrict which instances this object collides with
    pub fn with_collision_filter(
        mut self,
        filter: impl Fn(&Instance, &Instance) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.collision_filter = Some(Arc::new(filter));
        self
    }

    pub fn events(&self) -> EventSet {
        self.events
    }

    pub fn implements(&self, events: EventSet) -> bool {
        self.events.contains(events)
    }

    pub(crate) fn hook(&self, event: InstanceEvent) -> Option<InstanceHook> {
        if !self.implements(event.flag()) {
            return None;
        }
        match event {
            InstanceEvent::Create => self.hooks.create.clone(),
            InstanceEvent::Destroy => self.hooks.destroy.clone(),
            InstanceEvent::StepBegin => self.hooks.step_begin.clone(),
            InstanceEvent::StepMid => self.hooks.step_mid.clone(),
            InstanceEvent::StepEnd => self.hooks.step_end.clone(),
            InstanceEvent::PathEnd => self.hooks.path_end.clone(),
            InstanceEvent::OutsideRoom => self.hooks.outside_room.clone(),
        }
    }

    pub(crate) fn alarm_hook(&self) -> Option<AlarmHook> {
        self.hooks
            .alarm
            .clone()
            .filter(|_| self.implements(EventSet::ALARM))
    }

    pub(crate) fn draw_hook(&self) -> Option<DrawHook> {
        self.hooks
            .draw
            .clone()
            .filter(|_| self.implements(EventSet::DRAW))
    }

    pub(crate) fn collision_hook(&self) -> Option<CollisionHook> {
        self.hooks
            .collision
            .clone()
            .filter(|_| self.implements(EventSet::COLLISION))
    }

    /// One half of the two-way collision check. Objects without a filter
    /// accept everything.
    pub fn accepts_collision(&self, this: &Instance, other: &Instance) -> bool {
        match &self.collision_filter {
            Some(filter) => filter(this, other),
            None => true,
        }
    }

    /// Footprint size from the mask, falling back to the sprite
    pub fn mask_size(&self) -> (u32, u32) {
        self.mask
            .as_ref()
            .or(self.sprite.as_ref())
            .map(|s| (s.width, s.height))
            .unwrap_or((0, 0))
    }
}
