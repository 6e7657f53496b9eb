//! The room owns the live instances, their physics world, automated
//! timelines and particle systems, and runs the frame schedule over them.

use crate::instance::{Instance, Relation};
use crate::object::{InstanceEvent, InstanceHook};
use crate::path::{NodeUpdate, PathEndAction, PathEndOutcome, PathFollower, Waypoint};
use crate::registry::Registry;
use crate::timeline::Timeline;
use bee_core::geometry::{check_collision, coord_approach, direction_of, distance, polar_to_cartesian};
use bee_core::{
    BeeError, Color, IdAllocator, InstanceId, ObjectId, ParticleTypeId, PathId, PositionSource,
    Renderer, Result, Ticks, Vec3,
};
use bee_particles::rand::ParticleRng;
use bee_particles::{ParticleSystem, ParticleType};
use bee_physics::{BodyHandle, PhysicsBackend, RapierPhysics};
use bee_runtime::{EngineConfig, ParticleSettings, RoomSettings, Timing};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Something a timeline does to the room
pub type RoomAction = Arc<dyn Fn(&mut Room) + Send + Sync>;
pub type RoomTimeline = Timeline<RoomAction>;

/// Identifies a timeline the room is running
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TimelineHandle(pub usize);

const PATH_COLOR: Color = Color::RED;

/// One level of the game.
///
/// Each [`step`](Room::step) runs, in order: step-begin hooks, due alarms,
/// automated timelines, path following, the physics step, collision hooks,
/// step-mid hooks, outside-room hooks and step-end hooks. Every hook phase
/// walks instances deepest first, then by identity.
pub struct Room {
    registry: Arc<Registry>,
    settings: RoomSettings,
    particle_settings: ParticleSettings,
    physics: Box<dyn PhysicsBackend>,
    ids: IdAllocator,
    instances: BTreeMap<InstanceId, Instance>,
    /// Instances whose destroy hook is running
    destroying: HashSet<InstanceId>,
    timelines: BTreeMap<TimelineHandle, RoomTimeline>,
    next_timeline: usize,
    particle_systems: Vec<ParticleSystem>,
    /// Drives random placement
    rng: ParticleRng,
    /// Halts pausable path followers
    is_paused: bool,
    now: Ticks,
    delta: f64,
    frame: u64,
}

impl Room {
    pub fn new(
        registry: Arc<Registry>,
        settings: RoomSettings,
        physics: Box<dyn PhysicsBackend>,
    ) -> Self {
        Self {
            registry,
            settings,
            particle_settings: ParticleSettings::default(),
            physics,
            ids: IdAllocator::new(),
            instances: BTreeMap::new(),
            destroying: HashSet::new(),
            timelines: BTreeMap::new(),
            next_timeline: 0,
            particle_systems: Vec::new(),
            rng: ParticleRng::new(ParticleSettings::default().seed),
            is_paused: false,
            now: 0,
            delta: 0.0,
            frame: 0,
        }
    }

    /// A room with a Rapier physics world built from the engine config
    pub fn from_config(registry: Arc<Registry>, config: &EngineConfig) -> Self {
        let physics = RapierPhysics::new(config.physics.clone());
        Self {
            particle_settings: config.particles.clone(),
            rng: ParticleRng::new(config.particles.seed),
            ..Self::new(registry, config.room.clone(), Box::new(physics))
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn width(&self) -> u32 {
        self.settings.width
    }

    pub fn height(&self) -> u32 {
        self.settings.height
    }

    pub fn physics(&self) -> &dyn PhysicsBackend {
        self.physics.as_ref()
    }

    pub fn physics_mut(&mut self) -> &mut dyn PhysicsBackend {
        self.physics.as_mut()
    }

    /// Tick of the current step
    pub fn now(&self) -> Ticks {
        self.now
    }

    /// Steps run so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Pausing stops every instance whose path is pausable. Everything
    /// else keeps stepping.
    pub fn set_paused(&mut self, is_paused: bool) {
        if self.is_paused != is_paused {
            log::debug!(target: "bee::room", "room paused: {is_paused}");
        }
        self.is_paused = is_paused;
    }

    // ── instances ──

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(&id)
    }

    /// An instance together with the physics world its body lives in
    pub fn instance_parts(
        &mut self,
        id: InstanceId,
    ) -> Option<(&mut Instance, &mut dyn PhysicsBackend)> {
        let instance = self.instances.get_mut(&id)?;
        let physics: &mut dyn PhysicsBackend = self.physics.as_mut();
        Some((instance, physics))
    }

    fn get(&self, id: InstanceId) -> Result<&Instance> {
        self.instances
            .get(&id)
            .ok_or_else(|| not_found(id))
    }

    fn get_mut(&mut self, id: InstanceId) -> Result<&mut Instance> {
        self.instances
            .get_mut(&id)
            .ok_or_else(|| not_found(id))
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    pub fn instances_of(&self, object: ObjectId) -> impl Iterator<Item = InstanceId> + '_ {
        self.instances
            .values()
            .filter(move |i| i.object_id() == object)
            .map(Instance::id)
    }

    /// Instance ids in update and draw order
    pub fn sorted_ids(&self) -> Vec<InstanceId> {
        let mut keys: Vec<_> = self.instances.values().map(Instance::sort_key).collect();
        keys.sort();
        keys.into_iter().map(|(_, id)| id).collect()
    }

    pub fn position(&self, id: InstanceId) -> Result<Vec3> {
        Ok(self.get(id)?.position(self.physics.as_ref()))
    }

    pub fn set_position(&mut self, id: InstanceId, position: Vec3) -> Result<()> {
        let instance = self.instances.get_mut(&id).ok_or_else(|| not_found(id))?;
        instance.set_position(self.physics.as_mut(), position)
    }

    /// Spawn an instance of `object` and run its create hook
    pub fn create_instance(&mut self, object: ObjectId, x: f64, y: f64, z: f64) -> Result<InstanceId> {
        let template = self
            .registry
            .object(object)
            .cloned()
            .ok_or_else(|| BeeError::ObjectNotFound(object.to_string()))?;
        let id = self.ids.allocate();
        let start = Vec3::new(x, y, z);

        let mut instance = Instance::new(id, object, template, start, self.now);
        instance.set_position(self.physics.as_mut(), start)?;
        log::debug!(
            target: "bee::room",
            "created instance {id} of \"{}\" at ({x}, {y}, {z})",
            instance.object().name
        );
        let hook = instance.object().hook(InstanceEvent::Create);
        self.instances.insert(id, instance);

        if let Some(hook) = hook {
            hook(self, id);
        }
        Ok(id)
    }

    pub fn create_instance_by_name(&mut self, object: &str, x: f64, y: f64, z: f64) -> Result<InstanceId> {
        let object = self.registry.object_id(object)?;
        self.create_instance(object, x, y, z)
    }

    /// Run the destroy hook, then remove the instance and its body
    pub fn destroy_instance(&mut self, id: InstanceId) -> Result<()> {
        if self.destroying.contains(&id) {
            return Ok(());
        }
        let hook = self.get(id)?.object().hook(InstanceEvent::Destroy);
        if let Some(hook) = hook {
            self.destroying.insert(id);
            hook(self, id);
            self.destroying.remove(&id);
        }

        if let Some(mut instance) = self.instances.remove(&id) {
            if let Some(body) = instance.take_body() {
                self.physics.remove_body(body);
            }
            log::debug!(target: "bee::room", "destroyed instance {id}");
        }
        Ok(())
    }

    /// Destroy every instance whose object is not persistent and drop the
    /// timelines and particle systems. Persistent instances keep their
    /// bodies and state, and the frame count starts over.
    pub fn reset(&mut self) {
        let doomed: Vec<_> = self
            .sorted_ids()
            .into_iter()
            .filter(|id| {
                self.instances
                    .get(id)
                    .is_some_and(|i| !i.object().is_persistent)
            })
            .collect();
        for id in doomed {
            if let Err(e) = self.destroy_instance(id) {
                log_skipped("reset", id, &e);
            }
        }
        self.timelines.clear();
        self.particle_systems.clear();
        self.frame = 0;
        log::debug!(
            target: "bee::room",
            "room reset, {} persistent instances kept",
            self.instances.len()
        );
    }

    /// Set alarm `index` of `id` to fire `ticks` from now
    pub fn set_alarm(&mut self, id: InstanceId, index: usize, ticks: Ticks) -> Result<()> {
        let now = self.now;
        self.get_mut(id)?.set_alarm(index, ticks, now)
    }

    // ── spatial queries ──

    fn filters_accept(a: &Instance, b: &Instance) -> bool {
        a.object().accepts_collision(a, b) && b.object().accepts_collision(b, a)
    }

    fn overlapping<'a>(
        &'a self,
        id: InstanceId,
        x: f64,
        y: f64,
    ) -> Result<impl Iterator<Item = (&'a Instance, &'a Instance)> + 'a> {
        let me = self.get(id)?;
        let area = me.aabb_at(x, y);
        let physics = self.physics.as_ref();
        Ok(self
            .instances
            .values()
            .filter(move |other| {
                other.id() != id && check_collision(&area, &other.aabb(physics))
            })
            .map(move |other| (me, other)))
    }

    /// Whether `id` could stand at (x, y) without touching a solid instance
    /// both objects agree to collide with
    pub fn is_place_free(&self, id: InstanceId, x: f64, y: f64) -> Result<bool> {
        Ok(!self
            .overlapping(id, x, y)?
            .any(|(me, other)| other.object().is_solid && Self::filters_accept(me, other)))
    }

    /// Whether (x, y) overlaps no other instance at all
    pub fn is_place_empty(&self, id: InstanceId, x: f64, y: f64) -> Result<bool> {
        Ok(self.overlapping(id, x, y)?.next().is_none())
    }

    /// Whether (x, y) overlaps an instance of `object`
    pub fn is_place_meeting(&self, id: InstanceId, x: f64, y: f64, object: ObjectId) -> Result<bool> {
        Ok(self
            .overlapping(id, x, y)?
            .any(|(_, other)| other.object_id() == object))
    }

    pub fn is_move_free(&self, id: InstanceId, magnitude: f64, direction: f64) -> Result<bool> {
        let p = self.position(id)?;
        let (dx, dy) = polar_to_cartesian(magnitude, direction);
        self.is_place_free(id, p.x + dx, p.y + dy)
    }

    pub fn distance_to(&self, id: InstanceId, other: InstanceId) -> Result<f64> {
        let b = self.position(other)?;
        Ok(self.get(id)?.distance_to_point(self.physics.as_ref(), b.x, b.y))
    }

    pub fn direction_to(&self, id: InstanceId, other: InstanceId) -> Result<f64> {
        let b = self.position(other)?;
        Ok(self.get(id)?.direction_to_point(self.physics.as_ref(), b.x, b.y))
    }

    /// Closest other instance of `object` and its distance
    fn nearest_of(&self, id: InstanceId, object: ObjectId) -> Result<Option<(Vec3, f64)>> {
        let me = self.get(id)?;
        let physics = self.physics.as_ref();
        let mut nearest: Option<(Vec3, f64)> = None;
        for other in self.instances.values() {
            if other.id() == id || other.object_id() != object {
                continue;
            }
            let p = other.position(physics);
            let d = me.distance_to_point(physics, p.x, p.y);
            if nearest.map_or(true, |(_, best)| d < best) {
                nearest = Some((p, d));
            }
        }
        Ok(nearest)
    }

    /// Distance to the nearest other instance of `object`, if any exist
    pub fn distance_to_object(&self, id: InstanceId, object: ObjectId) -> Result<Option<f64>> {
        Ok(self.nearest_of(id, object)?.map(|(_, d)| d))
    }

    pub fn direction_to_object(&self, id: InstanceId, object: ObjectId) -> Result<Option<f64>> {
        let physics = self.physics.as_ref();
        let me = self.get(id)?;
        Ok(self
            .nearest_of(id, object)?
            .map(|(p, _)| me.direction_to_point(physics, p.x, p.y)))
    }

    pub fn relation(&self, id: InstanceId, other: InstanceId) -> Result<Relation> {
        Ok(self
            .get(id)?
            .relation_to(self.physics.as_ref(), self.get(other)?))
    }

    /// Wrap `id` around the room edges
    pub fn move_wrap(&mut self, id: InstanceId, horizontal: bool, vertical: bool, margin: f64) -> Result<bool> {
        let (w, h) = (f64::from(self.settings.width), f64::from(self.settings.height));
        let instance = self.instances.get_mut(&id).ok_or_else(|| not_found(id))?;
        instance.move_wrap(self.physics.as_mut(), horizontal, vertical, margin, w, h)
    }

    /// Jump `id` to a random spot in the room, snapped to the given grid
    pub fn move_random(&mut self, id: InstanceId, hsnap: u32, vsnap: u32) -> Result<()> {
        let (w, h) = (f64::from(self.settings.width), f64::from(self.settings.height));
        let instance = self.instances.get_mut(&id).ok_or_else(|| not_found(id))?;
        instance.move_random(self.physics.as_mut(), &mut self.rng, w, h, hsnap, vsnap)
    }

    fn is_outside(&self, instance: &Instance) -> bool {
        let p = instance.position(self.physics.as_ref());
        p.x + f64::from(instance.width()) < 0.0
            || p.y + f64::from(instance.height()) < 0.0
            || p.x > f64::from(self.settings.width)
            || p.y > f64::from(self.settings.height)
    }

    // ── paths ──

    /// Start `id` along `path` from node zero
    pub fn path_start(
        &mut self,
        id: InstanceId,
        path: PathId,
        speed: f64,
        end_action: PathEndAction,
        is_absolute: bool,
    ) -> Result<()> {
        let p = self
            .registry
            .path(path)
            .ok_or_else(|| BeeError::PathNotFound(path.to_string()))?;
        let instance = self.instances.get_mut(&id).ok_or_else(|| not_found(id))?;
        let current = instance.position(self.physics.as_ref());
        let follower = PathFollower::new(path, p, speed, end_action, is_absolute, current)?;
        instance.set_path(Some(follower));
        Ok(())
    }

    /// Stop following the current path
    pub fn path_end(&mut self, id: InstanceId) -> Result<()> {
        match self.get_mut(id)?.set_path(None) {
            Some(_) => Ok(()),
            None => Err(no_path(id)),
        }
    }

    /// Restart the current path from its first node
    pub fn path_reset(&mut self, id: InstanceId) -> Result<()> {
        let instance = self.instances.get_mut(&id).ok_or_else(|| not_found(id))?;
        let current = instance.position(self.physics.as_ref());
        let follower = instance.path_mut().ok_or_else(|| no_path(id))?;
        let path = self
            .registry
            .path(follower.path)
            .ok_or_else(|| BeeError::PathNotFound(follower.path.to_string()))?;
        let outcome = follower.reset(path, current);
        self.apply_path_outcome(id, outcome)
    }

    /// Advance to the next node once the instance is close enough to it.
    ///
    /// Close enough means within the distance covered this frame at the
    /// instance speed or the path speed, whichever is larger.
    pub fn path_update_node(&mut self, id: InstanceId) -> Result<NodeUpdate> {
        let delta = self.delta;
        let instance = self.instances.get_mut(&id).ok_or_else(|| not_found(id))?;
        let physics = self.physics.as_ref();
        let position = instance.position(physics);
        let speed = instance.speed(physics);
        let follower = instance.path_mut().ok_or_else(|| no_path(id))?;
        let path = self
            .registry
            .path(follower.path)
            .ok_or_else(|| BeeError::PathNotFound(follower.path.to_string()))?;

        let path_speed = follower.speed.abs() * waypoint_speed(path.coordinates(), follower.target_node(path));
        let reach = speed.max(path_speed) * delta;
        Ok(follower.update_node(path, position, reach))
    }

    /// Apply the path's end action
    pub fn handle_path_end(&mut self, id: InstanceId) -> Result<()> {
        let instance = self.instances.get_mut(&id).ok_or_else(|| not_found(id))?;
        let current = instance.position(self.physics.as_ref());
        let follower = instance.path_mut().ok_or_else(|| no_path(id))?;
        let path = self
            .registry
            .path(follower.path)
            .ok_or_else(|| BeeError::PathNotFound(follower.path.to_string()))?;
        let outcome = follower.handle_end(path, current);
        self.apply_path_outcome(id, outcome)
    }

    fn apply_path_outcome(&mut self, id: InstanceId, outcome: PathEndOutcome) -> Result<()> {
        match outcome {
            PathEndOutcome::Stop => {
                self.get_mut(id)?.set_path(None);
                Ok(())
            }
            PathEndOutcome::Teleport(p) => self.set_position(id, p),
            PathEndOutcome::Continue => Ok(()),
        }
    }

    /// Head for the target node. Dynamic bodies get a velocity, static ones
    /// are moved directly.
    fn steer_along_path(&mut self, id: InstanceId, delta: f64) -> Result<()> {
        let instance = self.instances.get_mut(&id).ok_or_else(|| not_found(id))?;
        let Some(follower) = instance.path() else {
            return Ok(());
        };
        let Some(path) = self.registry.path(follower.path) else {
            return Err(BeeError::PathNotFound(follower.path.to_string()));
        };
        let Some(target) = follower.target(path) else {
            return Ok(());
        };
        let speed = follower.speed.abs() * waypoint_speed(path.coordinates(), follower.target_node(path));

        let physics = self.physics.as_mut();
        let p = instance.position(physics);
        if instance.mass(physics).unwrap_or(0.0) > 0.0 {
            let remaining = distance(p.x, p.y, target.x, target.y);
            let magnitude = if delta > 0.0 { speed.min(remaining / delta) } else { speed };
            instance.set_velocity(physics, magnitude, direction_of(p.x, p.y, target.x, target.y))
        } else {
            let (x, y) = coord_approach(p.x, p.y, target.x, target.y, speed * delta);
            instance.set_position(physics, Vec3::new(x, y, p.z))
        }
    }

    /// Keep a paused follower where it is
    fn hold_on_path(&mut self, id: InstanceId) -> Result<()> {
        let instance = self.instances.get(&id).ok_or_else(|| not_found(id))?;
        let physics = self.physics.as_mut();
        if instance.mass(physics).unwrap_or(0.0) > 0.0 {
            instance.set_velocity(physics, 0.0, 0.0)?;
        }
        Ok(())
    }

    fn step_paths(&mut self, delta: f64) {
        for id in self.sorted_ids() {
            let Some(instance) = self.instances.get(&id) else {
                continue;
            };
            if !instance.has_path() {
                continue;
            }
            if self.is_paused && instance.is_path_pausable {
                if let Err(e) = self.hold_on_path(id) {
                    log_skipped("path pause", id, &e);
                }
                continue;
            }
            match self.path_update_node(id) {
                Ok(NodeUpdate::Ended) => {
                    if let Some(hook) = self.hook_for(id, InstanceEvent::PathEnd) {
                        hook(self, id);
                    }
                    // The hook may have ended the path itself
                    if let Err(e) = self.handle_path_end(id) {
                        log_skipped("path end", id, &e);
                    }
                }
                Ok(_) => {}
                Err(e) => log_skipped("path update", id, &e),
            }
            if self.instances.get(&id).is_some_and(Instance::has_path) {
                if let Err(e) = self.steer_along_path(id, delta) {
                    log_skipped("path steering", id, &e);
                }
            }
        }
    }

    // ── timelines ──

    /// Run `timeline` every step. A stopped timeline starts so that its
    /// first frame lines up with the next step.
    pub fn automate_timeline(&mut self, mut timeline: RoomTimeline) -> TimelineHandle {
        if !timeline.is_running() && !timeline.is_paused() {
            timeline.start(self.frame + 1);
        }
        let handle = TimelineHandle(self.next_timeline);
        self.next_timeline += 1;
        self.timelines.insert(handle, timeline);
        handle
    }

    pub fn timeline_mut(&mut self, handle: TimelineHandle) -> Option<&mut RoomTimeline> {
        self.timelines.get_mut(&handle)
    }

    pub fn remove_timeline(&mut self, handle: TimelineHandle) -> Option<RoomTimeline> {
        self.timelines.remove(&handle)
    }

    pub fn timeline_count(&self) -> usize {
        self.timelines.len()
    }

    fn step_timelines(&mut self) {
        let frame = self.frame;
        let handles: Vec<_> = self.timelines.keys().copied().collect();
        for handle in handles {
            let Some(timeline) = self.timelines.get_mut(&handle) else {
                continue;
            };
            // Paused timelines wait
            let Ok(step) = timeline.step_to(frame) else {
                continue;
            };
            let mut ending = None;
            if step.finished {
                if timeline.is_looping {
                    timeline.start(frame + 1);
                } else {
                    ending = Some(timeline.end());
                }
            }

            for action in step.fired {
                action(self);
            }
            if let Some(end_action) = ending {
                if let Some(timeline) = self.timelines.remove(&handle) {
                    log::debug!(target: "bee::room", "timeline \"{}\" finished", timeline.name);
                }
                if let Some(action) = end_action {
                    action(self);
                }
            }
        }
    }

    // ── particle systems ──

    pub fn add_particle_system(&mut self, system: ParticleSystem) -> usize {
        self.particle_systems.push(system);
        self.particle_systems.len() - 1
    }

    /// Add an empty particle system seeded from the room's particle settings
    pub fn create_particle_system(&mut self) -> usize {
        let system = ParticleSystem::with_settings(&self.particle_settings);
        self.add_particle_system(system)
    }

    pub fn particle_system(&self, index: usize) -> Option<&ParticleSystem> {
        self.particle_systems.get(index)
    }

    pub fn particle_system_mut(&mut self, index: usize) -> Option<&mut ParticleSystem> {
        self.particle_systems.get_mut(index)
    }

    pub fn remove_particle_system(&mut self, index: usize) -> Result<ParticleSystem> {
        if index >= self.particle_systems.len() {
            return Err(BeeError::IndexOutOfRange {
                what: "particle system",
                index,
                len: self.particle_systems.len(),
            });
        }
        Ok(self.particle_systems.remove(index))
    }

    /// Add a type drawn with the registered sprite `sprite` to a system
    pub fn create_particle_type(
        &mut self,
        index: usize,
        name: &str,
        sprite: &str,
    ) -> Result<ParticleTypeId> {
        let sprite = self.registry.sprite(sprite)?.clone();
        let len = self.particle_systems.len();
        let system = self
            .particle_systems
            .get_mut(index)
            .ok_or(BeeError::IndexOutOfRange {
                what: "particle system",
                index,
                len,
            })?;
        Ok(system.add_particle_type(ParticleType::new(name, Some(sprite))))
    }

    /// Warm up a particle system by simulating `frames` frames
    pub fn fast_forward_particles(&mut self, index: usize, frames: u32, timing: &dyn Timing) -> Result<u32> {
        let mut systems = std::mem::take(&mut self.particle_systems);
        let result = match systems.get_mut(index) {
            Some(system) => Ok(system.fast_forward(frames, timing, &*self)),
            None => Err(BeeError::IndexOutOfRange {
                what: "particle system",
                index,
                len: systems.len(),
            }),
        };
        self.particle_systems = systems;
        result
    }

    // ── frame ──

    fn hook_for(&self, id: InstanceId, event: InstanceEvent) -> Option<InstanceHook> {
        self.instances.get(&id)?.object().hook(event)
    }

    fn dispatch(&mut self, event: InstanceEvent) {
        for id in self.sorted_ids() {
            if let Some(hook) = self.hook_for(id, event) {
                hook(self, id);
            }
        }
    }

    fn fire_alarms(&mut self) {
        let now = self.now;
        for id in self.sorted_ids() {
            let Some(instance) = self.instances.get_mut(&id) else {
                continue;
            };
            let due = instance.take_due_alarms(now);
            if due.is_empty() {
                continue;
            }
            let Some(hook) = instance.object().alarm_hook() else {
                continue;
            };
            for index in due {
                if !self.instances.contains_key(&id) {
                    break;
                }
                hook(self, id, index);
            }
        }
    }

    fn dispatch_collisions(&mut self) {
        let contacts = self.physics.drain_contacts();
        if contacts.is_empty() {
            return;
        }
        let by_body: HashMap<BodyHandle, InstanceId> = self
            .instances
            .values()
            .filter_map(|i| i.body().map(|b| (b, i.id())))
            .collect();

        for contact in contacts.into_iter().filter(|c| c.started) {
            let (Some(&a), Some(&b)) = (by_body.get(&contact.a), by_body.get(&contact.b)) else {
                continue;
            };
            let accepted = match (self.instances.get(&a), self.instances.get(&b)) {
                (Some(ia), Some(ib)) => Self::filters_accept(ia, ib),
                _ => false,
            };
            if !accepted {
                continue;
            }
            for (this, other) in [(a, b), (b, a)] {
                let hook = self
                    .instances
                    .get(&this)
                    .and_then(|i| i.object().collision_hook());
                if let Some(hook) = hook {
                    hook(self, this, other);
                }
            }
        }
    }

    fn check_outside_room(&mut self) {
        for id in self.sorted_ids() {
            let Some(instance) = self.instances.get(&id) else {
                continue;
            };
            let Some(hook) = instance.object().hook(InstanceEvent::OutsideRoom) else {
                continue;
            };
            if self.is_outside(instance) {
                hook(self, id);
            }
        }
    }

    /// Run one simulation step at the clock's current time
    pub fn step(&mut self, timing: &dyn Timing) {
        self.now = timing.get_ticks();
        self.delta = timing.get_delta();
        self.frame += 1;

        let physics = self.physics.as_ref();
        for instance in self.instances.values_mut() {
            instance.remember_position(physics);
        }

        self.dispatch(InstanceEvent::StepBegin);
        self.fire_alarms();
        self.step_timelines();
        self.step_paths(self.delta);
        self.physics.step(self.delta);
        self.dispatch_collisions();
        self.dispatch(InstanceEvent::StepMid);
        self.check_outside_room();
        self.dispatch(InstanceEvent::StepEnd);
    }

    /// Draw every instance, then every particle system
    pub fn draw(&mut self, timing: &dyn Timing, renderer: &mut dyn Renderer) {
        for id in self.sorted_ids() {
            let Some(instance) = self.instances.get(&id) else {
                continue;
            };
            let hook = instance.object().draw_hook();
            let is_visible = instance.object().is_visible;
            match hook {
                Some(hook) => hook(self, id, &mut *renderer),
                None if is_visible => {
                    if let Err(e) = instance.draw(self.physics.as_ref(), renderer) {
                        log_skipped("draw", id, &e);
                    }
                }
                None => {}
            }
            if let Some(instance) = self.instances.get(&id) {
                self.draw_path(instance, renderer);
            }
        }

        let mut systems = std::mem::take(&mut self.particle_systems);
        let mut order: Vec<usize> = (0..systems.len()).collect();
        order.sort_by_key(|&i| Reverse(systems[i].depth));
        for i in order {
            systems[i].draw_frame(timing, &*self, renderer);
        }
        systems.append(&mut self.particle_systems);
        self.particle_systems = systems;
    }

    fn draw_path(&self, instance: &Instance, renderer: &mut dyn Renderer) {
        if !instance.is_path_drawn {
            return;
        }
        let Some(follower) = instance.path() else {
            return;
        };
        if let Some(path) = self.registry.path(follower.path) {
            path.draw_debug(follower, PATH_COLOR, renderer);
        }
    }
}

impl PositionSource for Room {
    fn position_of(&self, id: InstanceId) -> Option<Vec3> {
        self.instances
            .get(&id)
            .map(|i| i.position(self.physics.as_ref()))
    }
}

fn not_found(id: InstanceId) -> BeeError {
    BeeError::InstanceNotFound(id.to_string())
}

fn no_path(id: InstanceId) -> BeeError {
    BeeError::NotApplicable(format!("instance {id} is not following a path"))
}

/// Speed multiplier of a waypoint; zero means unchanged
fn waypoint_speed(coordinates: &[Waypoint], index: usize) -> f64 {
    match coordinates.get(index) {
        Some(w) if w.speed != 0.0 => w.speed.abs(),
        _ => 1.0,
    }
}

fn log_skipped(what: &str, id: InstanceId, err: &BeeError) {
    if err.is_not_applicable() {
        log::trace!(target: "bee::room", "{what} skipped for instance {id}: {err}");
    } else {
        log::warn!(target: "bee::room", "{what} failed for instance {id}: {err}");
    }
}
