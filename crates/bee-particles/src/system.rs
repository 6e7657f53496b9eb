//! The particle system: a particle population plus the modifiers acting on it

use crate::attractor::ParticleAttractor;
use crate::changer::ParticleChanger;
use crate::deflector::ParticleDeflector;
use crate::destroyer::ParticleDestroyer;
use crate::emitter::{EmitterConfig, ParticleEmitter};
use crate::particle::{ParticleData, ParticleType, SpawnQueue};
use crate::rand::ParticleRng;
use bee_core::{
    BeeError, BorderMode, Color, DrawRect, Flip, InstanceId, ParticleTypeId, PositionSource,
    Renderer, Result, Sprite, Ticks,
};
use bee_runtime::{ParticleSettings, Timing};
use std::borrow::Cow;
use std::collections::BTreeMap;

fn remove_at<T>(items: &mut Vec<T>, index: usize, what: &'static str) -> Result<T> {
    if index >= items.len() {
        return Err(BeeError::IndexOutOfRange {
            what,
            index,
            len: items.len(),
        });
    }
    Ok(items.remove(index))
}

/// A population of particles and the modifiers acting on it.
///
/// Particles live in world coordinates. Modifier regions are relative to
/// the system origin, which is the offset plus the followed instance's
/// position when there is one. A modifier that follows its own instance
/// is anchored there instead.
pub struct ParticleSystem {
    /// Instance whose position moves the system origin
    pub following: Option<InstanceId>,
    pub offset: (f64, f64),
    pub depth: i32,
    /// When false every batch is drawn unlit
    pub is_lightable: bool,
    /// Draw older particles underneath newer ones
    pub is_oldfirst: bool,
    /// Upper bound on frames one fast-forward simulates
    pub max_fast_forward: u32,

    particle_types: Vec<Option<ParticleType>>,
    particles: Vec<ParticleData>,
    /// Dead particle storage waiting to be reused
    free: Vec<ParticleData>,

    emitters: Vec<ParticleEmitter>,
    attractors: Vec<ParticleAttractor>,
    destroyers: Vec<ParticleDestroyer>,
    deflectors: Vec<ParticleDeflector>,
    changers: Vec<ParticleChanger>,

    /// Rebuilt on every drawing frame
    draw_data: BTreeMap<ParticleTypeId, Vec<DrawRect>>,
    time_offset: Ticks,
    rng: ParticleRng,
}

impl ParticleSystem {
    pub fn new(seed: u64) -> Self {
        Self {
            following: None,
            offset: (0.0, 0.0),
            depth: 0,
            is_lightable: true,
            is_oldfirst: true,
            max_fast_forward: ParticleSettings::default().max_fast_forward,
            particle_types: Vec::new(),
            particles: Vec::new(),
            free: Vec::new(),
            emitters: Vec::new(),
            attractors: Vec::new(),
            destroyers: Vec::new(),
            deflectors: Vec::new(),
            changers: Vec::new(),
            draw_data: BTreeMap::new(),
            time_offset: 0,
            rng: ParticleRng::new(seed),
        }
    }

    pub fn with_settings(settings: &ParticleSettings) -> Self {
        Self {
            max_fast_forward: settings.max_fast_forward,
            ..Self::new(settings.seed)
        }
    }

    // ── Particle types ──

    pub fn add_particle_type(&mut self, particle_type: ParticleType) -> ParticleTypeId {
        let id = ParticleTypeId(self.particle_types.len());
        self.particle_types.push(Some(particle_type));
        id
    }

    /// Remove a type and every live particle of it. The slot is not reused.
    pub fn remove_particle_type(&mut self, id: ParticleTypeId) -> Result<ParticleType> {
        let removed = self
            .particle_types
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or_else(|| BeeError::ParticleTypeNotFound(id.to_string()))?;

        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.particles)
            .into_iter()
            .partition(|p| p.particle_type == id);
        self.particles = kept;
        self.free.extend(gone);
        self.draw_data.remove(&id);
        Ok(removed)
    }

    pub fn particle_type(&self, id: ParticleTypeId) -> Option<&ParticleType> {
        self.particle_types.get(id.index()).and_then(Option::as_ref)
    }

    pub fn particle_type_mut(&mut self, id: ParticleTypeId) -> Option<&mut ParticleType> {
        self.particle_types
            .get_mut(id.index())
            .and_then(Option::as_mut)
    }

    pub fn find_particle_type(&self, name: &str) -> Option<ParticleTypeId> {
        self.particle_types
            .iter()
            .position(|t| t.as_ref().is_some_and(|t| t.name == name))
            .map(ParticleTypeId)
    }

    // ── Modifiers ──

    pub fn add_emitter(&mut self, emitter: ParticleEmitter) -> usize {
        self.emitters.push(emitter);
        self.emitters.len() - 1
    }

    /// Add an emitter described by a config, resolving its type by name
    pub fn add_emitter_from_config(&mut self, config: &EmitterConfig) -> Result<usize> {
        let id = self
            .find_particle_type(&config.particle_type)
            .ok_or_else(|| BeeError::ParticleTypeNotFound(config.particle_type.clone()))?;
        Ok(self.add_emitter(ParticleEmitter::from_config(id, config)))
    }

    pub fn remove_emitter(&mut self, index: usize) -> Result<ParticleEmitter> {
        remove_at(&mut self.emitters, index, "emitter")
    }

    pub fn emitters(&self) -> &[ParticleEmitter] {
        &self.emitters
    }

    pub fn emitter_mut(&mut self, index: usize) -> Option<&mut ParticleEmitter> {
        self.emitters.get_mut(index)
    }

    pub fn add_attractor(&mut self, attractor: ParticleAttractor) -> usize {
        self.attractors.push(attractor);
        self.attractors.len() - 1
    }

    pub fn remove_attractor(&mut self, index: usize) -> Result<ParticleAttractor> {
        remove_at(&mut self.attractors, index, "attractor")
    }

    pub fn attractors(&self) -> &[ParticleAttractor] {
        &self.attractors
    }

    pub fn add_destroyer(&mut self, destroyer: ParticleDestroyer) -> usize {
        self.destroyers.push(destroyer);
        self.destroyers.len() - 1
    }

    pub fn remove_destroyer(&mut self, index: usize) -> Result<ParticleDestroyer> {
        remove_at(&mut self.destroyers, index, "destroyer")
    }

    pub fn destroyers(&self) -> &[ParticleDestroyer] {
        &self.destroyers
    }

    pub fn add_deflector(&mut self, deflector: ParticleDeflector) -> usize {
        self.deflectors.push(deflector);
        self.deflectors.len() - 1
    }

    pub fn remove_deflector(&mut self, index: usize) -> Result<ParticleDeflector> {
        remove_at(&mut self.deflectors, index, "deflector")
    }

    pub fn deflectors(&self) -> &[ParticleDeflector] {
        &self.deflectors
    }

    pub fn add_changer(&mut self, changer: ParticleChanger) -> usize {
        self.changers.push(changer);
        self.changers.len() - 1
    }

    pub fn remove_changer(&mut self, index: usize) -> Result<ParticleChanger> {
        remove_at(&mut self.changers, index, "changer")
    }

    pub fn changers(&self) -> &[ParticleChanger] {
        &self.changers
    }

    // ── Population ──

    pub fn set_following(&mut self, following: Option<InstanceId>) {
        self.following = following;
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[ParticleData] {
        &self.particles
    }

    /// Recycled storage available for new particles
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Milliseconds this system runs ahead of the clock after fast-forwarding
    pub fn time_offset(&self) -> Ticks {
        self.time_offset
    }

    /// Batches built by the last drawing frame
    pub fn draw_data(&self) -> &BTreeMap<ParticleTypeId, Vec<DrawRect>> {
        &self.draw_data
    }

    /// Create a particle of `particle_type` at (x, y), born at `now`
    pub fn add_particle(
        &mut self,
        particle_type: ParticleTypeId,
        x: f64,
        y: f64,
        now: Ticks,
    ) -> Result<()> {
        let t = self
            .particle_types
            .get(particle_type.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| BeeError::ParticleTypeNotFound(particle_type.to_string()))?;

        let lifetime = self.rng.range_ticks(t.lifetime_min, t.lifetime_max);
        let (w, h) = t.draw_size();
        let velocity = t.velocity;

        let mut pd = match self.free.pop() {
            Some(mut pd) => {
                pd.reset(particle_type, x, y, now, lifetime);
                pd
            }
            None => ParticleData::new(particle_type, x, y, now, lifetime),
        };
        pd.w = w;
        pd.h = h;
        if velocity.magnitude != 0.0 {
            pd.push_velocity(velocity.magnitude, velocity.direction);
        }
        self.particles.push(pd);
        Ok(())
    }

    /// Drop every particle without running death behaviour
    pub fn clear(&mut self) {
        self.free.append(&mut self.particles);
        self.draw_data.clear();
    }

    /// Current system origin
    pub fn origin(&self, positions: &dyn PositionSource) -> (f64, f64) {
        let (mut x, mut y) = self.offset;
        if let Some(id) = self.following {
            match positions.position_of(id) {
                Some(p) => {
                    x += p.x;
                    y += p.y;
                }
                None => {
                    log::warn!(target: "bee::particles", "followed instance {id} no longer exists");
                }
            }
        }
        (x, y)
    }

    fn spawn_queued(&mut self, spawns: &mut SpawnQueue, now: Ticks) {
        let queued: Vec<_> = spawns.drain().collect();
        for (t, x, y) in queued {
            if let Err(e) = self.add_particle(t, x, y, now) {
                log::warn!(target: "bee::particles", "death spawn skipped: {e}");
            }
        }
    }

    /// Origin for a modifier: its followed instance, else the system origin
    fn anchor(
        following: Option<InstanceId>,
        system: (f64, f64),
        positions: &dyn PositionSource,
    ) -> (f64, f64) {
        following
            .and_then(|id| positions.position_of(id))
            .map_or(system, |p| (p.x, p.y))
    }

    /// Apply modifiers and emitters for one frame of `delta` seconds.
    ///
    /// Particles already marked old do not count toward an emitter's
    /// `max_particles`; each emitter sees the population including what
    /// earlier emitters added this frame.
    pub fn update(&mut self, now: Ticks, delta: f64, positions: &dyn PositionSource) {
        let origin = self.origin(positions);
        let mut spawns = SpawnQueue::default();

        let destroyers: Vec<_> = self
            .destroyers
            .iter()
            .map(|d| (d, Self::anchor(d.following, origin, positions)))
            .collect();
        let changers: Vec<_> = self
            .changers
            .iter()
            .map(|c| (c, Self::anchor(c.following, origin, positions)))
            .collect();
        let attractors: Vec<_> = self
            .attractors
            .iter()
            .map(|a| (a, Self::anchor(a.following, origin, positions)))
            .collect();
        let deflectors: Vec<_> = self
            .deflectors
            .iter()
            .map(|d| (d, Self::anchor(d.following, origin, positions)))
            .collect();

        for pd in self.particles.iter_mut() {
            if pd.is_old() {
                continue;
            }

            if destroyers.iter().any(|(d, (x, y))| d.handle(pd, *x, *y)) {
                if let Some(t) = self
                    .particle_types
                    .get(pd.particle_type.index())
                    .and_then(Option::as_ref)
                {
                    t.handle_death(pd, &mut spawns);
                }
                pd.mark_old();
                continue;
            }

            let before = pd.particle_type;
            for (c, (x, y)) in &changers {
                c.handle(pd, *x, *y);
            }
            if pd.particle_type != before {
                if let Some(t) = self
                    .particle_types
                    .get(pd.particle_type.index())
                    .and_then(Option::as_ref)
                {
                    (pd.w, pd.h) = t.draw_size();
                }
            }

            let (old_x, old_y) = (pd.x, pd.y);
            pd.move_by(delta);

            for (a, (x, y)) in &attractors {
                a.handle(pd, *x, *y, delta);
            }
            for (d, (x, y)) in &deflectors {
                d.handle(pd, old_x, old_y, *x, *y);
            }
        }

        let mut live = self.particles.iter().filter(|p| !p.is_old()).count();
        let mut emissions = Vec::new();
        for e in self.emitters.iter_mut() {
            let (x, y) = Self::anchor(e.following, origin, positions);
            let batch = e.emit(x, y, delta, live, &mut self.rng);
            live += batch.len();
            emissions.extend(batch.into_iter().map(|em| (e.particle_type, em)));
        }
        for (t, em) in emissions {
            match self.add_particle(t, em.x, em.y, now) {
                Ok(()) => {
                    if let Some(pd) = self.particles.last_mut() {
                        pd.push_velocity(em.velocity.magnitude, em.velocity.direction);
                    }
                }
                Err(e) => log::warn!(target: "bee::particles", "emitter skipped: {e}"),
            }
        }

        self.spawn_queued(&mut spawns, now);
    }

    /// Run one frame: modifiers, emitters and, when `should_draw`, the
    /// batched draw that also retires dead particles.
    pub fn draw(
        &mut self,
        now: Ticks,
        delta: f64,
        should_draw: bool,
        positions: &dyn PositionSource,
        renderer: &mut dyn Renderer,
    ) {
        self.update(now, delta, positions);
        if !should_draw {
            return;
        }

        self.draw_data.clear();
        let mut spawns = SpawnQueue::default();
        let mut kept = Vec::with_capacity(self.particles.len());

        for mut pd in self.particles.drain(..) {
            if pd.is_old() {
                self.free.push(pd);
                continue;
            }
            let Some(t) = self
                .particle_types
                .get(pd.particle_type.index())
                .and_then(Option::as_ref)
            else {
                log::warn!(target: "bee::particles", "dropping particle of missing type {}", pd.particle_type);
                self.free.push(pd);
                continue;
            };

            let elapsed = pd.elapsed(now);
            let rect = pd.get_rect();
            self.draw_data
                .entry(pd.particle_type)
                .or_default()
                .push(DrawRect {
                    x: rect.x,
                    y: rect.y,
                    w: rect.w,
                    h: rect.h,
                    angle: t.angle_at(elapsed),
                    subimage_time: pd.creation(),
                });

            if pd.is_dead(elapsed) {
                t.handle_death(&pd, &mut spawns);
                pd.mark_old();
                self.free.push(pd);
            } else {
                kept.push(pd);
            }
        }
        self.particles = kept;

        for (id, rects) in self.draw_data.iter_mut() {
            let Some(t) = self
                .particle_types
                .get(id.index())
                .and_then(Option::as_ref)
            else {
                continue;
            };
            let Some(sprite) = &t.sprite else {
                log::warn!(target: "bee::particles", "particle type \"{}\" has no sprite", t.name);
                continue;
            };
            if !sprite.is_loaded {
                log::warn!(
                    target: "bee::particles",
                    "{}",
                    BeeError::SpriteNotLoaded(sprite.name.clone())
                );
                continue;
            }

            if !self.is_oldfirst {
                rects.reverse();
            }

            let unlit = !self.is_lightable || !t.is_lightable;
            if unlit {
                renderer.set_is_lightable(false);
            }
            let sprite: Cow<'_, Sprite> = if t.is_sprite_lightable {
                Cow::Borrowed(sprite)
            } else {
                Cow::Owned(Sprite {
                    is_lightable: false,
                    ..sprite.clone()
                })
            };
            renderer.draw_batch(&sprite, &rects[..], t.rotation_cache, t.color, Flip::None);
            if unlit {
                renderer.set_is_lightable(true);
            }
        }

        self.spawn_queued(&mut spawns, now);
    }

    /// Draw one frame at the clock's time
    pub fn draw_frame(
        &mut self,
        timing: &dyn Timing,
        positions: &dyn PositionSource,
        renderer: &mut dyn Renderer,
    ) {
        let now = timing.get_ticks() + self.time_offset;
        self.draw(now, timing.get_delta(), true, positions, renderer);
    }

    /// Simulate `frames` frames ahead without drawing, then retire every
    /// particle that died along the way. Returns the frames simulated.
    pub fn fast_forward(
        &mut self,
        frames: u32,
        timing: &dyn Timing,
        positions: &dyn PositionSource,
    ) -> u32 {
        let frames = if frames > self.max_fast_forward {
            log::debug!(
                target: "bee::particles",
                "fast-forward of {frames} frames capped at {}",
                self.max_fast_forward
            );
            self.max_fast_forward
        } else {
            frames
        };

        let t = timing.get_ticks();
        // At least 1ms so goals above 1000fps still advance time
        let step: Ticks = (1000 / timing.get_fps_goal().max(1)).max(1).into();
        let delta = step as f64 / 1000.0;
        for _ in 0..frames {
            self.time_offset += step;
            self.update(t + self.time_offset, delta, positions);
        }

        let now = t + self.time_offset;
        let mut spawns = SpawnQueue::default();
        let mut kept = Vec::with_capacity(self.particles.len());
        for mut pd in self.particles.drain(..) {
            if pd.is_old() {
                self.free.push(pd);
                continue;
            }
            if pd.is_dead(pd.elapsed(now)) {
                if let Some(t) = self
                    .particle_types
                    .get(pd.particle_type.index())
                    .and_then(Option::as_ref)
                {
                    t.handle_death(&pd, &mut spawns);
                }
                pd.mark_old();
                self.free.push(pd);
            } else {
                kept.push(pd);
            }
        }
        self.particles = kept;
        self.spawn_queued(&mut spawns, now);
        frames
    }

    /// Outline every particle and modifier
    pub fn draw_debug(&self, positions: &dyn PositionSource, renderer: &mut dyn Renderer) {
        let origin = self.origin(positions);
        for pd in &self.particles {
            renderer.draw_rectangle(pd.get_rect(), BorderMode::Outline, Color::AQUA);
        }
        for e in &self.emitters {
            let (x, y) = Self::anchor(e.following, origin, positions);
            e.draw_debug(x, y, Color::GREEN, renderer);
        }
        for a in &self.attractors {
            let (x, y) = Self::anchor(a.following, origin, positions);
            a.draw_debug(x, y, Color::MAGENTA, renderer);
        }
        for d in &self.destroyers {
            let (x, y) = Self::anchor(d.following, origin, positions);
            d.draw_debug(x, y, Color::RED, renderer);
        }
        for d in &self.deflectors {
            let (x, y) = Self::anchor(d.following, origin, positions);
            d.draw_debug(x, y, Color::NAVY, renderer);
        }
        for c in &self.changers {
            let (x, y) = Self::anchor(c.following, origin, positions);
            c.draw_debug(x, y, Color::YELLOW, renderer);
        }
    }
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::with_settings(&ParticleSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changer::ChangeAction;
    use bee_core::{DrawCall, NoPositions, RecordingRenderer, Vec3};
    use bee_runtime::GameClock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn spark() -> ParticleType {
        ParticleType::new("pt_spark", Some(Sprite::new("spr_spark", 4, 4))).with_lifetime(100, 100)
    }

    #[test]
    fn aged_particle_dies_once() {
        let deaths = Arc::new(AtomicUsize::new(0));
        let counter = deaths.clone();
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark().with_death_callback(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let mut r = RecordingRenderer::new();

        sys.add_particle(t, 0.0, 0.0, 1000).unwrap();
        sys.draw(1099, 0.0, true, &NoPositions, &mut r);
        assert_eq!(sys.particle_count(), 1);
        assert_eq!(deaths.load(Ordering::SeqCst), 0);

        sys.draw(1100, 0.0, true, &NoPositions, &mut r);
        assert_eq!(sys.particle_count(), 0);
        assert_eq!(deaths.load(Ordering::SeqCst), 1);

        sys.draw(1200, 0.0, true, &NoPositions, &mut r);
        assert_eq!(deaths.load(Ordering::SeqCst), 1);
        assert_eq!(sys.free_count(), 1);
    }

    #[test]
    fn dead_particles_linger_until_a_drawing_frame() {
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark());
        let mut r = RecordingRenderer::new();
        sys.add_particle(t, 0.0, 0.0, 0).unwrap();
        sys.draw(500, 0.0, false, &NoPositions, &mut r);
        assert_eq!(sys.particle_count(), 1);
        sys.draw(500, 0.0, true, &NoPositions, &mut r);
        assert_eq!(sys.particle_count(), 0);
    }

    #[test]
    fn recycled_storage_is_reused() {
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark());
        sys.add_particle(t, 0.0, 0.0, 0).unwrap();
        sys.add_particle(t, 0.0, 0.0, 0).unwrap();
        sys.clear();
        assert_eq!(sys.particle_count(), 0);
        assert_eq!(sys.free_count(), 2);

        sys.add_particle(t, 3.0, 4.0, 50).unwrap();
        assert_eq!(sys.free_count(), 1);
        let p = &sys.particles()[0];
        assert_eq!((p.x, p.y, p.creation()), (3.0, 4.0, 50));
        assert!(!p.is_old());
    }

    #[test]
    fn deflector_bounces_particle() {
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(
            ParticleType::new("pt_ball", None)
                .with_lifetime(10_000, 10_000)
                .with_velocity(10.0, 0.0),
        );
        sys.add_deflector(ParticleDeflector::new(0.0, 0.0, 10, 10).with_friction(0.5));
        sys.add_particle(t, -3.0, 5.0, 0).unwrap();

        sys.update(500, 0.5, &NoPositions);

        let v = sys.particles()[0].last_velocity().unwrap();
        assert!((v.magnitude + 5.0).abs() < 1e-9);
        assert!(v.direction.abs() < 1e-9);
    }

    #[test]
    fn destroyer_runs_death_behaviour() {
        let mut sys = ParticleSystem::new(1);
        let ash = sys.add_particle_type(ParticleType::new("pt_ash", None).with_lifetime(1000, 1000));
        let ember = sys.add_particle_type(
            ParticleType::new("pt_ember", None)
                .with_lifetime(1000, 1000)
                .with_death_particles(ash, 3),
        );
        sys.add_destroyer(ParticleDestroyer::new(0.0, 0.0, 10, 10));
        sys.add_particle(ember, 5.0, 5.0, 0).unwrap();

        sys.update(10, 0.0, &NoPositions);

        let live: Vec<_> = sys.particles().iter().filter(|p| !p.is_old()).collect();
        assert_eq!(live.len(), 3);
        assert!(live.iter().all(|p| p.particle_type == ash && p.creation() == 10));

        // The destroyer also catches the ash, but the ember is not handled twice
        sys.update(20, 0.0, &NoPositions);
        let ash_count = sys
            .particles()
            .iter()
            .filter(|p| p.particle_type == ash)
            .count();
        assert_eq!(ash_count, 3);
    }

    #[test]
    fn changer_switches_type() {
        let mut sys = ParticleSystem::new(1);
        let a = sys.add_particle_type(ParticleType::new("pt_a", None));
        let b = sys.add_particle_type(ParticleType::new("pt_b", None));
        sys.add_changer(ParticleChanger::new(0.0, 0.0, 10, 10, ChangeAction::Type(b)));
        sys.add_particle(a, 5.0, 5.0, 0).unwrap();
        sys.add_particle(a, 50.0, 5.0, 0).unwrap();
        sys.update(0, 0.0, &NoPositions);
        assert_eq!(sys.particles()[0].particle_type, b);
        assert_eq!(sys.particles()[1].particle_type, a);
    }

    #[test]
    fn switched_particles_take_the_new_size() {
        let mut sys = ParticleSystem::new(1);
        let a = sys.add_particle_type(ParticleType::new("pt_a", Some(Sprite::new("spr_a", 2, 2))));
        let b = sys.add_particle_type(ParticleType::new("pt_b", Some(Sprite::new("spr_b", 16, 16))));
        sys.add_changer(ParticleChanger::new(0.0, 0.0, 10, 10, ChangeAction::Type(b)));
        sys.add_particle(a, 5.0, 5.0, 0).unwrap();
        sys.update(0, 0.0, &NoPositions);

        let p = &sys.particles()[0];
        assert_eq!(p.particle_type, b);
        assert_eq!((p.w, p.h), (16, 16));
    }

    #[test]
    fn modifiers_can_follow_their_own_instance() {
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark());
        sys.add_destroyer(ParticleDestroyer::new(0.0, 0.0, 4, 4).with_following(InstanceId(2)));
        sys.add_particle(t, 101.0, 101.0, 0).unwrap();
        sys.add_particle(t, 1.0, 1.0, 0).unwrap();

        let mut positions = HashMap::new();
        positions.insert(InstanceId(2), Vec3::new(100.0, 100.0, 0.0));
        sys.update(0, 0.0, &positions);
        assert!(sys.particles()[0].is_old());
        assert!(!sys.particles()[1].is_old());

        // Without the instance the region falls back to the system origin
        sys.update(0, 0.0, &NoPositions);
        assert!(sys.particles()[1].is_old());
    }

    #[test]
    fn emitter_follows_independently_of_system() {
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark());
        let mut e = ParticleEmitter::new(t, 0.0, 0.0, 2, 2).with_following(InstanceId(3));
        e.rate = 0.0;
        e.burst(3);
        sys.add_emitter(e);

        let mut positions = HashMap::new();
        positions.insert(InstanceId(3), Vec3::new(40.0, 60.0, 0.0));
        sys.update(0, 0.0, &positions);
        assert_eq!(sys.particle_count(), 3);
        assert!(sys
            .particles()
            .iter()
            .all(|p| (40.0..42.0).contains(&p.x) && (60.0..62.0).contains(&p.y)));
    }

    #[test]
    fn retired_particles_leave_emitter_headroom() {
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark());
        sys.add_destroyer(ParticleDestroyer::new(0.0, 0.0, 10, 10));
        for _ in 0..3 {
            sys.add_particle(t, 5.0, 5.0, 0).unwrap();
        }
        let mut e = ParticleEmitter::new(t, 50.0, 50.0, 2, 2);
        e.rate = 0.0;
        e.max_particles = 3;
        e.burst(3);
        sys.add_emitter(e);

        sys.update(0, 0.0, &NoPositions);
        let live = sys.particles().iter().filter(|p| !p.is_old()).count();
        assert_eq!(live, 3);
        assert_eq!(sys.particle_count(), 6);
    }

    #[test]
    fn emitters_share_the_population_cap() {
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark());
        for _ in 0..2 {
            let mut e = ParticleEmitter::new(t, 0.0, 0.0, 2, 2);
            e.rate = 0.0;
            e.max_particles = 4;
            e.burst(3);
            sys.add_emitter(e);
        }
        sys.update(0, 0.0, &NoPositions);
        assert_eq!(sys.particle_count(), 4);
    }

    #[test]
    fn one_batch_per_type() {
        let mut sys = ParticleSystem::new(1);
        let a = sys.add_particle_type(spark());
        let b = sys.add_particle_type(
            ParticleType::new("pt_smoke", Some(Sprite::new("spr_smoke", 8, 8))).with_lifetime(100, 100),
        );
        for i in 0..3 {
            sys.add_particle(a, f64::from(i), 0.0, 0).unwrap();
        }
        sys.add_particle(b, 0.0, 0.0, 0).unwrap();

        let mut r = RecordingRenderer::new();
        sys.draw(10, 0.0, true, &NoPositions, &mut r);
        assert_eq!(r.batches().count(), 2);
        assert_eq!(r.batched_sprite_count(), 4);
        assert_eq!(sys.draw_data()[&a].len(), 3);
        assert_eq!(sys.draw_data()[&b][0].w, 8);
    }

    #[test]
    fn unlit_system_overrides_lighting() {
        let mut sys = ParticleSystem::new(1);
        sys.is_lightable = false;
        let t = sys.add_particle_type(spark());
        sys.add_particle(t, 0.0, 0.0, 0).unwrap();

        let mut r = RecordingRenderer::new();
        sys.draw(10, 0.0, true, &NoPositions, &mut r);

        let batch_lit = r.calls.iter().find_map(|c| match c {
            DrawCall::Batch { is_lightable, .. } => Some(*is_lightable),
            _ => None,
        });
        assert_eq!(batch_lit, Some(false));
        assert!(r.is_lightable());
    }

    #[test]
    fn lit_system_leaves_lighting_alone() {
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark());
        sys.add_particle(t, 0.0, 0.0, 0).unwrap();
        let mut r = RecordingRenderer::new();
        sys.draw(10, 0.0, true, &NoPositions, &mut r);
        assert!(!r.calls.iter().any(|c| matches!(c, DrawCall::Lightable(_))));
    }

    #[test]
    fn missing_or_unloaded_sprite_is_skipped() {
        let mut sys = ParticleSystem::new(1);
        let bare = sys.add_particle_type(ParticleType::new("pt_bare", None).with_lifetime(100, 100));
        let late = sys.add_particle_type(
            ParticleType::new("pt_late", Some(Sprite::deferred("spr_late", 4, 4)))
                .with_lifetime(100, 100),
        );
        let ok = sys.add_particle_type(spark());
        for t in [bare, late, ok] {
            sys.add_particle(t, 0.0, 0.0, 0).unwrap();
        }

        let mut r = RecordingRenderer::new();
        sys.draw(10, 0.0, true, &NoPositions, &mut r);
        assert_eq!(r.batches().count(), 1);
        // Skipped types still age
        assert_eq!(sys.particle_count(), 3);
        sys.draw(100, 0.0, true, &NoPositions, &mut r);
        assert_eq!(sys.particle_count(), 0);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut sys = ParticleSystem::new(1);
        let err = sys.add_particle(ParticleTypeId(7), 0.0, 0.0, 0).unwrap_err();
        assert!(matches!(err, BeeError::ParticleTypeNotFound(_)));
    }

    #[test]
    fn removing_a_type_drops_its_particles() {
        let mut sys = ParticleSystem::new(1);
        let a = sys.add_particle_type(spark());
        let b = sys.add_particle_type(ParticleType::new("pt_b", None));
        sys.add_particle(a, 0.0, 0.0, 0).unwrap();
        sys.add_particle(b, 0.0, 0.0, 0).unwrap();

        let removed = sys.remove_particle_type(a).unwrap();
        assert_eq!(removed.name, "pt_spark");
        assert_eq!(sys.particle_count(), 1);
        assert!(sys.particle_type(a).is_none());
        assert!(sys.remove_particle_type(a).is_err());
        // Ids stay stable
        assert_eq!(sys.find_particle_type("pt_b"), Some(b));
    }

    #[test]
    fn modifier_removal_checks_index() {
        let mut sys = ParticleSystem::new(1);
        sys.add_attractor(ParticleAttractor::new(0.0, 0.0, 1.0, 10.0));
        let err = sys.remove_attractor(3).unwrap_err();
        assert!(err.is_not_applicable());
        assert!(sys.remove_attractor(0).is_ok());
        assert!(sys.attractors().is_empty());
    }

    #[test]
    fn emitter_from_config_resolves_type() {
        let mut sys = ParticleSystem::new(1);
        sys.add_particle_type(spark());
        let table: toml::value::Table =
            toml::from_str("particle_type = \"pt_spark\"\nburst_count = 4\nrate = 0").unwrap();
        let config = EmitterConfig::from_toml(&table);
        sys.add_emitter_from_config(&config).unwrap();
        sys.update(0, 0.016, &NoPositions);
        assert_eq!(sys.particle_count(), 4);

        let missing = EmitterConfig {
            particle_type: "pt_nope".into(),
            ..config
        };
        assert!(sys.add_emitter_from_config(&missing).is_err());
    }

    #[test]
    fn following_moves_the_origin() {
        let mut sys = ParticleSystem::new(1);
        sys.offset = (1.0, 2.0);
        let leader = InstanceId(4);
        sys.set_following(Some(leader));

        let mut positions = HashMap::new();
        positions.insert(leader, Vec3::new(100.0, 50.0, 0.0));
        assert_eq!(sys.origin(&positions), (101.0, 52.0));

        // A vanished leader leaves just the offset
        assert_eq!(sys.origin(&NoPositions), (1.0, 2.0));
    }

    #[test]
    fn emitter_region_follows_instance() {
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark());
        let mut e = ParticleEmitter::new(t, 0.0, 0.0, 2, 2);
        e.rate = 0.0;
        e.burst(5);
        sys.add_emitter(e);
        sys.set_following(Some(InstanceId(1)));

        let mut positions = HashMap::new();
        positions.insert(InstanceId(1), Vec3::new(200.0, 300.0, 0.0));
        sys.update(0, 0.016, &positions);
        assert!(sys
            .particles()
            .iter()
            .all(|p| (200.0..203.0).contains(&p.x) && (300.0..303.0).contains(&p.y)));
    }

    fn emitting_system() -> ParticleSystem {
        let mut sys = ParticleSystem::new(99);
        let t = sys.add_particle_type(spark().with_lifetime(40, 120));
        let mut e = ParticleEmitter::new(t, 0.0, 0.0, 10, 10);
        e.rate = 200.0;
        sys.add_emitter(e);
        sys
    }

    #[test]
    fn fast_forward_matches_stepping() {
        let frames = 30;
        let clock = GameClock::new(50);
        let step = clock.frame_ms();

        let mut forwarded = emitting_system();
        assert_eq!(forwarded.fast_forward(frames, &clock, &NoPositions), frames);
        let mut r = RecordingRenderer::new();
        forwarded.draw_frame(&clock, &NoPositions, &mut r);

        let mut stepped = emitting_system();
        for k in 1..=u64::from(frames) {
            stepped.draw(k * step, step as f64 / 1000.0, false, &NoPositions, &mut r);
        }
        stepped.draw(
            u64::from(frames) * step,
            clock.get_delta(),
            true,
            &NoPositions,
            &mut r,
        );

        assert!(forwarded.particle_count() > 0);
        let births = |s: &ParticleSystem| {
            let mut v: Vec<_> = s.particles().iter().map(|p| p.creation()).collect();
            v.sort_unstable();
            v
        };
        assert_eq!(births(&forwarded), births(&stepped));
        assert_eq!(forwarded.time_offset(), u64::from(frames) * step);
    }

    #[test]
    fn fast_forward_retires_dead_particles() {
        let deaths = Arc::new(AtomicUsize::new(0));
        let counter = deaths.clone();
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark().with_death_callback(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        sys.add_particle(t, 0.0, 0.0, 0).unwrap();

        let clock = GameClock::new(50);
        sys.fast_forward(5, &clock, &NoPositions);
        assert_eq!(sys.particle_count(), 0);
        assert_eq!(deaths.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fast_forward_is_capped() {
        let mut sys = ParticleSystem::new(1);
        sys.max_fast_forward = 10;
        let clock = GameClock::new(60);
        assert_eq!(sys.fast_forward(1000, &clock, &NoPositions), 10);
        assert_eq!(sys.time_offset(), 160);

        // Below the cap every requested frame runs
        assert_eq!(sys.fast_forward(4, &clock, &NoPositions), 4);
        assert_eq!(sys.time_offset(), 224);
    }

    #[test]
    fn fast_forward_above_1000_fps_still_advances() {
        let mut sys = emitting_system();
        let clock = GameClock::new(2000);
        assert_eq!(sys.fast_forward(20, &clock, &NoPositions), 20);
        assert_eq!(sys.time_offset(), 20);
        assert!(sys.particle_count() > 0);
    }

    #[test]
    fn oldest_drawn_first_unless_disabled() {
        let mut sys = ParticleSystem::new(1);
        sys.is_oldfirst = false;
        let t = sys.add_particle_type(spark());
        sys.add_particle(t, 0.0, 0.0, 0).unwrap();
        sys.add_particle(t, 20.0, 0.0, 5).unwrap();
        let mut r = RecordingRenderer::new();
        sys.draw(10, 0.0, true, &NoPositions, &mut r);
        assert_eq!(sys.draw_data()[&t][0].subimage_time, 5);
    }

    #[test]
    fn debug_draw_outlines_everything() {
        let mut sys = ParticleSystem::new(1);
        let t = sys.add_particle_type(spark());
        sys.add_particle(t, 0.0, 0.0, 0).unwrap();
        sys.add_emitter(ParticleEmitter::new(t, 0.0, 0.0, 4, 4));
        sys.add_destroyer(ParticleDestroyer::new(0.0, 0.0, 4, 4));
        let mut r = RecordingRenderer::new();
        sys.draw_debug(&NoPositions, &mut r);
        assert_eq!(r.calls.len(), 3);
    }
}
