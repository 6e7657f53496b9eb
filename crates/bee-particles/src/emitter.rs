//! Emitter configuration (parsed from TOML) and runtime state

use crate::rand::ParticleRng;
use bee_core::{BorderMode, Color, InstanceId, ParticleTypeId, Rect, Renderer, Velocity};

/// Configuration parsed from an emitter TOML table
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterConfig {
    /// Name of the particle type to emit
    pub particle_type: String,
    /// Spawn region, relative to the system origin
    pub x: f64,
    pub y: f64,
    pub w: u32,
    pub h: u32,
    /// Particles per second
    pub rate: f64,
    pub burst_count: u32,
    /// Stop emitting while the system holds this many particles
    pub max_particles: usize,
    pub direction: f64,
    pub spread: f64,
    pub speed_min: f64,
    pub speed_max: f64,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            particle_type: String::new(),
            x: 0.0,
            y: 0.0,
            w: 1,
            h: 1,
            rate: 10.0,
            burst_count: 0,
            max_particles: 256,
            direction: 90.0,
            spread: 15.0,
            speed_min: 10.0,
            speed_max: 30.0,
        }
    }
}

impl EmitterConfig {
    /// Parse an EmitterConfig from a TOML table
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();

        if let Some(v) = table.get("particle_type").and_then(|v| v.as_str()) {
            config.particle_type = v.to_string();
        }
        if let Some(v) = table.get("position") {
            let [x, y] = toml_vec2(v, [config.x, config.y]);
            config.x = x;
            config.y = y;
        }
        if let Some(v) = table.get("size") {
            let [w, h] = toml_vec2(v, [f64::from(config.w), f64::from(config.h)]);
            config.w = w.max(1.0) as u32;
            config.h = h.max(1.0) as u32;
        }
        if let Some(v) = table.get("rate") {
            config.rate = toml_f64(v, config.rate).max(0.0);
        }
        if let Some(v) = table.get("burst_count") {
            config.burst_count = v.as_integer().unwrap_or(0).max(0) as u32;
        }
        if let Some(v) = table.get("max_particles") {
            let n = v.as_integer().unwrap_or(256).max(0) as usize;
            config.max_particles = n.min(10000);
        }
        if let Some(v) = table.get("direction") {
            config.direction = toml_f64(v, config.direction);
        }
        if let Some(v) = table.get("spread") {
            config.spread = toml_f64(v, config.spread);
        }
        if let Some(v) = table.get("speed_min") {
            config.speed_min = toml_f64(v, config.speed_min);
        }
        if let Some(v) = table.get("speed_max") {
            config.speed_max = toml_f64(v, config.speed_max);
        }
        if config.speed_max < config.speed_min {
            config.speed_max = config.speed_min;
        }

        config
    }
}

/// A particle the emitter wants created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    pub x: f64,
    pub y: f64,
    pub velocity: Velocity,
}

/// Spawns particles of one type inside a region
#[derive(Debug, Clone)]
pub struct ParticleEmitter {
    pub particle_type: ParticleTypeId,
    pub x: f64,
    pub y: f64,
    pub w: u32,
    pub h: u32,
    pub rate: f64,
    pub max_particles: usize,
    pub direction: f64,
    pub spread: f64,
    pub speed_min: f64,
    pub speed_max: f64,
    /// Emit around this instance instead of the system origin
    pub following: Option<InstanceId>,
    /// Fractional particle accumulator for sub-frame emission
    accumulator: f64,
    /// Burst particles queued for the next frame
    pending_burst: u32,
}

impl ParticleEmitter {
    pub fn new(particle_type: ParticleTypeId, x: f64, y: f64, w: u32, h: u32) -> Self {
        let defaults = EmitterConfig::default();
        Self {
            particle_type,
            x,
            y,
            w: w.max(1),
            h: h.max(1),
            rate: defaults.rate,
            max_particles: defaults.max_particles,
            direction: defaults.direction,
            spread: defaults.spread,
            speed_min: defaults.speed_min,
            speed_max: defaults.speed_max,
            accumulator: 0.0,
            following: None,
            pending_burst: 0,
        }
    }

    /// Build an emitter from a parsed config once its type is resolved
    pub fn from_config(particle_type: ParticleTypeId, config: &EmitterConfig) -> Self {
        Self {
            particle_type,
            x: config.x,
            y: config.y,
            w: config.w.max(1),
            h: config.h.max(1),
            rate: config.rate,
            max_particles: config.max_particles,
            direction: config.direction,
            spread: config.spread,
            speed_min: config.speed_min,
            speed_max: config.speed_max,
            accumulator: 0.0,
            following: None,
            pending_burst: config.burst_count,
        }
    }

    pub fn with_following(mut self, id: InstanceId) -> Self {
        self.following = Some(id);
        self
    }

    /// Queue `count` extra particles for the next frame
    pub fn burst(&mut self, count: u32) {
        self.pending_burst = self.pending_burst.saturating_add(count);
    }

    pub fn pending_burst(&self) -> u32 {
        self.pending_burst
    }

    pub fn region(&self, system_x: f64, system_y: f64) -> Rect {
        Rect::new(
            (system_x + self.x) as i32,
            (system_y + self.y) as i32,
            self.w as i32,
            self.h as i32,
        )
    }

    /// Particles to create this frame.
    ///
    /// `live` counts particles not yet marked old, checked against
    /// `max_particles` so a saturated system stops growing.
    pub fn emit(
        &mut self,
        system_x: f64,
        system_y: f64,
        delta: f64,
        live: usize,
        rng: &mut ParticleRng,
    ) -> Vec<Emission> {
        self.accumulator += self.rate * delta.max(0.0);
        let from_rate = self.accumulator.floor();
        self.accumulator -= from_rate;

        let wanted = from_rate as usize + self.pending_burst as usize;
        self.pending_burst = 0;
        let count = wanted.min(self.max_particles.saturating_sub(live));

        (0..count)
            .map(|_| Emission {
                x: system_x + self.x + rng.range(0.0, f64::from(self.w)),
                y: system_y + self.y + rng.range(0.0, f64::from(self.h)),
                velocity: Velocity::new(
                    rng.range(self.speed_min, self.speed_max),
                    rng.spread_direction(self.direction, self.spread),
                ),
            })
            .collect()
    }

    pub fn draw_debug(&self, system_x: f64, system_y: f64, color: Color, renderer: &mut dyn Renderer) {
        renderer.draw_rectangle(self.region(system_x, system_y), BorderMode::Outline, color);
    }
}

// ── TOML helpers (handle integer/float coercion) ──

fn toml_f64(v: &toml::Value, default: f64) -> f64 {
    v.as_float()
        .or_else(|| v.as_integer().map(|i| i as f64))
        .unwrap_or(default)
}

fn toml_vec2(v: &toml::Value, default: [f64; 2]) -> [f64; 2] {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 2 {
            return [toml_f64(&arr[0], default[0]), toml_f64(&arr[1], default[1])];
        }
    }
    default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = EmitterConfig::default();
        assert!(config.rate > 0.0);
        assert!(config.speed_max >= config.speed_min);
        assert!(config.max_particles > 0);
    }

    #[test]
    fn parse_from_toml() {
        let toml_str = r#"
particle_type = "pt_smoke"
position = [10, -4.5]
size = [32, 8]
rate = 50.0
burst_count = 5
max_particles = 50000
speed_min = 4
speed_max = 2
"#;
        let table: toml::value::Table = toml::from_str(toml_str).unwrap();
        let config = EmitterConfig::from_toml(&table);
        assert_eq!(config.particle_type, "pt_smoke");
        assert!((config.x - 10.0).abs() < 1e-12);
        assert!((config.y + 4.5).abs() < 1e-12);
        assert_eq!((config.w, config.h), (32, 8));
        assert!((config.rate - 50.0).abs() < 1e-12);
        assert_eq!(config.burst_count, 5);
        assert_eq!(config.max_particles, 10000);
        assert!((config.speed_max - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rate_accumulates_fractions() {
        let mut rng = ParticleRng::new(1);
        let mut e = ParticleEmitter::new(ParticleTypeId(0), 0.0, 0.0, 4, 4);
        e.rate = 10.0;

        // 10/s at 60 fps is one particle every six frames
        let total: usize = (0..60)
            .map(|_| e.emit(0.0, 0.0, 1.0 / 60.0, 0, &mut rng).len())
            .sum();
        assert!((9..=10).contains(&total), "emitted {total}");
    }

    #[test]
    fn burst_is_emitted_once() {
        let mut rng = ParticleRng::new(1);
        let mut e = ParticleEmitter::new(ParticleTypeId(0), 0.0, 0.0, 4, 4);
        e.rate = 0.0;
        e.burst(3);
        assert_eq!(e.emit(0.0, 0.0, 0.016, 0, &mut rng).len(), 3);
        assert_eq!(e.emit(0.0, 0.0, 0.016, 0, &mut rng).len(), 0);
    }

    #[test]
    fn emissions_stay_in_region() {
        let mut rng = ParticleRng::new(5);
        let mut e = ParticleEmitter::new(ParticleTypeId(0), 10.0, 20.0, 5, 5);
        e.rate = 0.0;
        e.burst(100);
        for em in e.emit(100.0, 100.0, 0.0, 0, &mut rng) {
            assert!((110.0..115.0).contains(&em.x));
            assert!((120.0..125.0).contains(&em.y));
            assert!((e.speed_min..e.speed_max).contains(&em.velocity.magnitude));
        }
    }

    #[test]
    fn saturated_system_stops_emitting() {
        let mut rng = ParticleRng::new(5);
        let mut e = ParticleEmitter::new(ParticleTypeId(0), 0.0, 0.0, 1, 1);
        e.max_particles = 4;
        e.burst(10);
        assert_eq!(e.emit(0.0, 0.0, 0.0, 2, &mut rng).len(), 2);
    }
}
