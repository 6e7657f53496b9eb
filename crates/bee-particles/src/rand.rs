//! Lightweight xorshift32 PRNG for emitters and lifetimes

use bee_core::geometry::absolute_angle;
use bee_core::Ticks;

pub struct ParticleRng {
    state: u32,
}

impl ParticleRng {
    pub fn new(seed: u64) -> Self {
        // Fold the seed so configs can use any u64
        let folded = (seed ^ (seed >> 32)) as u32;
        Self {
            state: if folded == 0 { 1 } else { folded },
        }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Returns a float in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / (f64::from(u32::MAX) + 1.0)
    }

    /// Returns a float in [min, max)
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Returns a tick count in [min, max]
    pub fn range_ticks(&mut self, min: Ticks, max: Ticks) -> Ticks {
        if max <= min {
            return min;
        }
        let x = u64::from(self.next_u32());
        match (max - min).checked_add(1) {
            Some(span) => min + x % span,
            // The whole u64 range
            None => min.saturating_add(x),
        }
    }

    /// A direction within `spread` degrees either side of `base`, in [0, 360)
    pub fn spread_direction(&mut self, base: f64, spread: f64) -> f64 {
        if spread <= 0.0 {
            return absolute_angle(base);
        }
        absolute_angle(base + self.range(-spread, spread))
    }
}
