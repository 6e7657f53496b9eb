//! Frame clock in engine ticks

use bee_core::Ticks;
use std::time::Instant;

/// Timing queries the simulation makes each frame
pub trait Timing {
    /// Milliseconds since the clock started
    fn get_ticks(&self) -> Ticks;
    /// Seconds since the previous frame
    fn get_delta(&self) -> f64;
    /// Target frames per second
    fn get_fps_goal(&self) -> u32;
}

/// Tracks engine time in milliseconds.
///
/// `tick` reads the wall clock; `advance` moves time by a fixed amount for
/// headless runs and tests.
pub struct GameClock {
    /// Elapsed engine time in milliseconds
    pub ticks: Ticks,
    /// Time since last frame in seconds
    pub delta: f64,
    pub fps_goal: u32,
    /// Sub-millisecond remainder carried between wall-clock ticks
    carry: f64,
    last_instant: Option<Instant>,
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(60)
    }
}

impl GameClock {
    pub fn new(fps_goal: u32) -> Self {
        Self {
            ticks: 0,
            delta: 0.0,
            fps_goal: fps_goal.max(1),
            carry: 0.0,
            last_instant: None,
        }
    }

    /// Advance the clock from the wall clock. Call once per frame.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let Some(last) = self.last_instant.replace(now) else {
            self.delta = 0.0;
            return;
        };

        // Clamp to avoid spiral of death (max 250ms frame time)
        let elapsed = now.duration_since(last).as_secs_f64().min(0.25);
        self.delta = elapsed;

        let ms = elapsed * 1000.0 + self.carry;
        let whole = ms.floor();
        self.carry = ms - whole;
        self.ticks += whole as Ticks;
    }

    /// Advance by exactly `ms` milliseconds
    pub fn advance(&mut self, ms: Ticks) {
        self.ticks += ms;
        self.delta = ms as f64 / 1000.0;
    }

    /// Advance by one frame at the target rate
    pub fn advance_frame(&mut self) {
        self.advance(self.frame_ms());
    }

    /// Length of one frame at the target rate, in whole milliseconds
    pub fn frame_ms(&self) -> Ticks {
        (1000 / self.fps_goal).max(1).into()
    }
}

impl Timing for GameClock {
    fn get_ticks(&self) -> Ticks {
        self.ticks
    }

    fn get_delta(&self) -> f64 {
        self.delta
    }

    fn get_fps_goal(&self) -> u32 {
        self.fps_goal
    }
}
