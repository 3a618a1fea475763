//! Fixed timestep accumulator
//!
//! Wall-clock time accumulates as lag and is consumed in constant steps, so
//! the simulation advances identically no matter how fast frames render.

use tracing::warn;

/// Default simulation step, roughly 60 Hz
pub const FIXED_STEP_MS: u64 = 16;

#[derive(Debug, Clone)]
pub struct FixedTimestep {
    previous_ms: Option<u64>,
    lag_ms: u64,
    step_ms: u64,
    max_updates: Option<u32>,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(FIXED_STEP_MS)
    }
}

impl FixedTimestep {
    /// A zero step is raised to 1 ms
    pub fn new(step_ms: u64) -> Self {
        Self {
            previous_ms: None,
            lag_ms: 0,
            step_ms: step_ms.max(1),
            max_updates: None,
        }
    }

    /// Caps how many steps a single frame may run
    pub fn with_max_updates(mut self, max_updates: Option<u32>) -> Self {
        self.max_updates = max_updates;
        self
    }

    pub fn step_ms(&self) -> u64 {
        self.step_ms
    }

    /// The step handed to every update, in seconds
    pub fn step_seconds(&self) -> f32 {
        self.step_ms as f32 / 1000.0
    }

    pub fn lag_ms(&self) -> u64 {
        self.lag_ms
    }

    /// Records a new timestamp and returns the milliseconds since the last one
    ///
    /// The first call has nothing to measure against and returns 0.
    /// A clock that moves backwards also yields 0.
    pub fn advance(&mut self, now_ms: u64) -> u64 {
        let elapsed = self
            .previous_ms
            .map_or(0, |previous| now_ms.saturating_sub(previous));
        self.previous_ms = Some(now_ms);
        self.lag_ms += elapsed;
        elapsed
    }

    /// Takes one step out of the lag if a whole step is pending
    ///
    /// `updates_this_frame` is how many steps already ran this frame. Once it
    /// reaches the cap, the remaining whole steps are dropped.
    pub fn consume_step(&mut self, updates_this_frame: u32) -> bool {
        if self.lag_ms < self.step_ms {
            return false;
        }

        if let Some(max) = self.max_updates
            && updates_this_frame >= max
        {
            let dropped = self.lag_ms / self.step_ms;
            self.lag_ms %= self.step_ms;
            warn!(
                dropped_steps = dropped,
                max_updates = max,
                "Simulation fell behind, dropping steps"
            );
            return false;
        }

        self.lag_ms -= self.step_ms;
        true
    }

    /// Fraction of the next step already elapsed, in [0, 1)
    pub fn extrapolation(&self) -> f32 {
        self.lag_ms as f32 / self.step_ms as f32
    }
}
