//! Fixed-interval game clock using an accumulator pattern.
//!
//! `draw_web()` calls at ~60fps with variable delta. TickClock turns that
//! into whole ticks of a fixed interval (one second for the game), so the
//! tick logic stays deterministic and testable.
//!
//! The per-frame delta is capped at one interval: after a stall (tab in the
//! background) at most one tick is emitted and the missed ones are dropped.

pub struct TickClock {
    /// Milliseconds per tick (1000 = one tick per second)
    interval_ms: f64,
    /// Accumulated milliseconds not yet consumed as ticks
    accumulator: f64,
    /// Total elapsed ticks since creation
    pub total_ticks: u64,
    /// Timestamp of the last update (ms), None before the first frame
    last_timestamp: Option<f64>,
}

impl TickClock {
    /// `interval_ms` of zero is treated as 1ms.
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: interval_ms.max(1) as f64,
            accumulator: 0.0,
            total_ticks: 0,
            last_timestamp: None,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Feed the wall-clock timestamp (from `performance.now()`).
    /// Returns how many ticks to run this frame: 0 or 1.
    pub fn update(&mut self, now_ms: f64) -> u32 {
        let delta = match self.last_timestamp {
            Some(prev) => (now_ms - prev).clamp(0.0, self.interval_ms),
            None => 0.0,
        };
        self.last_timestamp = Some(now_ms);

        self.accumulator += delta;
        let ticks = (self.accumulator / self.interval_ms) as u32;
        self.accumulator -= ticks as f64 * self.interval_ms;
        self.total_ticks += ticks as u64;
        ticks
    }
}
