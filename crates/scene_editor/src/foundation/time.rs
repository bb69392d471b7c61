//! Frame timing

use std::time::{Duration, Instant};

/// Per-frame clock driven by the editor loop
#[derive(Debug, Clone)]
pub struct FrameClock {
    started: Instant,
    last_frame: Instant,
    delta: Duration,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock whose first frame starts now
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_frame: now,
            delta: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Advance to the next frame, returning the time since the previous one
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        self.delta = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.frame_count += 1;
        self.delta
    }

    /// Time between the two most recent ticks
    pub const fn delta(&self) -> Duration {
        self.delta
    }

    /// Number of ticks so far
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Time since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
