//! Diagnostic helpers for observing timers.

use crate::timer::{FrameCounter, FrameTimer};

/// Computes frames-per-second for a monitored timer.
///
/// Holds a reporting timer (typically one second per tick) and a
/// [`FrameCounter`] handle of the timer being observed; each time the
/// reporting timer fires, the fps becomes the number of frames the
/// monitored timer completed since the previous report.
#[derive(Debug)]
pub struct RateMonitor {
    monitor: FrameTimer,
    observed: FrameCounter,
    fps: u64,
    prev_frames: u64,
}

impl RateMonitor {
    /// Creates a monitor and starts its reporting timer.
    pub fn new(mut monitor: FrameTimer, observed: FrameCounter) -> Self {
        monitor.start();
        Self {
            monitor,
            observed,
            fps: 0,
            prev_frames: 0,
        }
    }

    /// Polls the reporting timer and recomputes the rate if it fired.
    pub fn update(&mut self) {
        if self.monitor.update() {
            let frames = self.observed.get();
            self.fps = frames - self.prev_frames;
            self.prev_frames = frames;
        }
    }

    /// The most recently computed rate. Before the first full reporting
    /// window elapses this falls back to the raw observed frame count.
    pub fn fps(&self) -> u64 {
        if self.fps == 0 {
            self.observed.get()
        } else {
            self.fps
        }
    }
}
