//! Drift-correcting frame timers.
//!
//! A [`FrameTimer`] converts a monotonically increasing tick counter
//! into discrete frame events at a target interval. Two policies are
//! supported when a frame fires late: drop-and-resync, which simply
//! schedules the next boundary one interval out (suits rendering), and
//! accumulation, which carries the scheduling error forward as debt so
//! the caller can drain several fixed steps per real-time frame (suits
//! physics). Timers may also be derived from another timer's frame
//! count, ticking in lockstep with it instead of with a wall clock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Capability supplying the current tick count.
///
/// The count must be monotonically non-decreasing during normal
/// operation; a single instantaneous decrease is treated as source
/// wraparound and recovered from by re-anchoring.
pub trait Clock {
    fn ticks(&self) -> u64;
}

impl<F: Fn() -> u64> Clock for F {
    fn ticks(&self) -> u64 {
        self()
    }
}

/// Wall clock counting milliseconds since its construction.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn ticks(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock for headless simulations and tests.
///
/// Clones share the same underlying counter, so a copy can drive the
/// timers while another is stepped by the simulation.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ticks: u64) {
        self.0.fetch_add(ticks, Ordering::Relaxed);
    }

    pub fn set(&self, ticks: u64) {
        self.0.store(ticks, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn ticks(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Shared, read-only view of a timer's completed frame count.
///
/// Doubles as a [`Clock`], which is how derived timers observe their
/// source without owning it.
#[derive(Debug, Clone)]
pub struct FrameCounter(Arc<AtomicU64>);

impl FrameCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Clock for FrameCounter {
    fn ticks(&self) -> u64 {
        self.get()
    }
}

/// Produces discrete frame events at a target tick interval.
///
/// Timers are created paused; call [`start`](Self::start) before
/// polling [`update`](Self::update). An interval of zero disables
/// firing entirely.
pub struct FrameTimer {
    clock: Box<dyn Clock>,
    interval: u64,
    accumulate: bool,
    paused: bool,
    t0: u64,
    t1: u64,
    t2: u64,
    tacc: u64,
    frames: Arc<AtomicU64>,
}

impl FrameTimer {
    /// Creates a drop-and-resync timer: a late frame does not owe time
    /// back, the next boundary is simply one interval after it fired.
    pub fn new(clock: impl Clock + 'static, interval: u64) -> Self {
        Self::with_policy(Box::new(clock), interval, false)
    }

    /// Creates an accumulating timer: scheduling error is carried
    /// forward as debt and repaid by shrinking subsequent frame
    /// windows, firing back-to-back while more than one interval of
    /// debt is outstanding.
    pub fn new_accumulating(clock: impl Clock + 'static, interval: u64) -> Self {
        Self::with_policy(Box::new(clock), interval, true)
    }

    fn with_policy(clock: Box<dyn Clock>, interval: u64, accumulate: bool) -> Self {
        Self {
            clock,
            interval,
            accumulate,
            paused: true,
            t0: 0,
            t1: 0,
            t2: 0,
            tacc: 0,
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Resumes frame production, re-anchoring the frame window to "now"
    /// while preserving the phase offset observed before the pause.
    pub fn start(&mut self) {
        let now = self.clock.ticks();
        self.anchor(now);
        self.paused = false;
    }

    /// Halts frame production until the next `start`.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Zeroes the frame count and restarts the current frame window.
    /// Does not affect the paused state.
    pub fn reset(&mut self) {
        let now = self.clock.ticks();
        self.t0 = now;
        self.t1 = now;
        self.t2 = now + self.interval;
        self.tacc = 0;
        self.frames.store(0, Ordering::Relaxed);
    }

    /// Changes the target interval. Implies a `reset`.
    pub fn set_interval(&mut self, interval: u64) {
        self.interval = interval;
        self.reset();
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Polls the timer, returning `true` when a frame has elapsed.
    pub fn update(&mut self) -> bool {
        self.update_with_error().is_some()
    }

    /// Polls the timer, returning the scheduling error (how late the
    /// frame fired relative to its boundary) when a frame has elapsed.
    pub fn update_with_error(&mut self) -> Option<u64> {
        if self.paused || self.interval == 0 {
            return None;
        }

        let mut now = self.clock.ticks();
        if now < self.t0 {
            // The clock source has wrapped; re-anchor and retry once.
            self.anchor(now);
            now = self.clock.ticks();
            if now < self.t0 {
                return None;
            }
        }

        self.t1 = now;
        if self.t1 < self.t2 {
            return None;
        }

        let error = self.t1 - self.t2;
        self.t0 = now;
        self.t1 = now;
        self.frames.fetch_add(1, Ordering::Relaxed);

        if self.accumulate {
            // Retire at most one interval of carried debt, then take on
            // the new error. While more than one interval is still
            // owed, the next boundary is immediate so the caller can
            // drain catch-up frames in a tight loop.
            self.tacc = self.tacc.saturating_sub(self.interval) + error;
            if self.tacc > self.interval {
                self.t2 = self.t1;
            } else {
                self.t2 = self.t0 + (self.interval - self.tacc);
            }
        } else {
            self.t2 = self.t0 + self.interval;
        }

        Some(error)
    }

    /// Number of frame windows completed since the last `reset`.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// A shared handle to this timer's frame count.
    pub fn counter(&self) -> FrameCounter {
        FrameCounter(Arc::clone(&self.frames))
    }

    /// The most recently sampled tick value.
    pub fn time(&self) -> u64 {
        self.t1
    }

    /// Ticks remaining until the next frame boundary, or zero if "now"
    /// already falls outside the current frame window.
    pub fn wait_time(&self) -> u64 {
        let now = self.clock.ticks();
        if now < self.t0 || now >= self.t0 + self.interval {
            0
        } else {
            self.t0 + self.interval - now
        }
    }

    /// Builds a timer that ticks once per `interval` completed frames
    /// of this timer, immune to wall-clock jitter.
    pub fn derived(&self, interval: u64) -> FrameTimer {
        FrameTimer::new(self.counter(), interval)
    }

    /// Accumulating variant of [`derived`](Self::derived).
    pub fn derived_accumulating(&self, interval: u64) -> FrameTimer {
        FrameTimer::new_accumulating(self.counter(), interval)
    }

    fn anchor(&mut self, now: u64) {
        let phase = self.t1.saturating_sub(self.t0);
        self.t0 = now;
        self.t1 = now + phase;
        self.t2 = now + self.interval;
    }
}

impl fmt::Debug for FrameTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameTimer")
            .field("interval", &self.interval)
            .field("accumulate", &self.accumulate)
            .field("paused", &self.paused)
            .field("frames", &self.frames())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_or_zero_interval_timers_never_fire() {
        let clock = ManualClock::new();
        let mut timer = FrameTimer::new(clock.clone(), 10);
        clock.advance(100);
        assert!(!timer.update(), "still paused");

        let mut disabled = FrameTimer::new(clock.clone(), 0);
        disabled.start();
        clock.advance(100);
        assert!(!disabled.update());
        assert_eq!(disabled.frames(), 0);
    }

    #[test]
    fn fires_once_per_interval() {
        let clock = ManualClock::new();
        let mut timer = FrameTimer::new(clock.clone(), 10);
        timer.start();

        let mut fired = 0;
        for _ in 0..100 {
            clock.advance(1);
            if timer.update() {
                fired += 1;
            }
        }
        assert_eq!(fired, 10);
        assert_eq!(timer.frames(), 10);
    }

    #[test]
    fn drop_mode_resyncs_after_a_late_frame() {
        let clock = ManualClock::new();
        let mut timer = FrameTimer::new(clock.clone(), 10);
        timer.start();

        clock.advance(25);
        assert_eq!(timer.update_with_error(), Some(15));
        // Late time is dropped: the next boundary is a full interval
        // out, and no catch-up frame is owed.
        assert!(!timer.update());
        clock.advance(9);
        assert!(!timer.update());
        clock.advance(1);
        assert_eq!(timer.update_with_error(), Some(0));
    }

    #[test]
    fn drop_mode_average_error_stays_below_one_tick() {
        // Drive intervals for 15/30/60/120 frames per 1000-tick window
        // with a clock advancing 1 tick per poll; scheduling error must
        // not build up over the run.
        for fps in [15u64, 30, 60, 120] {
            let interval = 1000 / fps;
            let clock = ManualClock::new();
            let mut timer = FrameTimer::new(clock.clone(), interval);
            timer.start();

            let mut total_error = 0u64;
            let mut fired = 0u64;
            while fired < 100 {
                clock.advance(1);
                if let Some(error) = timer.update_with_error() {
                    total_error += error;
                    fired += 1;
                }
            }
            assert!(
                (total_error as f64 / fired as f64) < 1.0,
                "avg error too high at {fps} fps"
            );
        }
    }

    #[test]
    fn update_holds_the_window_invariants() {
        let clock = ManualClock::new();
        let mut timer = FrameTimer::new(clock.clone(), 7);
        timer.start();

        for step in 1..=50u64 {
            clock.advance(step % 5);
            if timer.update() {
                // After a successful update the window re-anchors.
                assert_eq!(timer.time(), clock.ticks());
                assert!(timer.wait_time() <= 7);
            }
        }
    }

    #[test]
    fn wraparound_reanchors_without_losing_frames() {
        let clock = ManualClock::new();
        clock.set(1_000_000);
        let mut timer = FrameTimer::new(clock.clone(), 10);
        timer.start();

        clock.advance(10);
        assert!(timer.update());
        let frames_before = timer.frames();

        // Clock source wraps back near zero.
        clock.set(3);
        assert!(!timer.update(), "wrap itself produces no frame");
        assert_eq!(timer.frames(), frames_before);

        // Frame production resumes against the new epoch.
        clock.advance(10);
        assert!(timer.update());
        assert_eq!(timer.frames(), frames_before + 1);
    }

    #[test]
    fn accumulating_timer_drains_owed_frames() {
        let clock = ManualClock::new();
        let mut timer = FrameTimer::new_accumulating(clock.clone(), 10);
        timer.start();

        // A stall of three intervals is repaid as a burst of catch-up
        // frames when polled in a drain loop.
        clock.advance(30);
        let mut fired = 0;
        while timer.update() {
            fired += 1;
        }
        assert!(fired >= 2 && fired <= 3, "drained {fired} frames");

        // Post-drain debt is bounded below one interval, so steady
        // ticking resumes at the target rate.
        clock.advance(10);
        let mut steady = 0;
        while timer.update() {
            steady += 1;
        }
        assert_eq!(steady, 1);
    }

    #[test]
    fn accumulation_keeps_long_run_frame_count_on_schedule() {
        let clock = ManualClock::new();
        let mut timer = FrameTimer::new_accumulating(clock.clone(), 10);
        timer.start();

        // Jittered polling: alternate early and late polls. The total
        // frame count must track elapsed time, not poll luck.
        let mut elapsed = 0u64;
        for step in 0..200u64 {
            let jump = 4 + (step * 7) % 13;
            clock.advance(jump);
            elapsed += jump;
            while timer.update() {}
        }
        let expected = elapsed / 10;
        let frames = timer.frames();
        assert!(
            frames + 2 >= expected && frames <= expected + 2,
            "{frames} frames after {elapsed} ticks"
        );
    }

    #[test]
    fn reset_zeroes_frames_and_keeps_pause_state() {
        let clock = ManualClock::new();
        let mut timer = FrameTimer::new(clock.clone(), 10);
        timer.start();
        clock.advance(35);
        while timer.update() {}
        assert!(timer.frames() > 0);

        timer.reset();
        assert_eq!(timer.frames(), 0);
        assert!(!timer.is_paused());
        clock.advance(10);
        assert!(timer.update());
    }

    #[test]
    fn set_interval_implies_reset() {
        let clock = ManualClock::new();
        let mut timer = FrameTimer::new(clock.clone(), 10);
        timer.start();
        clock.advance(10);
        assert!(timer.update());

        timer.set_interval(3);
        assert_eq!(timer.frames(), 0);
        assert_eq!(timer.interval(), 3);
        clock.advance(3);
        assert!(timer.update());
    }

    #[test]
    fn pause_preserves_phase_across_start() {
        let clock = ManualClock::new();
        let mut timer = FrameTimer::new(clock.clone(), 10);
        timer.start();

        // Partway through a window, pause, let wall time pass, resume.
        clock.advance(4);
        assert!(!timer.update());
        timer.pause();
        clock.advance(1000);
        timer.start();

        // The 4 ticks of accrued phase carry over into the sampled
        // time, while the window itself restarts at full length.
        assert_eq!(timer.time(), clock.ticks() + 4);
        clock.advance(9);
        assert!(!timer.update());
        clock.advance(1);
        assert!(timer.update());
    }

    #[test]
    fn wait_time_counts_down_within_the_window() {
        let clock = ManualClock::new();
        let mut timer = FrameTimer::new(clock.clone(), 10);
        timer.start();
        assert_eq!(timer.wait_time(), 10);
        clock.advance(4);
        assert_eq!(timer.wait_time(), 6);
        clock.advance(6);
        assert_eq!(timer.wait_time(), 0, "boundary reached");
    }

    #[test]
    fn derived_timer_ticks_on_source_frames() {
        let clock = ManualClock::new();
        let mut source = FrameTimer::new(clock.clone(), 10);
        let mut derived = source.derived(3);
        source.start();
        derived.start();

        let mut derived_fired = 0;
        for _ in 0..90 {
            clock.advance(1);
            source.update();
            if derived.update() {
                derived_fired += 1;
            }
        }
        // 9 source frames over 90 ticks, one derived frame per 3.
        assert_eq!(source.frames(), 9);
        assert_eq!(derived_fired, 3);
    }
}
