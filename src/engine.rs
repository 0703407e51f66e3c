//! Skeleton for a game engine loop.
//!
//! The engine owns a stack of states, a pair of frame timers, and the
//! root event bus. Each loop iteration polls input-side events, drains
//! the accumulating physics timer (one `update` per owed step, so the
//! simulation never falls permanently behind wall time), polls the
//! graphics timer at most once, then sleeps off the remainder of the
//! render window. Rendering itself is left to the states; the engine is
//! fully headless.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::event::EventBus;
use crate::settings::Settings;
use crate::timer::{Clock, FrameTimer, SystemClock};

/// Event name that tears down the whole state stack.
pub const QUIT_EVENT: &str = "engine::quit";

/// Timer rates for the engine loop, in frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_physics_hz")]
    pub physics_hz: u32,
    #[serde(default = "default_graphics_hz")]
    pub graphics_hz: u32,
}

fn default_physics_hz() -> u32 {
    100
}

fn default_graphics_hz() -> u32 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            physics_hz: default_physics_hz(),
            graphics_hz: default_graphics_hz(),
        }
    }
}

impl EngineConfig {
    /// Reads the config from settings, writing defaults back for any
    /// missing keys.
    pub fn from_settings(settings: &mut Settings) -> Self {
        Self {
            physics_hz: settings.get_or("engine/physics_hz", default_physics_hz()),
            graphics_hz: settings.get_or("engine/graphics_hz", default_graphics_hz()),
        }
    }
}

/// Engine services visible to states while they run.
pub struct EngineContext {
    pub bus: EventBus,
    physics: FrameTimer,
    graphics: FrameTimer,
}

impl EngineContext {
    pub fn physics_frames(&self) -> u64 {
        self.physics.frames()
    }

    pub fn graphics_frames(&self) -> u64 {
        self.graphics.frames()
    }

    /// The physics timer, for deriving frame-locked timers or rate
    /// monitor handles.
    pub fn physics_timer(&self) -> &FrameTimer {
        &self.physics
    }

    pub fn graphics_timer(&self) -> &FrameTimer {
        &self.graphics
    }
}

/// Requested change to the state stack after a state callback.
pub enum Transition {
    Continue,
    Push(Box<dyn State>),
    Pop,
    Quit,
}

/// A screen of the application: title, gameplay, pause, editor.
pub trait State {
    /// Called once when the state is pushed onto the stack.
    fn start(&mut self, _ctx: &mut EngineContext) {}

    /// Called once per loop iteration, before timers are polled.
    /// Input feeding belongs here.
    fn poll(&mut self, _ctx: &mut EngineContext) -> Transition {
        Transition::Continue
    }

    /// Called once per elapsed physics frame.
    fn update(&mut self, ctx: &mut EngineContext) -> Transition;

    /// Called once per elapsed graphics frame.
    fn paint(&mut self, _ctx: &mut EngineContext) {}
}

pub struct Engine {
    ctx: EngineContext,
    states: Vec<Box<dyn State>>,
    quit: Arc<AtomicBool>,
    throttle: bool,
}

impl Engine {
    /// Creates an engine with wall-clock timers at the configured
    /// rates. The physics timer accumulates; the graphics timer drops
    /// late frames.
    pub fn new(config: EngineConfig) -> Self {
        let clock = Arc::new(SystemClock::new());
        let physics_clock = Arc::clone(&clock);
        let graphics_clock = clock;
        Self::with_timers(
            FrameTimer::new_accumulating(
                move || physics_clock.ticks(),
                interval_for(config.physics_hz),
            ),
            FrameTimer::new(
                move || graphics_clock.ticks(),
                interval_for(config.graphics_hz),
            ),
        )
    }

    /// Creates an engine around explicit timers. Used by tests and by
    /// consumers that tick from something other than wall time.
    pub fn with_timers(physics: FrameTimer, graphics: FrameTimer) -> Self {
        let bus = EventBus::new();
        let quit = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&quit);
        bus.subscribe(QUIT_EVENT, move |_| {
            flag.store(true, Ordering::Relaxed);
        });
        Self {
            ctx: EngineContext {
                bus,
                physics,
                graphics,
            },
            states: Vec::new(),
            quit,
            throttle: true,
        }
    }

    /// Disables sleeping off the remainder of the render window.
    /// Headless consumers driving a [`crate::timer::ManualClock`] run
    /// as fast as the simulation allows.
    pub fn set_throttled(&mut self, throttle: bool) {
        self.throttle = throttle;
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Pushes a state onto the stack and runs its `start` hook.
    pub fn push(&mut self, mut state: Box<dyn State>) {
        state.start(&mut self.ctx);
        self.states.push(state);
    }

    /// Runs the loop until the state stack empties.
    pub fn run(&mut self) -> Result<()> {
        if self.states.is_empty() {
            bail!("no initial state was defined");
        }

        self.ctx.physics.start();
        self.ctx.graphics.start();
        info!(
            "engine loop starting: physics interval {} ticks, graphics interval {} ticks",
            self.ctx.physics.interval(),
            self.ctx.graphics.interval()
        );

        while !self.states.is_empty() {
            self.ctx.bus.process();
            if self.quit.swap(false, Ordering::Relaxed) {
                debug!("quit event received, tearing down {} state(s)", self.states.len());
                self.states.clear();
                break;
            }

            let transition = self.step();
            match transition {
                Transition::Continue => {}
                Transition::Push(state) => self.push(state),
                Transition::Pop => {
                    self.states.pop();
                }
                Transition::Quit => self.states.clear(),
            }

            if self.throttle && !self.states.is_empty() {
                let wait = self.ctx.graphics.wait_time();
                if wait > 0 {
                    thread::sleep(Duration::from_millis(wait));
                }
            }
        }

        info!(
            "engine loop finished after {} physics / {} graphics frames",
            self.ctx.physics_frames(),
            self.ctx.graphics_frames()
        );
        Ok(())
    }

    /// One loop iteration against the current top state.
    fn step(&mut self) -> Transition {
        let mut state = match self.states.pop() {
            Some(state) => state,
            None => return Transition::Continue,
        };

        let mut transition = state.poll(&mut self.ctx);

        // Drain every owed physics step; stop early if the state asked
        // to leave the stack.
        while matches!(transition, Transition::Continue) && self.ctx.physics.update() {
            transition = state.update(&mut self.ctx);
        }

        if self.ctx.graphics.update() {
            state.paint(&mut self.ctx);
        }

        self.states.push(state);
        transition
    }
}

fn interval_for(hz: u32) -> u64 {
    if hz == 0 {
        0
    } else {
        (1000 / hz) as u64
    }
}
