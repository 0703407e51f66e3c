//! Core modules for the Lantern engine, rewritten in Rust.
//!
//! The crate exposes the timing and broad-phase collision building
//! blocks a real-time simulation needs regardless of how it is
//! rendered: drift-correcting frame timers, a quadtree spatial index,
//! the geometric primitives backing it, and a small engine-loop shell
//! with an event bus and JSON settings. Rendering and platform
//! integration are intentionally kept outside of the crate so that the
//! code remains testable and easy to embed in headless tools.

pub mod collision;
pub mod diag;
pub mod engine;
pub mod event;
pub mod geometry;
pub mod settings;
pub mod spatial;
pub mod timer;

pub use collision::{contact_side, ContactSide};
pub use diag::RateMonitor;
pub use engine::{Engine, EngineConfig, EngineContext, State, Transition, QUIT_EVENT};
pub use event::{Event, EventBus, EventKind};
pub use geometry::{Line, Rect};
pub use settings::{Settings, SettingsError};
pub use spatial::{Entry, SpatialIndex};
pub use timer::{Clock, FrameCounter, FrameTimer, SystemClock};
