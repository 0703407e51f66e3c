use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::debug;

use lantern_runtime::engine::EngineContext;
use lantern_runtime::timer::ManualClock;
use lantern_runtime::{
    contact_side, ContactSide, Engine, EngineConfig, FrameTimer, RateMonitor, Rect, Settings,
    SpatialIndex, State, Transition,
};

const FIELD: Rect = Rect {
    pos: Vec2::new(0.0, 0.0),
    size: Vec2::new(256.0, 224.0),
};
const BLOCK_SIZE: Vec2 = Vec2::new(16.0, 16.0);

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let config = match &options.config {
        Some(path) => {
            let mut settings = Settings::load(path)
                .with_context(|| format!("failed to load settings from {path}"))?;
            EngineConfig::from_settings(&mut settings)
        }
        None => EngineConfig::default(),
    };

    println!(
        "Lantern demo: {} blocks in {}x{} field, physics {} Hz, graphics {} Hz",
        options.blocks, FIELD.size.x, FIELD.size.y, config.physics_hz, config.graphics_hz
    );

    // The demo is headless, so the clock is stepped by the simulation
    // itself instead of wall time and the run completes immediately.
    let clock = ManualClock::new();
    let graphics_interval = interval_for(config.graphics_hz);
    let mut engine = Engine::with_timers(
        FrameTimer::new_accumulating(clock.clone(), interval_for(config.physics_hz)),
        FrameTimer::new(clock.clone(), graphics_interval),
    );

    engine.set_throttled(false);

    let stats = Arc::new(DemoStats::default());
    engine.push(Box::new(DemoState::new(
        clock,
        graphics_interval.max(1),
        &options,
        Arc::clone(&stats),
    )));
    engine.run()?;

    let ctx = engine.context();
    println!(
        "Simulated {} physics frames ({} graphics frames)",
        ctx.physics_frames(),
        ctx.graphics_frames()
    );
    println!("Physics rate: {} fps", stats.fps.load(Ordering::Relaxed));
    println!(
        "Collisions resolved: {}",
        stats.collisions.load(Ordering::Relaxed)
    );
    Ok(())
}

#[derive(Default)]
struct DemoStats {
    collisions: AtomicU64,
    fps: AtomicU64,
}

struct Block {
    rect: Rect,
    velocity: Vec2,
}

impl Block {
    fn step(&mut self) {
        self.rect = self.rect.translate(self.velocity);
        if self.rect.pos.x < FIELD.pos.x || self.rect.right() > FIELD.right() {
            self.velocity.x = -self.velocity.x;
        }
        if self.rect.pos.y < FIELD.pos.y || self.rect.bottom() > FIELD.bottom() {
            self.velocity.y = -self.velocity.y;
        }
    }
}

struct DemoState {
    clock: ManualClock,
    step: u64,
    blocks: Vec<Block>,
    index: SpatialIndex<usize>,
    monitor: Option<RateMonitor>,
    frame_limit: u64,
    stats: Arc<DemoStats>,
}

impl DemoState {
    fn new(clock: ManualClock, step: u64, options: &CliOptions, stats: Arc<DemoStats>) -> Self {
        let mut rng = Lcg::new(options.seed);
        let blocks = (0..options.blocks)
            .map(|_| {
                let x = rng.next_f32() * (FIELD.size.x - BLOCK_SIZE.x);
                let y = rng.next_f32() * (FIELD.size.y - BLOCK_SIZE.y);
                let vx = rng.next_f32() * 3.0 - 1.5;
                let vy = rng.next_f32() * 3.0 - 1.5;
                Block {
                    rect: Rect {
                        pos: Vec2::new(x, y),
                        size: BLOCK_SIZE,
                    },
                    velocity: Vec2::new(vx, vy),
                }
            })
            .collect();
        Self {
            clock,
            step,
            blocks,
            index: SpatialIndex::new(FIELD),
            monitor: None,
            frame_limit: options.frames,
            stats,
        }
    }

    fn resolve_collisions(&mut self) {
        self.index.clear();
        for (id, block) in self.blocks.iter().enumerate() {
            self.index.insert(id, block.rect);
        }

        let mut contacts = Vec::new();
        for (id, block) in self.blocks.iter().enumerate() {
            for entry in self.index.retrieve(&block.rect) {
                // Broad-phase candidates need the exact test; count
                // each pair once.
                if entry.payload > id {
                    if let Some(side) = contact_side(&block.rect, &entry.rect) {
                        contacts.push((id, entry.payload, side));
                    }
                }
            }
        }

        for (a, b, side) in contacts {
            match side {
                ContactSide::Left | ContactSide::Right => {
                    self.blocks[a].velocity.x = -self.blocks[a].velocity.x;
                    self.blocks[b].velocity.x = -self.blocks[b].velocity.x;
                }
                ContactSide::Top | ContactSide::Bottom => {
                    self.blocks[a].velocity.y = -self.blocks[a].velocity.y;
                    self.blocks[b].velocity.y = -self.blocks[b].velocity.y;
                }
            }
            self.stats.collisions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl State for DemoState {
    fn start(&mut self, ctx: &mut EngineContext) {
        // One report per simulated second against the physics rate.
        self.monitor = Some(RateMonitor::new(
            FrameTimer::new(self.clock.clone(), 1000),
            ctx.physics_timer().counter(),
        ));
    }

    fn poll(&mut self, _ctx: &mut EngineContext) -> Transition {
        self.clock.advance(self.step);
        Transition::Continue
    }

    fn update(&mut self, ctx: &mut EngineContext) -> Transition {
        for block in &mut self.blocks {
            block.step();
        }
        self.resolve_collisions();

        if ctx.physics_frames() >= self.frame_limit {
            Transition::Pop
        } else {
            Transition::Continue
        }
    }

    fn paint(&mut self, _ctx: &mut EngineContext) {
        if let Some(monitor) = &mut self.monitor {
            monitor.update();
            let fps = monitor.fps();
            self.stats.fps.store(fps, Ordering::Relaxed);
            debug!("physics rate: {fps} fps");
        }
    }
}

/// Deterministic linear congruential generator so demo runs are
/// reproducible from the seed alone.
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407))
    }

    fn next_f32(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as f32) / ((1u64 << 31) as f32)
    }
}

fn interval_for(hz: u32) -> u64 {
    if hz == 0 {
        0
    } else {
        (1000 / hz) as u64
    }
}

struct CliOptions {
    blocks: usize,
    frames: u64,
    seed: u64,
    config: Option<String>,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut options = Self {
            blocks: 32,
            frames: 240,
            seed: 7,
            config: None,
        };
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("missing value for {name}"))
            };
            match arg.as_str() {
                "--blocks" => options.blocks = value("--blocks")?.parse().context("--blocks")?,
                "--frames" => options.frames = value("--frames")?.parse().context("--frames")?,
                "--seed" => options.seed = value("--seed")?.parse().context("--seed")?,
                "--config" => options.config = Some(value("--config")?),
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Usage: lantern-runtime \
                         [--blocks N] [--frames N] [--seed N] [--config settings.json]"
                    ));
                }
            }
        }
        Ok(options)
    }
}
