//! Bounce Engine entry point
//!
//! Drops a seeded batch of balls into the arena, drives them with the
//! fixed-step loop for a while and prints the final world as JSON.
//!
//! Usage: `bounce-engine [settings.json]` (log level via `RUST_LOG`)

use std::thread;

use anyhow::Context;

use bounce_engine::sim::{SimEvent, World, tick};
use bounce_engine::{FixedStepLoop, LoopHooks, Settings};

/// Loop hooks owning the simulated world
struct Demo {
    world: World,
    frames: u64,
    report_every: u32,
}

impl LoopHooks for Demo {
    fn update(&mut self, dt: f32) {
        tick(&mut self.world, dt);
        for event in self.world.drain_events() {
            match event {
                SimEvent::CameToRest { id } => log::info!("Ball {id} came to rest"),
                other => log::trace!("{other:?}"),
            }
        }
    }

    fn render(&mut self, _alpha: f32) {
        self.frames += 1;
        if self.report_every == 0 || self.frames % u64::from(self.report_every) != 0 {
            return;
        }
        log::info!(
            "tick {}: {}/{} balls resting, energy {:.2}",
            self.world.time_ticks,
            self.world.resting_count(),
            self.world.balls.len(),
            self.world.total_energy()
        );
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Bounce Engine (native) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&path).with_context(|| format!("loading settings from {path}"))?,
        None => {
            log::info!("No settings file given, using defaults");
            Settings::default()
        }
    };

    let mut world = World::new(settings.physics, settings.bounds).context("building world")?;
    world
        .scatter(&settings.scene.scatter)
        .context("scattering balls")?;
    log::info!(
        "Scene ready: {} balls, seed {:#x}",
        world.balls.len(),
        settings.scene.scatter.seed
    );

    let demo = Demo {
        world,
        frames: 0,
        report_every: settings.scene.report_every_frames,
    };
    let run_time = settings.scene.duration()?;
    let mut game_loop = FixedStepLoop::new(demo, settings.timing)?;
    game_loop.start()?;
    thread::sleep(run_time);
    game_loop.stop()?;

    let stats = game_loop.stats();
    log::info!(
        "Ran {} frames, {} updates ({} dropped)",
        stats.frames,
        stats.updates,
        stats.dropped_updates
    );

    let demo = game_loop.into_hooks()?;
    println!("{}", serde_json::to_string_pretty(&demo.world)?);
    Ok(())
}
