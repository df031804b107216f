//! Drives a real world through the threaded fixed-step loop

use std::thread;
use std::time::Duration;

use bounce_engine::sim::{ScatterSpec, World, tick};
use bounce_engine::{Bounds, FixedStepLoop, LoopConfig, LoopHooks, PhysicsConfig};

struct WorldHooks {
    world: World,
    renders: u64,
}

impl LoopHooks for WorldHooks {
    fn update(&mut self, dt: f32) {
        tick(&mut self.world, dt);
    }

    fn render(&mut self, _alpha: f32) {
        self.renders += 1;
    }
}

fn scattered_world() -> World {
    let mut world = World::new(PhysicsConfig::default(), Bounds::boxed(-10.0, 10.0, 0.0, 20.0))
        .unwrap();
    world
        .scatter(&ScatterSpec {
            count: 10,
            ..Default::default()
        })
        .unwrap();
    world
}

#[test]
fn loop_advances_world_in_fixed_steps() {
    let hooks = WorldHooks {
        world: scattered_world(),
        renders: 0,
    };
    let mut game_loop = FixedStepLoop::new(hooks, LoopConfig::new(240.0)).unwrap();
    game_loop.start().unwrap();
    thread::sleep(Duration::from_millis(250));
    game_loop.stop().unwrap();

    let stats = game_loop.stats();
    let hooks = game_loop.into_hooks().unwrap();
    assert_eq!(hooks.world.time_ticks, stats.updates);
    assert_eq!(hooks.renders, stats.frames);
    assert!(stats.updates > 0);
}

#[test]
fn threaded_run_matches_direct_stepping() {
    let hooks = WorldHooks {
        world: scattered_world(),
        renders: 0,
    };
    let config = LoopConfig::new(500.0);
    let dt = config.interval().unwrap().as_secs_f32();
    let mut game_loop = FixedStepLoop::new(hooks, config).unwrap();
    game_loop.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    let hooks = game_loop.into_hooks().unwrap();

    // Same seed, same number of ticks on this thread
    let mut direct = scattered_world();
    for _ in 0..hooks.world.time_ticks {
        tick(&mut direct, dt);
    }
    for (a, b) in hooks.world.balls.iter().zip(&direct.balls) {
        assert_eq!(a.body, b.body);
    }
}

#[test]
fn immediate_stop_does_not_deadlock() {
    for _ in 0..50 {
        let hooks = WorldHooks {
            world: scattered_world(),
            renders: 0,
        };
        let mut game_loop = FixedStepLoop::new(hooks, LoopConfig::default()).unwrap();
        game_loop.start().unwrap();
        game_loop.stop().unwrap();
        assert!(!game_loop.is_running());
    }
}
