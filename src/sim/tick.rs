//! Fixed timestep simulation tick
//!
//! Advances every ball in the world deterministically.

use super::world::{SimEvent, World};

/// Advance the world by one fixed timestep
pub fn tick(world: &mut World, dt: f32) {
    if !(dt > 0.0 && dt.is_finite()) {
        return;
    }

    world.time_ticks += 1;

    let threshold = world.physics.rest_threshold(dt);
    for ball in &mut world.balls {
        let outcome = ball.body.advance(dt);
        let was_resting = ball.resting;
        ball.resting = ball.body.is_resting();

        // A resting ball "lands" every tick at speed g*dt; only report real bounces
        if let Some(impact_speed) = outcome.ground_impact {
            if !ball.resting && impact_speed > threshold {
                world.events.push(SimEvent::Bounced {
                    id: ball.id,
                    impact_speed,
                });
            }
        }
        for impact_speed in [outcome.wall_impact, outcome.ceiling_impact]
            .into_iter()
            .flatten()
        {
            world.events.push(SimEvent::HitBoundary {
                id: ball.id,
                impact_speed,
            });
        }

        if ball.resting && !was_resting {
            world.events.push(SimEvent::CameToRest { id: ball.id });
        }
    }

    // Ensure deterministic ordering
    world.normalize_order();
}

/// Run `steps` ticks back to back
pub fn run_ticks(world: &mut World, dt: f32, steps: u32) {
    for _ in 0..steps {
        tick(world, dt);
    }
}
