//! Deterministic simulation module
//!
//! All physics lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No threading or platform dependencies

pub mod body;
pub mod collision;
pub mod tick;
pub mod world;

pub use body::{BodyDesc, BodyError, PhysicsConfig, RigidBody2D, StepOutcome};
pub use collision::{
    Bounds, CollisionResult, Walls, ball_ceiling_collision, ball_ground_collision,
    ball_wall_collision, bounce_velocity,
};
pub use tick::{run_ticks, tick};
pub use world::{Ball, ScatterSpec, SimEvent, World};
