//! Bounce Engine - 2D ball physics driven by a fixed-timestep loop
//!
//! Core modules:
//! - `sim`: Deterministic simulation (rigid bodies, boundary collisions, world stepping)
//! - `platform`: Wall-clock driven fixed-timestep loop on a worker thread
//! - `settings`: Data-driven physics and timing configuration

pub mod platform;
pub mod settings;
pub mod sim;

pub use platform::{FixedStepLoop, FnHooks, LoopConfig, LoopError, LoopHooks, LoopStats};
pub use settings::{SceneSettings, Settings, SettingsError};
pub use sim::{BodyDesc, BodyError, Bounds, PhysicsConfig, RigidBody2D, StepOutcome, World};

/// Engine configuration constants
pub mod consts {
    /// Default simulation rate
    pub const SIM_HZ: f64 = 120.0;
    /// Fixed simulation timestep matching `SIM_HZ`
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Standard gravity (units/s², pointing down)
    pub const STANDARD_GRAVITY: f32 = 9.81;
    /// Velocity components below `scale * g * dt` snap to zero on contact
    pub const REST_THRESHOLD_SCALE: f32 = 1.0;
    /// Speeds below this produce no drag (avoids normalizing a zero vector)
    pub const MIN_DRAG_SPEED: f32 = 1e-6;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 1.0;
    pub const BALL_MASS: f32 = 1.0;
    pub const BALL_RESTITUTION: f32 = 0.7;
    pub const BALL_FRICTION: f32 = 0.05;
}

/// Clamp a coefficient into [0, 1]
#[inline]
pub fn clamp_unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Zero out a velocity component whose magnitude is below `threshold`
#[inline]
pub fn snap_to_zero(value: f32, threshold: f32) -> f32 {
    if value.abs() < threshold { 0.0 } else { value }
}
