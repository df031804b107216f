//! Platform abstraction layer
//!
//! Handles wall-clock concerns the deterministic simulation stays out of:
//! - Frame pacing against real time
//! - The worker thread that drives update/render hooks

pub mod fixed_loop;

pub use fixed_loop::{FixedStepLoop, FnHooks, LoopConfig, LoopError, LoopHooks, LoopStats};
