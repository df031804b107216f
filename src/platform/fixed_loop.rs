//! Fixed timestep game loop on a dedicated worker thread
//!
//! Real elapsed time is accumulated and spent in whole `interval` slices on
//! [`LoopHooks::update`], then [`LoopHooks::render`] runs once per outer
//! iteration. What is left of the frame budget is slept away with
//! `park_timeout`, so [`FixedStepLoop::stop`] can cut the sleep short.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_SUBSTEPS, SIM_HZ};

/// Callbacks driven by a [`FixedStepLoop`]
///
/// Both run on the loop's worker thread, one at a time.
pub trait LoopHooks: Send + 'static {
    /// Advance state by one fixed step of `dt` seconds
    fn update(&mut self, dt: f32);

    /// Present the current state
    ///
    /// `alpha` in [0, 1] is how far real time has run past the last update,
    /// as a fraction of one step.
    fn render(&mut self, alpha: f32);
}

/// Adapter turning a pair of closures into [`LoopHooks`]
pub struct FnHooks<U, R> {
    update: U,
    render: R,
}

impl<U, R> FnHooks<U, R>
where
    U: FnMut(f32) + Send + 'static,
    R: FnMut(f32) + Send + 'static,
{
    pub fn new(update: U, render: R) -> Self {
        Self { update, render }
    }
}

impl<U, R> LoopHooks for FnHooks<U, R>
where
    U: FnMut(f32) + Send + 'static,
    R: FnMut(f32) + Send + 'static,
{
    fn update(&mut self, dt: f32) {
        (self.update)(dt)
    }

    fn render(&mut self, alpha: f32) {
        (self.render)(alpha)
    }
}

/// Loop pacing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Updates per second
    pub target_hz: f64,
    /// Most updates run per outer iteration; extra backlog is dropped.
    /// `None` catches up without limit.
    pub max_catch_up: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_hz: SIM_HZ,
            max_catch_up: Some(MAX_SUBSTEPS),
        }
    }
}

impl LoopConfig {
    pub fn new(target_hz: f64) -> Self {
        Self {
            target_hz,
            ..Default::default()
        }
    }

    /// Catch up on every missed step, however long that takes
    pub fn uncapped(target_hz: f64) -> Self {
        Self {
            target_hz,
            max_catch_up: None,
        }
    }

    /// Length of one fixed step
    pub fn interval(&self) -> Result<Duration, LoopError> {
        if !(self.target_hz.is_finite() && self.target_hz > 0.0) {
            return Err(LoopError::InvalidRate(self.target_hz));
        }
        match Duration::try_from_secs_f64(1.0 / self.target_hz) {
            Ok(interval) if !interval.is_zero() => Ok(interval),
            _ => Err(LoopError::InvalidRate(self.target_hz)),
        }
    }

    pub fn validate(&self) -> Result<(), LoopError> {
        self.interval()?;
        if self.max_catch_up == Some(0) {
            return Err(LoopError::ZeroCatchUp);
        }
        Ok(())
    }
}

/// Counters accumulated across every run of a loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Outer iterations (one render each)
    pub frames: u64,
    pub updates: u64,
    /// Steps discarded because the catch-up cap was reached
    pub dropped_updates: u64,
}

#[derive(Debug, Default)]
struct Counters {
    frames: AtomicU64,
    updates: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> LoopStats {
        LoopStats {
            frames: self.frames.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            dropped_updates: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Ways that running a loop can fail
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoopError {
    #[error("target rate must be a positive, finite frequency, got {0} Hz")]
    InvalidRate(f64),
    #[error("catch-up cap must allow at least one update per frame")]
    ZeroCatchUp,
    #[error("failed to spawn loop thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("loop thread panicked")]
    WorkerPanicked,
    #[error("loop hooks were lost to an earlier failure")]
    HooksLost,
}

enum LoopState<H> {
    /// Hooks are owned here, nothing is running
    Idle(H),
    /// Hooks live on the worker and come back through the join
    Running(JoinHandle<H>),
    /// Hooks were lost to a panic or spawn failure
    Failed,
}

/// Drives a [`LoopHooks`] implementation at a fixed rate on its own thread
///
/// Dropping a running loop stops it and joins the worker.
pub struct FixedStepLoop<H: LoopHooks> {
    config: LoopConfig,
    interval: Duration,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    state: LoopState<H>,
}

impl<H: LoopHooks> FixedStepLoop<H> {
    pub fn new(hooks: H, config: LoopConfig) -> Result<Self, LoopError> {
        config.validate()?;
        let interval = config.interval()?;
        Ok(Self {
            config,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::default(),
            state: LoopState::Idle(hooks),
        })
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Length of one fixed step
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the worker thread is live
    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running(_)) && self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> LoopStats {
        self.counters.snapshot()
    }

    /// The hooks, while the loop is stopped
    pub fn hooks(&self) -> Option<&H> {
        match &self.state {
            LoopState::Idle(hooks) => Some(hooks),
            _ => None,
        }
    }

    pub fn hooks_mut(&mut self) -> Option<&mut H> {
        match &mut self.state {
            LoopState::Idle(hooks) => Some(hooks),
            _ => None,
        }
    }

    /// Start the worker thread. Does nothing if already running.
    pub fn start(&mut self) -> Result<(), LoopError> {
        if self.is_running() {
            return Ok(());
        }
        // A worker that exited by itself still has to be joined
        if matches!(self.state, LoopState::Running(_)) {
            self.stop()?;
        }

        let hooks = match std::mem::replace(&mut self.state, LoopState::Failed) {
            LoopState::Idle(hooks) => hooks,
            _ => return Err(LoopError::HooksLost),
        };

        self.running.store(true, Ordering::Release);
        let worker = Worker {
            running: Arc::clone(&self.running),
            counters: Arc::clone(&self.counters),
            interval: self.interval,
            max_catch_up: self.config.max_catch_up,
        };

        match thread::Builder::new()
            .name("fixed-step-loop".into())
            .spawn(move || worker.run(hooks))
        {
            Ok(handle) => {
                log::debug!(
                    "Fixed-step loop started at {} Hz (catch-up cap {:?})",
                    self.config.target_hz,
                    self.config.max_catch_up
                );
                self.state = LoopState::Running(handle);
                Ok(())
            }
            Err(error) => {
                self.running.store(false, Ordering::Release);
                Err(LoopError::Spawn(error))
            }
        }
    }

    /// Stop the worker and wait for it to exit. Does nothing if not running.
    ///
    /// An update or render already in progress runs to completion; no hook is
    /// invoked after this returns.
    pub fn stop(&mut self) -> Result<(), LoopError> {
        let handle = match std::mem::replace(&mut self.state, LoopState::Failed) {
            LoopState::Running(handle) => handle,
            other => {
                self.state = other;
                return Ok(());
            }
        };

        self.running.store(false, Ordering::Release);
        handle.thread().unpark();

        match handle.join() {
            Ok(hooks) => {
                self.state = LoopState::Idle(hooks);
                log::debug!("Fixed-step loop stopped ({:?})", self.stats());
                Ok(())
            }
            Err(_) => {
                log::error!("Fixed-step loop worker panicked");
                Err(LoopError::WorkerPanicked)
            }
        }
    }

    /// Stop the loop and take the hooks back
    pub fn into_hooks(mut self) -> Result<H, LoopError> {
        self.stop()?;
        match std::mem::replace(&mut self.state, LoopState::Failed) {
            LoopState::Idle(hooks) => Ok(hooks),
            _ => Err(LoopError::HooksLost),
        }
    }
}

impl<H: LoopHooks> Drop for FixedStepLoop<H> {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            log::warn!("Fixed-step loop failed while shutting down: {error}");
        }
    }
}

impl<H: LoopHooks> fmt::Debug for FixedStepLoop<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedStepLoop")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Clears the running flag however the worker exits, including by panic
struct ClearOnExit(Arc<AtomicBool>);

impl Drop for ClearOnExit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State owned by the worker thread
struct Worker {
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    interval: Duration,
    max_catch_up: Option<u32>,
}

impl Worker {
    fn run<H: LoopHooks>(self, mut hooks: H) -> H {
        let _clear = ClearOnExit(Arc::clone(&self.running));
        let dt = self.interval.as_secs_f32();
        let mut accumulator = Duration::ZERO;
        let mut last = Instant::now();

        while self.running.load(Ordering::Acquire) {
            let frame_start = Instant::now();
            accumulator += frame_start.duration_since(last);
            last = frame_start;

            let mut updates: u32 = 0;
            while accumulator >= self.interval {
                if self.max_catch_up.is_some_and(|cap| updates >= cap) {
                    self.drop_backlog(&mut accumulator);
                    break;
                }
                hooks.update(dt);
                accumulator -= self.interval;
                updates += 1;
            }
            self.counters
                .updates
                .fetch_add(u64::from(updates), Ordering::Relaxed);

            let alpha = (accumulator.as_secs_f64() / self.interval.as_secs_f64()) as f32;
            hooks.render(alpha.clamp(0.0, 1.0));
            self.counters.frames.fetch_add(1, Ordering::Relaxed);

            let spent = frame_start.elapsed();
            if let Some(remaining) = self.interval.checked_sub(spent) {
                if !remaining.is_zero() {
                    // Woken early by `stop()` through unpark
                    thread::park_timeout(remaining);
                }
            }
        }

        hooks
    }

    /// Discard whole steps of backlog, keeping the fractional remainder
    fn drop_backlog(&self, accumulator: &mut Duration) {
        let interval_nanos = self.interval.as_nanos();
        let backlog = accumulator.as_nanos() / interval_nanos;
        let remainder = accumulator.as_nanos() % interval_nanos;
        *accumulator = Duration::from_nanos(remainder as u64);

        let dropped = u64::try_from(backlog).unwrap_or(u64::MAX);
        self.counters.dropped.fetch_add(dropped, Ordering::Relaxed);
        log::debug!("Fixed-step loop fell behind, dropped {dropped} updates");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Records how many updates ran before each render
    #[derive(Default)]
    struct Recorder {
        updates: u64,
        pending: u32,
        per_frame: Vec<u32>,
        alphas: Vec<f32>,
        work: Duration,
    }

    impl LoopHooks for Recorder {
        fn update(&mut self, _dt: f32) {
            self.updates += 1;
            self.pending += 1;
            if !self.work.is_zero() {
                thread::sleep(self.work);
            }
        }

        fn render(&mut self, alpha: f32) {
            self.per_frame.push(self.pending);
            self.pending = 0;
            self.alphas.push(alpha);
        }
    }

    fn counting_hooks() -> (
        FnHooks<impl FnMut(f32) + Send + 'static, impl FnMut(f32) + Send + 'static>,
        Arc<AtomicUsize>,
        Arc<AtomicUsize>,
    ) {
        let updates = Arc::new(AtomicUsize::new(0));
        let renders = Arc::new(AtomicUsize::new(0));
        let (u, r) = (Arc::clone(&updates), Arc::clone(&renders));
        let hooks = FnHooks::new(
            move |_dt| {
                u.fetch_add(1, Ordering::SeqCst);
            },
            move |_alpha| {
                r.fetch_add(1, Ordering::SeqCst);
            },
        );
        (hooks, updates, renders)
    }

    #[test]
    fn test_config_validation() {
        for hz in [0.0, -60.0, f64::NAN, f64::INFINITY, 1e-300, 1e12] {
            assert!(
                matches!(LoopConfig::new(hz).validate(), Err(LoopError::InvalidRate(_))),
                "{hz} Hz should be rejected"
            );
        }

        let zero_cap = LoopConfig {
            max_catch_up: Some(0),
            ..Default::default()
        };
        assert!(matches!(zero_cap.validate(), Err(LoopError::ZeroCatchUp)));

        let config = LoopConfig::default();
        assert!(config.validate().is_ok());
        let interval = config.interval().unwrap();
        assert!((interval.as_secs_f64() - 1.0 / 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_start_then_stop_immediately() {
        let (hooks, updates, renders) = counting_hooks();
        let mut game_loop = FixedStepLoop::new(hooks, LoopConfig::new(60.0)).unwrap();

        game_loop.start().unwrap();
        game_loop.stop().unwrap();
        assert!(!game_loop.is_running());

        let seen = (updates.load(Ordering::SeqCst), renders.load(Ordering::SeqCst));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(
            seen,
            (updates.load(Ordering::SeqCst), renders.load(Ordering::SeqCst)),
            "no hook may run after stop() returns"
        );
        assert_eq!(game_loop.stats().frames, seen.1 as u64);
    }

    #[test]
    fn test_stop_wakes_sleeping_worker() {
        // One frame every 10 seconds: stop must not wait out the sleep
        let (hooks, _, _) = counting_hooks();
        let mut game_loop = FixedStepLoop::new(hooks, LoopConfig::new(0.1)).unwrap();
        game_loop.start().unwrap();
        thread::sleep(Duration::from_millis(20));

        let begin = Instant::now();
        game_loop.stop().unwrap();
        assert!(begin.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut game_loop = FixedStepLoop::new(Recorder::default(), LoopConfig::new(500.0)).unwrap();
        game_loop.start().unwrap();
        game_loop.start().unwrap();
        assert!(game_loop.is_running());
        assert!(game_loop.hooks().is_none());

        game_loop.stop().unwrap();
        assert!(!game_loop.is_running());
        assert!(game_loop.hooks().is_some());

        // Stopping twice is harmless
        game_loop.stop().unwrap();
    }

    #[test]
    fn test_update_count_follows_wall_clock() {
        let rate = 200.0;
        let mut game_loop = FixedStepLoop::new(Recorder::default(), LoopConfig::new(rate)).unwrap();

        let begin = Instant::now();
        game_loop.start().unwrap();
        thread::sleep(Duration::from_millis(200));
        game_loop.stop().unwrap();
        let elapsed = begin.elapsed().as_secs_f64();

        let stats = game_loop.stats();
        let recorder = game_loop.into_hooks().unwrap();
        assert!(recorder.updates > 0);
        assert!(recorder.updates as f64 <= elapsed * rate + 1.0);
        assert_eq!(stats.updates, recorder.updates);
        assert_eq!(stats.frames, recorder.per_frame.len() as u64);
        assert!(recorder.alphas.iter().all(|a| (0.0..=1.0).contains(a)));
    }

    #[test]
    fn test_restart_after_stop() {
        let mut game_loop = FixedStepLoop::new(Recorder::default(), LoopConfig::new(500.0)).unwrap();

        game_loop.start().unwrap();
        thread::sleep(Duration::from_millis(30));
        game_loop.stop().unwrap();
        let first = game_loop.stats().frames;
        assert!(first > 0);

        game_loop.start().unwrap();
        thread::sleep(Duration::from_millis(30));
        game_loop.stop().unwrap();
        assert!(game_loop.stats().frames > first);
    }

    #[test]
    fn test_catch_up_cap_bounds_updates() {
        let recorder = Recorder {
            work: Duration::from_millis(5),
            ..Default::default()
        };
        let config = LoopConfig {
            target_hz: 1000.0,
            max_catch_up: Some(2),
        };
        let mut game_loop = FixedStepLoop::new(recorder, config).unwrap();

        game_loop.start().unwrap();
        thread::sleep(Duration::from_millis(150));
        game_loop.stop().unwrap();

        let stats = game_loop.stats();
        let recorder = game_loop.into_hooks().unwrap();
        assert!(recorder.per_frame.iter().all(|&n| n <= 2));
        assert!(stats.dropped_updates > 0);
    }

    #[test]
    fn test_uncapped_never_drops() {
        let mut game_loop =
            FixedStepLoop::new(Recorder::default(), LoopConfig::uncapped(500.0)).unwrap();
        game_loop.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        game_loop.stop().unwrap();
        assert_eq!(game_loop.stats().dropped_updates, 0);
    }

    #[test]
    fn test_panicking_hook_is_reported() {
        let hooks = FnHooks::new(|_dt| panic!("update failed"), |_alpha| {});
        let mut game_loop = FixedStepLoop::new(hooks, LoopConfig::new(1000.0)).unwrap();
        game_loop.start().unwrap();

        let begin = Instant::now();
        while game_loop.is_running() && begin.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!game_loop.is_running());

        assert!(matches!(game_loop.stop(), Err(LoopError::WorkerPanicked)));
        assert!(matches!(game_loop.start(), Err(LoopError::HooksLost)));
    }

    #[test]
    fn test_drop_joins_worker() {
        let (hooks, updates, _) = counting_hooks();
        let mut game_loop = FixedStepLoop::new(hooks, LoopConfig::new(1000.0)).unwrap();
        game_loop.start().unwrap();
        thread::sleep(Duration::from_millis(20));
        drop(game_loop);

        let seen = updates.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(seen, updates.load(Ordering::SeqCst));
    }
}
