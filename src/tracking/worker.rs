//! Background sampling thread
//!
//! One dedicated OS thread polls every enabled subsystem, publishes the
//! frames into the [`SampleStore`] and then sleeps a fixed interval. A failed
//! poll is logged and counted; it never ends the loop. The loop checks its
//! [`CancellationFlag`] once per iteration, at the top.
//!
//! A worker moves `Idle -> Running -> Stopped` and is never restarted.
//!
//! A panicking poll is caught and counted like an error, but it still passes
//! through the process panic hook first, which by default prints to stderr
//! on every occurrence. Binaries that need a quiet stderr install their own
//! hook; this crate never replaces it.
//!
//! The thread inherits the tracing dispatcher that was current when
//! [`SamplingWorker::start`] was called.

use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::error::{LifecycleError, SdkError};
use crate::sdk::{Subsystem, TrackingSdk};

use super::handle::EnabledSubsystems;
use super::store::SampleStore;

/// Default pause between iterations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lifecycle of a sampling worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Running,
    Stopped,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

/// Cooperative stop signal for one worker run. Once raised it stays raised.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Loop counters, updated by the sampling thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    iterations: AtomicU64,
    gaze_frames: AtomicU64,
    mouth_frames: AtomicU64,
    poll_errors: AtomicU64,
}

/// Point-in-time copy of [`WorkerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStatsSnapshot {
    pub iterations: u64,
    pub gaze_frames: u64,
    pub mouth_frames: u64,
    pub poll_errors: u64,
}

impl WorkerStats {
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            gaze_frames: self.gaze_frames.load(Ordering::Relaxed),
            mouth_frames: self.mouth_frames.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
        }
    }

    fn frame_counter(&self, subsystem: Subsystem) -> &AtomicU64 {
        match subsystem {
            Subsystem::Gaze => &self.gaze_frames,
            Subsystem::Mouth => &self.mouth_frames,
        }
    }
}

#[derive(Debug, Default)]
struct WorkerShared {
    state: AtomicU8,
    stats: WorkerStats,
}

impl WorkerShared {
    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Read-only view of a worker that outlives the worker handle itself
#[derive(Debug, Clone)]
pub struct WorkerMonitor {
    shared: Arc<WorkerShared>,
}

impl WorkerMonitor {
    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    pub fn stats(&self) -> WorkerStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Block until the worker reaches `Stopped`. Returns false on timeout.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.state() != WorkerState::Stopped {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

/// Everything the sampling thread needs
pub struct WorkerContext {
    pub sdk: Arc<dyn TrackingSdk>,
    pub store: Arc<SampleStore>,
    pub enabled: Arc<EnabledSubsystems>,
    pub clock: Arc<dyn Clock>,
    pub interval: Duration,
}

/// Handle to one sampling thread
#[derive(Debug)]
pub struct SamplingWorker {
    shared: Arc<WorkerShared>,
    cancel: CancellationFlag,
    thread: Option<thread::JoinHandle<()>>,
}

impl Default for SamplingWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplingWorker {
    /// Create an idle worker with a fresh cancellation flag
    pub fn new() -> Self {
        Self {
            shared: Arc::new(WorkerShared::default()),
            cancel: CancellationFlag::new(),
            thread: None,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    pub fn monitor(&self) -> WorkerMonitor {
        WorkerMonitor {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    /// Spawn the sampling thread.
    ///
    /// Only an idle worker starts; on a running or stopped worker this
    /// returns `Ok(false)` without spawning anything.
    pub fn start(&mut self, ctx: WorkerContext, thread_name: &str) -> Result<bool, LifecycleError> {
        let claimed = self.shared.state.compare_exchange(
            WorkerState::Idle as u8,
            WorkerState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if claimed.is_err() {
            return Ok(false);
        }

        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());

        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                tracing::dispatcher::with_default(&dispatch, || run_loop(ctx, cancel, shared))
            })
            .map_err(|e| {
                self.shared.set_state(WorkerState::Stopped);
                LifecycleError::WorkerSpawn(e.to_string())
            })?;

        self.thread = Some(handle);
        Ok(true)
    }

    /// Raise the cancellation flag without waiting for the thread
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the sampling thread to exit. Only meaningful after `cancel`.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("Sampling thread panicked");
            }
        }
    }
}

impl Drop for SamplingWorker {
    fn drop(&mut self) {
        // Detaches the thread; it exits at its next iteration
        self.cancel.cancel();
    }
}

fn run_loop(ctx: WorkerContext, cancel: CancellationFlag, shared: Arc<WorkerShared>) {
    tracing::info!(
        "Sampling thread started (interval: {:?})",
        ctx.interval
    );

    while !cancel.is_cancelled() {
        if ctx.enabled.is_enabled(Subsystem::Gaze) {
            sample(Subsystem::Gaze, &shared.stats, || {
                let frame = ctx.sdk.poll_gaze()?;
                if !cancel.is_cancelled() {
                    ctx.store.publish_gaze(frame);
                }
                Ok(())
            });
        }

        if ctx.enabled.is_enabled(Subsystem::Mouth) {
            sample(Subsystem::Mouth, &shared.stats, || {
                let (frame, shapes) = ctx.sdk.poll_mouth()?;
                if !cancel.is_cancelled() {
                    ctx.store.publish_mouth(frame, shapes);
                }
                Ok(())
            });
        }

        let iteration = shared.stats.iterations.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!("Sampling iteration {} complete", iteration);

        ctx.clock.sleep(ctx.interval);
    }

    shared.set_state(WorkerState::Stopped);
    tracing::info!("Sampling thread stopped");
}

/// Run one poll-and-publish step, absorbing any failure
fn sample(subsystem: Subsystem, stats: &WorkerStats, poll: impl FnOnce() -> Result<(), SdkError>) {
    let result = catch_unwind(AssertUnwindSafe(poll))
        .unwrap_or_else(|panic| Err(SdkError::Other(panic_message(panic.as_ref()))));

    match result {
        Ok(()) => {
            stats.frame_counter(subsystem).fetch_add(1, Ordering::Relaxed);
        }
        Err(e) if e.is_teardown() => {}
        Err(e) => {
            stats.poll_errors.fetch_add(1, Ordering::Relaxed);
            tracing::error!("Sampling error in {} update: {}", subsystem, e);
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("poll panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("poll panicked: {}", s)
    } else {
        "poll panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockDriver, SteppedClock};
    use crate::sdk::SimulatedSdk;
    use parking_lot::Mutex;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Collects the messages of error-level events
    #[derive(Clone, Default)]
    struct ErrorEvents(Arc<Mutex<Vec<String>>>);

    impl ErrorEvents {
        fn messages(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for ErrorEvents {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != tracing::Level::ERROR {
                return;
            }
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.0.lock().push(visitor.0);
        }
    }

    struct MessageVisitor(String);

    impl Visit for MessageVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{:?}", value);
            }
        }
    }

    fn context(
        sdk: Arc<SimulatedSdk>,
        gaze: bool,
        mouth: bool,
    ) -> (WorkerContext, Arc<SampleStore>, ClockDriver) {
        let (clock, driver) = SteppedClock::new();
        let store = Arc::new(SampleStore::new());
        let enabled = Arc::new(EnabledSubsystems::new());
        if gaze {
            enabled.enable(Subsystem::Gaze);
        }
        if mouth {
            enabled.enable(Subsystem::Mouth);
        }

        let ctx = WorkerContext {
            sdk,
            store: Arc::clone(&store),
            enabled,
            clock: Arc::new(clock),
            interval: DEFAULT_POLL_INTERVAL,
        };
        (ctx, store, driver)
    }

    #[test]
    fn test_new_worker_is_idle() {
        let worker = SamplingWorker::new();
        assert_eq!(worker.state(), WorkerState::Idle);
        assert!(!worker.cancellation().is_cancelled());
    }

    #[test]
    fn test_polls_only_enabled_subsystems() {
        let sdk = Arc::new(SimulatedSdk::new());
        let (ctx, store, driver) = context(Arc::clone(&sdk), false, true);

        let mut worker = SamplingWorker::new();
        assert!(worker.start(ctx, "test-sampler").unwrap());
        assert!(driver.wait_for_sleep(TIMEOUT));
        assert!(driver.step(TIMEOUT));

        assert_eq!(sdk.poll_count(Subsystem::Gaze), 0);
        assert_eq!(sdk.poll_count(Subsystem::Mouth), 2);
        assert!(store.latest_gaze().is_none());
        assert_eq!(store.latest_mouth().unwrap().frame.frame_sequence, 2);

        worker.cancel();
        driver.tick();
        worker.join();
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_start_is_one_shot() {
        let sdk = Arc::new(SimulatedSdk::new());
        let (ctx, _store, driver) = context(Arc::clone(&sdk), true, false);
        let (ctx2, _store2, _driver2) = context(Arc::clone(&sdk), true, false);

        let mut worker = SamplingWorker::new();
        assert!(worker.start(ctx, "test-sampler").unwrap());
        assert!(!worker.start(ctx2, "test-sampler").unwrap());
        assert!(driver.wait_for_sleep(TIMEOUT));

        worker.cancel();
        driver.tick();
        worker.join();

        // Stopped is terminal
        let (ctx3, _store3, _driver3) = context(sdk, true, false);
        assert!(!worker.start(ctx3, "test-sampler").unwrap());
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_failure_on_fifth_of_ten_iterations() {
        let sdk = Arc::new(SimulatedSdk::new().fail_poll(
            Subsystem::Gaze,
            5,
            SdkError::Other("corrupt eye frame".to_string()),
        ));
        let (ctx, store, driver) = context(Arc::clone(&sdk), true, false);

        let errors = ErrorEvents::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(errors.clone()));

        let mut worker = SamplingWorker::new();
        let monitor = worker.monitor();
        worker.start(ctx, "test-sampler").unwrap();

        let mut published = Vec::new();
        let mut logged = Vec::new();
        for i in 1..=10 {
            let ok = if i == 1 {
                driver.wait_for_sleep(TIMEOUT)
            } else {
                driver.step(TIMEOUT)
            };
            assert!(ok, "iteration {} did not complete", i);
            published.push(store.latest_gaze().unwrap().frame_sequence);
            logged.push(errors.messages().len());
        }

        assert_eq!(published, vec![1, 2, 3, 4, 4, 6, 7, 8, 9, 10]);
        assert_eq!(logged, vec![0, 0, 0, 0, 1, 1, 1, 1, 1, 1]);
        let messages = errors.messages();
        assert!(messages[0].contains("gaze"), "{}", messages[0]);
        assert!(messages[0].contains("corrupt eye frame"), "{}", messages[0]);
        let stats = monitor.stats();
        assert_eq!(stats.iterations, 10);
        assert_eq!(stats.gaze_frames, 9);
        assert_eq!(stats.poll_errors, 1);
        assert!(monitor.is_running());

        worker.cancel();
        driver.tick();
        assert!(monitor.wait_until_stopped(TIMEOUT));
    }

    #[test]
    fn test_teardown_error_is_silent() {
        let sdk = Arc::new(
            SimulatedSdk::new().fail_poll(Subsystem::Mouth, 1, SdkError::ThreadTeardown),
        );
        let (ctx, store, driver) = context(Arc::clone(&sdk), false, true);

        let mut worker = SamplingWorker::new();
        worker.start(ctx, "test-sampler").unwrap();
        assert!(driver.wait_for_sleep(TIMEOUT));

        let stats = worker.monitor().stats();
        assert_eq!(stats.poll_errors, 0);
        assert_eq!(stats.mouth_frames, 0);
        assert!(store.latest_mouth().is_none());

        worker.cancel();
        driver.tick();
        worker.join();
    }

    struct PanickingSdk(SimulatedSdk);

    impl TrackingSdk for PanickingSdk {
        fn init(&self, subsystem: Subsystem) -> Result<crate::sdk::ErrorCode, SdkError> {
            self.0.init(subsystem)
        }
        fn release(&self, subsystem: Subsystem) {
            self.0.release(subsystem)
        }
        fn poll_gaze(&self) -> Result<crate::tracking::gaze::GazeFrame, SdkError> {
            panic!("driver crashed")
        }
        fn poll_mouth(
            &self,
        ) -> Result<(crate::tracking::mouth::MouthFrame, crate::tracking::mouth::ShapeWeights), SdkError>
        {
            self.0.poll_mouth()
        }
        fn fill_mouth_image(&self, image: &mut crate::tracking::mouth::MouthImage) -> bool {
            self.0.fill_mouth_image(image)
        }
    }

    #[test]
    fn test_panicking_poll_does_not_kill_loop() {
        let (clock, driver) = SteppedClock::new();
        let store = Arc::new(SampleStore::new());
        let enabled = Arc::new(EnabledSubsystems::new());
        enabled.enable(Subsystem::Gaze);
        enabled.enable(Subsystem::Mouth);

        let ctx = WorkerContext {
            sdk: Arc::new(PanickingSdk(SimulatedSdk::new())),
            store: Arc::clone(&store),
            enabled,
            clock: Arc::new(clock),
            interval: DEFAULT_POLL_INTERVAL,
        };

        let mut worker = SamplingWorker::new();
        worker.start(ctx, "test-sampler").unwrap();
        assert!(driver.wait_for_sleep(TIMEOUT));
        assert!(driver.step(TIMEOUT));

        let stats = worker.monitor().stats();
        assert_eq!(stats.poll_errors, 2);
        assert_eq!(stats.mouth_frames, 2);
        assert!(worker.is_running());

        worker.cancel();
        driver.tick();
        worker.join();
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_drop_cancels() {
        let sdk = Arc::new(SimulatedSdk::new());
        let (ctx, _store, driver) = context(sdk, true, true);

        let mut worker = SamplingWorker::new();
        let monitor = worker.monitor();
        worker.start(ctx, "test-sampler").unwrap();
        assert!(driver.wait_for_sleep(TIMEOUT));

        drop(worker);
        driver.tick();
        assert!(monitor.wait_until_stopped(TIMEOUT));
    }
}
