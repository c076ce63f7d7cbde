//! Tracking session: initialization, worker lifecycle and consumer reads
//!
//! A session owns everything one run of the tracker needs: the SDK handle,
//! the sample store, the calibration tracker and at most one live sampling
//! worker. `initialize` brings subsystems up and starts the worker on the
//! first success; `teardown` stops it and releases what was brought up.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::TrackingConfig;
use crate::error::Result;
use crate::sdk::{Subsystem, TrackingSdk};

use super::calibration::{CalibrationRange, CalibrationTracker, ShapeThresholds};
use super::gaze::GazeFrame;
use super::handle::{EnabledSubsystems, SubsystemHandle};
use super::initializer::{self, InitOutcome};
use super::mouth::{MouthImage, MouthSample};
use super::store::SampleStore;
use super::worker::{SamplingWorker, WorkerContext, WorkerMonitor};

/// One tracking run against one SDK
pub struct TrackingSession {
    sdk: Arc<dyn TrackingSdk>,
    store: Arc<SampleStore>,
    calibration: Arc<CalibrationTracker>,
    enabled: Arc<EnabledSubsystems>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    thread_name: String,
    worker: Mutex<Option<SamplingWorker>>,
    monitor: Mutex<Option<WorkerMonitor>>,
}

impl TrackingSession {
    /// Create a session with a wall clock and a fresh calibration table
    pub fn new(sdk: Arc<dyn TrackingSdk>, config: &TrackingConfig) -> Self {
        Self {
            sdk,
            store: Arc::new(SampleStore::new()),
            calibration: Arc::new(CalibrationTracker::new(Arc::new(ShapeThresholds::new()))),
            enabled: Arc::new(EnabledSubsystems::new()),
            clock: Arc::new(SystemClock),
            interval: config.poll_interval(),
            thread_name: config.worker_thread_name.clone(),
            worker: Mutex::new(None),
            monitor: Mutex::new(None),
        }
    }

    /// Replace the clock driving the sampling pause
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use an externally owned calibration tracker
    pub fn with_calibration(mut self, calibration: Arc<CalibrationTracker>) -> Self {
        self.calibration = calibration;
        self
    }

    /// Bring up the requested subsystems and start sampling if any came up.
    ///
    /// Returns `(gaze_ok, mouth_ok)`. `(false, false)` means tracking is
    /// unavailable and is not an error.
    pub fn initialize(&self, want_gaze: bool, want_mouth: bool) -> Result<(bool, bool)> {
        Ok(self.initialize_detailed(want_gaze, want_mouth)?.flags())
    }

    /// Same as [`initialize`](Self::initialize) but also reports busy retries
    pub fn initialize_detailed(&self, want_gaze: bool, want_mouth: bool) -> Result<InitOutcome> {
        let outcome = initializer::initialize(self.sdk.as_ref(), want_gaze, want_mouth)?;

        if outcome.gaze_ok {
            self.enabled.enable(Subsystem::Gaze);
        }
        if outcome.mouth_ok {
            self.enabled.enable(Subsystem::Mouth);
        }

        self.start_if_needed(outcome.gaze_ok, outcome.mouth_ok)?;
        Ok(outcome)
    }

    /// Start the sampling worker if a subsystem came up and none is running.
    ///
    /// Returns whether a new worker was started.
    pub fn start_if_needed(&self, gaze_ok: bool, mouth_ok: bool) -> Result<bool> {
        if !gaze_ok && !mouth_ok {
            return Ok(false);
        }

        let mut slot = self.worker.lock();
        if slot.as_ref().map_or(false, |w| w.is_running()) {
            debug!("Sampling thread already running");
            return Ok(false);
        }

        // Frames from a previous run must not outlive it
        self.store.clear();

        let mut worker = SamplingWorker::new();
        let ctx = WorkerContext {
            sdk: Arc::clone(&self.sdk),
            store: Arc::clone(&self.store),
            enabled: Arc::clone(&self.enabled),
            clock: Arc::clone(&self.clock),
            interval: self.interval,
        };
        worker.start(ctx, &self.thread_name)?;

        *self.monitor.lock() = Some(worker.monitor());
        *slot = Some(worker);
        Ok(true)
    }

    /// Stop sampling and release every subsystem that was brought up.
    ///
    /// Raises the worker's cancellation flag and returns without waiting;
    /// the thread exits at the top of its next iteration. Calling this again
    /// releases nothing further.
    pub fn teardown(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = &worker {
            info!("Stopping sampling thread");
            worker.cancel();
        }

        for kind in Subsystem::ALL {
            if self.enabled.disable(kind) {
                self.sdk.release(kind);
                info!("{} tracking released", kind);
            }
        }

        drop(worker);
    }

    /// Reset the dilation range and the per-shape lip thresholds together
    pub fn reset_calibration(&self) {
        self.calibration.reset();
    }

    /// Feed the latest gaze frame's dilation into the calibration range
    pub fn observe_latest_dilation(&self) -> Option<f32> {
        let dilation = self.store.latest_gaze()?.dilation()?;
        self.calibration.observe(dilation);
        Some(dilation)
    }

    /// Grab the current lip camera picture, independent of the sampling loop
    pub fn capture_mouth_image(&self) -> Option<MouthImage> {
        let mut image = MouthImage::new();
        if self.sdk.fill_mouth_image(&mut image) {
            Some(image)
        } else {
            None
        }
    }

    pub fn latest_gaze(&self) -> Option<Arc<GazeFrame>> {
        self.store.latest_gaze()
    }

    pub fn latest_mouth(&self) -> Option<Arc<MouthSample>> {
        self.store.latest_mouth()
    }

    pub fn calibration_range(&self) -> CalibrationRange {
        self.calibration.range()
    }

    pub fn calibration(&self) -> &Arc<CalibrationTracker> {
        &self.calibration
    }

    pub fn store(&self) -> &Arc<SampleStore> {
        &self.store
    }

    pub fn handles(&self) -> [SubsystemHandle; 2] {
        Subsystem::ALL.map(|kind| self.enabled.handle(kind))
    }

    /// True while a worker is live and has not been torn down
    pub fn is_running(&self) -> bool {
        self.worker.lock().as_ref().map_or(false, |w| w.is_running())
    }

    /// View of the most recently started worker, kept after teardown
    pub fn worker_monitor(&self) -> Option<WorkerMonitor> {
        self.monitor.lock().clone()
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
