//! Tracking module
//!
//! Sampling machinery for the eye and lip trackers:
//! - frame types for both subsystems (`gaze`, `mouth`)
//! - the latest-sample store shared with consumers
//! - subsystem initialization with busy retry for the lip tracker
//! - the background sampling worker and the session that owns it
//! - pupil dilation calibration

pub mod calibration;
pub mod gaze;
pub mod handle;
pub mod initializer;
pub mod mouth;
pub mod session;
pub mod store;
pub mod worker;

pub use calibration::{CalibrationRange, CalibrationTracker, ShapeCalibration, ShapeThresholds};
pub use gaze::GazeFrame;
pub use handle::{EnabledSubsystems, SubsystemHandle};
pub use initializer::InitOutcome;
pub use mouth::{LipShape, MouthFrame, MouthImage, MouthSample, ShapeWeights};
pub use session::TrackingSession;
pub use store::SampleStore;
pub use worker::{SamplingWorker, WorkerMonitor, WorkerState, WorkerStatsSnapshot};
