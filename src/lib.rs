//! vivetrack - Eye and lip tracker sampling service
//!
//! Samples the eye and lip modules of a VR face tracking runtime on a
//! background thread and exposes the latest frames to avatar drivers:
//! - Independent bring-up of both subsystems, with busy retry for the lip tracker
//! - One sampling thread with cooperative cancellation
//! - Lock-per-frame sample store for concurrent readers
//! - Online pupil dilation calibration

pub mod clock;
pub mod config;
pub mod error;
pub mod sdk;
pub mod tracking;

pub use config::Config;
pub use error::{Result, VivetrackError};
pub use sdk::{ErrorCode, SimulatedSdk, Subsystem, TrackingSdk};
pub use tracking::TrackingSession;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
