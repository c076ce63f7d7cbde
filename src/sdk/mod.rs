//! Vendor SDK boundary
//!
//! The eye and lip runtimes are reached through the [`TrackingSdk`] trait so
//! the sampling machinery never touches native calls directly. A native
//! binding implements the trait on the target platform; [`SimulatedSdk`]
//! provides deterministic synthetic hardware for development and tests.

pub mod simulated;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;
use crate::tracking::gaze::GazeFrame;
use crate::tracking::mouth::{MouthFrame, MouthImage, ShapeWeights};

pub use simulated::SimulatedSdk;

/// One of the two independently initializable tracking paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    /// Eye tracking (gaze, openness, pupil)
    Gaze,
    /// Lip tracking (mouth shapes)
    Mouth,
}

impl Subsystem {
    pub const ALL: [Subsystem; 2] = [Subsystem::Gaze, Subsystem::Mouth];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Gaze => "gaze",
            Subsystem::Mouth => "mouth",
        }
    }
}

impl std::fmt::Display for Subsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status codes returned by the runtime's initialization call.
///
/// Only `Work` means success. `ResourceBusy` is reported while another
/// process is still releasing the lip camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    Work,
    InvalidInput,
    FileNotFound,
    DataNotFound,
    Undefined,
    InitialFailed,
    NotImplemented,
    NotSupported,
    Timeout,
    DeviceNotFound,
    NotAvailable,
    ServiceNotFound,
    DisabledByUser,
    RuntimeNoResponse,
    NotSupportEyeTracking,
    ResourceBusy,
    Other(i32),
}

impl ErrorCode {
    /// Map a raw runtime status code
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Work,
            1 => Self::InvalidInput,
            2 => Self::FileNotFound,
            13 => Self::DataNotFound,
            319 => Self::Undefined,
            1001 => Self::InitialFailed,
            1003 => Self::NotImplemented,
            1018 => Self::NotSupported,
            1022 => Self::Timeout,
            1023 => Self::DeviceNotFound,
            1031 => Self::NotAvailable,
            1033 => Self::ServiceNotFound,
            1034 => Self::DisabledByUser,
            1036 => Self::RuntimeNoResponse,
            1038 => Self::NotSupportEyeTracking,
            1051 => Self::ResourceBusy,
            other => Self::Other(other),
        }
    }

    /// Raw runtime status code
    pub fn code(&self) -> i32 {
        match self {
            Self::Work => 0,
            Self::InvalidInput => 1,
            Self::FileNotFound => 2,
            Self::DataNotFound => 13,
            Self::Undefined => 319,
            Self::InitialFailed => 1001,
            Self::NotImplemented => 1003,
            Self::NotSupported => 1018,
            Self::Timeout => 1022,
            Self::DeviceNotFound => 1023,
            Self::NotAvailable => 1031,
            Self::ServiceNotFound => 1033,
            Self::DisabledByUser => 1034,
            Self::RuntimeNoResponse => 1036,
            Self::NotSupportEyeTracking => 1038,
            Self::ResourceBusy => 1051,
            Self::Other(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Work)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::ResourceBusy)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other(code) => write!(f, "unknown status {}", code),
            known => write!(f, "{:?} ({})", known, known.code()),
        }
    }
}

/// Calls into the vendor face tracking runtime.
///
/// Implementations must be callable from the sampling thread and the control
/// thread at the same time. Poll calls are expected to return quickly; there
/// is no timeout around them.
pub trait TrackingSdk: Send + Sync + 'static {
    /// Bring up one subsystem. `Err` is reserved for faults where the runtime
    /// itself is unusable; hardware absence is reported through the code.
    fn init(&self, subsystem: Subsystem) -> Result<ErrorCode, SdkError>;

    /// Release a subsystem that was previously initialized successfully
    fn release(&self, subsystem: Subsystem);

    /// Read one complete eye frame
    fn poll_gaze(&self) -> Result<GazeFrame, SdkError>;

    /// Read one complete lip frame together with its shape weights
    fn poll_mouth(&self) -> Result<(MouthFrame, ShapeWeights), SdkError>;

    /// Fill `image` with the current lip camera picture. Returns false when
    /// no image is available.
    fn fill_mouth_image(&self, image: &mut MouthImage) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(ErrorCode::from_code(0), ErrorCode::Work);
        assert_eq!(ErrorCode::from_code(1051), ErrorCode::ResourceBusy);
        assert_eq!(ErrorCode::from_code(4242), ErrorCode::Other(4242));

        for code in [0, 1, 2, 13, 319, 1001, 1023, 1036, 1051, 77] {
            assert_eq!(ErrorCode::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_error_code_predicates() {
        assert!(ErrorCode::Work.is_success());
        assert!(!ErrorCode::ResourceBusy.is_success());
        assert!(ErrorCode::ResourceBusy.is_busy());
        assert!(!ErrorCode::DeviceNotFound.is_busy());
    }

    #[test]
    fn test_subsystem_display() {
        assert_eq!(Subsystem::Gaze.to_string(), "gaze");
        assert_eq!(Subsystem::Mouth.to_string(), "mouth");
        assert_eq!(
            ErrorCode::DeviceNotFound.to_string(),
            "DeviceNotFound (1023)"
        );
    }
}
