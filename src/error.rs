//! Error types for vivetrack

use thiserror::Error;

use crate::sdk::{ErrorCode, Subsystem};

/// Main error type for vivetrack
#[derive(Error, Debug)]
pub enum VivetrackError {
    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised at the vendor SDK boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// The runtime library could not be loaded at all. This is the only
    /// condition that aborts initialization instead of disabling a subsystem.
    #[error("SDK runtime unavailable: {0}")]
    Unavailable(String),

    /// The calling thread is being torn down while inside the SDK
    #[error("Sampling thread is being torn down")]
    ThreadTeardown,

    #[error("{subsystem} poll failed: {code}")]
    Poll { subsystem: Subsystem, code: ErrorCode },

    #[error("SDK fault: {0}")]
    Other(String),
}

impl SdkError {
    /// Whether this error is the expected teardown condition that the
    /// sampling loop swallows without logging.
    pub fn is_teardown(&self) -> bool {
        matches!(self, SdkError::ThreadTeardown)
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Worker lifecycle errors
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Failed to spawn sampling thread: {0}")]
    WorkerSpawn(String),
}

/// Result type alias for vivetrack operations
pub type Result<T> = std::result::Result<T, VivetrackError>;
