//! Configuration parsing and management for vivetrack

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, VivetrackError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub simulated: SimulatedConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VivetrackError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> Result<Self, VivetrackError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, VivetrackError> {
        let paths = [
            PathBuf::from("vivetrack.toml"),
            PathBuf::from("config/vivetrack.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), VivetrackError> {
        if self.tracking.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tracking.poll_interval_ms".to_string(),
                message: "Poll interval must be greater than 0".to_string(),
            }
            .into());
        }

        if self.tracking.worker_thread_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tracking.worker_thread_name".to_string(),
                message: "Thread name must not be empty".to_string(),
            }
            .into());
        }

        if !(self.simulated.base_dilation_mm > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "simulated.base_dilation_mm".to_string(),
                message: "Pupil diameter must be positive".to_string(),
            }
            .into());
        }

        if !self.tracking.gaze && !self.tracking.mouth {
            tracing::warn!("Both gaze and mouth tracking are disabled in config");
        }

        Ok(())
    }
}

/// Sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Request eye tracking
    pub gaze: bool,
    /// Request lip tracking
    pub mouth: bool,
    /// Pause between sampling iterations in milliseconds
    pub poll_interval_ms: u64,
    /// Name given to the sampling thread
    pub worker_thread_name: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            gaze: true,
            mouth: true,
            poll_interval_ms: 10,
            worker_thread_name: "vivetrack-sampler".to_string(),
        }
    }
}

impl TrackingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Simulated hardware parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    /// Whether the eye tracker is present
    pub gaze_present: bool,
    /// Whether the lip tracker is present
    pub mouth_present: bool,
    /// Number of busy responses before the lip tracker comes up
    pub mouth_busy_attempts: u32,
    /// Resting pupil diameter in millimeters
    pub base_dilation_mm: f32,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            gaze_present: true,
            mouth_present: true,
            mouth_busy_attempts: 0,
            base_dilation_mm: 3.5,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("vivetrack");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/vivetrack");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/vivetrack");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("vivetrack");
        }
    }

    PathBuf::from(".")
}
