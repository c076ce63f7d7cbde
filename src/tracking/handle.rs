//! Per-subsystem enabled flags shared by the session and the sampling thread

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::sdk::Subsystem;

/// Snapshot of one subsystem's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubsystemHandle {
    pub kind: Subsystem,
    pub enabled: bool,
}

/// Which subsystems are live.
///
/// A flag is set once when its subsystem initializes successfully and is
/// cleared only by teardown.
#[derive(Debug, Default)]
pub struct EnabledSubsystems {
    gaze: AtomicBool,
    mouth: AtomicBool,
}

impl EnabledSubsystems {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, kind: Subsystem) -> &AtomicBool {
        match kind {
            Subsystem::Gaze => &self.gaze,
            Subsystem::Mouth => &self.mouth,
        }
    }

    pub fn is_enabled(&self, kind: Subsystem) -> bool {
        self.flag(kind).load(Ordering::Acquire)
    }

    pub fn enable(&self, kind: Subsystem) {
        self.flag(kind).store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether it was set
    pub fn disable(&self, kind: Subsystem) -> bool {
        self.flag(kind).swap(false, Ordering::AcqRel)
    }

    pub fn any(&self) -> bool {
        Subsystem::ALL.iter().any(|&kind| self.is_enabled(kind))
    }

    pub fn handle(&self, kind: Subsystem) -> SubsystemHandle {
        SubsystemHandle {
            kind,
            enabled: self.is_enabled(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_disable() {
        let enabled = EnabledSubsystems::new();
        assert!(!enabled.any());

        enabled.enable(Subsystem::Mouth);
        assert!(enabled.is_enabled(Subsystem::Mouth));
        assert!(!enabled.is_enabled(Subsystem::Gaze));
        assert!(enabled.any());

        assert!(enabled.disable(Subsystem::Mouth));
        assert!(!enabled.disable(Subsystem::Mouth));
        assert!(!enabled.any());
    }

    #[test]
    fn test_handle_snapshot() {
        let enabled = EnabledSubsystems::new();
        enabled.enable(Subsystem::Gaze);
        assert_eq!(
            enabled.handle(Subsystem::Gaze),
            SubsystemHandle {
                kind: Subsystem::Gaze,
                enabled: true
            }
        );
        assert!(!enabled.handle(Subsystem::Mouth).enabled);
    }
}
