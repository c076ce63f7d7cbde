//! Subsystem bring-up with per-subsystem retry policy
//!
//! Gaze gets exactly one init attempt. Mouth is retried for as long as the
//! runtime reports `ResourceBusy`, which happens while another process is
//! still letting go of the lip camera; any other code ends the attempt.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SdkError;
use crate::sdk::{ErrorCode, Subsystem, TrackingSdk};

/// Result of one initialization pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InitOutcome {
    pub gaze_ok: bool,
    pub mouth_ok: bool,
    /// Extra mouth init calls made because the device was busy
    pub mouth_busy_retries: u32,
}

impl InitOutcome {
    pub fn any(&self) -> bool {
        self.gaze_ok || self.mouth_ok
    }

    pub fn flags(&self) -> (bool, bool) {
        (self.gaze_ok, self.mouth_ok)
    }
}

/// Initialize the requested subsystems.
///
/// Hardware absence and init failures come back as `false` flags. Only a
/// runtime fault (`Err` from the SDK) is returned as an error; a gaze
/// subsystem already brought up in the same pass is released first.
pub fn initialize(
    sdk: &dyn TrackingSdk,
    want_gaze: bool,
    want_mouth: bool,
) -> Result<InitOutcome, SdkError> {
    let mut outcome = InitOutcome::default();

    if want_gaze {
        outcome.gaze_ok = init_gaze(sdk)?;
    }

    if want_mouth {
        let (ok, retries) = match init_mouth(sdk) {
            Ok(result) => result,
            Err(e) => {
                // Nobody records gaze as enabled on this path
                if outcome.gaze_ok {
                    warn!("Releasing gaze tracking after mouth init fault: {}", e);
                    sdk.release(Subsystem::Gaze);
                }
                return Err(e);
            }
        };
        outcome.mouth_ok = ok;
        outcome.mouth_busy_retries = retries;
    }

    Ok(outcome)
}

fn init_gaze(sdk: &dyn TrackingSdk) -> Result<bool, SdkError> {
    let code = sdk.init(Subsystem::Gaze)?;
    Ok(report(Subsystem::Gaze, code))
}

fn init_mouth(sdk: &dyn TrackingSdk) -> Result<(bool, u32), SdkError> {
    let mut retries = 0u32;
    let mut code = sdk.init(Subsystem::Mouth)?;

    while code.is_busy() {
        retries += 1;
        debug!("Mouth tracker busy, retrying init (attempt {})", retries + 1);
        code = sdk.init(Subsystem::Mouth)?;
    }

    if retries > 0 {
        info!("Mouth tracker became available after {} busy retries", retries);
    }

    Ok((report(Subsystem::Mouth, code), retries))
}

fn report(subsystem: Subsystem, code: ErrorCode) -> bool {
    if code.is_success() {
        info!("{} tracking initialized", subsystem);
        true
    } else {
        warn!("{} tracking unavailable: {}", subsystem, code);
        false
    }
}
