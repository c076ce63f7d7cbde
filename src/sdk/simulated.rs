//! Simulated eye and lip hardware
//!
//! Produces deterministic synthetic frames and lets callers script init
//! status codes and per-poll faults. Counts every call so behaviour at the
//! SDK boundary can be checked.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use super::{ErrorCode, Subsystem, TrackingSdk};
use crate::config::SimulatedConfig;
use crate::error::SdkError;
use crate::tracking::gaze::{validity, EyeExpression, GazeFrame, SingleEye};
use crate::tracking::mouth::{LipShape, MouthFrame, MouthImage, ShapeWeights, LIP_SHAPE_COUNT};

/// Synthetic stand-in for the vendor runtime
#[derive(Debug)]
pub struct SimulatedSdk {
    state: Mutex<SimState>,
}

#[derive(Debug)]
struct SimState {
    unloadable: bool,
    init_faults: [Option<SdkError>; 2],
    gaze_init: VecDeque<ErrorCode>,
    mouth_init: VecDeque<ErrorCode>,
    gaze_default: ErrorCode,
    mouth_default: ErrorCode,
    init_calls: [u32; 2],
    release_calls: [u32; 2],
    polls: [u64; 2],
    faults: [HashMap<u64, SdkError>; 2],
    image_available: bool,
    base_dilation_mm: f32,
}

fn slot(subsystem: Subsystem) -> usize {
    match subsystem {
        Subsystem::Gaze => 0,
        Subsystem::Mouth => 1,
    }
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSdk {
    /// Both subsystems present, every init succeeds, no faults
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                unloadable: false,
                init_faults: [None, None],
                gaze_init: VecDeque::new(),
                mouth_init: VecDeque::new(),
                gaze_default: ErrorCode::Work,
                mouth_default: ErrorCode::Work,
                init_calls: [0; 2],
                release_calls: [0; 2],
                polls: [0; 2],
                faults: [HashMap::new(), HashMap::new()],
                image_available: true,
                base_dilation_mm: 3.5,
            }),
        }
    }

    /// Build from the `[simulated]` config section
    pub fn from_config(config: &SimulatedConfig) -> Self {
        let mut sdk = Self::new().with_base_dilation(config.base_dilation_mm);

        if !config.gaze_present {
            sdk = sdk.absent(Subsystem::Gaze);
        }
        if !config.mouth_present {
            sdk = sdk.absent(Subsystem::Mouth);
        }
        if config.mouth_busy_attempts > 0 {
            let busy = std::iter::repeat(ErrorCode::ResourceBusy)
                .take(config.mouth_busy_attempts as usize);
            sdk = sdk.with_mouth_init(busy);
        }

        sdk
    }

    /// Script the next gaze init codes; later calls fall back to the default
    pub fn with_gaze_init(mut self, codes: impl IntoIterator<Item = ErrorCode>) -> Self {
        self.state.get_mut().gaze_init.extend(codes);
        self
    }

    /// Script the next mouth init codes; later calls fall back to the default
    pub fn with_mouth_init(mut self, codes: impl IntoIterator<Item = ErrorCode>) -> Self {
        self.state.get_mut().mouth_init.extend(codes);
        self
    }

    /// Report the subsystem's hardware as missing
    pub fn absent(mut self, subsystem: Subsystem) -> Self {
        let state = self.state.get_mut();
        match subsystem {
            Subsystem::Gaze => state.gaze_default = ErrorCode::NotSupportEyeTracking,
            Subsystem::Mouth => state.mouth_default = ErrorCode::DeviceNotFound,
        }
        self
    }

    /// Make every init call fail as if the runtime library were missing
    pub fn unloadable(mut self) -> Self {
        self.state.get_mut().unloadable = true;
        self
    }

    /// Make every init call of one subsystem return `error`
    pub fn fail_init(mut self, subsystem: Subsystem, error: SdkError) -> Self {
        self.state.get_mut().init_faults[slot(subsystem)] = Some(error);
        self
    }

    /// Fail the `poll_number`-th (1-based) poll of a subsystem
    pub fn fail_poll(mut self, subsystem: Subsystem, poll_number: u64, error: SdkError) -> Self {
        self.state.get_mut().faults[slot(subsystem)].insert(poll_number, error);
        self
    }

    pub fn with_image(mut self, available: bool) -> Self {
        self.state.get_mut().image_available = available;
        self
    }

    pub fn with_base_dilation(mut self, millimeters: f32) -> Self {
        self.state.get_mut().base_dilation_mm = millimeters;
        self
    }

    pub fn init_calls(&self, subsystem: Subsystem) -> u32 {
        self.state.lock().init_calls[slot(subsystem)]
    }

    pub fn release_calls(&self, subsystem: Subsystem) -> u32 {
        self.state.lock().release_calls[slot(subsystem)]
    }

    pub fn poll_count(&self, subsystem: Subsystem) -> u64 {
        self.state.lock().polls[slot(subsystem)]
    }

    /// Advance a subsystem's poll counter, returning the poll number or the
    /// scripted fault for it
    fn next_poll(&self, subsystem: Subsystem) -> Result<(u64, f32), SdkError> {
        let mut state = self.state.lock();
        let i = slot(subsystem);
        state.polls[i] += 1;
        let n = state.polls[i];

        match state.faults[i].get(&n) {
            Some(err) => Err(err.clone()),
            None => Ok((n, state.base_dilation_mm)),
        }
    }
}

fn synthetic_eye(n: u64, base_dilation_mm: f32, phase: f32) -> SingleEye {
    let t = n as f32;
    let blinking = n % 300 < 6;

    SingleEye {
        validity: validity::ALL,
        gaze_origin_mm: [phase * 32.0, 0.0, 0.0],
        gaze_direction: [(t * 0.01).sin() * 0.3, (t * 0.013).cos() * 0.1, 1.0],
        pupil_diameter_mm: base_dilation_mm + 0.6 * (t * 0.05 + phase).sin(),
        openness: if blinking { 0.0 } else { 1.0 },
        pupil_position: [0.5, 0.5],
    }
}

impl TrackingSdk for SimulatedSdk {
    fn init(&self, subsystem: Subsystem) -> Result<ErrorCode, SdkError> {
        let mut state = self.state.lock();
        state.init_calls[slot(subsystem)] += 1;

        if state.unloadable {
            return Err(SdkError::Unavailable(
                "simulated runtime library not found".to_string(),
            ));
        }
        if let Some(err) = &state.init_faults[slot(subsystem)] {
            return Err(err.clone());
        }

        let code = match subsystem {
            Subsystem::Gaze => {
                let fallback = state.gaze_default;
                state.gaze_init.pop_front().unwrap_or(fallback)
            }
            Subsystem::Mouth => {
                let fallback = state.mouth_default;
                state.mouth_init.pop_front().unwrap_or(fallback)
            }
        };

        Ok(code)
    }

    fn release(&self, subsystem: Subsystem) {
        self.state.lock().release_calls[slot(subsystem)] += 1;
        tracing::debug!("Simulated {} runtime released", subsystem);
    }

    fn poll_gaze(&self) -> Result<GazeFrame, SdkError> {
        let (n, base) = self.next_poll(Subsystem::Gaze)?;
        let t = n as f32;

        let left = synthetic_eye(n, base, -1.0);
        let right = synthetic_eye(n, base, 1.0);
        let combined = SingleEye {
            pupil_diameter_mm: (left.pupil_diameter_mm + right.pupil_diameter_mm) / 2.0,
            ..left
        };
        let expression = EyeExpression {
            wide: ((t * 0.02).sin() * 0.5).max(0.0),
            squeeze: ((t * 0.02).sin() * -0.5).max(0.0),
            frown: 0.0,
        };

        Ok(GazeFrame {
            frame_sequence: n as i32,
            timestamp_ms: (n * 10) as i32,
            no_user: false,
            left,
            right,
            combined,
            left_expression: expression,
            right_expression: expression,
        })
    }

    fn poll_mouth(&self) -> Result<(MouthFrame, ShapeWeights), SdkError> {
        let (n, _) = self.next_poll(Subsystem::Mouth)?;
        let t = n as f32;

        let mut weights = [0.0f32; LIP_SHAPE_COUNT];
        let jaw = 0.5 + 0.5 * (t * 0.08).sin();
        let smile = (0.3 * (t * 0.03).cos()).max(0.0);
        weights[LipShape::JawOpen.index()] = jaw;
        weights[LipShape::MouthApeShape.index()] = jaw * 0.2;
        weights[LipShape::MouthSmileLeft.index()] = smile;
        weights[LipShape::MouthSmileRight.index()] = smile;

        let frame = MouthFrame {
            frame_sequence: n as i32,
            timestamp_ms: (n * 10) as i32,
            blend_shape_weight: weights,
        };

        Ok((frame, frame.shape_weights()))
    }

    fn fill_mouth_image(&self, image: &mut MouthImage) -> bool {
        let state = self.state.lock();
        if !state.image_available {
            return false;
        }
        let frame = state.polls[slot(Subsystem::Mouth)] as usize;
        drop(state);

        let width = image.width;
        for (i, pixel) in image.pixels.iter_mut().enumerate() {
            let (x, y) = (i % width, i / width);
            *pixel = ((x + y + frame) % 256) as u8;
        }
        true
    }
}
