//! Eye tracking frames
//!
//! Layout mirrors the v2 eye data block reported by the runtime:
//! per-eye verbose data for the left, right and combined eye, plus the
//! per-eye expression data (wide / squeeze / frown).

use serde::{Deserialize, Serialize};

/// Bits of [`SingleEye::validity`]
pub mod validity {
    pub const GAZE_ORIGIN: u64 = 1 << 0;
    pub const GAZE_DIRECTION: u64 = 1 << 1;
    pub const PUPIL_DIAMETER: u64 = 1 << 2;
    pub const EYE_OPENNESS: u64 = 1 << 3;
    pub const PUPIL_POSITION_IN_SENSOR_AREA: u64 = 1 << 4;

    pub const ALL: u64 = GAZE_ORIGIN
        | GAZE_DIRECTION
        | PUPIL_DIAMETER
        | EYE_OPENNESS
        | PUPIL_POSITION_IN_SENSOR_AREA;
}

/// Verbose data for one eye
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SingleEye {
    /// Bit mask of valid fields, see [`validity`]
    pub validity: u64,
    /// Cornea center relative to the lens center, in millimeters
    pub gaze_origin_mm: [f32; 3],
    /// Normalized gaze direction (right-handed)
    pub gaze_direction: [f32; 3],
    /// Pupil diameter in millimeters
    pub pupil_diameter_mm: f32,
    /// Openness (0.0 = closed, 1.0 = open)
    pub openness: f32,
    /// Normalized pupil position inside the sensor area
    pub pupil_position: [f32; 2],
}

impl SingleEye {
    /// Check whether every bit in `mask` is set
    pub fn is_valid(&self, mask: u64) -> bool {
        self.validity & mask == mask
    }
}

/// Expression data for one eye
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EyeExpression {
    pub wide: f32,
    pub squeeze: f32,
    pub frown: f32,
}

/// One complete eye sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GazeFrame {
    /// Runtime frame counter
    pub frame_sequence: i32,
    /// Runtime timestamp in milliseconds
    pub timestamp_ms: i32,
    /// True when nobody is wearing the headset
    pub no_user: bool,
    pub left: SingleEye,
    pub right: SingleEye,
    pub combined: SingleEye,
    pub left_expression: EyeExpression,
    pub right_expression: EyeExpression,
}

impl GazeFrame {
    /// Pupil dilation in millimeters: the mean diameter over the eyes whose
    /// pupil measurement is valid. `None` when neither eye reports one.
    pub fn dilation(&self) -> Option<f32> {
        let mut sum = 0.0;
        let mut count = 0u8;
        for eye in [&self.left, &self.right] {
            if eye.is_valid(validity::PUPIL_DIAMETER) {
                sum += eye.pupil_diameter_mm;
                count += 1;
            }
        }

        if count == 0 {
            return None;
        }

        Some(sum / f32::from(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eye(diameter: f32, mask: u64) -> SingleEye {
        SingleEye {
            validity: mask,
            pupil_diameter_mm: diameter,
            openness: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_dilation_averages_valid_eyes() {
        let frame = GazeFrame {
            left: eye(3.0, validity::ALL),
            right: eye(4.0, validity::ALL),
            ..Default::default()
        };
        assert!((frame.dilation().unwrap() - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_dilation_skips_invalid_eye() {
        let frame = GazeFrame {
            left: eye(3.0, validity::EYE_OPENNESS),
            right: eye(4.5, validity::PUPIL_DIAMETER),
            ..Default::default()
        };
        assert!((frame.dilation().unwrap() - 4.5).abs() < 1e-6);
    }

    #[test]
    fn test_dilation_none_without_pupil_data() {
        let frame = GazeFrame::default();
        assert!(frame.dilation().is_none());
    }

    #[test]
    fn test_validity_mask() {
        let e = eye(1.0, validity::GAZE_ORIGIN | validity::PUPIL_DIAMETER);
        assert!(e.is_valid(validity::PUPIL_DIAMETER));
        assert!(!e.is_valid(validity::EYE_OPENNESS));
        assert!(!e.is_valid(validity::ALL));
    }
}
