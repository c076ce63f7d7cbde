//! Online min/max calibration for pupil dilation
//!
//! The dilation range feeds downstream normalization. Resetting it also
//! resets the per-shape lip thresholds, which belong to the lip mapping
//! layer and are reached through [`ShapeCalibration`].

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use super::mouth::{LipShape, ShapeWeights, LIP_SHAPE_COUNT};

/// Reset value for the lower bound; above any real reading
pub const MIN_SENTINEL: f32 = f32::INFINITY;

/// Reset value for the upper bound. Dilation is non-negative, so the floor
/// is zero rather than negative infinity.
pub const MAX_FLOOR: f32 = 0.0;

/// Observed bounds since the last reset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationRange {
    pub min: f32,
    pub max: f32,
}

impl Default for CalibrationRange {
    fn default() -> Self {
        Self {
            min: MIN_SENTINEL,
            max: MAX_FLOOR,
        }
    }
}

impl CalibrationRange {
    /// Widen the bounds to include `value`. Never narrows.
    pub fn observe(&mut self, value: f32) {
        if value > self.max {
            self.max = value;
        }
        if value < self.min {
            self.min = value;
        }
    }

    /// True once at least one value has been observed
    pub fn is_calibrated(&self) -> bool {
        self.min <= self.max
    }

    /// Map `value` into `0.0..=1.0` using the observed bounds
    pub fn normalize(&self, value: f32) -> Option<f32> {
        if !self.is_calibrated() {
            return None;
        }
        let span = self.max - self.min;
        if span <= f32::EPSILON {
            return Some(0.0);
        }
        Some(((value - self.min) / span).clamp(0.0, 1.0))
    }
}

/// Per-shape threshold table reset together with the dilation range
pub trait ShapeCalibration: Send + Sync {
    fn reset_thresholds(&self);
}

/// Default per-shape min/max table for lip weights
#[derive(Debug)]
pub struct ShapeThresholds {
    ranges: Mutex<[CalibrationRange; LIP_SHAPE_COUNT]>,
}

impl Default for ShapeThresholds {
    fn default() -> Self {
        Self {
            ranges: Mutex::new([CalibrationRange::default(); LIP_SHAPE_COUNT]),
        }
    }
}

impl ShapeThresholds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widen every shape's range with one weight table
    pub fn observe(&self, shapes: &ShapeWeights) {
        let mut ranges = self.ranges.lock();
        for (shape, weight) in shapes.iter() {
            ranges[shape.index()].observe(weight);
        }
    }

    pub fn range(&self, shape: LipShape) -> CalibrationRange {
        self.ranges.lock()[shape.index()]
    }
}

impl ShapeCalibration for ShapeThresholds {
    fn reset_thresholds(&self) {
        *self.ranges.lock() = [CalibrationRange::default(); LIP_SHAPE_COUNT];
    }
}

/// Dilation range tracker owned by a tracking session
pub struct CalibrationTracker {
    range: Mutex<CalibrationRange>,
    shapes: Arc<dyn ShapeCalibration>,
}

impl std::fmt::Debug for CalibrationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationTracker")
            .field("range", &*self.range.lock())
            .finish_non_exhaustive()
    }
}

impl CalibrationTracker {
    pub fn new(shapes: Arc<dyn ShapeCalibration>) -> Self {
        Self {
            range: Mutex::new(CalibrationRange::default()),
            shapes,
        }
    }

    /// Widen the dilation range with a new reading
    pub fn observe(&self, value: f32) {
        self.range.lock().observe(value);
    }

    /// Current bounds
    pub fn range(&self) -> CalibrationRange {
        *self.range.lock()
    }

    /// Reset the dilation range and the shape thresholds.
    ///
    /// The range lock is held across both resets, so no caller can observe
    /// one reset without the other.
    pub fn reset(&self) {
        let mut range = self.range.lock();
        *range = CalibrationRange::default();
        self.shapes.reset_thresholds();
        tracing::info!("Tracking calibration thresholds reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingShapes(AtomicUsize);

    impl ShapeCalibration for CountingShapes {
        fn reset_thresholds(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_initial_range() {
        let range = CalibrationRange::default();
        assert_eq!(range.min, MIN_SENTINEL);
        assert_eq!(range.max, 0.0);
        assert!(!range.is_calibrated());
        assert!(range.normalize(3.0).is_none());
    }

    #[test]
    fn test_observe_tracks_extremes() {
        let tracker = CalibrationTracker::new(Arc::new(ShapeThresholds::new()));
        let values = [3.2, 2.9, 4.1, 3.7, 2.5, 3.0];
        for v in values {
            tracker.observe(v);
        }

        let range = tracker.range();
        assert_eq!(range.min, 2.5);
        assert_eq!(range.max, 4.1);
        assert!(range.is_calibrated());
    }

    #[test]
    fn test_first_observation_widens_both_bounds() {
        let mut range = CalibrationRange::default();
        range.observe(3.5);
        assert_eq!(range.min, 3.5);
        assert_eq!(range.max, 3.5);
    }

    #[test]
    fn test_never_narrows() {
        let mut range = CalibrationRange::default();
        range.observe(2.0);
        range.observe(5.0);
        range.observe(3.0);
        assert_eq!((range.min, range.max), (2.0, 5.0));
    }

    #[test]
    fn test_reset_is_asymmetric() {
        let shapes = Arc::new(CountingShapes::default());
        let tracker = CalibrationTracker::new(shapes.clone());
        tracker.observe(7.0);
        tracker.observe(1.0);

        tracker.reset();

        let range = tracker.range();
        assert_eq!(range.min, MIN_SENTINEL);
        assert_eq!(range.max, 0.0);
        assert_eq!(shapes.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_negative_reading_leaves_max_at_floor() {
        let mut range = CalibrationRange::default();
        range.observe(-1.0);
        assert_eq!(range.min, -1.0);
        assert_eq!(range.max, MAX_FLOOR);
    }

    #[test]
    fn test_normalize() {
        let mut range = CalibrationRange::default();
        range.observe(2.0);
        range.observe(6.0);
        assert_eq!(range.normalize(4.0), Some(0.5));
        assert_eq!(range.normalize(10.0), Some(1.0));
        assert_eq!(range.normalize(0.0), Some(0.0));
    }

    #[test]
    fn test_shape_thresholds() {
        let table = ShapeThresholds::new();
        let mut shapes = ShapeWeights::default();
        shapes.set(LipShape::JawOpen, 0.8);
        table.observe(&shapes);
        shapes.set(LipShape::JawOpen, 0.2);
        table.observe(&shapes);

        let jaw = table.range(LipShape::JawOpen);
        assert_eq!((jaw.min, jaw.max), (0.2, 0.8));

        table.reset_thresholds();
        assert_eq!(table.range(LipShape::JawOpen), CalibrationRange::default());
    }
}
