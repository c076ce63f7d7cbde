//! Latest-sample store shared between the sampling thread and consumers
//!
//! Each subsystem has its own lock holding an `Arc` to an immutable frame.
//! Publishing swaps the whole `Arc`, so a reader always gets a complete frame
//! from a single poll. Gaze and mouth never contend for the same lock.

use parking_lot::RwLock;
use std::sync::Arc;

use super::gaze::GazeFrame;
use super::mouth::{MouthFrame, MouthSample, ShapeWeights};

/// Most recent frame per subsystem
#[derive(Debug, Default)]
pub struct SampleStore {
    gaze: RwLock<Option<Arc<GazeFrame>>>,
    mouth: RwLock<Option<Arc<MouthSample>>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest gaze frame
    pub fn publish_gaze(&self, frame: GazeFrame) {
        let frame = Arc::new(frame);
        *self.gaze.write() = Some(frame);
    }

    /// Replace the latest mouth frame and its shape weights together
    pub fn publish_mouth(&self, frame: MouthFrame, shapes: ShapeWeights) {
        let sample = Arc::new(MouthSample { frame, shapes });
        *self.mouth.write() = Some(sample);
    }

    /// Latest gaze frame, or `None` before the first successful poll
    pub fn latest_gaze(&self) -> Option<Arc<GazeFrame>> {
        self.gaze.read().clone()
    }

    /// Latest mouth sample, or `None` before the first successful poll
    pub fn latest_mouth(&self) -> Option<Arc<MouthSample>> {
        self.mouth.read().clone()
    }

    /// Forget all published frames
    pub fn clear(&self) {
        *self.gaze.write() = None;
        *self.mouth.write() = None;
    }
}
