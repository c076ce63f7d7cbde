//! Lip tracking frames, shape weights and the lip camera image

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Number of v2 lip shapes
pub const LIP_SHAPE_COUNT: usize = 37;

/// Lip camera image width in pixels
pub const MOUTH_IMAGE_WIDTH: usize = 800;

/// Lip camera image height in pixels
pub const MOUTH_IMAGE_HEIGHT: usize = 400;

/// The v2 lip shapes, in runtime weight order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LipShape {
    JawRight,
    JawLeft,
    JawForward,
    JawOpen,
    MouthApeShape,
    MouthUpperRight,
    MouthUpperLeft,
    MouthLowerRight,
    MouthLowerLeft,
    MouthUpperOverturn,
    MouthLowerOverturn,
    MouthPout,
    MouthSmileRight,
    MouthSmileLeft,
    MouthSadRight,
    MouthSadLeft,
    CheekPuffRight,
    CheekPuffLeft,
    CheekSuck,
    MouthUpperUpRight,
    MouthUpperUpLeft,
    MouthLowerDownRight,
    MouthLowerDownLeft,
    MouthUpperInside,
    MouthLowerInside,
    MouthLowerOverlay,
    TongueLongStep1,
    TongueLeft,
    TongueRight,
    TongueUp,
    TongueDown,
    TongueRoll,
    TongueLongStep2,
    TongueUpRightMorph,
    TongueUpLeftMorph,
    TongueDownRightMorph,
    TongueDownLeftMorph,
}

impl LipShape {
    pub const ALL: [LipShape; LIP_SHAPE_COUNT] = [
        Self::JawRight,
        Self::JawLeft,
        Self::JawForward,
        Self::JawOpen,
        Self::MouthApeShape,
        Self::MouthUpperRight,
        Self::MouthUpperLeft,
        Self::MouthLowerRight,
        Self::MouthLowerLeft,
        Self::MouthUpperOverturn,
        Self::MouthLowerOverturn,
        Self::MouthPout,
        Self::MouthSmileRight,
        Self::MouthSmileLeft,
        Self::MouthSadRight,
        Self::MouthSadLeft,
        Self::CheekPuffRight,
        Self::CheekPuffLeft,
        Self::CheekSuck,
        Self::MouthUpperUpRight,
        Self::MouthUpperUpLeft,
        Self::MouthLowerDownRight,
        Self::MouthLowerDownLeft,
        Self::MouthUpperInside,
        Self::MouthLowerInside,
        Self::MouthLowerOverlay,
        Self::TongueLongStep1,
        Self::TongueLeft,
        Self::TongueRight,
        Self::TongueUp,
        Self::TongueDown,
        Self::TongueRoll,
        Self::TongueLongStep2,
        Self::TongueUpRightMorph,
        Self::TongueUpLeftMorph,
        Self::TongueDownRightMorph,
        Self::TongueDownLeftMorph,
    ];

    /// Position of this shape in the runtime weight array
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Per-shape weights derived from one lip frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeWeights(pub [f32; LIP_SHAPE_COUNT]);

impl Default for ShapeWeights {
    fn default() -> Self {
        Self([0.0; LIP_SHAPE_COUNT])
    }
}

impl ShapeWeights {
    pub fn get(&self, shape: LipShape) -> f32 {
        self.0[shape.index()]
    }

    pub fn set(&mut self, shape: LipShape, weight: f32) {
        self.0[shape.index()] = weight;
    }

    /// Iterate over `(shape, weight)` pairs in runtime order
    pub fn iter(&self) -> impl Iterator<Item = (LipShape, f32)> + '_ {
        LipShape::ALL.iter().map(move |&shape| (shape, self.get(shape)))
    }
}

// Serialized as a shape-name map
impl Serialize for ShapeWeights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(LIP_SHAPE_COUNT))?;
        for (shape, weight) in self.iter() {
            map.serialize_entry(&shape, &weight)?;
        }
        map.end()
    }
}

/// One raw lip frame as reported by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MouthFrame {
    /// Runtime frame counter
    pub frame_sequence: i32,
    /// Runtime timestamp in milliseconds
    pub timestamp_ms: i32,
    /// Raw prediction weights, one per [`LipShape`]
    #[serde(serialize_with = "serialize_weights")]
    pub blend_shape_weight: [f32; LIP_SHAPE_COUNT],
}

impl Default for MouthFrame {
    fn default() -> Self {
        Self {
            frame_sequence: 0,
            timestamp_ms: 0,
            blend_shape_weight: [0.0; LIP_SHAPE_COUNT],
        }
    }
}

fn serialize_weights<S: Serializer>(
    weights: &[f32; LIP_SHAPE_COUNT],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    weights.as_slice().serialize(serializer)
}

impl MouthFrame {
    /// Derive the shape weight table from the raw prediction
    pub fn shape_weights(&self) -> ShapeWeights {
        ShapeWeights(self.blend_shape_weight)
    }
}

/// A lip frame and the shape weights read alongside it.
///
/// Published as one value so readers never pair a frame with weights from a
/// different poll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MouthSample {
    pub frame: MouthFrame,
    pub shapes: ShapeWeights,
}

/// Single-channel 8-bit lip camera picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouthImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl MouthImage {
    /// Allocate a zeroed 800x400 buffer
    pub fn new() -> Self {
        Self {
            width: MOUTH_IMAGE_WIDTH,
            height: MOUTH_IMAGE_HEIGHT,
            pixels: vec![0; MOUTH_IMAGE_WIDTH * MOUTH_IMAGE_HEIGHT],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }
}

impl Default for MouthImage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_order_matches_index() {
        for (i, shape) in LipShape::ALL.iter().enumerate() {
            assert_eq!(shape.index(), i);
        }
        assert_eq!(LipShape::TongueDownLeftMorph.index(), LIP_SHAPE_COUNT - 1);
    }

    #[test]
    fn test_shape_weights_from_frame() {
        let mut frame = MouthFrame::default();
        frame.blend_shape_weight[LipShape::JawOpen.index()] = 0.75;

        let shapes = frame.shape_weights();
        assert!((shapes.get(LipShape::JawOpen) - 0.75).abs() < 1e-6);
        assert_eq!(shapes.get(LipShape::MouthPout), 0.0);
        assert_eq!(shapes.iter().count(), LIP_SHAPE_COUNT);
    }

    #[test]
    fn test_serialize_shapes_by_name() {
        let mut shapes = ShapeWeights::default();
        shapes.set(LipShape::JawOpen, 0.5);

        let value = serde_json::to_value(shapes).unwrap();
        assert_eq!(value["JawOpen"], 0.5);
        assert_eq!(value.as_object().unwrap().len(), LIP_SHAPE_COUNT);

        let frame = MouthFrame::default();
        let value = serde_json::to_value(frame).unwrap();
        assert_eq!(value["blend_shape_weight"].as_array().unwrap().len(), LIP_SHAPE_COUNT);
    }

    #[test]
    fn test_mouth_image_dimensions() {
        let image = MouthImage::new();
        assert_eq!(image.width, 800);
        assert_eq!(image.height, 400);
        assert_eq!(image.pixels.len(), 800 * 400);
        assert_eq!(image.pixel(799, 399), Some(0));
        assert_eq!(image.pixel(800, 0), None);
    }
}
