//! Detector output consumed by the tracker.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Class label as produced by the detector.
pub type ClassId = u32;

/// A single detector output: box, class label and confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box in TLWH pixel coordinates
    pub bbox: Rect,
    /// Detector class label
    pub class_id: ClassId,
    /// Detection confidence score
    pub score: f32,
}

impl Detection {
    /// Create a detection from a TLWH box.
    pub fn new(x: f32, y: f32, w: f32, h: f32, class_id: ClassId, score: f32) -> Self {
        Self {
            bbox: Rect::new(x, y, w, h),
            class_id,
            score,
        }
    }

    pub fn from_rect(bbox: Rect, class_id: ClassId, score: f32) -> Self {
        Self {
            bbox,
            class_id,
            score,
        }
    }
}

/// All detections for one video frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Position of the frame in the stream
    pub index: u64,
    /// Seconds since the start of the stream
    pub timestamp: f64,
    pub detections: Vec<Detection>,
}

impl Frame {
    pub fn new(index: u64, timestamp: f64, detections: Vec<Detection>) -> Self {
        Self {
            index,
            timestamp,
            detections,
        }
    }

    /// A frame at `index` with its timestamp derived from a constant frame rate.
    pub fn at_rate(index: u64, fps: f64, detections: Vec<Detection>) -> Self {
        let timestamp = if fps > 0.0 { index as f64 / fps } else { 0.0 };
        Self::new(index, timestamp, detections)
    }
}
