//! Shared 2D geometry: detection boxes, region polygons and reference paths.

mod polygon;
mod polyline;
mod rect;

use nalgebra::{Point2, distance};
use thiserror::Error;

pub use polygon::Polygon;
pub use polyline::{
    Polyline, angle_between, displacement, dtw, hausdorff, mean_distance, path_length, resample,
};
pub use rect::Rect;

/// Shape construction failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("need at least {required} points, got {got}")]
    TooFewVertices { required: usize, got: usize },
    #[error("coordinates must be finite")]
    NonFinite,
    #[error("polygon has zero area")]
    ZeroArea,
    #[error("polyline has zero length")]
    ZeroLength,
}

/// Distance from `p` to the segment `a`-`b`.
pub(crate) fn point_segment_distance(p: &Point2<f32>, a: &Point2<f32>, b: &Point2<f32>) -> f32 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f32::EPSILON {
        return distance(p, a);
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    distance(p, &(a + ab * t))
}
