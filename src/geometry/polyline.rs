//! Open polylines and the path distances used to compare trajectories with
//! reference movement paths.

use nalgebra::{Point2, Vector2, distance};

use super::{GeometryError, point_segment_distance};

/// An open polyline with at least two points and non-zero length.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    points: Vec<Point2<f32>>,
}

impl Polyline {
    pub fn new(points: Vec<Point2<f32>>) -> Result<Self, GeometryError> {
        if points.len() < 2 {
            return Err(GeometryError::TooFewVertices {
                required: 2,
                got: points.len(),
            });
        }
        if points.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(GeometryError::NonFinite);
        }
        if path_length(&points) <= f32::EPSILON {
            return Err(GeometryError::ZeroLength);
        }
        Ok(Self { points })
    }

    pub fn from_pairs(pairs: &[[f32; 2]]) -> Result<Self, GeometryError> {
        Self::new(pairs.iter().map(|&[x, y]| Point2::new(x, y)).collect())
    }

    pub fn points(&self) -> &[Point2<f32>] {
        &self.points
    }

    pub fn length(&self) -> f32 {
        path_length(&self.points)
    }

    /// Vector from the first to the last point.
    pub fn direction(&self) -> Vector2<f32> {
        displacement(&self.points)
    }

    /// Shortest distance from `p` to any segment.
    pub fn distance_to(&self, p: &Point2<f32>) -> f32 {
        polyline_distance(p, &self.points)
    }

    pub fn resample(&self, count: usize) -> Vec<Point2<f32>> {
        resample(&self.points, count)
    }
}

/// Total arc length of a point sequence.
pub fn path_length(points: &[Point2<f32>]) -> f32 {
    points.windows(2).map(|w| distance(&w[0], &w[1])).sum()
}

/// Vector from the first to the last point, zero for fewer than two points.
pub fn displacement(points: &[Point2<f32>]) -> Vector2<f32> {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => last - first,
        _ => Vector2::zeros(),
    }
}

fn polyline_distance(p: &Point2<f32>, points: &[Point2<f32>]) -> f32 {
    match points {
        [] => f32::INFINITY,
        [only] => distance(p, only),
        _ => points
            .windows(2)
            .map(|w| point_segment_distance(p, &w[0], &w[1]))
            .fold(f32::INFINITY, f32::min),
    }
}

/// Resample a path to `count` points evenly spaced by arc length. The first
/// and last points are kept exactly. A zero-length path yields `count`
/// copies of its first point; an empty path yields nothing.
pub fn resample(points: &[Point2<f32>], count: usize) -> Vec<Point2<f32>> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![first];
    }

    let total = path_length(points);
    if total <= f32::EPSILON {
        return vec![first; count];
    }

    let step = total / (count - 1) as f32;
    let mut out = Vec::with_capacity(count);
    out.push(first);

    let mut segment = 0;
    let mut walked = 0.0;
    for i in 1..count - 1 {
        let target = step * i as f32;
        while segment + 1 < points.len() - 1
            && walked + distance(&points[segment], &points[segment + 1]) < target
        {
            walked += distance(&points[segment], &points[segment + 1]);
            segment += 1;
        }
        let a = points[segment];
        let b = points[segment + 1];
        let seg_len = distance(&a, &b);
        let t = if seg_len > 0.0 {
            ((target - walked) / seg_len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(a + (b - a) * t);
    }

    if let Some(&last) = points.last() {
        out.push(last);
    }
    out
}

/// Average distance from each sample to the reference polyline.
pub fn mean_distance(samples: &[Point2<f32>], reference: &Polyline) -> f32 {
    if samples.is_empty() {
        return f32::INFINITY;
    }
    samples.iter().map(|p| reference.distance_to(p)).sum::<f32>() / samples.len() as f32
}

/// Symmetric Hausdorff distance between two paths, measuring each point
/// against the other path's segments rather than its vertices.
pub fn hausdorff(a: &[Point2<f32>], b: &[Point2<f32>]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return f32::INFINITY;
    }
    let directed = |from: &[Point2<f32>], to: &[Point2<f32>]| {
        from.iter()
            .map(|p| polyline_distance(p, to))
            .fold(0.0_f32, f32::max)
    };
    directed(a, b).max(directed(b, a))
}

/// Dynamic time warping distance, normalised by the length of the warping
/// path so that it stays comparable to a per-point pixel distance.
pub fn dtw(a: &[Point2<f32>], b: &[Point2<f32>]) -> f32 {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return f32::INFINITY;
    }

    // (accumulated cost, steps) per cell, rolling two rows.
    let mut prev = vec![(f32::INFINITY, 0usize); m + 1];
    let mut curr = vec![(f32::INFINITY, 0usize); m + 1];
    prev[0] = (0.0, 0);

    for i in 1..=n {
        curr[0] = (f32::INFINITY, 0);
        for j in 1..=m {
            let cost = distance(&a[i - 1], &b[j - 1]);
            let best = [prev[j - 1], prev[j], curr[j - 1]]
                .into_iter()
                .min_by(|x, y| x.0.total_cmp(&y.0))
                .unwrap_or((f32::INFINITY, 0));
            curr[j] = (best.0 + cost, best.1 + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let (total, steps) = prev[m];
    if steps == 0 { f32::INFINITY } else { total / steps as f32 }
}

/// Angle in degrees between two direction vectors, `None` if either is zero.
pub fn angle_between(u: &Vector2<f32>, v: &Vector2<f32>) -> Option<f32> {
    let nu = u.norm();
    let nv = v.norm();
    if nu <= f32::EPSILON || nv <= f32::EPSILON {
        return None;
    }
    let cos = (u.dot(v) / (nu * nv)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}
