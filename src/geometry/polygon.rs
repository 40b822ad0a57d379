//! Simple polygons used as entry/exit regions and regions of interest.

use nalgebra::{Point2, Vector2};

use super::{GeometryError, point_segment_distance};

/// Points closer than this to an edge are treated as lying on it.
const EDGE_EPSILON: f32 = 1e-4;

/// A closed, simple polygon in pixel space. The last vertex connects back to
/// the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point2<f32>>,
}

impl Polygon {
    /// Build a polygon, rejecting fewer than three vertices, non-finite
    /// coordinates and zero area.
    pub fn new(vertices: Vec<Point2<f32>>) -> Result<Self, GeometryError> {
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices {
                required: 3,
                got: vertices.len(),
            });
        }
        if vertices.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(GeometryError::NonFinite);
        }
        let polygon = Self { vertices };
        if polygon.area() <= f32::EPSILON {
            return Err(GeometryError::ZeroArea);
        }
        Ok(polygon)
    }

    /// Build a polygon from `[x, y]` pairs, the layout used in camera files.
    pub fn from_pairs(pairs: &[[f32; 2]]) -> Result<Self, GeometryError> {
        Self::new(pairs.iter().map(|&[x, y]| Point2::new(x, y)).collect())
    }

    pub fn vertices(&self) -> &[Point2<f32>] {
        &self.vertices
    }

    /// Iterate over the edges as `(start, end)` pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point2<f32>, Point2<f32>)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area.
    pub fn area(&self) -> f32 {
        let twice: f32 = self.edges().map(|(a, b)| a.x * b.y - b.x * a.y).sum();
        twice.abs() / 2.0
    }

    /// Mean of the vertices.
    pub fn centroid(&self) -> Point2<f32> {
        let n = self.vertices.len() as f32;
        let (sx, sy) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2::new(sx / n, sy / n)
    }

    /// Distance from `p` to the nearest edge.
    pub fn boundary_distance(&self, p: &Point2<f32>) -> f32 {
        self.edges()
            .map(|(a, b)| point_segment_distance(p, &a, &b))
            .fold(f32::INFINITY, f32::min)
    }

    /// Even-odd ray cast, ignoring the boundary.
    fn ray_cast(&self, p: &Point2<f32>) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Point containment. Points on the boundary count as inside.
    pub fn contains(&self, p: &Point2<f32>) -> bool {
        self.boundary_distance(p) <= EDGE_EPSILON || self.ray_cast(p)
    }

    /// Signed distance to the boundary: positive inside, negative outside,
    /// zero on an edge.
    pub fn signed_depth(&self, p: &Point2<f32>) -> f32 {
        let distance = self.boundary_distance(p);
        if distance <= EDGE_EPSILON {
            0.0
        } else if self.ray_cast(p) {
            distance
        } else {
            -distance
        }
    }

    /// True when the interiors of the two polygons intersect. Polygons that
    /// only share edges or vertices do not overlap.
    pub fn overlaps(&self, other: &Polygon) -> bool {
        self.shares_interior_along_edges(other) || other.shares_interior_along_edges(self)
    }

    /// Any non-empty intersection of the interiors is bounded by a piece of
    /// one polygon's edges. Each edge of `self` is cut wherever `other`
    /// touches it, and a point just off both sides of every piece is tested
    /// against both interiors.
    fn shares_interior_along_edges(&self, other: &Polygon) -> bool {
        self.edges().any(|(a, b)| {
            edge_cuts(&a, &b, other).windows(2).any(|w| {
                let (p, q) = (a + (b - a) * w[0], a + (b - a) * w[1]);
                let piece = q - p;
                let len = piece.norm();
                if len <= EDGE_EPSILON {
                    return false;
                }
                let mid = p + piece / 2.0;
                let clearance = self
                    .edges()
                    .chain(other.edges())
                    .map(|(c, d)| point_segment_distance(&mid, &c, &d))
                    .filter(|d| *d > EDGE_EPSILON)
                    .fold(f32::INFINITY, f32::min);
                let offset = (len / 4.0).min(clearance / 2.0).min(0.5);
                let normal = Vector2::new(-piece.y, piece.x) / len;
                [mid + normal * offset, mid - normal * offset]
                    .iter()
                    .any(|s| self.ray_cast(s) && other.ray_cast(s))
            })
        })
    }
}

/// Sorted parameters along `a -> b` where `other` touches the segment: its
/// vertices lying on it and crossings with its edges, plus both endpoints.
fn edge_cuts(a: &Point2<f32>, b: &Point2<f32>, other: &Polygon) -> Vec<f32> {
    let r = b - a;
    let len_sq = r.norm_squared();
    let mut cuts = vec![0.0, 1.0];
    if len_sq <= f32::EPSILON {
        return cuts;
    }
    for v in other.vertices() {
        if point_segment_distance(v, a, b) <= EDGE_EPSILON {
            cuts.push(((v - a).dot(&r) / len_sq).clamp(0.0, 1.0));
        }
    }
    for (c, d) in other.edges() {
        let s = d - c;
        let denom = r.perp(&s);
        // Parallel edges only meet at vertices, handled above.
        if denom.abs() <= f32::EPSILON {
            continue;
        }
        let t = (c - a).perp(&s) / denom;
        let u = (c - a).perp(&r) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            cuts.push(t);
        }
    }
    cuts.sort_by(f32::total_cmp);
    cuts.dedup_by(|x, y| (*x - *y).abs() <= f32::EPSILON);
    cuts
}
