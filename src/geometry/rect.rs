use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Axis-aligned detection box in pixel coordinates, stored as top-left
/// corner plus size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box spanning two opposite corners, given as `(x1, y1, x2, y2)`.
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    #[inline]
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    /// Inverse of [`Rect::to_xyah`].
    #[inline]
    pub fn from_xyah(cx: f32, cy: f32, aspect_ratio: f32, height: f32) -> Self {
        Self::from_center(cx, cy, aspect_ratio * height, height)
    }

    /// Centre, aspect ratio (w/h) and height: the motion filter's measurement.
    pub fn to_xyah(&self) -> [f32; 4] {
        let c = self.center();
        let aspect_ratio = if self.height > 0.0 { self.width / self.height } else { 0.0 };
        [c.x, c.y, aspect_ratio, self.height]
    }

    #[inline]
    pub fn top_left(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn bottom_right(&self) -> Point2<f32> {
        Point2::new(self.x + self.width, self.y + self.height)
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        self.top_left() + Vector2::new(self.width, self.height) / 2.0
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// The same box moved by `(dx, dy)`.
    #[inline]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Non-finite coordinates or a side that is not strictly positive.
    pub fn is_degenerate(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        !finite || self.width <= 0.0 || self.height <= 0.0
    }

    /// Overlapping part of two boxes, if their interiors meet.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let (a, b) = (self.bottom_right(), other.bottom_right());
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = a.x.min(b.x);
        let y2 = a.y.min(b.y);
        (x2 > x1 && y2 > y1).then(|| Rect::from_tlbr(x1, y1, x2, y2))
    }

    /// Intersection over union; zero for disjoint or empty boxes.
    pub fn iou(&self, other: &Rect) -> f32 {
        let Some(overlap) = self.intersection(other) else {
            return 0.0;
        };
        let inter = overlap.area();
        let union = self.area() + other.area() - inter;
        if union > 0.0 { inter / union } else { 0.0 }
    }
}
