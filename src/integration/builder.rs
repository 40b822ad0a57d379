use crate::geometry::Rect;
use crate::tracker::{ClassId, Detection};

/// Builder for `Detection`s from whatever box convention a detector emits.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    bbox: Rect,
    class_id: ClassId,
    score: f32,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corners `(x1, y1)` and `(x2, y2)`, as most YOLO heads emit them.
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Centre and size.
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::from_center(cx, cy, w, h);
        self
    }

    /// Top-left corner and size.
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(x, y, w, h);
        self
    }

    pub fn class_id(mut self, class_id: ClassId) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn build(self) -> Detection {
        Detection::from_rect(self.bbox, self.class_id, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_formats_agree() {
        let a = DetectionBuilder::new().tlbr(10.0, 20.0, 50.0, 80.0).build();
        let b = DetectionBuilder::new().tlwh(10.0, 20.0, 40.0, 60.0).build();
        let c = DetectionBuilder::new().xywh(30.0, 50.0, 40.0, 60.0).build();
        assert_eq!(a.bbox, b.bbox);
        assert_eq!(a.bbox, c.bbox);
    }

    #[test]
    fn test_class_and_score() {
        let det = DetectionBuilder::new()
            .tlwh(0.0, 0.0, 5.0, 5.0)
            .class_id(2)
            .score(0.95)
            .build();
        assert_eq!(det.class_id, 2);
        assert_eq!(det.score, 0.95);
    }
}
