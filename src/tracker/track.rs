//! Single object track and the frozen trajectory it leaves behind.

use nalgebra::Point2;
use serde::Serialize;

use crate::geometry::Rect;
use crate::tracker::detection::{ClassId, Detection};
use crate::tracker::motion::{MotionModel, MotionState};
use crate::tracker::track_state::TrackState;

/// Session-unique track identifier.
pub type TrackId = u64;

/// One entry of a track's position history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackPoint {
    pub frame_index: u64,
    pub timestamp: f64,
    pub bbox: Rect,
    /// True when the box was extrapolated for a frame without a matching detection
    pub predicted: bool,
}

impl TrackPoint {
    #[inline]
    pub fn center(&self) -> Point2<f32> {
        self.bbox.center()
    }
}

/// Single object track, owned and mutated by the `TrackManager`.
#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    state: TrackState,
    points: Vec<TrackPoint>,
    motion: MotionState,
    /// Class votes in first-seen order
    class_votes: Vec<(ClassId, u32)>,
    score: f32,
    start_frame: u64,
    last_matched_frame: u64,
    hits: u32,
    consecutive_hits: u32,
    predicted: Rect,
    max_history: usize,
}

impl Track {
    pub(crate) fn new(
        id: TrackId,
        detection: &Detection,
        frame_index: u64,
        timestamp: f64,
        motion: &MotionModel,
        max_history: usize,
    ) -> Self {
        Self {
            id,
            state: TrackState::Tentative,
            points: vec![TrackPoint {
                frame_index,
                timestamp,
                bbox: detection.bbox,
                predicted: false,
            }],
            motion: MotionState::new(motion, frame_index, detection.bbox),
            class_votes: vec![(detection.class_id, 1)],
            score: detection.score,
            start_frame: frame_index,
            last_matched_frame: frame_index,
            hits: 1,
            consecutive_hits: 1,
            predicted: detection.bbox,
            max_history: max_history.max(2),
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Majority-vote class label; the earliest seen label wins ties.
    pub fn class_id(&self) -> ClassId {
        let mut best = self.class_votes[0];
        for &(class, votes) in &self.class_votes[1..] {
            if votes > best.1 {
                best = (class, votes);
            }
        }
        best.0
    }

    /// Confidence of the last matched detection.
    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn last_matched_frame(&self) -> u64 {
        self.last_matched_frame
    }

    /// Frames elapsed since the track was created.
    pub fn age(&self, frame_index: u64) -> u64 {
        frame_index.saturating_sub(self.start_frame)
    }

    /// Frames elapsed since the track last matched a detection.
    pub fn frames_since_match(&self, frame_index: u64) -> u64 {
        frame_index.saturating_sub(self.last_matched_frame)
    }

    /// Number of matched detections over the track's life.
    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn consecutive_hits(&self) -> u32 {
        self.consecutive_hits
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Box predicted for the frame currently being processed.
    pub fn predicted_box(&self) -> Rect {
        self.predicted
    }

    /// Most recent box, observed or predicted.
    pub fn current_box(&self) -> Rect {
        self.points.last().map_or(self.predicted, |p| p.bbox)
    }

    pub(crate) fn predict(&mut self, frame_index: u64) -> Rect {
        self.predicted = self.motion.predict(frame_index);
        self.predicted
    }

    pub(crate) fn observe(&mut self, detection: &Detection, frame_index: u64, timestamp: f64) {
        self.push_point(TrackPoint {
            frame_index,
            timestamp,
            bbox: detection.bbox,
            predicted: false,
        });
        self.motion.correct(frame_index, detection.bbox);

        match self.class_votes.iter_mut().find(|(c, _)| *c == detection.class_id) {
            Some((_, votes)) => *votes += 1,
            None => self.class_votes.push((detection.class_id, 1)),
        }

        self.score = detection.score;
        self.last_matched_frame = frame_index;
        self.hits += 1;
        self.consecutive_hits += 1;
    }

    /// Record a frame without a match, extending the history with the prediction.
    pub(crate) fn mark_missed(&mut self, frame_index: u64, timestamp: f64) {
        self.consecutive_hits = 0;
        let advanced = self.points.last().is_none_or(|p| p.frame_index < frame_index);
        if advanced {
            self.push_point(TrackPoint {
                frame_index,
                timestamp,
                bbox: self.predicted,
                predicted: true,
            });
        }
    }

    /// Apply a lifecycle transition, refusing anything that would run the
    /// state machine backwards.
    pub(crate) fn transition(&mut self, next: TrackState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    fn push_point(&mut self, point: TrackPoint) {
        self.points.push(point);
        if self.points.len() > self.max_history {
            // Halve the interior, keeping both endpoints.
            let last = self.points.len() - 1;
            let mut i = 0;
            self.points.retain(|_| {
                let keep = i == 0 || i == last || i % 2 == 0;
                i += 1;
                keep
            });
        }
    }

    /// Freeze the track. Trailing predictions are dropped so the trajectory
    /// ends on the last real observation.
    pub(crate) fn into_trajectory(mut self) -> Trajectory {
        while self.points.last().is_some_and(|p| p.predicted) {
            self.points.pop();
        }
        Trajectory {
            track_id: self.id,
            class_id: self.class_id(),
            observations: self.hits,
            points: self.points,
        }
    }
}

/// The read-only position history of a terminated track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    pub track_id: TrackId,
    pub class_id: ClassId,
    /// Number of matched detections, independent of history thinning
    pub observations: u32,
    pub points: Vec<TrackPoint>,
}

impl Trajectory {
    /// Build a trajectory from observed centre points, one per frame starting
    /// at frame zero. Useful for replaying stored tracks through a classifier.
    pub fn from_centers(track_id: TrackId, class_id: ClassId, centers: &[(f32, f32)]) -> Self {
        let points = centers
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| TrackPoint {
                frame_index: i as u64,
                timestamp: i as f64,
                bbox: Rect::from_center(x, y, 1.0, 1.0),
                predicted: false,
            })
            .collect();
        Self {
            track_id,
            class_id,
            observations: centers.len() as u32,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_observed(&self) -> Option<&TrackPoint> {
        self.points.iter().find(|p| !p.predicted)
    }

    pub fn last_observed(&self) -> Option<&TrackPoint> {
        self.points.iter().rev().find(|p| !p.predicted)
    }

    /// Centres of the observed points, in frame order.
    pub fn observed_centers(&self) -> Vec<Point2<f32>> {
        self.points
            .iter()
            .filter(|p| !p.predicted)
            .map(TrackPoint::center)
            .collect()
    }

    pub fn start_frame(&self) -> Option<u64> {
        self.points.first().map(|p| p.frame_index)
    }

    pub fn end_frame(&self) -> Option<u64> {
        self.points.last().map(|p| p.frame_index)
    }

    /// Timestamp of the last observation, or zero for an empty trajectory.
    pub fn end_timestamp(&self) -> f64 {
        self.last_observed().map_or(0.0, |p| p.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, class_id: ClassId) -> Detection {
        Detection::new(x, 0.0, 10.0, 10.0, class_id, 0.9)
    }

    #[test]
    fn test_majority_class_first_seen_wins_ties() {
        let mut track = Track::new(1, &det(0.0, 2), 0, 0.0, &MotionModel::default(), 64);
        track.observe(&det(1.0, 7), 1, 0.1);
        assert_eq!(track.class_id(), 2);
        track.observe(&det(2.0, 7), 2, 0.2);
        assert_eq!(track.class_id(), 7);
    }

    #[test]
    fn test_missed_frames_fill_then_trim() {
        let mut track = Track::new(1, &det(0.0, 1), 0, 0.0, &MotionModel::default(), 64);
        track.observe(&det(2.0, 1), 1, 0.1);
        track.predict(2);
        track.mark_missed(2, 0.2);
        track.observe(&det(6.0, 1), 3, 0.3);
        track.predict(4);
        track.mark_missed(4, 0.4);
        track.predict(5);
        track.mark_missed(5, 0.5);
        assert_eq!(track.points().len(), 6);
        assert_eq!(track.frames_since_match(5), 2);

        let trajectory = track.into_trajectory();
        // The gap at frame 2 survives, the tail at 4 and 5 does not.
        assert_eq!(trajectory.len(), 4);
        assert!(trajectory.points[2].predicted);
        assert_eq!(trajectory.end_frame(), Some(3));
        assert_eq!(trajectory.observations, 3);
        assert_eq!(trajectory.observed_centers().len(), 3);
        assert!((trajectory.end_timestamp() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut track = Track::new(1, &det(0.0, 1), 0, 0.0, &MotionModel::default(), 8);
        for frame in 1..100u64 {
            track.observe(&det(frame as f32, 1), frame, frame as f64);
        }
        assert!(track.points().len() <= 8);
        assert_eq!(track.points()[0].frame_index, 0);
        assert_eq!(track.points().last().map(|p| p.frame_index), Some(99));
        assert_eq!(track.hits(), 100);
    }

    #[test]
    fn test_transition_refuses_reversal() {
        let mut track = Track::new(1, &det(0.0, 1), 0, 0.0, &MotionModel::default(), 8);
        assert!(!track.transition(TrackState::Lost));
        assert!(track.transition(TrackState::Confirmed));
        assert!(track.transition(TrackState::Lost));
        assert!(track.transition(TrackState::Confirmed));
        assert!(track.transition(TrackState::Terminated));
        assert!(!track.transition(TrackState::Confirmed));
    }
}
