//! Per-frame track lifecycle management.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::error::ConfigError;
use crate::geometry::Polygon;
use crate::session::SessionContext;
use crate::tracker::associator::{Associator, AssociatorConfig, TrackCandidate};
use crate::tracker::detection::{Detection, Frame};
use crate::tracker::motion::MotionModel;
use crate::tracker::track::{Track, TrackId, Trajectory};
use crate::tracker::track_state::TrackState;

/// Configuration for the `TrackManager`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Consecutive matches needed to confirm a tentative track
    pub min_hits: u32,
    /// Missed frames a tentative track survives before it is discarded
    pub tentative_tolerance: u64,
    /// Missed frames before a confirmed track is considered lost
    pub lost_tolerance: u64,
    /// Missed frames before a track is terminated
    pub terminate_tolerance: u64,
    /// Association gate on `1 - IoU` plus class penalty
    pub max_cost: f32,
    /// Optional association gate on centre displacement, in pixels
    pub max_center_distance: Option<f32>,
    pub class_mismatch_penalty: f32,
    /// Detections below this confidence are dropped
    pub min_confidence: f32,
    /// Upper bound on stored positions per track
    pub max_history: usize,
    pub motion: MotionModel,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_hits: 3,
            tentative_tolerance: 0,
            lost_tolerance: 1,
            terminate_tolerance: 30,
            max_cost: 0.7,
            max_center_distance: None,
            class_mismatch_penalty: 0.2,
            min_confidence: 0.1,
            max_history: 2048,
            motion: MotionModel::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &'static str, reason: &'static str| {
            Err(ConfigError::InvalidParameter { name, reason })
        };
        if self.min_hits == 0 {
            return invalid("min_hits", "must be at least 1");
        }
        if self.terminate_tolerance < self.lost_tolerance {
            return invalid("terminate_tolerance", "must not be smaller than lost_tolerance");
        }
        if !(self.max_cost.is_finite() && self.max_cost >= 0.0) {
            return invalid("max_cost", "must be finite and non-negative");
        }
        if let Some(d) = self.max_center_distance {
            if !(d.is_finite() && d > 0.0) {
                return invalid("max_center_distance", "must be finite and positive");
            }
        }
        if !(self.class_mismatch_penalty.is_finite() && self.class_mismatch_penalty >= 0.0) {
            return invalid("class_mismatch_penalty", "must be finite and non-negative");
        }
        if !self.min_confidence.is_finite() {
            return invalid("min_confidence", "must be finite");
        }
        if self.max_history < 2 {
            return invalid("max_history", "must be at least 2");
        }
        if let MotionModel::ConstantVelocity { window: 0 } = self.motion {
            return invalid("motion.window", "must be at least 1");
        }
        Ok(())
    }

    pub fn associator(&self) -> AssociatorConfig {
        AssociatorConfig {
            max_cost: self.max_cost,
            max_center_distance: self.max_center_distance,
            class_mismatch_penalty: self.class_mismatch_penalty,
        }
    }
}

/// Counters for everything the tracker absorbed instead of failing on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    pub frames: u64,
    pub out_of_order_frames: u64,
    pub detections: u64,
    pub dropped_degenerate: u64,
    pub dropped_low_confidence: u64,
    pub dropped_out_of_frame: u64,
    pub dropped_outside_roi: u64,
    pub tracks_created: u64,
    pub tracks_confirmed: u64,
    pub tentative_discarded: u64,
    pub reacquired: u64,
    pub terminated: u64,
}

impl TrackerStats {
    pub fn dropped(&self) -> u64 {
        self.dropped_degenerate
            + self.dropped_low_confidence
            + self.dropped_out_of_frame
            + self.dropped_outside_roi
    }
}

/// Owns the live tracks of one camera stream and drives the per-frame update.
#[derive(Debug, Clone)]
pub struct TrackManager {
    config: TrackerConfig,
    associator: Associator,
    roi: Option<Polygon>,
    frame_size: Option<(f32, f32)>,
    /// Live tracks, kept sorted by id
    tracks: Vec<Track>,
    next_id: TrackId,
    last_frame: Option<u64>,
    stats: TrackerStats,
}

impl TrackManager {
    /// Create a manager from a validated session context.
    pub fn new(context: &SessionContext) -> Self {
        let mut manager = Self::with_config(context.tracker().clone());
        manager.roi = context.roi().cloned();
        manager.frame_size = context.frame_size();
        manager
    }

    /// Create a manager without frame bounds or region of interest.
    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            associator: Associator::new(config.associator()),
            config,
            roi: None,
            frame_size: None,
            tracks: Vec::new(),
            next_id: 1,
            last_frame: None,
            stats: TrackerStats::default(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    /// All live tracks, including tentative and lost ones.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn confirmed_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks
            .iter()
            .filter(|t| t.state() == TrackState::Confirmed)
    }

    /// Process one frame and return the trajectories of tracks that
    /// terminated during it, ordered by track id.
    ///
    /// Frames must arrive in non-decreasing index order; an earlier frame is
    /// skipped and counted.
    pub fn update(&mut self, frame: &Frame) -> Vec<Trajectory> {
        if let Some(last) = self.last_frame {
            if frame.index < last {
                self.stats.out_of_order_frames += 1;
                warn!(frame = frame.index, last, "skipping out-of-order frame");
                return Vec::new();
            }
        }
        self.last_frame = Some(frame.index);
        self.stats.frames += 1;

        let detections: Vec<Detection> = frame
            .detections
            .iter()
            .filter(|d| self.accept(d, frame.index))
            .copied()
            .collect();

        let candidates: Vec<TrackCandidate> = self
            .tracks
            .iter_mut()
            .map(|track| TrackCandidate {
                id: track.id(),
                predicted: track.predict(frame.index),
                class_id: track.class_id(),
            })
            .collect();

        let association = self.associator.associate(&candidates, &detections);

        for &(id, det_idx) in &association.matches {
            let Ok(idx) = self.tracks.binary_search_by_key(&id, Track::id) else {
                continue;
            };
            let track = &mut self.tracks[idx];
            track.observe(&detections[det_idx], frame.index, frame.timestamp);
            let promote = match track.state() {
                TrackState::Tentative => track.consecutive_hits() >= self.config.min_hits,
                TrackState::Lost => true,
                _ => false,
            };
            if promote {
                let was = track.state();
                track.transition(TrackState::Confirmed);
                if was == TrackState::Lost {
                    self.stats.reacquired += 1;
                    debug!(track = id, frame = frame.index, "track re-acquired");
                } else {
                    self.stats.tracks_confirmed += 1;
                    debug!(track = id, frame = frame.index, "track confirmed");
                }
            }
        }

        let mut discarded = Vec::new();
        for &id in &association.unmatched_tracks {
            let config = &self.config;
            let Ok(idx) = self.tracks.binary_search_by_key(&id, Track::id) else {
                continue;
            };
            let track = &mut self.tracks[idx];
            track.mark_missed(frame.index, frame.timestamp);
            let missed = track.frames_since_match(frame.index);

            if track.state() == TrackState::Tentative {
                if missed > config.tentative_tolerance {
                    discarded.push(id);
                }
                continue;
            }
            if track.state() == TrackState::Confirmed && missed > config.lost_tolerance {
                track.transition(TrackState::Lost);
                debug!(track = id, frame = frame.index, "track lost");
            }
            if missed > config.terminate_tolerance {
                track.transition(TrackState::Terminated);
            }
        }

        let finalized = self.drain_finished(&discarded);

        for det_idx in association.unmatched_detections {
            self.spawn(&detections[det_idx], frame.index, frame.timestamp);
        }

        finalized
    }

    /// Terminate every live track at end of stream. Confirmed and lost tracks
    /// are returned as trajectories; tentative ones are discarded.
    pub fn finish(&mut self) -> Vec<Trajectory> {
        let mut finalized = Vec::new();
        for mut track in self.tracks.drain(..) {
            if track.transition(TrackState::Terminated) {
                self.stats.terminated += 1;
                debug!(track = track.id(), "track terminated at end of stream");
                finalized.push(track.into_trajectory());
            } else {
                self.stats.tentative_discarded += 1;
            }
        }
        info!(
            frames = self.stats.frames,
            tracks = self.stats.tracks_created,
            terminated = self.stats.terminated,
            dropped = self.stats.dropped(),
            "tracker flushed"
        );
        finalized
    }

    fn accept(&mut self, detection: &Detection, frame_index: u64) -> bool {
        self.stats.detections += 1;
        let center = detection.bbox.center();

        let reason = if detection.bbox.is_degenerate() {
            self.stats.dropped_degenerate += 1;
            "degenerate box"
        } else if !(detection.score.is_finite() && detection.score >= self.config.min_confidence) {
            self.stats.dropped_low_confidence += 1;
            "low confidence"
        } else if self
            .frame_size
            .is_some_and(|(w, h)| !(0.0..=w).contains(&center.x) || !(0.0..=h).contains(&center.y))
        {
            self.stats.dropped_out_of_frame += 1;
            "outside frame"
        } else if self.roi.as_ref().is_some_and(|roi| !roi.contains(&center)) {
            self.stats.dropped_outside_roi += 1;
            "outside region of interest"
        } else {
            return true;
        };

        trace!(frame = frame_index, bbox = ?detection.bbox, reason, "dropped detection");
        false
    }

    fn spawn(&mut self, detection: &Detection, frame_index: u64, timestamp: f64) {
        let id = self.next_id;
        self.next_id += 1;

        let mut track = Track::new(
            id,
            detection,
            frame_index,
            timestamp,
            &self.config.motion,
            self.config.max_history,
        );
        self.stats.tracks_created += 1;
        if self.config.min_hits <= 1 {
            track.transition(TrackState::Confirmed);
            self.stats.tracks_confirmed += 1;
        }
        trace!(track = id, frame = frame_index, "track created");
        // Ids only grow, so pushing keeps the list sorted.
        self.tracks.push(track);
    }

    /// Remove discarded tentative tracks and terminated tracks, returning the
    /// latter as trajectories.
    fn drain_finished(&mut self, discarded: &[TrackId]) -> Vec<Trajectory> {
        let mut finalized = Vec::new();
        let mut live = Vec::with_capacity(self.tracks.len());
        for track in self.tracks.drain(..) {
            if discarded.contains(&track.id()) {
                self.stats.tentative_discarded += 1;
                trace!(track = track.id(), "tentative track discarded");
            } else if !track.state().is_live() {
                self.stats.terminated += 1;
                debug!(track = track.id(), hits = track.hits(), "track terminated");
                finalized.push(track.into_trajectory());
            } else {
                live.push(track);
            }
        }
        self.tracks = live;
        finalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64, detections: Vec<Detection>) -> Frame {
        Frame::at_rate(index, 10.0, detections)
    }

    fn car(x: f32, y: f32) -> Detection {
        Detection::new(x, y, 20.0, 20.0, 2, 0.9)
    }

    #[test]
    fn test_confirmation_after_min_hits() {
        let mut manager = TrackManager::with_config(TrackerConfig::default());
        manager.update(&frame(0, vec![car(0.0, 0.0)]));
        manager.update(&frame(1, vec![car(2.0, 0.0)]));
        assert_eq!(manager.tracks()[0].state(), TrackState::Tentative);
        manager.update(&frame(2, vec![car(4.0, 0.0)]));
        assert_eq!(manager.tracks()[0].state(), TrackState::Confirmed);
        assert_eq!(manager.stats().tracks_confirmed, 1);
    }

    #[test]
    fn test_single_frame_noise_is_discarded_silently() {
        let mut manager = TrackManager::with_config(TrackerConfig::default());
        manager.update(&frame(0, vec![car(0.0, 0.0)]));
        let finalized = manager.update(&frame(1, vec![]));
        assert!(finalized.is_empty());
        assert!(manager.tracks().is_empty());
        assert_eq!(manager.stats().tentative_discarded, 1);
        assert!(manager.finish().is_empty());
    }

    #[test]
    fn test_lost_then_reacquired_keeps_id() {
        let mut manager = TrackManager::with_config(TrackerConfig::default());
        for i in 0..5 {
            manager.update(&frame(i, vec![car(i as f32 * 2.0, 0.0)]));
        }
        let id = manager.tracks()[0].id();
        manager.update(&frame(5, vec![]));
        manager.update(&frame(6, vec![]));
        assert_eq!(manager.tracks()[0].state(), TrackState::Lost);

        // Reappears where constant velocity puts it.
        manager.update(&frame(7, vec![car(14.0, 0.0)]));
        assert_eq!(manager.tracks().len(), 1);
        assert_eq!(manager.tracks()[0].id(), id);
        assert_eq!(manager.tracks()[0].state(), TrackState::Confirmed);
        assert_eq!(manager.stats().reacquired, 1);
    }

    #[test]
    fn test_terminates_after_tolerance() {
        let config = TrackerConfig {
            terminate_tolerance: 3,
            ..TrackerConfig::default()
        };
        let mut manager = TrackManager::with_config(config);
        for i in 0..4 {
            manager.update(&frame(i, vec![car(0.0, 0.0)]));
        }
        assert!(manager.update(&frame(4, vec![])).is_empty());
        assert!(manager.update(&frame(5, vec![])).is_empty());
        assert!(manager.update(&frame(6, vec![])).is_empty());
        let finalized = manager.update(&frame(7, vec![]));
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].observations, 4);
        assert_eq!(finalized[0].end_frame(), Some(3));
        assert!(manager.tracks().is_empty());
    }

    #[test]
    fn test_frame_gap_terminates_directly() {
        let config = TrackerConfig {
            terminate_tolerance: 5,
            ..TrackerConfig::default()
        };
        let mut manager = TrackManager::with_config(config);
        for i in 0..3 {
            manager.update(&frame(i, vec![car(0.0, 0.0)]));
        }
        let finalized = manager.update(&frame(100, vec![]));
        assert_eq!(finalized.len(), 1);
    }

    #[test]
    fn test_malformed_detections_are_dropped() {
        let config = TrackerConfig {
            min_hits: 1,
            ..TrackerConfig::default()
        };
        let mut manager = TrackManager::with_config(config);
        manager.update(&frame(
            0,
            vec![
                Detection::new(10.0, 10.0, 0.0, 20.0, 2, 0.9),
                Detection::new(10.0, 10.0, 20.0, -3.0, 2, 0.9),
                Detection::new(10.0, 10.0, 20.0, 20.0, 2, 0.01),
                Detection::new(f32::NAN, 10.0, 20.0, 20.0, 2, 0.9),
            ],
        ));
        assert!(manager.tracks().is_empty());
        assert_eq!(manager.stats().dropped_degenerate, 3);
        assert_eq!(manager.stats().dropped_low_confidence, 1);
        assert_eq!(manager.stats().detections, 4);
    }

    #[test]
    fn test_out_of_order_frame_is_skipped() {
        let mut manager = TrackManager::with_config(TrackerConfig::default());
        manager.update(&frame(5, vec![car(0.0, 0.0)]));
        manager.update(&frame(3, vec![car(50.0, 50.0)]));
        assert_eq!(manager.tracks().len(), 1);
        assert_eq!(manager.stats().out_of_order_frames, 1);
        assert_eq!(manager.stats().frames, 1);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let config = TrackerConfig {
            min_hits: 1,
            terminate_tolerance: 1,
            ..TrackerConfig::default()
        };
        let mut manager = TrackManager::with_config(config);
        let mut seen = Vec::new();
        for round in 0..3u64 {
            let base = round * 10;
            manager.update(&frame(base, vec![car(0.0, 0.0)]));
            seen.push(manager.tracks()[0].id());
            manager.update(&frame(base + 1, vec![]));
            manager.update(&frame(base + 2, vec![]));
            assert!(manager.tracks().is_empty());
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_validate() {
        assert!(TrackerConfig::default().validate().is_ok());
        let bad = TrackerConfig {
            min_hits: 0,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidParameter { name: "min_hits", .. })
        ));
        let bad = TrackerConfig {
            lost_tolerance: 10,
            terminate_tolerance: 5,
            ..TrackerConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
