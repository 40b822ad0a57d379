//! Detection-to-track association.
//!
//! Costs combine box overlap with a class-mismatch penalty. Pairs beyond the
//! gate are removed before solving, so the solver never spends an
//! assignment on an implausible match, and the minimum-cost assignment is
//! found with the Jonker-Volgenant solver on a padded square matrix.

use nalgebra::distance;
use ndarray::Array2;

use crate::geometry::Rect;
use crate::tracker::detection::{ClassId, Detection};
use crate::tracker::track::TrackId;

/// Cost of gated-out and padding cells.
const FORBIDDEN: f64 = 1e6;

/// Per-row bias that breaks equal-cost ties toward lower track ids.
const TIE_BREAK_EPSILON: f64 = 1e-9;

/// Association parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssociatorConfig {
    /// Maximum accepted cost
    pub max_cost: f32,
    /// Optional gate on the distance between predicted and detected centres
    pub max_center_distance: Option<f32>,
    /// Added to the cost when track and detection labels differ
    pub class_mismatch_penalty: f32,
}

impl Default for AssociatorConfig {
    fn default() -> Self {
        Self {
            max_cost: 0.7,
            max_center_distance: None,
            class_mismatch_penalty: 0.2,
        }
    }
}

/// What the associator needs to know about a live track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackCandidate {
    pub id: TrackId,
    pub predicted: Rect,
    pub class_id: ClassId,
}

/// Outcome of one association round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Association {
    /// `(track id, detection index)` pairs, ordered by track id
    pub matches: Vec<(TrackId, usize)>,
    pub unmatched_tracks: Vec<TrackId>,
    pub unmatched_detections: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Associator {
    config: AssociatorConfig,
}

impl Associator {
    pub fn new(config: AssociatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssociatorConfig {
        &self.config
    }

    /// Cost of pairing a track with a detection, or `None` when the pair is
    /// outside the gate.
    pub fn pair_cost(&self, track: &TrackCandidate, detection: &Detection) -> Option<f32> {
        if let Some(max_distance) = self.config.max_center_distance {
            if distance(&track.predicted.center(), &detection.bbox.center()) > max_distance {
                return None;
            }
        }
        let mut cost = 1.0 - track.predicted.iou(&detection.bbox);
        if track.class_id != detection.class_id {
            cost += self.config.class_mismatch_penalty;
        }
        (cost <= self.config.max_cost).then_some(cost)
    }

    /// Gated cost matrix, tracks by rows. Gated cells are `None`.
    pub fn cost_matrix(
        &self,
        tracks: &[TrackCandidate],
        detections: &[Detection],
    ) -> Array2<Option<f32>> {
        let mut costs = Array2::from_elem((tracks.len(), detections.len()), None);
        for (i, t) in tracks.iter().enumerate() {
            for (j, d) in detections.iter().enumerate() {
                costs[[i, j]] = self.pair_cost(t, d);
            }
        }
        costs
    }

    /// Match detections to tracks.
    ///
    /// Tracks are considered in ascending id order regardless of the order
    /// they are passed in, so results are reproducible and equal-cost
    /// conflicts resolve in favour of the older track.
    pub fn associate(&self, tracks: &[TrackCandidate], detections: &[Detection]) -> Association {
        let mut order: Vec<usize> = (0..tracks.len()).collect();
        order.sort_by_key(|&i| tracks[i].id);
        let sorted: Vec<TrackCandidate> = order.iter().map(|&i| tracks[i]).collect();

        let costs = self.cost_matrix(&sorted, detections);
        let (matches, unmatched_rows, unmatched_detections) = linear_assignment(&costs);

        Association {
            matches: matches
                .into_iter()
                .map(|(row, col)| (sorted[row].id, col))
                .collect(),
            unmatched_tracks: unmatched_rows.into_iter().map(|row| sorted[row].id).collect(),
            unmatched_detections,
        }
    }
}

/// Minimum-cost assignment over a gated cost matrix.
///
/// Returns `(matches, unmatched rows, unmatched columns)`, each sorted by row
/// or column index.
pub fn linear_assignment(
    costs: &Array2<Option<f32>>,
) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
    let (num_rows, num_cols) = costs.dim();

    if num_rows == 0 || num_cols == 0 {
        return (vec![], (0..num_rows).collect(), (0..num_cols).collect());
    }

    // Nothing passes the gate: skip the solver entirely.
    if costs.iter().all(Option::is_none) {
        return (vec![], (0..num_rows).collect(), (0..num_cols).collect());
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), FORBIDDEN);
    for ((i, j), cost) in costs.indexed_iter() {
        if let Some(cost) = cost {
            padded[[i, j]] = *cost as f64 + TIE_BREAK_EPSILON * i as f64;
        }
    }

    let mut matches = vec![];
    let mut row_matched = vec![false; num_rows];
    let mut col_matched = vec![false; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row, &col) in row_to_col.iter().enumerate().take(num_rows) {
                if col < num_cols && costs[[row, col]].is_some() {
                    matches.push((row, col));
                    row_matched[row] = true;
                    col_matched[col] = true;
                }
            }
        }
        Err(err) => {
            tracing::warn!(?err, rows = num_rows, cols = num_cols, "assignment solver failed");
        }
    }

    // An unmatched lower row with exactly the same cost takes the column.
    for m in matches.iter_mut() {
        let (row, col) = *m;
        let better = (0..row).find(|&r| !row_matched[r] && costs[[r, col]] == costs[[row, col]]);
        if let Some(better) = better {
            row_matched[row] = false;
            row_matched[better] = true;
            *m = (better, col);
        }
    }
    matches.sort_unstable();

    let unmatched = |mask: &[bool]| -> Vec<usize> {
        mask.iter()
            .enumerate()
            .filter_map(|(i, &m)| if m { None } else { Some(i) })
            .collect()
    };

    (matches, unmatched(&row_matched), unmatched(&col_matched))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: TrackId, x: f32, y: f32) -> TrackCandidate {
        TrackCandidate {
            id,
            predicted: Rect::new(x, y, 20.0, 20.0),
            class_id: 0,
        }
    }

    fn det(x: f32, y: f32) -> Detection {
        Detection::new(x, y, 20.0, 20.0, 0, 0.9)
    }

    #[test]
    fn test_matches_by_overlap() {
        let associator = Associator::default();
        let tracks = [candidate(1, 0.0, 0.0), candidate(2, 100.0, 100.0)];
        let dets = [det(101.0, 100.0), det(1.0, 1.0)];
        let result = associator.associate(&tracks, &dets);
        assert_eq!(result.matches, vec![(1, 1), (2, 0)]);
        assert!(result.unmatched_tracks.is_empty());
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_gate_forces_unmatched() {
        let associator = Associator::default();
        let tracks = [candidate(1, 0.0, 0.0)];
        // IoU 0 -> cost 1.0, above the 0.7 gate.
        let dets = [det(50.0, 0.0)];
        let result = associator.associate(&tracks, &dets);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_tracks, vec![1]);
        assert_eq!(result.unmatched_detections, vec![0]);
    }

    #[test]
    fn test_center_distance_gate() {
        let associator = Associator::new(AssociatorConfig {
            max_center_distance: Some(5.0),
            ..AssociatorConfig::default()
        });
        let track = candidate(1, 0.0, 0.0);
        assert!(associator.pair_cost(&track, &det(4.0, 0.0)).is_some());
        // Overlap is fine (IoU ~0.54) but the centre jumped 6px.
        assert!(associator.pair_cost(&track, &det(6.0, 0.0)).is_none());
    }

    #[test]
    fn test_class_penalty() {
        let associator = Associator::default();
        let track = candidate(1, 0.0, 0.0);
        let same = associator.pair_cost(&track, &det(0.0, 0.0)).unwrap();
        let other = associator
            .pair_cost(&track, &Detection::new(0.0, 0.0, 20.0, 20.0, 3, 0.9))
            .unwrap();
        assert!(same.abs() < 1e-6);
        assert!((other - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_tie_prefers_lower_track_id() {
        let associator = Associator::default();
        // Two identical predictions compete for one detection; pass them in
        // reverse order to make sure input order does not decide.
        let tracks = [candidate(9, 0.0, 0.0), candidate(4, 0.0, 0.0)];
        let dets = [det(2.0, 0.0)];
        let result = associator.associate(&tracks, &dets);
        assert_eq!(result.matches, vec![(4, 0)]);
        assert_eq!(result.unmatched_tracks, vec![9]);
    }

    #[test]
    fn test_empty_inputs() {
        let associator = Associator::default();
        let result = associator.associate(&[], &[det(0.0, 0.0)]);
        assert_eq!(result.unmatched_detections, vec![0]);
        let result = associator.associate(&[candidate(3, 0.0, 0.0)], &[]);
        assert_eq!(result.unmatched_tracks, vec![3]);
    }
}
