//! Trajectory-to-movement classification.

use std::sync::Arc;

use nalgebra::Point2;
use serde::Serialize;

use crate::geometry::{angle_between, displacement, dtw, hausdorff, mean_distance, path_length, resample};
use crate::session::SessionContext;
use crate::tracker::Trajectory;

use super::MovementId;
use super::config::{ClassificationPolicy, PathDistance};
use super::movement_set::{MovementGeometry, MovementSet};

/// Why a trajectory was not assigned to any movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum UnmatchedReason {
    /// Fewer observations than the camera's minimum trajectory length
    TooShort,
    /// The object never moved
    Stationary,
    /// No movement fits within its tolerance
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Classification {
    Movement(MovementId),
    Unmatched(UnmatchedReason),
}

impl Classification {
    pub fn movement(&self) -> Option<MovementId> {
        match self {
            Classification::Movement(id) => Some(*id),
            Classification::Unmatched(_) => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Classification::Movement(_))
    }
}

/// Classify a finished trajectory against a camera's movements.
///
/// Pure: the same trajectory and movement set always give the same answer.
/// Candidates are scanned in ascending id order and only a strictly better
/// score replaces the current best, so ties go to the lowest movement id.
pub fn classify(trajectory: &Trajectory, movements: &MovementSet) -> Classification {
    if trajectory.observations < movements.min_trajectory_len() {
        return Classification::Unmatched(UnmatchedReason::TooShort);
    }
    let centers = trajectory.observed_centers();
    if centers.len() < 2 {
        return Classification::Unmatched(UnmatchedReason::TooShort);
    }

    let best = match movements.policy() {
        ClassificationPolicy::RegionCrossing => best_region_match(&centers, movements),
        ClassificationPolicy::PathSimilarity { samples, distance } => {
            if path_length(&centers) <= f32::EPSILON {
                return Classification::Unmatched(UnmatchedReason::Stationary);
            }
            best_path_match(&centers, movements, samples, distance)
        }
    };

    best.map_or(
        Classification::Unmatched(UnmatchedReason::NoMatch),
        Classification::Movement,
    )
}

/// The movement whose entry holds the first point and whose exit holds the
/// last, preferring the tightest fit (smallest combined depth).
fn best_region_match(centers: &[Point2<f32>], movements: &MovementSet) -> Option<MovementId> {
    let (first, last) = (centers.first()?, centers.last()?);
    let mut best: Option<(f32, MovementId)> = None;

    for movement in movements.iter() {
        let MovementGeometry::Regions { entry, exit } = &movement.geometry else {
            continue;
        };
        if !(entry.contains(first) && exit.contains(last)) {
            continue;
        }
        let margin = entry.signed_depth(first) + exit.signed_depth(last);
        if best.is_none_or(|(score, _)| margin < score) {
            best = Some((margin, movement.id));
        }
    }
    best.map(|(_, id)| id)
}

fn best_path_match(
    centers: &[Point2<f32>],
    movements: &MovementSet,
    samples: usize,
    metric: PathDistance,
) -> Option<MovementId> {
    let resampled = resample(centers, samples);
    let heading = displacement(centers);
    let mut best: Option<(f32, MovementId)> = None;

    for movement in movements.iter() {
        let MovementGeometry::Path {
            reference,
            tolerance,
            max_angle_deg,
        } = &movement.geometry
        else {
            continue;
        };
        // Loops that end where they started have no heading to compare.
        if angle_between(&heading, &reference.direction()).is_some_and(|a| a > *max_angle_deg) {
            continue;
        }
        let score = match metric {
            PathDistance::MeanPointToPolyline => mean_distance(&resampled, reference),
            PathDistance::Hausdorff => hausdorff(&resampled, reference.points()),
            PathDistance::Dtw => dtw(&resampled, &reference.resample(samples)),
        };
        if score <= *tolerance && best.is_none_or(|(s, _)| score < s) {
            best = Some((score, movement.id));
        }
    }
    best.map(|(_, id)| id)
}

/// A camera's movement set bundled for repeated classification.
#[derive(Debug, Clone)]
pub struct MovementClassifier {
    movements: Arc<MovementSet>,
}

impl MovementClassifier {
    pub fn new(context: &SessionContext) -> Self {
        Self::from_movements(Arc::clone(context.movements()))
    }

    pub fn from_movements(movements: Arc<MovementSet>) -> Self {
        Self { movements }
    }

    pub fn movements(&self) -> &MovementSet {
        &self.movements
    }

    pub fn classify(&self, trajectory: &Trajectory) -> Classification {
        classify(trajectory, &self.movements)
    }
}
