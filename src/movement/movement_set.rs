//! Validated, immutable movement definitions for one camera.

use crate::error::ConfigError;
use crate::geometry::{Polygon, Polyline, angle_between, hausdorff};

use super::MovementId;
use super::config::{CameraConfig, ClassificationPolicy, GeometryConfig, MovementConfig};

/// Same-direction reference paths within this Hausdorff distance are
/// duplicates. Independent of the per-movement classification tolerance.
const DUPLICATE_PATH_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum MovementGeometry {
    Regions {
        entry: Polygon,
        exit: Polygon,
    },
    Path {
        reference: Polyline,
        tolerance: f32,
        max_angle_deg: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub id: MovementId,
    pub label: String,
    pub geometry: MovementGeometry,
}

impl Movement {
    fn from_config(config: &MovementConfig) -> Result<Self, ConfigError> {
        let id = config.id;
        let geometry_error = |source| ConfigError::Geometry { id, source };

        let geometry = match &config.geometry {
            GeometryConfig::Regions { entry, exit } => MovementGeometry::Regions {
                entry: Polygon::from_pairs(entry).map_err(geometry_error)?,
                exit: Polygon::from_pairs(exit).map_err(geometry_error)?,
            },
            GeometryConfig::Path {
                points,
                tolerance,
                max_angle_deg,
            } => {
                if !(tolerance.is_finite() && *tolerance > 0.0) {
                    return Err(ConfigError::InvalidMovement {
                        id,
                        reason: "tolerance must be finite and positive",
                    });
                }
                if !(max_angle_deg.is_finite() && *max_angle_deg > 0.0 && *max_angle_deg <= 180.0) {
                    return Err(ConfigError::InvalidMovement {
                        id,
                        reason: "max_angle_deg must be in (0, 180]",
                    });
                }
                MovementGeometry::Path {
                    reference: Polyline::from_pairs(points).map_err(geometry_error)?,
                    tolerance: *tolerance,
                    max_angle_deg: *max_angle_deg,
                }
            }
        };

        Ok(Self {
            id,
            label: config.label.clone(),
            geometry,
        })
    }

    /// True when no trajectory could tell `self` and `other` apart.
    fn is_ambiguous_with(&self, other: &Movement) -> bool {
        match (&self.geometry, &other.geometry) {
            (
                MovementGeometry::Regions { entry, exit },
                MovementGeometry::Regions {
                    entry: other_entry,
                    exit: other_exit,
                },
            ) => entry.overlaps(other_entry) && exit.overlaps(other_exit),
            (
                MovementGeometry::Path { reference, .. },
                MovementGeometry::Path {
                    reference: other_reference,
                    ..
                },
            ) => {
                let same_direction = angle_between(&reference.direction(), &other_reference.direction())
                    .is_none_or(|angle| angle < 90.0);
                same_direction
                    && hausdorff(reference.points(), other_reference.points())
                        < DUPLICATE_PATH_DISTANCE
            }
            _ => false,
        }
    }
}

/// Movements of one camera, sorted by id, together with the policy used to
/// classify trajectories against them. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementSet {
    policy: ClassificationPolicy,
    min_trajectory_len: u32,
    movements: Vec<Movement>,
}

impl MovementSet {
    /// Validate a camera configuration into a movement set.
    pub fn from_config(config: &CameraConfig) -> Result<Self, ConfigError> {
        let movements = config
            .movements
            .iter()
            .map(Movement::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(config.policy, config.min_trajectory_len, movements)
    }

    pub fn new(
        policy: ClassificationPolicy,
        min_trajectory_len: u32,
        mut movements: Vec<Movement>,
    ) -> Result<Self, ConfigError> {
        if min_trajectory_len < 2 {
            return Err(ConfigError::InvalidParameter {
                name: "min_trajectory_len",
                reason: "must be at least 2",
            });
        }
        if let ClassificationPolicy::PathSimilarity { samples, .. } = policy {
            if samples < 2 {
                return Err(ConfigError::InvalidParameter {
                    name: "policy.samples",
                    reason: "must be at least 2",
                });
            }
        }
        if movements.is_empty() {
            return Err(ConfigError::NoMovements);
        }

        movements.sort_by_key(|m| m.id);
        if let Some(pair) = movements.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(ConfigError::DuplicateMovement(pair[0].id));
        }

        for movement in &movements {
            let kind = match movement.geometry {
                MovementGeometry::Regions { .. } => "regions",
                MovementGeometry::Path { .. } => "path",
            };
            if kind != policy.geometry_kind() {
                return Err(ConfigError::PolicyMismatch {
                    id: movement.id,
                    geometry: kind,
                    policy: policy.name(),
                });
            }
        }

        for (i, a) in movements.iter().enumerate() {
            for b in &movements[i + 1..] {
                if a.is_ambiguous_with(b) {
                    return Err(ConfigError::OverlappingMovements {
                        first: a.id,
                        second: b.id,
                    });
                }
            }
        }

        Ok(Self {
            policy,
            min_trajectory_len,
            movements,
        })
    }

    pub fn policy(&self) -> ClassificationPolicy {
        self.policy
    }

    pub fn min_trajectory_len(&self) -> u32 {
        self.min_trajectory_len
    }

    pub fn get(&self, id: MovementId) -> Option<&Movement> {
        self.movements
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|idx| &self.movements[idx])
    }

    pub fn label(&self, id: MovementId) -> Option<&str> {
        self.get(id).map(|m| m.label.as_str())
    }

    /// Movements in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Movement> {
        self.movements.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = MovementId> + '_ {
        self.movements.iter().map(|m| m.id)
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryError;

    fn square(x: f32, y: f32, side: f32) -> Vec<[f32; 2]> {
        vec![[x, y], [x + side, y], [x + side, y + side], [x, y + side]]
    }

    fn camera(policy: ClassificationPolicy, movements: Vec<MovementConfig>) -> CameraConfig {
        CameraConfig {
            movements,
            ..CameraConfig::new("cam", policy)
        }
    }

    #[test]
    fn test_sorted_by_id() {
        let config = camera(
            ClassificationPolicy::RegionCrossing,
            vec![
                MovementConfig::regions(3, "c", square(0.0, 0.0, 10.0), square(100.0, 0.0, 10.0)),
                MovementConfig::regions(1, "a", square(0.0, 50.0, 10.0), square(100.0, 50.0, 10.0)),
            ],
        );
        let set = MovementSet::from_config(&config).unwrap();
        assert_eq!(set.ids().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(set.label(3), Some("c"));
        assert!(set.get(2).is_none());
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        let empty = camera(ClassificationPolicy::RegionCrossing, vec![]);
        assert_eq!(MovementSet::from_config(&empty), Err(ConfigError::NoMovements));

        let dup = camera(
            ClassificationPolicy::RegionCrossing,
            vec![
                MovementConfig::regions(1, "a", square(0.0, 0.0, 10.0), square(100.0, 0.0, 10.0)),
                MovementConfig::regions(1, "b", square(0.0, 50.0, 10.0), square(100.0, 50.0, 10.0)),
            ],
        );
        assert_eq!(MovementSet::from_config(&dup), Err(ConfigError::DuplicateMovement(1)));
    }

    #[test]
    fn test_rejects_overlapping_regions() {
        let config = camera(
            ClassificationPolicy::RegionCrossing,
            vec![
                MovementConfig::regions(1, "a", square(0.0, 0.0, 10.0), square(100.0, 0.0, 10.0)),
                MovementConfig::regions(2, "b", square(5.0, 5.0, 10.0), square(105.0, 5.0, 10.0)),
            ],
        );
        assert_eq!(
            MovementSet::from_config(&config),
            Err(ConfigError::OverlappingMovements { first: 1, second: 2 })
        );
    }

    #[test]
    fn test_rejects_regions_overlapping_along_edges() {
        // Each region is shifted by half its width, so vertices land on the
        // other region's edges.
        let config = camera(
            ClassificationPolicy::RegionCrossing,
            vec![
                MovementConfig::regions(1, "a", square(0.0, 0.0, 10.0), square(100.0, 0.0, 10.0)),
                MovementConfig::regions(2, "b", square(5.0, 0.0, 10.0), square(105.0, 0.0, 10.0)),
            ],
        );
        assert_eq!(
            MovementSet::from_config(&config),
            Err(ConfigError::OverlappingMovements { first: 1, second: 2 })
        );
    }

    #[test]
    fn test_adjacent_regions_are_allowed() {
        let config = camera(
            ClassificationPolicy::RegionCrossing,
            vec![
                MovementConfig::regions(1, "a", square(0.0, 0.0, 10.0), square(100.0, 0.0, 10.0)),
                MovementConfig::regions(2, "b", square(10.0, 0.0, 10.0), square(110.0, 0.0, 10.0)),
            ],
        );
        assert!(MovementSet::from_config(&config).is_ok());
    }

    #[test]
    fn test_parallel_lanes_within_tolerance_are_allowed() {
        let policy = ClassificationPolicy::path_similarity(Default::default());
        let config = camera(
            policy,
            vec![
                MovementConfig::path(1, "inner", vec![[0.0, 0.0], [100.0, 0.0]], 10.0),
                MovementConfig::path(2, "outer", vec![[0.0, 5.0], [100.0, 5.0]], 10.0),
            ],
        );
        assert!(MovementSet::from_config(&config).is_ok());
    }

    #[test]
    fn test_shared_entry_is_allowed() {
        // Through and turning movements share an approach.
        let config = camera(
            ClassificationPolicy::RegionCrossing,
            vec![
                MovementConfig::regions(1, "through", square(0.0, 0.0, 10.0), square(100.0, 0.0, 10.0)),
                MovementConfig::regions(2, "turn", square(0.0, 0.0, 10.0), square(50.0, 100.0, 10.0)),
            ],
        );
        assert!(MovementSet::from_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_duplicate_paths_but_not_reversed() {
        let policy = ClassificationPolicy::path_similarity(Default::default());
        let forward = vec![[0.0, 0.0], [100.0, 0.0]];
        let config = camera(
            policy,
            vec![
                MovementConfig::path(1, "a", forward.clone(), 10.0),
                MovementConfig::path(2, "b", vec![[0.0, 0.5], [100.0, 0.5]], 10.0),
            ],
        );
        assert!(matches!(
            MovementSet::from_config(&config),
            Err(ConfigError::OverlappingMovements { .. })
        ));

        let config = camera(
            policy,
            vec![
                MovementConfig::path(1, "east", forward, 10.0),
                MovementConfig::path(2, "west", vec![[100.0, 0.0], [0.0, 0.0]], 10.0),
            ],
        );
        assert!(MovementSet::from_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_policy_mismatch() {
        let config = camera(
            ClassificationPolicy::RegionCrossing,
            vec![MovementConfig::path(4, "a", vec![[0.0, 0.0], [10.0, 0.0]], 5.0)],
        );
        assert!(matches!(
            MovementSet::from_config(&config),
            Err(ConfigError::PolicyMismatch { id: 4, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_geometry_and_tolerance() {
        let config = camera(
            ClassificationPolicy::RegionCrossing,
            vec![MovementConfig::regions(
                7,
                "a",
                vec![[0.0, 0.0], [1.0, 1.0]],
                square(0.0, 0.0, 10.0),
            )],
        );
        assert!(matches!(
            MovementSet::from_config(&config),
            Err(ConfigError::Geometry {
                id: 7,
                source: GeometryError::TooFewVertices { .. }
            })
        ));

        let policy = ClassificationPolicy::path_similarity(Default::default());
        let config = camera(
            policy,
            vec![MovementConfig::path(1, "a", vec![[0.0, 0.0], [10.0, 0.0]], 0.0)],
        );
        assert!(matches!(
            MovementSet::from_config(&config),
            Err(ConfigError::InvalidMovement { id: 1, .. })
        ));
    }
}
