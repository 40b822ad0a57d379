//! Serialized per-camera movement definitions.
//!
//! ```json
//! {
//!   "camera_id": "cam_1",
//!   "frame_size": [1280, 720],
//!   "roi": [[0, 200], [1280, 200], [1280, 720], [0, 720]],
//!   "policy": { "kind": "path_similarity", "samples": 20, "distance": "hausdorff" },
//!   "min_trajectory_len": 5,
//!   "movements": [
//!     { "id": 1, "label": "northbound through",
//!       "geometry": { "kind": "path", "points": [[640, 700], [640, 220]], "tolerance": 60 } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::MovementId;

fn default_min_trajectory_len() -> u32 {
    5
}

fn default_samples() -> usize {
    20
}

fn default_max_angle_deg() -> f32 {
    45.0
}

/// Static description of one camera: frame bounds, region of interest and
/// the movements its trajectories are classified against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub camera_id: String,
    /// Frame width and height in pixels
    #[serde(default)]
    pub frame_size: Option<[f32; 2]>,
    /// Detections whose centre falls outside this polygon are ignored
    #[serde(default)]
    pub roi: Option<Vec<[f32; 2]>>,
    #[serde(default)]
    pub policy: ClassificationPolicy,
    /// Trajectories with fewer observations are never classified
    #[serde(default = "default_min_trajectory_len")]
    pub min_trajectory_len: u32,
    pub movements: Vec<MovementConfig>,
}

impl CameraConfig {
    pub fn new(camera_id: impl Into<String>, policy: ClassificationPolicy) -> Self {
        Self {
            camera_id: camera_id.into(),
            frame_size: None,
            roi: None,
            policy,
            min_trajectory_len: default_min_trajectory_len(),
            movements: Vec::new(),
        }
    }

    pub fn with_movement(mut self, movement: MovementConfig) -> Self {
        self.movements.push(movement);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    pub id: MovementId,
    #[serde(default)]
    pub label: String,
    pub geometry: GeometryConfig,
}

impl MovementConfig {
    /// Entry/exit region pair.
    pub fn regions(
        id: MovementId,
        label: impl Into<String>,
        entry: Vec<[f32; 2]>,
        exit: Vec<[f32; 2]>,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            geometry: GeometryConfig::Regions { entry, exit },
        }
    }

    /// Reference path with the default direction limit.
    pub fn path(id: MovementId, label: impl Into<String>, points: Vec<[f32; 2]>, tolerance: f32) -> Self {
        Self {
            id,
            label: label.into(),
            geometry: GeometryConfig::Path {
                points,
                tolerance,
                max_angle_deg: default_max_angle_deg(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometryConfig {
    /// Polygons the first and last observed positions must fall in
    Regions {
        entry: Vec<[f32; 2]>,
        exit: Vec<[f32; 2]>,
    },
    /// Reference polyline with a distance tolerance in pixels
    Path {
        points: Vec<[f32; 2]>,
        tolerance: f32,
        #[serde(default = "default_max_angle_deg")]
        max_angle_deg: f32,
    },
}

impl GeometryConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            GeometryConfig::Regions { .. } => "regions",
            GeometryConfig::Path { .. } => "path",
        }
    }
}

/// How a camera's trajectories are matched to its movements.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// First position in the entry region, last position in the exit region
    #[default]
    RegionCrossing,
    /// Nearest reference path within tolerance
    PathSimilarity {
        /// Points the trajectory is resampled to
        #[serde(default = "default_samples")]
        samples: usize,
        #[serde(default)]
        distance: PathDistance,
    },
}

impl ClassificationPolicy {
    pub fn path_similarity(distance: PathDistance) -> Self {
        ClassificationPolicy::PathSimilarity {
            samples: default_samples(),
            distance,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClassificationPolicy::RegionCrossing => "region_crossing",
            ClassificationPolicy::PathSimilarity { .. } => "path_similarity",
        }
    }

    /// Geometry kind this policy classifies against.
    pub fn geometry_kind(&self) -> &'static str {
        match self {
            ClassificationPolicy::RegionCrossing => "regions",
            ClassificationPolicy::PathSimilarity { .. } => "path",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathDistance {
    /// Mean distance from each resampled point to the reference polyline
    #[default]
    MeanPointToPolyline,
    /// Symmetric Hausdorff distance
    Hausdorff,
    /// Dynamic time warping against the equally resampled reference
    Dtw,
}
