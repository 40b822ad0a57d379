//! Per-camera session configuration and the validated context built from it.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, Result};
use crate::geometry::Polygon;
use crate::movement::{CameraConfig, MovementSet};
use crate::tracker::TrackerConfig;

fn default_window_secs() -> f64 {
    60.0
}

/// Everything needed to process one camera stream.
///
/// ```json
/// {
///   "tracker": { "min_hits": 3, "max_cost": 0.7 },
///   "window_secs": 900,
///   "camera": { "camera_id": "cam_1", "movements": [] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,
    pub camera: CameraConfig,
    /// Length of one counting window in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,
}

impl SessionConfig {
    pub fn new(camera: CameraConfig) -> Self {
        Self {
            tracker: TrackerConfig::default(),
            camera,
            window_secs: default_window_secs(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

/// Validated, immutable configuration of one camera session.
///
/// Built once at startup and shared read-only by the tracker, classifier and
/// counter of that camera.
#[derive(Debug, Clone)]
pub struct SessionContext {
    camera_id: Arc<str>,
    tracker: TrackerConfig,
    movements: Arc<MovementSet>,
    roi: Option<Polygon>,
    frame_size: Option<(f32, f32)>,
    window_secs: f64,
}

impl SessionContext {
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        let SessionConfig {
            tracker,
            camera,
            window_secs,
        } = config;

        tracker.validate()?;
        if !(window_secs.is_finite() && window_secs > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "window_secs",
                reason: "must be finite and positive",
            });
        }
        if camera.camera_id.trim().is_empty() {
            return Err(ConfigError::EmptyCameraId);
        }

        let frame_size = match camera.frame_size {
            Some([w, h]) if w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0 => Some((w, h)),
            Some(_) => {
                return Err(ConfigError::InvalidParameter {
                    name: "frame_size",
                    reason: "width and height must be finite and positive",
                });
            }
            None => None,
        };
        let roi = camera
            .roi
            .as_deref()
            .map(Polygon::from_pairs)
            .transpose()
            .map_err(ConfigError::Roi)?;
        let movements = MovementSet::from_config(&camera)?;

        info!(
            camera = %camera.camera_id,
            movements = movements.len(),
            policy = movements.policy().name(),
            roi = roi.is_some(),
            "camera session configured"
        );

        Ok(Self {
            camera_id: Arc::from(camera.camera_id),
            tracker,
            movements: Arc::new(movements),
            roi,
            frame_size,
            window_secs,
        })
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub(crate) fn camera_id_arc(&self) -> Arc<str> {
        Arc::clone(&self.camera_id)
    }

    pub fn tracker(&self) -> &TrackerConfig {
        &self.tracker
    }

    pub fn movements(&self) -> &Arc<MovementSet> {
        &self.movements
    }

    pub fn roi(&self) -> Option<&Polygon> {
        self.roi.as_ref()
    }

    pub fn frame_size(&self) -> Option<(f32, f32)> {
        self.frame_size
    }

    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }
}
