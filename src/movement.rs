//! Movement definitions and trajectory classification.
//!
//! A movement is one way through the scene (a through lane, a left turn...)
//! described either by an entry/exit region pair or by a reference path.

mod classifier;
mod config;
mod movement_set;

/// Movement identifier, unique within a camera.
pub type MovementId = u32;

pub use classifier::{Classification, MovementClassifier, UnmatchedReason, classify};
pub use config::{CameraConfig, ClassificationPolicy, GeometryConfig, MovementConfig, PathDistance};
pub use movement_set::{Movement, MovementGeometry, MovementSet};
