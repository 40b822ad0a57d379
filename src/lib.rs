//! Per-movement traffic flow counting from fixed-camera vehicle detections.
//!
//! Detections for each frame go into a [`TrackManager`], which keeps object
//! identities across frames and hands back a [`Trajectory`] for every track
//! that ends. A [`MovementClassifier`] assigns each trajectory to one of the
//! camera's movements, and a [`FlowCounter`] aggregates the results into
//! windowed counts. [`CameraPipeline`] wires these together for one camera;
//! [`run_cameras`] processes several cameras in parallel.

pub mod error;
pub mod flow;
pub mod geometry;
pub mod integration;
pub mod movement;
pub mod session;
pub mod tracker;

pub use error::{ConfigError, Error, Result};
pub use flow::{FlowCounter, FlowEvent, FlowReport, Window};
pub use geometry::{GeometryError, Polygon, Polyline, Rect};
pub use integration::{
    CameraPipeline, ChannelSource, DetectionBuilder, DetectionSource, IntoDetections,
    SessionSummary, VecSource, run_cameras,
};
pub use movement::{
    CameraConfig, Classification, ClassificationPolicy, GeometryConfig, MovementClassifier,
    MovementConfig, MovementId, MovementSet, PathDistance, UnmatchedReason, classify,
};
pub use session::{SessionConfig, SessionContext};
pub use tracker::{
    Associator, ClassId, Detection, Frame, MotionModel, Track, TrackId, TrackManager, TrackState,
    TrackerConfig, TrackerStats, Trajectory,
};
