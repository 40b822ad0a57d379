//! Connecting external detectors to the tracking and counting core.
//!
//! A detector is anything implementing [`DetectionSource`]. [`CameraPipeline`]
//! drives one camera session from it; [`run_cameras`] runs several sessions
//! in parallel against one shared [`FlowCounter`](crate::flow::FlowCounter).

mod builder;
mod detector;
mod pipeline;
mod workers;

pub use builder::DetectionBuilder;
pub use detector::{ChannelSource, DetectionSource, IntoDetections, VecSource};
pub use pipeline::{CameraPipeline, SessionSummary};
pub use workers::run_cameras;
