mod associator;
mod detection;
mod motion;
mod track;
mod track_manager;
mod track_state;

pub use associator::{
    Association, Associator, AssociatorConfig, TrackCandidate, linear_assignment,
};
pub use detection::{ClassId, Detection, Frame};
pub use motion::MotionModel;
pub use track::{Track, TrackId, TrackPoint, Trajectory};
pub use track_manager::{TrackManager, TrackerConfig, TrackerStats};
pub use track_state::TrackState;
