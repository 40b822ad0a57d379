use thiserror::Error;

use crate::geometry::GeometryError;
use crate::movement::MovementId;

/// Problems with a camera's configuration. These are fatal at session start:
/// counts produced from an ambiguous or incomplete movement set would be
/// meaningless, so no pipeline is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("camera id must not be empty")]
    EmptyCameraId,
    #[error("no movements are defined")]
    NoMovements,
    #[error("movement id {0} is defined more than once")]
    DuplicateMovement(MovementId),
    #[error("movement {id}: {source}")]
    Geometry {
        id: MovementId,
        #[source]
        source: GeometryError,
    },
    #[error("region of interest: {0}")]
    Roi(#[source] GeometryError),
    #[error("movement {id}: {reason}")]
    InvalidMovement { id: MovementId, reason: &'static str },
    #[error("movement {id} uses {geometry} geometry, which the {policy} policy cannot classify")]
    PolicyMismatch {
        id: MovementId,
        geometry: &'static str,
        policy: &'static str,
    },
    #[error("movements {first} and {second} overlap and cannot be told apart")]
    OverlappingMovements {
        first: MovementId,
        second: MovementId,
    },
    #[error("invalid {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("camera {camera}: detection source failed: {message}")]
    Source { camera: String, message: String },
    #[error("camera {0} is configured more than once")]
    DuplicateCamera(String),
    #[error("camera {0}: worker panicked")]
    WorkerPanicked(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
