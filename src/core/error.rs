//! Error types for the marching pipeline

use glam::IVec3;
use thiserror::Error;

/// Main error type for the pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// A tunable or input is outside its accepted range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `projection * world_to_camera` cannot be inverted.
    #[error("Camera matrices are singular")]
    SingularMatrix,

    /// A stage was run before `configure` or after `shutdown`.
    #[error("Stage '{0}' is not ready")]
    NotReady(&'static str),

    #[error("Voxel coordinate {coord} outside grid resolution {resolution}")]
    OutOfBounds { coord: IVec3, resolution: IVec3 },

    #[error("Volume has no density populated")]
    DensityMissing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
