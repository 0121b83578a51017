//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum PwilError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// The reward mode is not one of `airl`, `raw` or `pwil`.
    #[error("Unrecognized reward mode: {0}")]
    UnknownRewardMode(String),

    /// A distribution kind that does not support reparameterized sampling
    /// for the given action space.
    #[error("Unsupported distribution: {0}")]
    UnsupportedDistribution(String),

    /// Tensors or buffers with incompatible shapes.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}
