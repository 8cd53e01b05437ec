//! Error types for shrinkwrap fitting.

use armor_spatial::SpatialError;
use thiserror::Error;

/// Result type alias for fitting operations.
pub type FitResult<T> = Result<T, FitError>;

/// Errors that can occur while fitting.
///
/// Rays that miss the target are not errors; they leave a vertex in place
/// for that iteration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FitError {
    /// The target has nothing to fit against.
    #[error("invalid fitting target: {details}")]
    InvalidTarget {
        /// Why the target was rejected.
        details: String,
    },

    /// A fitting parameter is out of range.
    #[error("invalid fitting parameters: {0}")]
    InvalidParams(String),

    /// Spatial index failure.
    #[error("spatial query failed: {0}")]
    Spatial(#[from] SpatialError),
}

impl FitError {
    /// Create an invalid target error.
    #[must_use]
    pub fn invalid_target(details: impl Into<String>) -> Self {
        Self::InvalidTarget {
            details: details.into(),
        }
    }

    /// Create an invalid params error.
    #[must_use]
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::InvalidParams(details.into())
    }
}
