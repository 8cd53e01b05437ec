//! Error types for collision handling.

use armor_spatial::SpatialError;
use thiserror::Error;

/// Result type alias for collision operations.
pub type CollisionResult<T> = Result<T, CollisionError>;

/// Errors that can occur during collision detection or resolution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CollisionError {
    /// The avatar has nothing to collide with.
    #[error("invalid collision target: {details}")]
    InvalidTarget {
        /// Why the target was rejected.
        details: String,
    },

    /// A collision parameter is out of range.
    #[error("invalid collision parameters: {0}")]
    InvalidParams(String),

    /// Spatial index failure.
    #[error("spatial query failed: {0}")]
    Spatial(#[from] SpatialError),
}

impl CollisionError {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CollisionError::invalid_target("zero triangles");
        assert!(format!("{err}").contains("zero triangles"));

        let err = CollisionError::invalid_params("probe_distance must be positive");
        assert!(format!("{err}").contains("probe_distance"));

        let err: CollisionError = SpatialError::invalid_query("NaN ray interval").into();
        assert!(format!("{err}").contains("NaN"));
    }
}
