//! Error types for spatial index construction and queries.

use thiserror::Error;

/// Errors from building or querying a [`SpatialIndex`](crate::SpatialIndex).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpatialError {
    /// The source has no usable (non-degenerate) triangles.
    #[error("failed to build spatial index: {details}")]
    BuildError {
        /// Why the build failed.
        details: String,
    },

    /// The ray is unusable (zero-length or non-finite direction, bad interval).
    #[error("invalid ray query: {details}")]
    InvalidQuery {
        /// What was wrong with the query.
        details: String,
    },
}

impl SpatialError {
    /// Create a build error.
    #[must_use]
    pub fn build(details: impl Into<String>) -> Self {
        Self::BuildError {
            details: details.into(),
        }
    }

    /// Create an invalid query error.
    #[must_use]
    pub fn invalid_query(details: impl Into<String>) -> Self {
        Self::InvalidQuery {
            details: details.into(),
        }
    }
}

/// Result type for spatial operations.
pub type SpatialResult<T> = Result<T, SpatialError>;
