//! Error types for weight transfer.

use armor_spatial::SpatialError;
use armor_types::MeshError;
use thiserror::Error;

/// Result type alias for weight transfer.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors that can occur during weight transfer.
///
/// A vertex no strategy can resolve is not an error: it binds to the root
/// bone.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransferError {
    /// The source has no bones to transfer.
    #[error("source mesh has no skeleton")]
    MissingSkeleton,

    /// The target mesh cannot be bound.
    #[error("invalid transfer target: {details}")]
    InvalidTarget {
        /// Why the target was rejected.
        details: String,
    },

    /// Building the source index failed.
    #[error("spatial index error: {0}")]
    Spatial(#[from] SpatialError),

    /// Binding the target failed.
    #[error("mesh error: {0}")]
    Mesh(#[from] MeshError),
}

impl TransferError {
    /// Create an invalid target error.
    #[must_use]
    pub fn invalid_target(details: impl Into<String>) -> Self {
        Self::InvalidTarget {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransferError::MissingSkeleton;
        assert!(format!("{err}").contains("skeleton"));

        let err = TransferError::invalid_target("no vertices");
        assert!(format!("{err}").contains("no vertices"));

        let err: TransferError = SpatialError::build("zero triangles").into();
        assert!(format!("{err}").contains("zero triangles"));

        let err: TransferError = MeshError::SingularTransform.into();
        assert!(format!("{err}").contains("invertible"));
    }
}
