//! Error types for fitting sessions.

use armor_collision::CollisionError;
use armor_shrinkwrap::FitError;
use armor_skinning::TransferError;
use armor_spatial::SpatialError;
use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors from a [`FittingSession`](crate::FittingSession).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The armor is bound to a skeleton; reset before reshaping or rebinding.
    #[error("armor is already bound to a skeleton")]
    AlreadyBound,

    /// Shrinkwrap fitting failed.
    #[error("fit failed: {0}")]
    Fit(#[from] FitError),

    /// Weight transfer failed.
    #[error("binding failed: {0}")]
    Transfer(#[from] TransferError),

    /// Collision correction failed.
    #[error("collision correction failed: {0}")]
    Collision(#[from] CollisionError),

    /// Building a fitting target failed.
    #[error("target construction failed: {0}")]
    Spatial(#[from] SpatialError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(format!("{}", SessionError::AlreadyBound).contains("bound"));

        let err: SessionError = FitError::invalid_params("step_size").into();
        assert!(format!("{err}").contains("step_size"));

        let err: SessionError = TransferError::MissingSkeleton.into();
        assert!(format!("{err}").contains("skeleton"));

        let err: SessionError = SpatialError::build("zero triangles").into();
        assert!(format!("{err}").contains("zero triangles"));
    }
}
