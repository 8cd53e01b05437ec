//! Error types for region segmentation.

use thiserror::Error;

/// Result type for region operations.
pub type RegionResult<T> = Result<T, RegionError>;

/// Errors that can occur during region segmentation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegionError {
    /// The skinned mesh's skeleton has no bones.
    #[error("skinned mesh has no skeleton bones")]
    MissingSkeleton,

    /// No region matched the requested name.
    ///
    /// Recoverable: fall back to [`BodyRegion::proportional`](crate::BodyRegion::proportional).
    #[error("no body region '{name}' found")]
    NoRegionFound {
        /// The requested region.
        name: String,
    },
}
