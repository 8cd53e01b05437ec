//! Error types for mesh and skeleton construction.

use thiserror::Error;

/// Result type alias for data-model operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors raised when caller-supplied geometry or rigging data is malformed.
///
/// These are fatal topology conditions: they surface at construction time
/// instead of degrading per vertex later on.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MeshError {
    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index} (mesh has {vertex_count} vertices)")]
    InvalidIndex {
        /// Triangle index.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// Two per-vertex buffers disagree in length.
    #[error("{buffer} has {actual} entries, expected {expected}")]
    LengthMismatch {
        /// Name of the mismatched buffer.
        buffer: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Non-indexed vertex buffer is not a whole number of triangles.
    #[error("non-indexed mesh has {vertex_count} vertices, not a multiple of 3")]
    IncompleteTriangle {
        /// Number of vertices supplied.
        vertex_count: usize,
    },

    /// A world or bind transform has no inverse.
    #[error("transform is not invertible")]
    SingularTransform,

    /// The bone hierarchy is malformed.
    #[error("invalid skeleton: {0}")]
    InvalidSkeleton(String),

    /// Skin influence data references bones outside the skeleton.
    #[error("vertex {vertex} references bone {bone} (skeleton has {bone_count} bones)")]
    InvalidBoneIndex {
        /// Vertex index.
        vertex: usize,
        /// Offending bone index.
        bone: u32,
        /// Number of bones in the skeleton.
        bone_count: usize,
    },
}

impl MeshError {
    /// Create an invalid skeleton error.
    #[must_use]
    pub fn invalid_skeleton(details: impl Into<String>) -> Self {
        Self::InvalidSkeleton(details.into())
    }
}
