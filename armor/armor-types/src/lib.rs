//! Shared data model for the armor fitting kernel.
//!
//! This crate provides the types every other `armor-*` crate speaks:
//!
//! - [`Mesh`] - Triangle surface with positions, normals, optional indices
//!   and a world transform
//! - [`SkinnedMesh`] - A mesh bound to a [`Skeleton`] through per-vertex
//!   [`SkinInfluence`]s
//! - [`Skeleton`] / [`Bone`] / [`Pose`] - Bone hierarchy with O(1) name lookup
//! - [`Aabb`] / [`Triangle`] - Geometric helpers
//! - [`VertexAdjacency`] - 1-ring connectivity used by smoothing passes
//!
//! # Units
//!
//! All coordinates are `f64` and unit-agnostic. Avatars are usually authored
//! in meters with **Y up**, which is what the region defaults assume.
//!
//! # Example
//!
//! ```
//! use armor_types::{Mesh, Point3};
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mesh = Mesh::new(positions, Some(vec![[0, 1, 2]]), None).unwrap();
//!
//! assert_eq!(mesh.triangle_count(), 1);
//! assert!((mesh.normals[0].z - 1.0).abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod adjacency;
mod bounds;
mod error;
mod mesh;
mod skeleton;
mod skin;
mod triangle;

pub use adjacency::VertexAdjacency;
pub use bounds::Aabb;
pub use error::{MeshError, MeshResult};
pub use mesh::{Mesh, subdivided_box, uv_sphere};
pub use skeleton::{Bone, BoneDef, Pose, Skeleton};
pub use skin::{MAX_INFLUENCES, SkinInfluence, SkinnedMesh};
pub use triangle::Triangle;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point3, Vector3};
