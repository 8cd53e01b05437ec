//! Spatial queries over avatar surfaces.
//!
//! This crate answers "where does this ray first meet the surface?" for the
//! fitting, weight-transfer and collision passes:
//!
//! - [`bake`] / [`bake_current`] - Pose a [`SkinnedMesh`](armor_types::SkinnedMesh)
//!   into a static world-space [`Mesh`](armor_types::Mesh)
//! - [`SpatialIndex`] - BVH over a static triangle buffer with closest-hit
//!   [`query_ray`](SpatialIndex::query_ray)
//! - [`TriangleSource`] - Anything an index can be built from
//! - [`PointIndex`] - k-d tree over vertex positions for nearest and radius
//!   queries
//!
//! Baking is decoupled from tree construction so a posed mesh can be cached
//! or inspected on its own.
//!
//! # Example
//!
//! ```
//! use armor_types::{subdivided_box, Point3, Vector3};
//! use armor_spatial::SpatialIndex;
//!
//! let body = subdivided_box(Point3::new(0.0, 1.0, 0.0), 0.2, 4);
//! let index = SpatialIndex::build(&body).unwrap();
//!
//! // From inside, the hit is a back face
//! let hit = index
//!     .query_ray(Point3::new(0.0, 1.0, 0.0), Vector3::x(), 0.0, f64::INFINITY)
//!     .unwrap()
//!     .unwrap();
//! assert!(!hit.front_face);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod bake;
mod bvh;
mod error;
mod index;
mod points;
mod ray;

pub use bake::{TriangleSource, bake, bake_current};
pub use bvh::{BvhConfig, BvhStats};
pub use error::{SpatialError, SpatialResult};
pub use index::SpatialIndex;
pub use points::PointIndex;
pub use ray::RayHit;
