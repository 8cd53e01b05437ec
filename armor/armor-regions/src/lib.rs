//! Skeleton-driven body segmentation for armor fitting.
//!
//! Two views of an avatar, both derived from skin weights:
//!
//! - [`compute_regions`] - Named [`BodyRegion`]s (head, torso, arms, hips,
//!   legs) with world-space bounds, driven by a declarative [`RegionTable`]
//! - [`extract_hull`] / [`extract_torso_hull`] - A cut-out sub-surface
//!   ([`HullResult`]) used as a smoother fitting target than the full body
//!
//! Both read the avatar in its current pose and never modify it. Results
//! are derived data: recompute after posing.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use armor_regions::{compute_regions, RegionName};
//! use armor_types::{subdivided_box, BoneDef, Point3, Skeleton, SkinInfluence, SkinnedMesh};
//!
//! let skeleton = Skeleton::new(vec![
//!     BoneDef::at("Hips", None, [0.0, 1.0, 0.0]),
//!     BoneDef::at("Spine", Some(0), [0.0, 0.2, 0.0]),
//! ])
//! .unwrap();
//! let mesh = subdivided_box(Point3::new(0.0, 1.2, 0.0), 0.2, 2);
//! let influences = vec![SkinInfluence::single(1); mesh.vertex_count()];
//! let avatar = SkinnedMesh::new(mesh, influences, Arc::new(skeleton)).unwrap();
//!
//! let regions = compute_regions(&avatar).unwrap();
//! let torso = regions.require(&RegionName::Torso).unwrap();
//! assert_eq!(torso.vertex_count(), 26);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod hull;
mod region;
mod segment;
mod table;

pub use error::{RegionError, RegionResult};
pub use hull::{
    HullResult, TORSO_HULL_EXCLUDE, TORSO_HULL_INCLUDE, TORSO_HULL_THRESHOLD, extract_hull,
    extract_torso_hull,
};
pub use region::{BodyRegion, RegionSet, RegionSource};
pub use segment::{compute_regions, compute_regions_with};
pub use table::{RegionName, RegionRule, RegionTable, TorsoCorrection};
