//! Armor fitting kernel.
//!
//! Fits a rigid armor mesh onto a skinned avatar so it conforms to the body
//! and can follow the avatar's skeleton. This umbrella crate re-exports the
//! `armor-*` crates and adds the [`FittingSession`] workflow on top.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use armor::prelude::*;
//! use armor::types::{uv_sphere, BoneDef};
//!
//! let skeleton = Arc::new(Skeleton::new(vec![BoneDef::at("Spine", None, [0.0; 3])]).unwrap());
//! let body = uv_sphere(Point3::origin(), 1.0, 24, 12);
//! let influences = vec![SkinInfluence::single(0); body.vertex_count()];
//! let avatar = SkinnedMesh::new(body, influences, skeleton).unwrap();
//!
//! let mut session = FittingSession::new(subdivided_box(Point3::origin(), 1.2, 4));
//! session
//!     .fit_to_avatar(
//!         &avatar,
//!         FitTargetKind::TorsoHull,
//!         &FittingParameters::default(),
//!         &Progress::none(),
//!         &CancelToken::new(),
//!     )
//!     .unwrap();
//!
//! let body_index = SpatialIndex::build(&avatar).unwrap();
//! session.resolve_collisions(&body_index, 2, &CollisionParams::default()).unwrap();
//! session.bind(&avatar, &TransferOptions::default()).unwrap();
//! assert_eq!(session.status(), FitStatus::Bound);
//! ```
//!
//! # Module Organization
//!
//! - [`types`] - Meshes, skeletons, skin influences, bounds
//! - [`spatial`] - Pose baking, BVH ray queries, point index
//! - [`regions`] - Body regions and hull extraction from skin weights
//! - [`shrinkwrap`] - Iterative shrinkwrap fitting with progress and cancellation
//! - [`skinning`] - Bone-weight transfer onto fitted armor
//! - [`collision`] - Shallow penetration fix-up and Laplacian smoothing
//!
//! # Feature Flags
//!
//! - `serde` - Serialize parameter structs and region tables

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod session;
mod target;

pub use error::{SessionError, SessionResult};
pub use session::{FitStatus, FittingSession};
pub use target::{FitTargetKind, build_target};

// =============================================================================
// Re-exports
// =============================================================================

/// Meshes, skeletons, skin influences, bounds.
pub use armor_types as types;

/// Pose baking, BVH ray queries, point index.
pub use armor_spatial as spatial;

/// Body regions and hull extraction.
pub use armor_regions as regions;

/// Iterative shrinkwrap fitting.
pub use armor_shrinkwrap as shrinkwrap;

/// Bone-weight transfer.
pub use armor_skinning as skinning;

/// Collision detection, resolution and smoothing.
pub use armor_collision as collision;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for armor fitting.
///
/// ```
/// use armor::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use armor_types::{
        Aabb, Matrix4, Mesh, Point3, Skeleton, SkinInfluence, SkinnedMesh, Vector3,
        subdivided_box,
    };

    // Spatial
    pub use armor_spatial::{SpatialIndex, bake, bake_current};

    // Regions
    pub use armor_regions::{RegionName, RegionTable, compute_regions, extract_torso_hull};

    // Fitting
    pub use armor_shrinkwrap::{
        CancelToken, FitOutcome, FitReport, FittingParameters, Progress, fit_shrinkwrap,
    };

    // Binding and correction
    pub use armor_collision::{CollisionParams, detect_collisions, resolve_collisions, smooth};
    pub use armor_skinning::{TransferOptions, transfer_weights};

    // Workflow
    pub use crate::{FitStatus, FitTargetKind, FittingSession, SessionError, build_target};
}

// =============================================================================
// Tests
// =============================================================================
