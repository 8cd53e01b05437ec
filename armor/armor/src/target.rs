//! Choosing what the armor is fitted against.

use armor_regions::extract_torso_hull;
use armor_spatial::{SpatialIndex, SpatialResult};
use armor_types::SkinnedMesh;
use tracing::{info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Surface a fit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FitTargetKind {
    /// The whole posed avatar.
    #[default]
    FullBody,
    /// Spine, chest and pelvis only; smoother for chest pieces.
    TorsoHull,
}

/// Index the avatar surface selected by `kind` at its current pose.
///
/// [`FitTargetKind::TorsoHull`] falls back to the full body when no hull
/// can be cut (no matching bones, too few vertices, no surviving
/// triangles) or the hull has no usable triangles.
///
/// # Errors
///
/// Returns [`SpatialError::BuildError`](armor_spatial::SpatialError::BuildError)
/// if the full body has no usable triangles.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use armor::{build_target, FitTargetKind};
/// use armor::types::{subdivided_box, BoneDef, Point3, Skeleton, SkinInfluence, SkinnedMesh};
///
/// let skeleton = Arc::new(Skeleton::new(vec![BoneDef::at("Head", None, [0.0; 3])]).unwrap());
/// let body = subdivided_box(Point3::origin(), 0.5, 2);
/// let influences = vec![SkinInfluence::single(0); body.vertex_count()];
/// let avatar = SkinnedMesh::new(body, influences, skeleton).unwrap();
///
/// // No spine bones: the torso hull falls back to the whole body
/// let index = build_target(&avatar, FitTargetKind::TorsoHull).unwrap();
/// assert_eq!(index.triangle_count(), avatar.mesh.triangle_count());
/// ```
pub fn build_target(avatar: &SkinnedMesh, kind: FitTargetKind) -> SpatialResult<SpatialIndex> {
    match kind {
        FitTargetKind::FullBody => SpatialIndex::build(avatar),
        FitTargetKind::TorsoHull => {
            let Some(hull) = extract_torso_hull(avatar) else {
                warn!("No torso hull, fitting to the full body");
                return SpatialIndex::build(avatar);
            };
            match SpatialIndex::build(&hull.mesh) {
                Ok(index) => {
                    info!(triangles = index.triangle_count(), "Fitting to torso hull");
                    Ok(index)
                }
                Err(e) => {
                    warn!(error = %e, "Torso hull unusable, fitting to the full body");
                    SpatialIndex::build(avatar)
                }
            }
        }
    }
}
