//! Resolving bone weights for every target vertex.

use std::sync::Arc;

use armor_spatial::{PointIndex, SpatialIndex, bake_current};
use armor_types::{Mesh, Point3, SkinInfluence, SkinnedMesh, Vector3};
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::{
    TransferError, TransferOptions, TransferOutput, TransferReport, TransferResult,
    TransferStrategy,
};

/// Target vertex count below which resolution stays on one thread.
const PARALLEL_THRESHOLD: usize = 512;

/// Bones blended by the bone-distance strategy.
const BONE_CANDIDATES: usize = 4;

/// Per-bone accumulator; three corners of four slots each.
type BoneWeights = SmallVec<[(u32, f64); 12]>;

/// Read-only lookup structures over the posed source.
struct Resolver<'a> {
    source: &'a SkinnedMesh,
    options: &'a TransferOptions,
    index: SpatialIndex,
    points: PointIndex,
    bones: Vec<Point3<f64>>,
    center: Point3<f64>,
    root: u32,
}

impl<'a> Resolver<'a> {
    #[allow(clippy::cast_possible_truncation)]
    fn new(source: &'a SkinnedMesh, options: &'a TransferOptions) -> TransferResult<Self> {
        let skeleton = source.skeleton();
        let root = skeleton.root().ok_or(TransferError::MissingSkeleton)? as u32;

        let baked = bake_current(source);
        let index = SpatialIndex::build(&baked)?;
        let points = PointIndex::build(&baked.positions);
        let center = index.bounds().center();

        // Skeleton space to avatar world space
        let to_world = source.mesh.world() * source.bind_matrix_inverse();
        let bones = (0..skeleton.len())
            .map(|i| to_world.transform_point(&skeleton.bone_world_position(i)))
            .collect();

        Ok(Self {
            source,
            options,
            index,
            points,
            bones,
            center,
            root,
        })
    }

    fn resolve(&self, p: &Point3<f64>) -> (SkinInfluence, TransferStrategy) {
        if let Some(dir) = (self.center - p).try_normalize(1e-12) {
            if let Some(inf) = self.project(p, dir) {
                return (inf, TransferStrategy::Projective);
            }
            if let Some(inf) = self.project(p, -dir) {
                return (inf, TransferStrategy::ReverseProjective);
            }
        }
        if let Some(inf) = self.nearest_vertex(p) {
            return (inf, TransferStrategy::NearestVertex);
        }
        if let Some(inf) = self.bone_distance(p) {
            return (inf, TransferStrategy::BoneDistance);
        }
        (SkinInfluence::single(self.root), TransferStrategy::RootFallback)
    }

    /// Blend the corner weights of the first triangle hit along `dir`.
    fn project(&self, p: &Point3<f64>, dir: Vector3<f64>) -> Option<SkinInfluence> {
        let hit = match self
            .index
            .query_ray(*p, dir, 0.0, self.options.max_ray_distance)
        {
            Ok(hit) => hit?,
            Err(e) => {
                debug!(error = %e, "Projection skipped");
                return None;
            }
        };
        let corners = self.index.triangle_vertices(hit.triangle)?;

        let mut acc = BoneWeights::new();
        for (&v, &bary) in corners.iter().zip(&hit.barycentric) {
            let inf = self.source.influences().get(v as usize)?;
            for (bone, weight) in inf.iter() {
                let share = weight * bary;
                match acc.iter_mut().find(|(b, _)| *b == bone) {
                    Some(entry) => entry.1 += share,
                    None => acc.push((bone, share)),
                }
            }
        }
        self.finish(&acc)
    }

    fn nearest_vertex(&self, p: &Point3<f64>) -> Option<SkinInfluence> {
        let (v, distance) = self.points.nearest(p)?;
        if distance > self.options.max_nearest_distance {
            return None;
        }
        let acc: BoneWeights = self.source.influences().get(v)?.iter().collect();
        self.finish(&acc)
    }

    /// Gaussian over the closest bones, relative to the closest one.
    #[allow(clippy::cast_possible_truncation)]
    fn bone_distance(&self, p: &Point3<f64>) -> Option<SkinInfluence> {
        let mut near: Vec<(u32, f64)> = self
            .bones
            .iter()
            .enumerate()
            .map(|(i, b)| (i as u32, (b - p).norm_squared()))
            .filter(|&(_, d2)| d2.sqrt() <= self.options.max_bone_distance)
            .collect();
        near.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        near.truncate(BONE_CANDIDATES);

        let &(closest, d2_min) = near.first()?;
        let sigma = self.options.bone_sigma;
        if sigma.is_nan() || sigma <= 0.0 {
            return Some(SkinInfluence::single(closest));
        }
        let two_sigma_sq = 2.0 * sigma * sigma;
        let acc: BoneWeights = near
            .iter()
            .map(|&(bone, d2)| (bone, (-(d2 - d2_min) / two_sigma_sq).exp()))
            .collect();
        self.finish(&acc)
    }

    /// Top four, floor at `min_weight`, renormalize.
    fn finish(&self, pairs: &[(u32, f64)]) -> Option<SkinInfluence> {
        let mut inf = SkinInfluence::from_pairs(pairs);
        for w in &mut inf.weights {
            if *w < self.options.min_weight {
                *w = 0.0;
            }
        }
        (inf.total() > 0.0).then(|| inf.normalized(self.root))
    }
}

/// Bind `target` to the skeleton of `source`.
///
/// For each target vertex (in world space) the first strategy that succeeds
/// decides its weights:
///
/// 1. **Projective**: ray toward the center of the posed source bounds; the
///    hit triangle's corner weights are blended by barycentric coordinates
/// 2. **Reverse projective**: the same ray, pointing away from the center
/// 3. **Nearest vertex**: weights of the closest source vertex within
///    [`max_nearest_distance`](TransferOptions::max_nearest_distance)
/// 4. **Bone distance**: Gaussian falloff over the four closest bone origins
///    within [`max_bone_distance`](TransferOptions::max_bone_distance)
///
/// Anything left binds fully to the root bone, so every vertex ends with
/// weights summing to 1.
///
/// The result shares the source's skeleton. Its bind matrix is the target's
/// world transform, and its positions are un-posed through each vertex's
/// blended skin matrix so that skinning at the current pose reproduces the
/// target exactly.
///
/// # Errors
///
/// - [`TransferError::MissingSkeleton`] if the source skeleton has no bones
/// - [`TransferError::InvalidTarget`] if the target has no vertices
/// - [`TransferError::Spatial`] if the posed source has no usable triangles
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use armor_skinning::{transfer_weights, TransferOptions};
/// use armor_types::{subdivided_box, BoneDef, Point3, Skeleton, SkinInfluence, SkinnedMesh};
///
/// let skeleton = Arc::new(Skeleton::new(vec![BoneDef::at("Hips", None, [0.0; 3])]).unwrap());
/// let body = subdivided_box(Point3::origin(), 0.5, 4);
/// let influences = vec![SkinInfluence::single(0); body.vertex_count()];
/// let avatar = SkinnedMesh::new(body, influences, skeleton).unwrap();
///
/// let armor = subdivided_box(Point3::origin(), 0.6, 4);
/// let output = transfer_weights(&avatar, &armor, &TransferOptions::default()).unwrap();
///
/// assert_eq!(output.report.total(), armor.vertex_count());
/// assert!(output.skinned.influences().iter().all(|inf| inf.is_normalized()));
/// ```
pub fn transfer_weights(
    source: &SkinnedMesh,
    target: &Mesh,
    options: &TransferOptions,
) -> TransferResult<TransferOutput> {
    if source.skeleton().is_empty() {
        return Err(TransferError::MissingSkeleton);
    }
    if target.vertex_count() == 0 {
        return Err(TransferError::invalid_target("target has no vertices"));
    }

    info!(
        source_vertices = source.vertex_count(),
        target_vertices = target.vertex_count(),
        bones = source.skeleton().len(),
        "Transferring skin weights"
    );

    let resolver = Resolver::new(source, options)?;
    let world = target.world_positions();
    let resolved: Vec<(SkinInfluence, TransferStrategy)> =
        if options.parallel && world.len() >= PARALLEL_THRESHOLD {
            world.par_iter().map(|p| resolver.resolve(p)).collect()
        } else {
            world.iter().map(|p| resolver.resolve(p)).collect()
        };

    let mut report = TransferReport::default();
    let mut influences = Vec::with_capacity(resolved.len());
    let mut strategies = Vec::with_capacity(resolved.len());
    for (inf, strategy) in resolved {
        report.record(strategy);
        influences.push(inf);
        strategies.push(strategy);
    }

    let mut skinned = SkinnedMesh::new(target.clone(), influences, Arc::clone(source.skeleton()))?;
    unpose(&mut skinned, &world);

    if report.root_fallback > 0 {
        warn!(
            vertices = report.root_fallback,
            "Vertices bound to the root bone"
        );
    }
    info!(
        projective = report.projective,
        reverse_projective = report.reverse_projective,
        nearest_vertex = report.nearest_vertex,
        bone_distance = report.bone_distance,
        root_fallback = report.root_fallback,
        "Skin weight transfer complete"
    );

    Ok(TransferOutput {
        skinned,
        strategies,
        report,
    })
}

/// Move each vertex so the current pose maps it back onto `world`.
///
/// Vertices whose blended matrix is singular keep their position.
fn unpose(skinned: &mut SkinnedMesh, world: &[Point3<f64>]) {
    let pose = skinned.skeleton().current_pose();
    let local: Vec<Point3<f64>> = world
        .iter()
        .enumerate()
        .map(|(v, p)| {
            skinned
                .blended_matrix(v, &pose)
                .try_inverse()
                .map_or(skinned.mesh.positions[v], |inv| inv.transform_point(p))
        })
        .collect();
    skinned.mesh.positions = local;
    skinned.mesh.recompute_normals();
}
