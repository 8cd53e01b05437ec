//! Finding armor vertices that sit just inside the avatar.

use armor_spatial::{SpatialError, SpatialIndex, TriangleSource};
use armor_types::{Mesh, Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{CollisionError, CollisionParams, CollisionResult};

/// Sampled vertex count below which probing stays on one thread.
const PARALLEL_THRESHOLD: usize = 512;

/// An armor vertex found inside the avatar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPoint {
    /// Armor vertex index.
    pub vertex: u32,
    /// Penetration depth along `normal`, clamped to `max_depth`.
    pub depth: f64,
    /// World-space unit normal the vertex should move along.
    pub normal: Vector3<f64>,
    /// World-space vertex position at detection time.
    pub position: Point3<f64>,
}

/// Detect shallow penetrations of `armor` into `avatar`.
///
/// Builds an index over `avatar` and calls [`detect_collisions_with_index`].
///
/// # Errors
///
/// - [`CollisionError::InvalidParams`] if `params` do not validate
/// - [`CollisionError::InvalidTarget`] if the avatar has no usable triangles
///
/// # Example
///
/// ```
/// use armor_collision::{detect_collisions, CollisionParams};
/// use armor_types::{uv_sphere, Point3};
///
/// let body = uv_sphere(Point3::origin(), 1.0, 24, 12);
/// let armor = uv_sphere(Point3::origin(), 0.99, 24, 12);
///
/// let hits = detect_collisions(&body, &armor, &CollisionParams::default()).unwrap();
/// assert_eq!(hits.len(), armor.vertex_count());
/// ```
pub fn detect_collisions<S: TriangleSource + ?Sized>(
    avatar: &S,
    armor: &Mesh,
    params: &CollisionParams,
) -> CollisionResult<Vec<CollisionPoint>> {
    params.validate()?;
    let index = SpatialIndex::build(avatar).map_err(|e| match e {
        SpatialError::BuildError { details } => CollisionError::invalid_target(details),
        other => other.into(),
    })?;
    detect_collisions_with_index(&index, armor, params)
}

/// Detect shallow penetrations against a prebuilt avatar index.
///
/// Every `sample_stride`-th vertex is probed: a ray starts `probe_distance`
/// outside the vertex along its world normal and runs back toward it. A
/// front-facing avatar hit before the vertex means the vertex is inside,
/// by `probe_distance - t`. Depths in `(min_depth, probe_distance]` are
/// recorded, clamped to `max_depth`; vertices buried deeper than the probe
/// are left alone.
///
/// # Errors
///
/// Returns [`CollisionError::InvalidParams`] if `params` do not validate.
pub fn detect_collisions_with_index(
    index: &SpatialIndex,
    armor: &Mesh,
    params: &CollisionParams,
) -> CollisionResult<Vec<CollisionPoint>> {
    params.validate()?;

    let samples: Vec<usize> = (0..armor.vertex_count())
        .step_by(params.sample_stride)
        .collect();
    let probe = |&v: &usize| probe_vertex(index, armor, v, params);
    let collisions: Vec<CollisionPoint> = if samples.len() >= PARALLEL_THRESHOLD {
        samples.par_iter().filter_map(probe).collect()
    } else {
        samples.iter().filter_map(probe).collect()
    };

    info!(
        sampled = samples.len(),
        collisions = collisions.len(),
        "Detected armor collisions"
    );
    Ok(collisions)
}

#[allow(clippy::cast_possible_truncation)]
fn probe_vertex(
    index: &SpatialIndex,
    armor: &Mesh,
    v: usize,
    params: &CollisionParams,
) -> Option<CollisionPoint> {
    let normal = armor.world_normal(v).try_normalize(f64::EPSILON)?;
    let position = armor.world_position(v);
    let origin = position + normal * params.probe_distance;

    let hit = match index.query_ray(origin, -normal, 0.0, params.probe_distance) {
        Ok(hit) => hit?,
        Err(e) => {
            debug!(vertex = v, error = %e, "Collision probe skipped");
            return None;
        }
    };
    if !hit.front_face {
        return None;
    }

    let depth = params.probe_distance - hit.t;
    (depth > params.min_depth).then(|| CollisionPoint {
        vertex: v as u32,
        depth: depth.min(params.max_depth),
        normal,
        position,
    })
}
