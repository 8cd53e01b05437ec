//! Pushing colliding vertices back out.

use armor_spatial::PointIndex;
use armor_types::{Mesh, Point3, Vector3};
use tracing::{debug, info};

use crate::{CollisionParams, CollisionPoint, CollisionResult};

/// Summary of a resolve pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolveReport {
    /// Iterations the pushes were spread over.
    pub iterations: usize,
    /// Collisions applied.
    pub collisions: usize,
    /// Vertices that moved.
    pub moved: usize,
    /// Vertices whose total displacement hit `max_total_displacement`.
    pub clamped: usize,
    /// Longest total displacement.
    pub max_displacement: f64,
}

/// A collision with the neighbors that follow it.
struct Push {
    vertex: usize,
    step: Vector3<f64>,
    followers: Vec<(usize, f64)>,
}

/// Move colliding vertices out along their stored normals.
///
/// Each collision pushes its vertex by `depth + margin`, split evenly over
/// `iterations` (at least one). Vertices within `propagation_radius` of a
/// pushed vertex receive `propagation_strength * (1 - d / radius)` of each
/// step. After every iteration no vertex may sit farther than
/// `max_total_displacement` from where it started. Normals are recomputed.
///
/// Collisions naming vertices outside the mesh are skipped.
///
/// # Errors
///
/// Returns [`CollisionError::InvalidParams`](crate::CollisionError::InvalidParams)
/// if `params` do not validate.
///
/// # Example
///
/// ```
/// use armor_collision::{detect_collisions, resolve_collisions, CollisionParams};
/// use armor_types::{uv_sphere, Point3};
///
/// let body = uv_sphere(Point3::origin(), 1.0, 24, 12);
/// let mut armor = uv_sphere(Point3::origin(), 0.99, 24, 12);
/// let params = CollisionParams::default();
///
/// let hits = detect_collisions(&body, &armor, &params).unwrap();
/// let report = resolve_collisions(&mut armor, &hits, 3, &params).unwrap();
/// assert_eq!(report.moved, armor.vertex_count());
/// assert!(detect_collisions(&body, &armor, &params).unwrap().is_empty());
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn resolve_collisions(
    armor: &mut Mesh,
    collisions: &[CollisionPoint],
    iterations: usize,
    params: &CollisionParams,
) -> CollisionResult<ResolveReport> {
    params.validate()?;
    let iterations = iterations.max(1);
    let n = armor.vertex_count();

    let original = armor.world_positions();
    let points = PointIndex::build(&original);
    let radius = params.propagation_radius;

    let pushes: Vec<Push> = collisions
        .iter()
        .filter_map(|c| {
            let vertex = c.vertex as usize;
            if vertex >= n {
                debug!(vertex, "Collision outside mesh skipped");
                return None;
            }
            let step = c.normal * ((c.depth + params.margin) / iterations as f64);
            let followers = if radius > 0.0 && params.propagation_strength > 0.0 {
                points
                    .within(&original[vertex], radius)
                    .into_iter()
                    .filter(|&(u, _)| u != vertex)
                    .map(|(u, d)| (u, params.propagation_strength * (1.0 - d / radius)))
                    .filter(|&(_, f)| f > 0.0)
                    .collect()
            } else {
                Vec::new()
            };
            Some(Push {
                vertex,
                step,
                followers,
            })
        })
        .collect();

    let mut current = original.clone();
    for _ in 0..iterations {
        for push in &pushes {
            current[push.vertex] += push.step;
            for &(u, share) in &push.followers {
                current[u] += push.step * share;
            }
        }
        clamp_total(&mut current, &original, params.max_total_displacement);
    }

    let mut report = ResolveReport {
        iterations,
        collisions: pushes.len(),
        ..ResolveReport::default()
    };
    for (v, p) in current.iter().enumerate() {
        let moved = (p - original[v]).norm();
        if moved > 0.0 {
            report.moved += 1;
            armor.positions[v] = armor.to_local_point(p);
        }
        if moved >= params.max_total_displacement * (1.0 - 1e-9) {
            report.clamped += 1;
        }
        report.max_displacement = report.max_displacement.max(moved);
    }
    armor.recompute_normals();

    info!(
        collisions = report.collisions,
        moved = report.moved,
        clamped = report.clamped,
        max_displacement = report.max_displacement,
        "Resolved armor collisions"
    );
    Ok(report)
}

fn clamp_total(current: &mut [Point3<f64>], original: &[Point3<f64>], max: f64) {
    for (p, o) in current.iter_mut().zip(original) {
        let offset = *p - o;
        let len = offset.norm();
        if len > max {
            *p = o + offset * (max / len);
        }
    }
}
