//! Laplacian smoothing.
//!
//! Each vertex moves toward the centroid of its 1-ring:
//!
//! ```text
//! v_new = v + strength * (centroid(N(v)) - v)
//! ```
//!
//! Repeated passes shrink closed surfaces, so a single light pass after
//! collision resolution is the usual choice.

use armor_types::{Mesh, Vector3};
use rayon::prelude::*;

/// Vertex count below which smoothing stays on one thread.
const PARALLEL_THRESHOLD: usize = 2048;

/// Apply one Laplacian pass with `strength` in `[0, 1]` (clamped).
///
/// Vertices without neighbors stay put. Normals are recomputed. Returns the
/// largest local-space displacement.
///
/// # Example
///
/// ```
/// use armor_collision::smooth;
/// use armor_types::{subdivided_box, Point3};
///
/// let mut mesh = subdivided_box(Point3::origin(), 1.0, 4);
/// let moved = smooth(&mut mesh, 0.5);
/// assert!(moved > 0.0);
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn smooth(mesh: &mut Mesh, strength: f64) -> f64 {
    let strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) };
    if strength <= 0.0 || mesh.vertex_count() == 0 {
        return 0.0;
    }

    let adjacency = mesh.vertex_neighbors();
    let positions = &mesh.positions;
    #[allow(clippy::cast_possible_truncation)]
    let offset = |v: usize| -> Vector3<f64> {
        let ring = adjacency.neighbors(v as u32);
        if ring.is_empty() {
            return Vector3::zeros();
        }
        let sum: Vector3<f64> = ring.iter().map(|&n| positions[n as usize].coords).sum();
        let centroid = sum / ring.len() as f64;
        (centroid - positions[v].coords) * strength
    };
    let offsets: Vec<Vector3<f64>> = if positions.len() >= PARALLEL_THRESHOLD {
        (0..positions.len()).into_par_iter().map(offset).collect()
    } else {
        (0..positions.len()).map(offset).collect()
    };

    let mut max_displacement = 0.0_f64;
    for (p, d) in mesh.positions.iter_mut().zip(&offsets) {
        *p += d;
        max_displacement = max_displacement.max(d.norm());
    }
    mesh.recompute_normals();
    max_displacement
}

/// Apply `passes` Laplacian passes. Returns the summed per-pass maxima.
pub fn smooth_iterations(mesh: &mut Mesh, passes: usize, strength: f64) -> f64 {
    (0..passes).map(|_| smooth(mesh, strength)).sum()
}
