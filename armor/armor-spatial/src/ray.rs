//! Ray-box and ray-triangle primitives.

use armor_types::{Aabb, Point3, Triangle, Vector3};

/// Barycentric slack so rays through shared edges and vertices still hit.
pub(crate) const BARYCENTRIC_TOLERANCE: f64 = 1e-9;

/// Relative threshold below which a ray counts as parallel to a triangle.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Closest intersection returned by [`SpatialIndex::query_ray`](crate::SpatialIndex::query_ray).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space hit point.
    pub point: Point3<f64>,
    /// Barycentric weights `[w0, w1, w2]` of the triangle's corners.
    pub barycentric: [f64; 3],
    /// Unit geometric normal of the hit triangle (from its winding).
    pub normal: Vector3<f64>,
    /// Distance along the normalized ray direction.
    pub t: f64,
    /// Index of the hit triangle in the source mesh.
    pub triangle: usize,
    /// Whether the ray hit the side the normal points to.
    ///
    /// `false` means the ray left the surface from the inside.
    pub front_face: bool,
}

/// Slab test. Returns the entry distance if the ray meets the box before `t_max`.
pub(crate) fn ray_box_entry(
    aabb: &Aabb,
    origin: &Point3<f64>,
    dir_inv: &Vector3<f64>,
    t_max: f64,
) -> Option<f64> {
    if aabb.is_empty() {
        return None;
    }
    // Padded so edge and corner hits the triangle test accepts are not culled
    let size = aabb.max - aabb.min;
    let pad = BARYCENTRIC_TOLERANCE * (1.0 + size.x + size.y + size.z);

    let mut near = f64::NEG_INFINITY;
    let mut far = f64::INFINITY;
    for axis in 0..3 {
        let inv = dir_inv[axis];
        let o = origin[axis];
        let lo = aabb.min[axis] - pad;
        let hi = aabb.max[axis] + pad;
        // Zero direction component: the ray stays in its slab or never enters it
        if inv.is_infinite() {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let t1 = (lo - o) * inv;
        let t2 = (hi - o) * inv;
        near = near.max(t1.min(t2));
        far = far.min(t1.max(t2));
    }

    if far >= near && far >= 0.0 && near <= t_max {
        Some(near)
    } else {
        None
    }
}

/// Two-sided Moller-Trumbore.
///
/// Returns `(t, [w0, w1, w2])` for hits with `t` in `[t_min, t_max]`.
/// Barycentrics within [`BARYCENTRIC_TOLERANCE`] of an edge are snapped onto
/// it and renormalized.
pub(crate) fn ray_triangle(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tri: &Triangle,
    t_min: f64,
    t_max: f64,
) -> Option<(f64, [f64; 3])> {
    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;

    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    if a.abs() <= PARALLEL_EPSILON * edge1.norm() * edge2.norm() {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - tri.v0;
    let u = f * s.dot(&h);
    if u < -BARYCENTRIC_TOLERANCE || u > 1.0 + BARYCENTRIC_TOLERANCE {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < -BARYCENTRIC_TOLERANCE || u + v > 1.0 + BARYCENTRIC_TOLERANCE {
        return None;
    }

    let t = f * edge2.dot(&q);
    if !t.is_finite() || t < t_min - BARYCENTRIC_TOLERANCE || t > t_max {
        return None;
    }

    Some((t.max(t_min), snap_barycentric([1.0 - u - v, u, v])))
}

fn snap_barycentric(raw: [f64; 3]) -> [f64; 3] {
    let mut w = raw.map(|x| if x <= BARYCENTRIC_TOLERANCE { 0.0 } else { x.min(1.0) });
    let sum: f64 = w.iter().sum();
    if sum > 0.0 {
        for x in &mut w {
            *x /= sum;
        }
        w
    } else {
        [1.0, 0.0, 0.0]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_triangle() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn hits_from_both_sides() {
        let tri = make_triangle();
        let above = ray_triangle(&Point3::new(0.25, 0.25, 1.0), &-Vector3::z(), &tri, 0.0, 10.0);
        let below = ray_triangle(&Point3::new(0.25, 0.25, -1.0), &Vector3::z(), &tri, 0.0, 10.0);
        let (t, bary) = above.unwrap();
        assert_relative_eq!(t, 1.0);
        assert_relative_eq!(bary[1], 0.25);
        assert!(below.is_some());
    }

    #[test]
    fn respects_interval() {
        let tri = make_triangle();
        let origin = Point3::new(0.25, 0.25, 1.0);
        assert!(ray_triangle(&origin, &-Vector3::z(), &tri, 0.0, 0.5).is_none());
        assert!(ray_triangle(&origin, &-Vector3::z(), &tri, 1.5, 10.0).is_none());
        assert!(ray_triangle(&origin, &Vector3::z(), &tri, 0.0, 10.0).is_none());
    }

    #[test]
    fn corner_hit_snaps_to_vertex() {
        let tri = make_triangle();
        let (t, bary) =
            ray_triangle(&Point3::new(1.0, 0.0, 0.0), &Vector3::new(-0.3, 0.2, -1.0).normalize(), &tri, 0.0, 1.0)
                .unwrap();
        assert_relative_eq!(t, 0.0);
        assert_eq!(bary, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn parallel_ray_misses() {
        let tri = make_triangle();
        assert!(ray_triangle(&Point3::new(-1.0, 0.2, 0.0), &Vector3::x(), &tri, 0.0, 10.0).is_none());
    }

    #[test]
    fn slab_handles_axis_parallel_rays() {
        let aabb = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let dir = Vector3::new(1.0, 0.0, 0.0);
        let inv = dir.map(|c| 1.0 / c);
        assert_relative_eq!(ray_box_entry(&aabb, &Point3::new(-3.0, 0.0, 0.0), &inv, 10.0).unwrap(), 2.0, epsilon = 1e-6);
        assert!(ray_box_entry(&aabb, &Point3::new(-3.0, 2.0, 0.0), &inv, 10.0).is_none());
        assert!(ray_box_entry(&aabb, &Point3::new(-3.0, 0.0, 0.0), &inv, 1.0).is_none());
        // Origin inside the box
        assert!(ray_box_entry(&aabb, &Point3::origin(), &inv, 10.0).is_some());
    }

    #[test]
    fn slab_keeps_rays_lying_on_a_face_plane() {
        let below = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 0.0, 1.0));
        let above = Aabb::new(Point3::new(-1.0, 0.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let origin = Point3::new(-3.0, 0.0, 0.0);

        for dir in [Vector3::x(), Vector3::new(1.0, 0.0, -0.0)] {
            let inv = dir.map(|c| 1.0 / c);
            assert_relative_eq!(ray_box_entry(&below, &origin, &inv, 10.0).unwrap(), 2.0, epsilon = 1e-6);
            assert_relative_eq!(ray_box_entry(&above, &origin, &inv, 10.0).unwrap(), 2.0, epsilon = 1e-6);
        }

        // Negative zero component on the shared plane
        let inv = Vector3::new(-1.0, -0.0, 0.0).map(|c| 1.0 / c);
        let start = Point3::new(3.0, 0.0, 1.0);
        assert!(ray_box_entry(&below, &start, &inv, 10.0).is_some());
        assert!(ray_box_entry(&above, &start, &inv, 10.0).is_some());
    }
}
