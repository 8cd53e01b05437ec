//! The spatial index: a static triangle buffer plus its BVH.

use armor_types::{Aabb, Point3, Triangle, Vector3};
use tracing::{debug, info, warn};

use crate::bake::TriangleSource;
use crate::bvh::{BvhConfig, BvhNode, BvhStats, TriRef, make_hit};
use crate::error::{SpatialError, SpatialResult};
use crate::ray::{RayHit, ray_box_entry};

/// Triangles with less area than this are skipped at build time.
const DEGENERATE_AREA: f64 = 1e-14;

/// Accelerated closest-hit ray queries over a static triangle surface.
///
/// An index captures the geometry it was built from. When the target's
/// world transform or pose changes, build a new one; nothing is invalidated
/// implicitly and the tree is never edited in place.
///
/// # Example
///
/// ```
/// use armor_types::{uv_sphere, Point3, Vector3};
/// use armor_spatial::SpatialIndex;
///
/// let sphere = uv_sphere(Point3::origin(), 1.0, 24, 12);
/// let index = SpatialIndex::build(&sphere).unwrap();
///
/// let hit = index
///     .query_ray(Point3::new(0.0, 0.0, 5.0), -Vector3::z(), 0.0, f64::INFINITY)
///     .unwrap()
///     .unwrap();
/// assert!(hit.front_face);
/// assert!((hit.t - 4.0).abs() < 0.02);
/// ```
#[derive(Debug)]
pub struct SpatialIndex {
    root: BvhNode,
    /// Non-degenerate world-space triangles.
    triangles: Vec<Triangle>,
    /// Source triangle index for each entry of `triangles`.
    source_triangle: Vec<u32>,
    /// Every source face, degenerate ones included.
    faces: Vec<[u32; 3]>,
    bounds: Aabb,
    centroid: Point3<f64>,
    skipped: usize,
}

impl SpatialIndex {
    /// Build with the default [`BvhConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::BuildError`] if no non-degenerate triangle remains.
    pub fn build<S: TriangleSource + ?Sized>(source: &S) -> SpatialResult<Self> {
        Self::build_with(source, &BvhConfig::default())
    }

    /// Build with explicit tree settings.
    ///
    /// Skinned sources are baked in their current pose first.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::BuildError`] if no non-degenerate triangle remains.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn build_with<S: TriangleSource + ?Sized>(
        source: &S,
        config: &BvhConfig,
    ) -> SpatialResult<Self> {
        let (positions, faces) = source.world_geometry();

        let mut triangles = Vec::with_capacity(faces.len());
        let mut source_triangle = Vec::with_capacity(faces.len());
        for (i, face) in faces.iter().enumerate() {
            let Some(tri) = lookup_triangle(&positions, face) else {
                continue;
            };
            let finite = [tri.v0, tri.v1, tri.v2]
                .iter()
                .all(|p| p.coords.iter().all(|c| c.is_finite()));
            if !finite || tri.is_degenerate(DEGENERATE_AREA) {
                continue;
            }
            triangles.push(tri);
            source_triangle.push(i as u32);
        }

        let skipped = faces.len() - triangles.len();
        if triangles.is_empty() {
            return Err(SpatialError::build(format!(
                "no usable triangles ({} faces, {skipped} degenerate)",
                faces.len()
            )));
        }
        if skipped > 0 {
            warn!(skipped, total = faces.len(), "Skipped degenerate triangles");
        }

        let mut refs: Vec<TriRef> = triangles
            .iter()
            .enumerate()
            .map(|(i, t)| TriRef {
                index: i as u32,
                bbox: t.bounds(),
                centroid: t.centroid(),
            })
            .collect();
        let root = BvhNode::build(&mut refs, config);

        let bounds = *root.bbox();
        let centroid = if positions.is_empty() {
            Point3::origin()
        } else {
            Point3::from(
                positions.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords)
                    / positions.len() as f64,
            )
        };

        let index = Self {
            root,
            triangles,
            source_triangle,
            faces,
            bounds,
            centroid,
            skipped,
        };

        let stats = index.stats();
        info!(
            triangles = index.triangle_count(),
            skipped,
            leaves = stats.leaf_count,
            depth = stats.max_depth,
            "Built spatial index"
        );

        Ok(index)
    }

    /// Closest hit with `t` in `[t_min, t_max]`.
    ///
    /// The direction is normalized, so `t` is a world-space distance. Works for
    /// rays starting inside the surface; such hits have `front_face == false`.
    /// A miss is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidQuery`] if the direction has zero length
    /// or any input is non-finite.
    pub fn query_ray(
        &self,
        origin: Point3<f64>,
        direction: Vector3<f64>,
        t_min: f64,
        t_max: f64,
    ) -> SpatialResult<Option<RayHit>> {
        if !origin.coords.iter().all(|c| c.is_finite()) {
            return Err(SpatialError::invalid_query("non-finite origin"));
        }
        if !direction.iter().all(|c| c.is_finite()) {
            return Err(SpatialError::invalid_query("non-finite direction"));
        }
        let Some(dir) = direction.try_normalize(f64::MIN_POSITIVE) else {
            return Err(SpatialError::invalid_query("zero-length direction"));
        };
        if t_min.is_nan() || t_max.is_nan() {
            return Err(SpatialError::invalid_query("NaN ray interval"));
        }
        if t_max < t_min {
            return Ok(None);
        }

        let dir_inv = dir.map(|c| 1.0 / c);
        let mut best = t_max;
        let mut raw = None;
        if ray_box_entry(self.root.bbox(), &origin, &dir_inv, best).is_some() {
            self.root
                .trace(&origin, &dir, &dir_inv, &self.triangles, t_min, &mut best, &mut raw);
        }

        Ok(raw.map(|(t, id, bary)| {
            let id = id as usize;
            make_hit(
                t,
                bary,
                &self.triangles[id],
                self.source_triangle[id] as usize,
                &dir,
            )
        }))
    }

    /// Whether `point` lies inside the closed surface.
    ///
    /// Casts toward the centroid: a back-face hit means inside, a front-face
    /// hit means outside. On a miss the opposite ray decides the same way.
    #[must_use]
    pub fn is_inside(&self, point: &Point3<f64>) -> bool {
        let toward = self.centroid - point;
        let dir = toward.try_normalize(1e-12).unwrap_or_else(Vector3::y);

        for d in [dir, -dir] {
            match self.query_ray(*point, d, 0.0, f64::INFINITY) {
                Ok(Some(hit)) => return !hit.front_face,
                Ok(None) => {}
                Err(e) => {
                    debug!(error = %e, "Inside test skipped");
                    return false;
                }
            }
        }
        false
    }

    /// Source vertex indices of a source triangle.
    #[must_use]
    pub fn triangle_vertices(&self, triangle: usize) -> Option<[u32; 3]> {
        self.faces.get(triangle).copied()
    }

    /// World-space bounds of the indexed triangles.
    #[must_use]
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Mean of the source's world-space vertex positions.
    #[must_use]
    pub const fn centroid(&self) -> Point3<f64> {
        self.centroid
    }

    /// Number of triangles in the tree.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of source triangles skipped as degenerate.
    #[must_use]
    pub const fn skipped_triangles(&self) -> usize {
        self.skipped
    }

    /// Tree statistics.
    #[must_use]
    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        self.root.collect_stats(0, &mut stats);
        stats
    }
}

fn lookup_triangle(positions: &[Point3<f64>], face: &[u32; 3]) -> Option<Triangle> {
    Some(Triangle::new(
        *positions.get(face[0] as usize)?,
        *positions.get(face[1] as usize)?,
        *positions.get(face[2] as usize)?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armor_types::{BoneDef, Matrix4, Mesh, SkinInfluence, SkinnedMesh, Skeleton, subdivided_box, uv_sphere};
    use std::sync::Arc;

    fn make_cube() -> Mesh {
        subdivided_box(Point3::origin(), 1.0, 4)
    }

    #[test]
    fn zero_triangles_is_build_error() {
        let empty = Mesh::new(Vec::new(), Some(Vec::new()), None).unwrap();
        assert!(matches!(
            SpatialIndex::build(&empty),
            Err(SpatialError::BuildError { .. })
        ));
    }

    #[test]
    fn all_degenerate_is_build_error() {
        let flat = Mesh::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)],
            Some(vec![[0, 1, 2]]),
            None,
        )
        .unwrap();
        assert!(SpatialIndex::build(&flat).is_err());
    }

    #[test]
    fn degenerate_triangles_are_skipped() {
        let mut positions = make_cube().positions;
        let n = positions.len() as u32;
        positions.push(Point3::new(5.0, 5.0, 5.0));
        let mut faces = make_cube().face_list();
        faces.push([n, n, 0]);
        let mesh = Mesh::new(positions, Some(faces.clone()), None).unwrap();

        let index = SpatialIndex::build(&mesh).unwrap();
        assert_eq!(index.skipped_triangles(), 1);
        assert_eq!(index.triangle_count(), faces.len() - 1);
    }

    #[test]
    fn zero_direction_is_invalid_query() {
        let index = SpatialIndex::build(&make_cube()).unwrap();
        let result = index.query_ray(Point3::new(0.0, 0.0, 5.0), Vector3::zeros(), 0.0, 10.0);
        assert!(matches!(result, Err(SpatialError::InvalidQuery { .. })));

        let result = index.query_ray(Point3::new(0.0, 0.0, 5.0), Vector3::new(f64::NAN, 0.0, 1.0), 0.0, 10.0);
        assert!(result.is_err());
    }

    #[test]
    fn outside_and_inside_hits() {
        let index = SpatialIndex::build(&make_cube()).unwrap();

        let outside = index
            .query_ray(Point3::new(0.1, 0.2, 5.0), Vector3::new(0.0, 0.0, -2.0), 0.0, f64::INFINITY)
            .unwrap()
            .unwrap();
        assert!(outside.front_face);
        assert_relative_eq!(outside.t, 4.0, epsilon = 1e-9);
        assert_relative_eq!(outside.point, Point3::new(0.1, 0.2, 1.0), epsilon = 1e-9);
        assert_relative_eq!(outside.normal, Vector3::z(), epsilon = 1e-9);
        let bary_sum: f64 = outside.barycentric.iter().sum();
        assert_relative_eq!(bary_sum, 1.0, epsilon = 1e-12);

        let inside = index
            .query_ray(Point3::new(0.1, 0.2, 0.0), Vector3::x(), 0.0, f64::INFINITY)
            .unwrap()
            .unwrap();
        assert!(!inside.front_face);
        assert_relative_eq!(inside.t, 0.9, epsilon = 1e-9);
    }

    #[test]
    fn interval_limits_hits() {
        let index = SpatialIndex::build(&make_cube()).unwrap();
        let origin = Point3::new(0.1, 0.2, 5.0);
        assert!(index.query_ray(origin, -Vector3::z(), 0.0, 3.0).unwrap().is_none());
        // Skip the near face, land on the far one
        let far = index.query_ray(origin, -Vector3::z(), 4.5, 10.0).unwrap().unwrap();
        assert_relative_eq!(far.t, 6.0, epsilon = 1e-9);
        assert!(!far.front_face);
        assert!(index.query_ray(origin, Vector3::z(), 0.0, 100.0).unwrap().is_none());
    }

    #[test]
    fn hit_maps_back_to_source_vertices() {
        let cube = make_cube();
        let index = SpatialIndex::build(&cube).unwrap();
        let hit = index
            .query_ray(Point3::new(0.3, -0.4, 3.0), -Vector3::z(), 0.0, f64::INFINITY)
            .unwrap()
            .unwrap();
        let verts = index.triangle_vertices(hit.triangle).unwrap();
        assert_eq!(verts, cube.face(hit.triangle));

        let rebuilt = Point3::from(
            verts
                .iter()
                .zip(hit.barycentric)
                .fold(Vector3::zeros(), |acc, (&v, w)| acc + cube.positions[v as usize].coords * w),
        );
        assert_relative_eq!(rebuilt, hit.point, epsilon = 1e-9);
    }

    #[test]
    fn axis_rays_along_grid_planes_hit() {
        let index = SpatialIndex::build(&make_cube()).unwrap();
        // Every origin sits on planes shared by neighbouring BVH boxes
        for (origin, dir) in [
            (Point3::new(3.0, 0.0, 0.0), -Vector3::x()),
            (Point3::new(0.0, -3.0, 0.5), Vector3::y()),
            (Point3::new(0.5, 0.5, 3.0), -Vector3::z()),
        ] {
            let hit = index.query_ray(origin, dir, 0.0, f64::INFINITY).unwrap().unwrap();
            assert!(hit.front_face);
            assert_relative_eq!(hit.t, 2.0, epsilon = 1e-9);
        }
        assert!(index.is_inside(&Point3::new(0.0, 0.5, 0.0)));
    }

    #[test]
    fn inside_test() {
        let index = SpatialIndex::build(&uv_sphere(Point3::origin(), 1.0, 24, 12)).unwrap();
        assert!(index.is_inside(&Point3::new(0.2, 0.1, -0.3)));
        assert!(index.is_inside(&Point3::origin()));
        assert!(!index.is_inside(&Point3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn world_transform_is_applied() {
        let cube = make_cube()
            .with_world(Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0)))
            .unwrap();
        let index = SpatialIndex::build(&cube).unwrap();
        assert_relative_eq!(index.bounds().center(), Point3::new(10.0, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(index.centroid(), Point3::new(10.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn skinned_source_is_baked_in_current_pose() {
        let mut skeleton = Skeleton::new(vec![BoneDef::at("Root", None, [0.0; 3])]).unwrap();
        let cube = make_cube();
        let influences = vec![SkinInfluence::single(0); cube.vertex_count()];

        skeleton
            .set_local_transform(0, Matrix4::new_translation(&Vector3::new(0.0, 3.0, 0.0)))
            .unwrap();
        skeleton.update_world_transforms();
        let skinned = SkinnedMesh::new(cube, influences, Arc::new(skeleton)).unwrap();

        let index = SpatialIndex::build(&skinned).unwrap();
        assert_relative_eq!(index.bounds().center().y, 3.0, epsilon = 1e-9);
    }
}
