//! Triangle surface with a world transform.

use hashbrown::{HashMap, HashSet};
use nalgebra::{Matrix4, Point3, Vector3};

use crate::{Aabb, MeshError, MeshResult, Triangle, VertexAdjacency};

/// A triangle surface mesh.
///
/// Positions and normals live in the mesh's local space; [`Mesh::world`]
/// maps them into world space. Indices are optional: when absent, every three
/// consecutive vertices form one triangle.
///
/// # Invariants
///
/// - Every index is `< vertex_count()`.
/// - `normals.len() == positions.len()`.
/// - Anything in this workspace that moves `positions` calls
///   [`Mesh::recompute_normals`] before returning.
///
/// # Example
///
/// ```
/// use armor_types::{Mesh, Point3};
///
/// // Non-indexed: two triangles from six vertices
/// let positions = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mesh = Mesh::new(positions, None, None).unwrap();
/// assert_eq!(mesh.triangle_count(), 2);
/// assert!(!mesh.is_indexed());
/// ```
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex positions in local space.
    pub positions: Vec<Point3<f64>>,

    /// Per-vertex unit normals in local space.
    pub normals: Vec<Vector3<f64>>,

    indices: Option<Vec<[u32; 3]>>,
    world: Matrix4<f64>,
    world_inverse: Matrix4<f64>,
}

impl Mesh {
    /// Create a mesh, validating indices and normals.
    ///
    /// Normals are computed when `normals` is `None`.
    ///
    /// # Errors
    ///
    /// - [`MeshError::InvalidIndex`] if an index is out of range
    /// - [`MeshError::LengthMismatch`] if the normal count differs from the vertex count
    /// - [`MeshError::IncompleteTriangle`] if a non-indexed vertex count is not a multiple of 3
    pub fn new(
        positions: Vec<Point3<f64>>,
        indices: Option<Vec<[u32; 3]>>,
        normals: Option<Vec<Vector3<f64>>>,
    ) -> MeshResult<Self> {
        let vertex_count = positions.len();

        match &indices {
            Some(faces) => {
                for (triangle, face) in faces.iter().enumerate() {
                    if let Some(&index) = face.iter().find(|&&i| i as usize >= vertex_count) {
                        return Err(MeshError::InvalidIndex {
                            triangle,
                            index,
                            vertex_count,
                        });
                    }
                }
            }
            None => {
                if vertex_count % 3 != 0 {
                    return Err(MeshError::IncompleteTriangle { vertex_count });
                }
            }
        }

        let recompute = normals.is_none();
        let normals = match normals {
            Some(n) if n.len() != vertex_count => {
                return Err(MeshError::LengthMismatch {
                    buffer: "normals",
                    expected: vertex_count,
                    actual: n.len(),
                });
            }
            Some(n) => n,
            None => vec![Vector3::zeros(); vertex_count],
        };

        let mut mesh = Self {
            positions,
            normals,
            indices,
            world: Matrix4::identity(),
            world_inverse: Matrix4::identity(),
        };
        if recompute {
            mesh.recompute_normals();
        }
        Ok(mesh)
    }

    /// Create an indexed mesh from flat coordinate and index arrays.
    ///
    /// Trailing values that do not form a whole point or triangle are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidIndex`] if an index is out of range.
    ///
    /// # Example
    ///
    /// ```
    /// use armor_types::Mesh;
    ///
    /// let mesh = Mesh::from_raw(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], &[0, 1, 2]).unwrap();
    /// assert_eq!(mesh.vertex_count(), 3);
    /// ```
    pub fn from_raw(coords: &[f64], indices: &[u32]) -> MeshResult<Self> {
        let positions = coords
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        let faces = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Self::new(positions, Some(faces), None)
    }

    /// Same mesh with a different world transform.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::SingularTransform`] if the matrix cannot be inverted.
    pub fn with_world(mut self, world: Matrix4<f64>) -> MeshResult<Self> {
        self.set_world(world)?;
        Ok(self)
    }

    /// Replace the world transform.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::SingularTransform`] if the matrix cannot be inverted.
    pub fn set_world(&mut self, world: Matrix4<f64>) -> MeshResult<()> {
        let inverse = world.try_inverse().ok_or(MeshError::SingularTransform)?;
        self.world = world;
        self.world_inverse = inverse;
        Ok(())
    }

    /// Reset the world transform to the identity.
    pub fn reset_world(&mut self) {
        self.world = Matrix4::identity();
        self.world_inverse = Matrix4::identity();
    }

    /// Copy with every vertex replaced by `f(index, position)`.
    ///
    /// Topology and world transform are kept; normals are recomputed.
    #[must_use]
    pub fn map_positions(&self, mut f: impl FnMut(usize, &Point3<f64>) -> Point3<f64>) -> Self {
        let mut out = self.clone();
        for (i, p) in out.positions.iter_mut().enumerate() {
            *p = f(i, p);
        }
        out.recompute_normals();
        out
    }

    /// Local-to-world transform.
    #[inline]
    #[must_use]
    pub const fn world(&self) -> &Matrix4<f64> {
        &self.world
    }

    /// World-to-local transform.
    #[inline]
    #[must_use]
    pub const fn world_inverse(&self) -> &Matrix4<f64> {
        &self.world_inverse
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices
            .as_ref()
            .map_or(self.positions.len() / 3, Vec::len)
    }

    /// Whether the mesh carries an index buffer.
    #[inline]
    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// The index buffer, if any.
    #[must_use]
    pub fn indices(&self) -> Option<&[[u32; 3]]> {
        self.indices.as_deref()
    }

    /// Iterate triangles as vertex index triplets for either layout.
    pub fn faces(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let count = self.triangle_count();
        (0..count).map(move |i| self.face(i))
    }

    /// Vertex indices of triangle `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= triangle_count()`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn face(&self, i: usize) -> [u32; 3] {
        match &self.indices {
            Some(faces) => faces[i],
            None => {
                let base = (i * 3) as u32;
                [base, base + 1, base + 2]
            }
        }
    }

    /// Collect faces into an owned index buffer.
    #[must_use]
    pub fn face_list(&self) -> Vec<[u32; 3]> {
        self.faces().collect()
    }

    /// Local-space triangle `i`.
    #[must_use]
    pub fn triangle(&self, i: usize) -> Triangle {
        let [a, b, c] = self.face(i);
        Triangle::new(
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        )
    }

    /// World-space position of vertex `i`.
    #[inline]
    #[must_use]
    pub fn world_position(&self, i: usize) -> Point3<f64> {
        self.world.transform_point(&self.positions[i])
    }

    /// All vertex positions in world space.
    #[must_use]
    pub fn world_positions(&self) -> Vec<Point3<f64>> {
        self.positions
            .iter()
            .map(|p| self.world.transform_point(p))
            .collect()
    }

    /// World-space unit normal of vertex `i`.
    #[must_use]
    pub fn world_normal(&self, i: usize) -> Vector3<f64> {
        let n = self.world_inverse.transpose().transform_vector(&self.normals[i]);
        n.try_normalize(f64::EPSILON).unwrap_or(n)
    }

    /// Convert a world-space point to local space.
    #[inline]
    #[must_use]
    pub fn to_local_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.world_inverse.transform_point(p)
    }

    /// Convert a world-space displacement to local space.
    #[inline]
    #[must_use]
    pub fn to_local_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.world_inverse.transform_vector(v)
    }

    /// Convert a local-space displacement to world space.
    #[inline]
    #[must_use]
    pub fn to_world_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.world.transform_vector(v)
    }

    /// Local-space bounding box.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    /// World-space bounding box.
    #[must_use]
    pub fn world_bounds(&self) -> Aabb {
        Aabb::from_points(&self.world_positions())
    }

    /// Mean of the world-space vertex positions.
    ///
    /// Returns the origin for an empty mesh.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Point3<f64> {
        if self.positions.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .positions
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + self.world.transform_point(p).coords);
        Point3::from(sum / self.positions.len() as f64)
    }

    /// Recompute area-weighted vertex normals from the faces.
    ///
    /// Vertices without a non-degenerate incident face keep a zero normal.
    pub fn recompute_normals(&mut self) {
        let mut acc = vec![Vector3::zeros(); self.positions.len()];
        for i in 0..self.triangle_count() {
            let face = self.face(i);
            // Length is proportional to area, which gives the weighting
            let n = self.triangle(i).normal_unnormalized();
            for &v in &face {
                acc[v as usize] += n;
            }
        }
        for n in &mut acc {
            if let Some(unit) = n.try_normalize(f64::EPSILON) {
                *n = unit;
            }
        }
        self.normals = acc;
    }

    /// 1-ring vertex adjacency.
    #[must_use]
    pub fn vertex_neighbors(&self) -> VertexAdjacency {
        VertexAdjacency::build(&self.face_list(), self.vertex_count())
    }

    /// Vertices on edges with exactly one incident face.
    #[must_use]
    pub fn boundary_vertices(&self) -> HashSet<u32> {
        self.vertex_neighbors().boundary_vertices()
    }

    /// Per-vertex largest dihedral angle (radians) between adjacent faces.
    ///
    /// The angle is between face normals, so a flat region reads 0 and a
    /// cube edge reads pi/2. Vertices on no interior edge read 0.
    #[must_use]
    pub fn max_dihedral_angles(&self, adjacency: &VertexAdjacency) -> Vec<f64> {
        let face_normals: Vec<Option<Vector3<f64>>> = (0..self.triangle_count())
            .map(|i| self.triangle(i).normal())
            .collect();

        let mut out = vec![0.0_f64; self.vertex_count()];
        for ((a, b), [f0, f1]) in adjacency.interior_edges() {
            let (Some(n0), Some(n1)) = (face_normals[f0], face_normals[f1]) else {
                continue;
            };
            let angle = n0.dot(&n1).clamp(-1.0, 1.0).acos();
            for v in [a, b] {
                let slot = &mut out[v as usize];
                *slot = slot.max(angle);
            }
        }
        out
    }

    /// Merge vertices that share a position, producing an indexed mesh.
    ///
    /// Non-indexed meshes coming out of some exporters have no shared
    /// vertices, which leaves smoothing passes without neighbors.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn welded(&self, tolerance: f64) -> Self {
        let scale = 1.0 / tolerance.max(f64::EPSILON);
        let key = |p: &Point3<f64>| {
            [
                (p.x * scale).round() as i64,
                (p.y * scale).round() as i64,
                (p.z * scale).round() as i64,
            ]
        };

        let mut lookup: HashMap<[i64; 3], u32> = HashMap::new();
        let mut remap = Vec::with_capacity(self.positions.len());
        let mut positions = Vec::new();
        for p in &self.positions {
            let next = positions.len() as u32;
            let idx = *lookup.entry(key(p)).or_insert_with(|| {
                positions.push(*p);
                next
            });
            remap.push(idx);
        }

        let faces = self
            .faces()
            .map(|f| [remap[f[0] as usize], remap[f[1] as usize], remap[f[2] as usize]])
            .filter(|f| f[0] != f[1] && f[1] != f[2] && f[0] != f[2])
            .collect();

        let mut mesh = Self {
            normals: vec![Vector3::zeros(); positions.len()],
            positions,
            indices: Some(faces),
            world: self.world,
            world_inverse: self.world_inverse,
        };
        mesh.recompute_normals();
        mesh
    }
}

/// Axis-aligned box with each face split into a `divisions x divisions` grid.
///
/// Vertices are shared between faces and triangles wind outward.
///
/// # Example
///
/// ```
/// use armor_types::{subdivided_box, Point3};
///
/// let cube = subdivided_box(Point3::origin(), 1.0, 2);
/// assert_eq!(cube.vertex_count(), 26);
/// assert_eq!(cube.triangle_count(), 48);
/// assert!(cube.boundary_vertices().is_empty());
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn subdivided_box(center: Point3<f64>, half_extent: f64, divisions: usize) -> Mesh {
    let n = divisions.max(1);
    let h = half_extent;
    let x = Vector3::x();
    let y = Vector3::y();
    let z = Vector3::z();

    // (normal, u, v) with u x v == normal so grid cells wind outward
    let sides = [
        (x, y, z),
        (-x, z, y),
        (y, z, x),
        (-y, x, z),
        (z, x, y),
        (-z, y, x),
    ];

    let mut positions = Vec::with_capacity(6 * (n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(12 * n * n);
    for (normal, u, v) in sides {
        let base = positions.len() as u32;
        for j in 0..=n {
            for i in 0..=n {
                let s = -h + 2.0 * h * i as f64 / n as f64;
                let t = -h + 2.0 * h * j as f64 / n as f64;
                positions.push(center + normal * h + u * s + v * t);
            }
        }
        let row = (n + 1) as u32;
        for j in 0..n as u32 {
            for i in 0..n as u32 {
                let a = base + j * row + i;
                let b = a + 1;
                let c = a + row + 1;
                let d = a + row;
                faces.push([a, b, c]);
                faces.push([a, c, d]);
            }
        }
    }

    let soup = Mesh {
        normals: vec![Vector3::zeros(); positions.len()],
        positions,
        indices: Some(faces),
        world: Matrix4::identity(),
        world_inverse: Matrix4::identity(),
    };
    soup.welded(h.abs().max(1.0) * 1e-9)
}

/// Latitude/longitude sphere with outward winding.
///
/// `segments` is clamped to at least 3 and `rings` to at least 2.
///
/// # Example
///
/// ```
/// use armor_types::{uv_sphere, Point3};
///
/// let sphere = uv_sphere(Point3::origin(), 1.0, 16, 8);
/// assert_eq!(sphere.vertex_count(), 2 + 16 * 7);
/// assert!(sphere.boundary_vertices().is_empty());
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn uv_sphere(center: Point3<f64>, radius: f64, segments: usize, rings: usize) -> Mesh {
    use std::f64::consts::PI;

    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut positions = Vec::with_capacity(2 + segments * (rings - 1));
    positions.push(center + Vector3::new(0.0, radius, 0.0));
    for r in 1..rings {
        let phi = PI * r as f64 / rings as f64;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for s in 0..segments {
            let theta = 2.0 * PI * s as f64 / segments as f64;
            let (sin_t, cos_t) = theta.sin_cos();
            positions.push(
                center + Vector3::new(radius * sin_phi * cos_t, radius * cos_phi, radius * sin_phi * sin_t),
            );
        }
    }
    positions.push(center - Vector3::new(0.0, radius, 0.0));

    let top = 0u32;
    let bottom = (positions.len() - 1) as u32;
    let seg = segments as u32;
    let ring_start = |r: usize| 1 + (r as u32 - 1) * seg;

    let mut faces = Vec::with_capacity(2 * segments * (rings - 1));
    for s in 0..seg {
        let next = (s + 1) % seg;
        faces.push([top, ring_start(1) + next, ring_start(1) + s]);
    }
    for r in 1..rings - 1 {
        let upper = ring_start(r);
        let lower = ring_start(r + 1);
        for s in 0..seg {
            let next = (s + 1) % seg;
            faces.push([upper + s, upper + next, lower + next]);
            faces.push([upper + s, lower + next, lower + s]);
        }
    }
    let last = ring_start(rings - 1);
    for s in 0..seg {
        let next = (s + 1) % seg;
        faces.push([bottom, last + s, last + next]);
    }

    let mut mesh = Mesh {
        normals: vec![Vector3::zeros(); positions.len()],
        positions,
        indices: Some(faces),
        world: Matrix4::identity(),
        world_inverse: Matrix4::identity(),
    };
    mesh.recompute_normals();
    mesh
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_quad() -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        Mesh::new(positions, Some(vec![[0, 1, 2], [0, 2, 3]]), None).unwrap()
    }

    #[test]
    fn rejects_out_of_range_index() {
        let positions = vec![Point3::origin(); 3];
        let err = Mesh::new(positions, Some(vec![[0, 1, 3]]), None).unwrap_err();
        assert!(matches!(err, MeshError::InvalidIndex { index: 3, .. }));
    }

    #[test]
    fn rejects_normal_count_mismatch() {
        let positions = vec![Point3::origin(); 3];
        let err = Mesh::new(positions, Some(vec![[0, 1, 2]]), Some(vec![Vector3::z()])).unwrap_err();
        assert!(matches!(err, MeshError::LengthMismatch { buffer: "normals", .. }));
    }

    #[test]
    fn rejects_partial_triangle_soup() {
        let positions = vec![Point3::origin(); 4];
        assert!(matches!(
            Mesh::new(positions, None, None),
            Err(MeshError::IncompleteTriangle { vertex_count: 4 })
        ));
    }

    #[test]
    fn normals_computed_on_construction() {
        let mesh = make_quad();
        for n in &mesh.normals {
            assert_relative_eq!(*n, Vector3::z(), epsilon = 1e-12);
        }
    }

    #[test]
    fn world_transform_applies() {
        let mesh = make_quad()
            .with_world(Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0)))
            .unwrap();
        assert_relative_eq!(mesh.world_position(2), Point3::new(1.0, 3.0, 0.0));
        assert_relative_eq!(mesh.world_bounds().min.y, 2.0);
        assert_relative_eq!(mesh.centroid(), Point3::new(0.5, 2.5, 0.0));
        assert_relative_eq!(
            mesh.to_local_point(&Point3::new(0.0, 2.0, 0.0)),
            Point3::origin()
        );
    }

    #[test]
    fn singular_world_is_rejected() {
        let mut mesh = make_quad();
        assert!(mesh.set_world(Matrix4::zeros()).is_err());
        assert_eq!(*mesh.world(), Matrix4::identity());
    }

    #[test]
    fn box_edges_have_right_angle_dihedrals() {
        let cube = subdivided_box(Point3::origin(), 1.0, 2);
        let adj = cube.vertex_neighbors();
        let angles = cube.max_dihedral_angles(&adj);

        // Corner vertex sits on cube edges, face centers are flat
        let corner = cube
            .positions
            .iter()
            .position(|p| (p - Point3::new(1.0, 1.0, 1.0)).norm() < 1e-9)
            .unwrap();
        let face_center = cube
            .positions
            .iter()
            .position(|p| (p - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-9)
            .unwrap();
        assert_relative_eq!(angles[corner], std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
        assert_relative_eq!(angles[face_center], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn box_normals_point_outward() {
        let cube = subdivided_box(Point3::new(0.0, 1.0, 0.0), 0.5, 3);
        let c = Point3::new(0.0, 1.0, 0.0);
        for (p, n) in cube.positions.iter().zip(&cube.normals) {
            assert!(n.dot(&(p - c)) > 0.0);
        }
    }

    #[test]
    fn sphere_normals_point_outward() {
        let sphere = uv_sphere(Point3::origin(), 2.0, 12, 6);
        for (p, n) in sphere.positions.iter().zip(&sphere.normals) {
            assert_relative_eq!(p.coords.norm(), 2.0, epsilon = 1e-12);
            assert!(n.dot(&p.coords) / 2.0 > 0.9);
        }
    }

    #[test]
    fn welding_soup_connects_triangles() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let soup = Mesh::new(positions, None, None).unwrap();
        let welded = soup.welded(1e-9);
        assert_eq!(welded.vertex_count(), 4);
        assert_eq!(welded.triangle_count(), 2);
        assert!(welded.is_indexed());
    }

    #[test]
    fn faces_cover_both_layouts() {
        let quad = make_quad();
        assert_eq!(quad.face_list(), vec![[0, 1, 2], [0, 2, 3]]);

        let soup = Mesh::new(vec![Point3::origin(); 6], None, None).unwrap();
        assert_eq!(soup.face_list(), vec![[0, 1, 2], [3, 4, 5]]);
    }
}
