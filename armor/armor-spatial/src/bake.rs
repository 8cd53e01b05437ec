//! Posing skinned meshes into static world-space geometry.

use armor_types::{Mesh, Point3, Pose, SkinnedMesh};

/// Anything a [`SpatialIndex`](crate::SpatialIndex) can be built over.
///
/// Implementors hand back world-space vertex positions and the triangle list
/// indexing them.
pub trait TriangleSource {
    /// World-space positions and triangle indices.
    fn world_geometry(&self) -> (Vec<Point3<f64>>, Vec<[u32; 3]>);
}

impl TriangleSource for Mesh {
    fn world_geometry(&self) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        (self.world_positions(), self.face_list())
    }
}

impl TriangleSource for SkinnedMesh {
    /// Bakes the skeleton's current pose.
    fn world_geometry(&self) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        let baked = bake_current(self);
        let faces = baked.face_list();
        (baked.positions, faces)
    }
}

impl<T: TriangleSource + ?Sized> TriangleSource for &T {
    fn world_geometry(&self) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        (**self).world_geometry()
    }
}

/// Linear-blend skin every vertex with `pose`, producing a static mesh.
///
/// Each vertex goes through `W * B^-1 * sum(w_i * S_i) * B`, where `W` is the
/// mesh world transform, `B` the bind matrix and `S_i` the pose's skinning
/// matrices. The result is already in world space, so its own world
/// transform is the identity. Topology is unchanged; normals are recomputed.
///
/// The function only reads its inputs: baking the same pose twice gives the
/// same positions.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use armor_types::{BoneDef, Mesh, Point3, Pose, SkinInfluence, SkinnedMesh, Skeleton};
/// use armor_spatial::bake;
///
/// let skeleton = Arc::new(Skeleton::new(vec![BoneDef::at("Root", None, [0.0; 3])]).unwrap());
/// let mesh = Mesh::new(
///     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
///     Some(vec![[0, 1, 2]]),
///     None,
/// )
/// .unwrap();
/// let skinned = SkinnedMesh::new(mesh, vec![SkinInfluence::single(0); 3], skeleton).unwrap();
///
/// let baked = bake(&skinned, &Pose::identity(1));
/// assert_eq!(baked.positions, skinned.mesh.positions);
/// ```
#[must_use]
pub fn bake(skinned: &SkinnedMesh, pose: &Pose) -> Mesh {
    let mut baked = skinned
        .mesh
        .map_positions(|i, _| skinned.posed_position(i, pose));
    baked.reset_world();
    baked
}

/// [`bake`] with the skeleton's current pose.
#[must_use]
pub fn bake_current(skinned: &SkinnedMesh) -> Mesh {
    bake(skinned, &skinned.skeleton().current_pose())
}
