//! Bone hierarchy with constant-time name lookup.

use hashbrown::HashMap;
use nalgebra::{Matrix4, Point3};

use crate::{MeshError, MeshResult};

/// Input description of one bone.
#[derive(Debug, Clone)]
pub struct BoneDef {
    /// Bone name, unique within the skeleton.
    pub name: String,
    /// Index of the parent bone, `None` for a root.
    pub parent: Option<usize>,
    /// Transform relative to the parent (or to world space for roots).
    pub local: Matrix4<f64>,
}

impl BoneDef {
    /// Create a bone description.
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<usize>, local: Matrix4<f64>) -> Self {
        Self {
            name: name.into(),
            parent,
            local,
        }
    }

    /// Bone translated by `offset` from its parent.
    #[must_use]
    pub fn at(name: impl Into<String>, parent: Option<usize>, offset: [f64; 3]) -> Self {
        Self::new(
            name,
            parent,
            Matrix4::new_translation(&nalgebra::Vector3::new(offset[0], offset[1], offset[2])),
        )
    }
}

/// A bone inside a [`Skeleton`].
#[derive(Debug, Clone)]
pub struct Bone {
    /// Bone name.
    pub name: String,
    /// Index of the parent bone.
    pub parent: Option<usize>,
    /// Transform relative to the parent.
    pub local: Matrix4<f64>,
    /// Transform in world space, derived from the hierarchy.
    pub world: Matrix4<f64>,
    /// Inverse of the world transform captured at bind time.
    pub inverse_bind: Matrix4<f64>,
}

impl Bone {
    /// World-space origin of the bone.
    #[must_use]
    pub fn world_position(&self) -> Point3<f64> {
        Point3::new(self.world[(0, 3)], self.world[(1, 3)], self.world[(2, 3)])
    }
}

/// Snapshot of per-bone skinning matrices (`world * inverse_bind`).
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    matrices: Vec<Matrix4<f64>>,
}

impl Pose {
    /// Pose from explicit skinning matrices.
    #[must_use]
    pub const fn new(matrices: Vec<Matrix4<f64>>) -> Self {
        Self { matrices }
    }

    /// Rest pose: every skinning matrix is the identity.
    #[must_use]
    pub fn identity(bone_count: usize) -> Self {
        Self {
            matrices: vec![Matrix4::identity(); bone_count],
        }
    }

    /// Skinning matrix for a bone, `None` when out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, bone: usize) -> Option<&Matrix4<f64>> {
        self.matrices.get(bone)
    }

    /// All skinning matrices.
    #[must_use]
    pub fn matrices(&self) -> &[Matrix4<f64>] {
        &self.matrices
    }

    /// Number of bones in the pose.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    /// Whether the pose has no bones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}

/// An ordered bone hierarchy.
///
/// The name table is built once at construction; [`Skeleton::find_bone`] never
/// walks the hierarchy. World transforms are kept in sync by
/// [`Skeleton::update_world_transforms`], visiting bones parents-first.
///
/// # Example
///
/// ```
/// use armor_types::{BoneDef, Skeleton};
///
/// let skeleton = Skeleton::new(vec![
///     BoneDef::at("Hips", None, [0.0, 1.0, 0.0]),
///     BoneDef::at("Spine", Some(0), [0.0, 0.2, 0.0]),
/// ])
/// .unwrap();
///
/// let spine = skeleton.find_bone("Spine").unwrap();
/// assert!((skeleton.bone_world_position(spine).y - 1.2).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
    name_to_index: HashMap<String, usize>,
    /// Parents-first visiting order.
    order: Vec<usize>,
}

impl Skeleton {
    /// Build a skeleton; the construction pose becomes the bind pose.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidSkeleton`] for dangling or cyclic parent
    /// references and duplicate names.
    pub fn new(defs: Vec<BoneDef>) -> MeshResult<Self> {
        let count = defs.len();
        let mut name_to_index = HashMap::with_capacity(count);

        for (i, def) in defs.iter().enumerate() {
            if let Some(p) = def.parent {
                if p >= count {
                    return Err(MeshError::invalid_skeleton(format!(
                        "bone '{}' has parent {p} but skeleton has {count} bones",
                        def.name
                    )));
                }
            }
            if name_to_index.insert(def.name.clone(), i).is_some() {
                return Err(MeshError::invalid_skeleton(format!(
                    "duplicate bone name '{}'",
                    def.name
                )));
            }
        }

        let order = parents_first_order(&defs)?;

        let bones = defs
            .into_iter()
            .map(|d| Bone {
                name: d.name,
                parent: d.parent,
                local: d.local,
                world: Matrix4::identity(),
                inverse_bind: Matrix4::identity(),
            })
            .collect();

        let mut skeleton = Self {
            bones,
            name_to_index,
            order,
        };
        skeleton.update_world_transforms();
        skeleton.rebind();
        Ok(skeleton)
    }

    /// Replace the inverse bind matrices, e.g. with values loaded from an asset.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::LengthMismatch`] if the count differs from the bone count.
    pub fn with_inverse_binds(mut self, inverse_binds: Vec<Matrix4<f64>>) -> MeshResult<Self> {
        if inverse_binds.len() != self.bones.len() {
            return Err(MeshError::LengthMismatch {
                buffer: "inverse_binds",
                expected: self.bones.len(),
                actual: inverse_binds.len(),
            });
        }
        for (bone, m) in self.bones.iter_mut().zip(inverse_binds) {
            bone.inverse_bind = m;
        }
        Ok(self)
    }

    /// Number of bones.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Whether the skeleton has no bones.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// All bones in index order.
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Bone by index.
    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    /// Index of the bone with exactly this name.
    #[must_use]
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// First bone without a parent.
    #[must_use]
    pub fn root(&self) -> Option<usize> {
        self.bones.iter().position(|b| b.parent.is_none())
    }

    /// World-space origin of bone `index` (origin when out of range).
    #[must_use]
    pub fn bone_world_position(&self, index: usize) -> Point3<f64> {
        self.bones
            .get(index)
            .map_or_else(Point3::origin, Bone::world_position)
    }

    /// Set a bone's local transform. Call
    /// [`update_world_transforms`](Self::update_world_transforms) afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidSkeleton`] if the index is out of range.
    pub fn set_local_transform(&mut self, index: usize, local: Matrix4<f64>) -> MeshResult<()> {
        let count = self.bones.len();
        let bone = self.bones.get_mut(index).ok_or_else(|| {
            MeshError::invalid_skeleton(format!("bone {index} out of range ({count} bones)"))
        })?;
        bone.local = local;
        Ok(())
    }

    /// Recompute every world transform from the local transforms.
    pub fn update_world_transforms(&mut self) {
        for &i in &self.order {
            let world = match self.bones[i].parent {
                Some(p) => self.bones[p].world * self.bones[i].local,
                None => self.bones[i].local,
            };
            self.bones[i].world = world;
        }
    }

    /// Capture the current pose as the bind pose.
    ///
    /// Bones whose world transform is singular keep an identity inverse bind.
    pub fn rebind(&mut self) {
        for bone in &mut self.bones {
            bone.inverse_bind = bone.world.try_inverse().unwrap_or_else(Matrix4::identity);
        }
    }

    /// Skinning matrix `world * inverse_bind` for bone `index`.
    #[must_use]
    pub fn skinning_matrix(&self, index: usize) -> Matrix4<f64> {
        self.bones
            .get(index)
            .map_or_else(Matrix4::identity, |b| b.world * b.inverse_bind)
    }

    /// Snapshot of the current skinning matrices.
    #[must_use]
    pub fn current_pose(&self) -> Pose {
        Pose::new((0..self.bones.len()).map(|i| self.skinning_matrix(i)).collect())
    }
}

/// Order bones so every parent precedes its children, rejecting cycles.
fn parents_first_order(defs: &[BoneDef]) -> MeshResult<Vec<usize>> {
    let count = defs.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut roots = Vec::new();
    for (i, def) in defs.iter().enumerate() {
        match def.parent {
            Some(p) if p == i => {
                return Err(MeshError::invalid_skeleton(format!(
                    "bone '{}' is its own parent",
                    def.name
                )));
            }
            Some(p) => children[p].push(i),
            None => roots.push(i),
        }
    }

    let mut order = Vec::with_capacity(count);
    let mut stack: Vec<usize> = roots.into_iter().rev().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().rev());
    }

    // Anything unreached hangs off a cycle
    if order.len() != count {
        return Err(MeshError::invalid_skeleton(format!(
            "parent cycle detected ({} of {count} bones reachable from a root)",
            order.len()
        )));
    }
    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn make_chain() -> Skeleton {
        Skeleton::new(vec![
            BoneDef::at("Hips", None, [0.0, 1.0, 0.0]),
            BoneDef::at("Spine01", Some(0), [0.0, 0.2, 0.0]),
            BoneDef::at("Spine02", Some(1), [0.0, 0.2, 0.0]),
            BoneDef::at("Head", Some(2), [0.0, 0.3, 0.0]),
        ])
        .unwrap()
    }

    #[test]
    fn world_transforms_accumulate() {
        let sk = make_chain();
        assert_relative_eq!(sk.bone_world_position(3), Point3::new(0.0, 1.7, 0.0), epsilon = 1e-12);
        assert_eq!(sk.root(), Some(0));
        assert_eq!(sk.find_bone("Spine02"), Some(2));
        assert_eq!(sk.find_bone("spine02"), None);
    }

    #[test]
    fn bind_pose_skins_to_identity() {
        let sk = make_chain();
        for m in sk.current_pose().matrices() {
            assert_relative_eq!(*m, Matrix4::identity(), epsilon = 1e-12);
        }
    }

    #[test]
    fn posing_moves_descendants() {
        let mut sk = make_chain();
        sk.set_local_transform(1, Matrix4::new_translation(&Vector3::new(0.5, 0.2, 0.0)))
            .unwrap();
        sk.update_world_transforms();

        assert_relative_eq!(sk.bone_world_position(3).x, 0.5, epsilon = 1e-12);
        let m = sk.skinning_matrix(3);
        let moved = m.transform_point(&Point3::new(0.0, 1.7, 0.0));
        assert_relative_eq!(moved, Point3::new(0.5, 1.7, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn children_may_precede_parents() {
        let sk = Skeleton::new(vec![
            BoneDef::at("Spine", Some(1), [0.0, 0.5, 0.0]),
            BoneDef::at("Root", None, [0.0, 1.0, 0.0]),
        ])
        .unwrap();
        assert_relative_eq!(sk.bone_world_position(0).y, 1.5, epsilon = 1e-12);
        assert_eq!(sk.root(), Some(1));
    }

    #[test]
    fn rejects_bad_hierarchies() {
        let dangling = Skeleton::new(vec![BoneDef::at("A", Some(4), [0.0; 3])]);
        assert!(matches!(dangling, Err(MeshError::InvalidSkeleton(_))));

        let cycle = Skeleton::new(vec![
            BoneDef::at("A", Some(1), [0.0; 3]),
            BoneDef::at("B", Some(0), [0.0; 3]),
        ]);
        assert!(matches!(cycle, Err(MeshError::InvalidSkeleton(_))));

        let dup = Skeleton::new(vec![
            BoneDef::at("A", None, [0.0; 3]),
            BoneDef::at("A", Some(0), [0.0; 3]),
        ]);
        assert!(matches!(dup, Err(MeshError::InvalidSkeleton(_))));
    }

    #[test]
    fn inverse_bind_count_is_checked() {
        let sk = make_chain();
        assert!(sk.clone().with_inverse_binds(vec![Matrix4::identity(); 2]).is_err());
        assert!(sk.with_inverse_binds(vec![Matrix4::identity(); 4]).is_ok());
    }
}
