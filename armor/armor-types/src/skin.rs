//! Skinned meshes and per-vertex bone influences.

use std::sync::Arc;

use nalgebra::{Matrix4, Point3};

use crate::{Mesh, MeshError, MeshResult, Pose, Skeleton};

/// Number of bone slots per vertex.
pub const MAX_INFLUENCES: usize = 4;

/// Tolerance on the weight sum of a normalized influence.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-5;

/// Up to four bone influences on one vertex.
///
/// Unused slots carry weight 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinInfluence {
    /// Bone indices.
    pub bones: [u32; MAX_INFLUENCES],
    /// Blend weights, one per slot.
    pub weights: [f64; MAX_INFLUENCES],
}

impl SkinInfluence {
    /// Influence from raw slots.
    #[must_use]
    pub const fn new(bones: [u32; MAX_INFLUENCES], weights: [f64; MAX_INFLUENCES]) -> Self {
        Self { bones, weights }
    }

    /// Full weight on a single bone.
    #[must_use]
    pub const fn single(bone: u32) -> Self {
        Self {
            bones: [bone, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    /// Build from `(bone, weight)` pairs, keeping the four heaviest.
    ///
    /// Weights are not normalized; see [`SkinInfluence::normalized`].
    #[must_use]
    pub fn from_pairs(pairs: &[(u32, f64)]) -> Self {
        let mut sorted: Vec<(u32, f64)> = pairs.to_vec();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut out = Self::new([0; MAX_INFLUENCES], [0.0; MAX_INFLUENCES]);
        for (slot, (bone, weight)) in sorted.into_iter().take(MAX_INFLUENCES).enumerate() {
            out.bones[slot] = bone;
            out.weights[slot] = weight;
        }
        out
    }

    /// Sum of the slot weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Non-zero `(bone, weight)` slots.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.bones
            .iter()
            .zip(&self.weights)
            .filter(|(_, w)| **w > 0.0)
            .map(|(&b, &w)| (b, w))
    }

    /// Summed weight on bones accepted by `pred`.
    #[must_use]
    pub fn weight_on(&self, mut pred: impl FnMut(u32) -> bool) -> f64 {
        self.iter().filter(|&(b, _)| pred(b)).map(|(_, w)| w).sum()
    }

    /// Whether the weights sum to 1 within 1e-5 and none is negative.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.weights.iter().all(|&w| w >= 0.0 && w.is_finite())
            && (self.total() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }

    /// Copy with negative or non-finite weights zeroed, the rest scaled to
    /// sum 1, and zero-weight slots pointing at bone 0.
    ///
    /// An influence with no positive weight binds fully to `root`.
    #[must_use]
    pub fn normalized(&self, root: u32) -> Self {
        let mut out = *self;
        for w in &mut out.weights {
            if !w.is_finite() || *w < 0.0 {
                *w = 0.0;
            }
        }
        let total = out.total();
        if total <= 0.0 {
            return Self::single(root);
        }
        for (b, w) in out.bones.iter_mut().zip(out.weights.iter_mut()) {
            *w /= total;
            if *w == 0.0 {
                *b = 0;
            }
        }
        out
    }
}

/// A mesh deformed by a skeleton.
///
/// The skeleton is shared: an armor mesh bound by weight transfer holds a
/// clone of the avatar's `Arc`, never its own copy.
///
/// The bind matrix relates mesh space to skeleton space at bind time; by
/// default it is the mesh's world transform.
#[derive(Debug, Clone)]
pub struct SkinnedMesh {
    /// Underlying geometry in bind pose.
    pub mesh: Mesh,
    influences: Vec<SkinInfluence>,
    skeleton: Arc<Skeleton>,
    bind_matrix: Matrix4<f64>,
    bind_matrix_inverse: Matrix4<f64>,
}

impl SkinnedMesh {
    /// Bind a mesh to a skeleton.
    ///
    /// Weights are normalized to sum 1; a vertex with no positive weight binds
    /// to the root bone.
    ///
    /// # Errors
    ///
    /// - [`MeshError::LengthMismatch`] if there is not one influence per vertex
    /// - [`MeshError::InvalidBoneIndex`] if a weighted slot names a missing bone
    pub fn new(
        mesh: Mesh,
        influences: Vec<SkinInfluence>,
        skeleton: Arc<Skeleton>,
    ) -> MeshResult<Self> {
        if influences.len() != mesh.vertex_count() {
            return Err(MeshError::LengthMismatch {
                buffer: "influences",
                expected: mesh.vertex_count(),
                actual: influences.len(),
            });
        }

        let bone_count = skeleton.len();
        for (vertex, inf) in influences.iter().enumerate() {
            if let Some((bone, _)) = inf.iter().find(|&(b, _)| b as usize >= bone_count) {
                return Err(MeshError::InvalidBoneIndex {
                    vertex,
                    bone,
                    bone_count,
                });
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let influences = match skeleton.root() {
            Some(root) => influences
                .iter()
                .map(|inf| inf.normalized(root as u32))
                .collect(),
            // No bones: nothing to bind to, keep the raw data
            None => influences,
        };

        let bind_matrix = *mesh.world();
        let bind_matrix_inverse = *mesh.world_inverse();
        Ok(Self {
            mesh,
            influences,
            skeleton,
            bind_matrix,
            bind_matrix_inverse,
        })
    }

    /// Bind from parallel index and weight arrays.
    ///
    /// # Errors
    ///
    /// Same as [`SkinnedMesh::new`], plus [`MeshError::LengthMismatch`] when
    /// the two arrays differ in length.
    pub fn from_arrays(
        mesh: Mesh,
        skin_indices: &[[u32; MAX_INFLUENCES]],
        skin_weights: &[[f64; MAX_INFLUENCES]],
        skeleton: Arc<Skeleton>,
    ) -> MeshResult<Self> {
        if skin_indices.len() != skin_weights.len() {
            return Err(MeshError::LengthMismatch {
                buffer: "skin_weights",
                expected: skin_indices.len(),
                actual: skin_weights.len(),
            });
        }
        let influences = skin_indices
            .iter()
            .zip(skin_weights)
            .map(|(&b, &w)| SkinInfluence::new(b, w))
            .collect();
        Self::new(mesh, influences, skeleton)
    }

    /// Same skinned mesh with an explicit bind matrix.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::SingularTransform`] if the matrix cannot be inverted.
    pub fn with_bind_matrix(mut self, bind_matrix: Matrix4<f64>) -> MeshResult<Self> {
        self.bind_matrix_inverse = bind_matrix
            .try_inverse()
            .ok_or(MeshError::SingularTransform)?;
        self.bind_matrix = bind_matrix;
        Ok(self)
    }

    /// Per-vertex influences.
    #[must_use]
    pub fn influences(&self) -> &[SkinInfluence] {
        &self.influences
    }

    /// Shared skeleton.
    #[must_use]
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    /// Bind matrix.
    #[must_use]
    pub const fn bind_matrix(&self) -> &Matrix4<f64> {
        &self.bind_matrix
    }

    /// Inverse bind matrix.
    #[must_use]
    pub const fn bind_matrix_inverse(&self) -> &Matrix4<f64> {
        &self.bind_matrix_inverse
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    /// Matrix taking local vertex `v` to its posed world position:
    /// `W * B^-1 * sum(w_i * S_i) * B`.
    ///
    /// Bones missing from `pose` contribute the identity.
    #[must_use]
    pub fn blended_matrix(&self, v: usize, pose: &Pose) -> Matrix4<f64> {
        let mut blend = Matrix4::zeros();
        let mut total = 0.0;
        for (bone, weight) in self.influences[v].iter() {
            let s = pose.get(bone as usize).copied().unwrap_or_else(Matrix4::identity);
            blend += s * weight;
            total += weight;
        }
        if total <= 0.0 {
            blend = Matrix4::identity();
        }
        self.mesh.world() * self.bind_matrix_inverse * blend * self.bind_matrix
    }

    /// Posed world position of vertex `v`.
    #[must_use]
    pub fn posed_position(&self, v: usize, pose: &Pose) -> Point3<f64> {
        self.blended_matrix(v, pose)
            .transform_point(&self.mesh.positions[v])
    }
}
