//! Transfer output and diagnostics.

use armor_types::SkinnedMesh;

/// Which strategy resolved a target vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStrategy {
    /// Ray toward the avatar's bounds center hit the surface.
    Projective,
    /// Ray away from the center hit the surface.
    ReverseProjective,
    /// Weights copied from the closest source vertex.
    NearestVertex,
    /// Gaussian blend of the closest bones.
    BoneDistance,
    /// Bound fully to the root bone.
    RootFallback,
}

/// Count of target vertices resolved by each strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferReport {
    /// Resolved by the forward ray.
    pub projective: usize,
    /// Resolved by the reverse ray.
    pub reverse_projective: usize,
    /// Resolved by the nearest source vertex.
    pub nearest_vertex: usize,
    /// Resolved by bone distance.
    pub bone_distance: usize,
    /// Bound to the root bone.
    pub root_fallback: usize,
}

impl TransferReport {
    /// Count one vertex resolved by `strategy`.
    pub fn record(&mut self, strategy: TransferStrategy) {
        match strategy {
            TransferStrategy::Projective => self.projective += 1,
            TransferStrategy::ReverseProjective => self.reverse_projective += 1,
            TransferStrategy::NearestVertex => self.nearest_vertex += 1,
            TransferStrategy::BoneDistance => self.bone_distance += 1,
            TransferStrategy::RootFallback => self.root_fallback += 1,
        }
    }

    /// Vertices resolved by `strategy`.
    #[must_use]
    pub const fn count(&self, strategy: TransferStrategy) -> usize {
        match strategy {
            TransferStrategy::Projective => self.projective,
            TransferStrategy::ReverseProjective => self.reverse_projective,
            TransferStrategy::NearestVertex => self.nearest_vertex,
            TransferStrategy::BoneDistance => self.bone_distance,
            TransferStrategy::RootFallback => self.root_fallback,
        }
    }

    /// Total vertices resolved.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.projective
            + self.reverse_projective
            + self.nearest_vertex
            + self.bone_distance
            + self.root_fallback
    }

    /// Vertices resolved from surface geometry (rays or nearest vertex).
    #[must_use]
    pub const fn geometric(&self) -> usize {
        self.projective + self.reverse_projective + self.nearest_vertex
    }
}

/// A target mesh bound to the source skeleton.
#[derive(Debug, Clone)]
pub struct TransferOutput {
    /// Bound target, sharing the source skeleton.
    pub skinned: SkinnedMesh,
    /// Strategy that resolved each target vertex.
    pub strategies: Vec<TransferStrategy>,
    /// Per-strategy counts.
    pub report: TransferReport,
}
