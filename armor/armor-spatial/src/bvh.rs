//! Bounding volume hierarchy over world-space triangles.
//!
//! Nodes split on a binned surface-area heuristic along the longest axis of
//! the triangle centroids, falling back to a median split when the bins
//! cannot separate them. Large subtrees are built in parallel with
//! `rayon::join`.

use armor_types::{Aabb, Point3, Triangle, Vector3};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ray::{RayHit, ray_box_entry, ray_triangle};

/// Tree construction settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BvhConfig {
    /// Maximum triangles per leaf.
    ///
    /// Default: 4
    pub max_leaf_size: usize,

    /// Number of centroid bins evaluated per split.
    ///
    /// Default: 12
    pub sah_bins: usize,

    /// Whether subtrees may be built on the rayon pool.
    ///
    /// Default: true
    pub parallel: bool,

    /// Subtrees at least this large are built in parallel.
    ///
    /// Default: 4096
    pub parallel_threshold: usize,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            max_leaf_size: 4,
            sah_bins: 12,
            parallel: true,
            parallel_threshold: 4096,
        }
    }
}

impl BvhConfig {
    /// Set the maximum leaf size (clamped to at least 1).
    #[must_use]
    pub const fn with_max_leaf_size(mut self, size: usize) -> Self {
        self.max_leaf_size = if size == 0 { 1 } else { size };
        self
    }

    /// Set the number of SAH bins (clamped to at least 2).
    #[must_use]
    pub const fn with_sah_bins(mut self, bins: usize) -> Self {
        self.sah_bins = if bins < 2 { 2 } else { bins };
        self
    }

    /// Enable or disable parallel construction.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the subtree size above which construction goes parallel.
    #[must_use]
    pub const fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

/// Statistics about the built tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BvhStats {
    /// Number of leaf nodes.
    pub leaf_count: usize,
    /// Number of internal nodes.
    pub internal_count: usize,
    /// Depth of the deepest leaf (root is 0).
    pub max_depth: usize,
    /// Largest leaf.
    pub max_leaf_size: usize,
    /// Sum of triangles over all leaves.
    pub total_triangles_in_leaves: usize,
}

impl BvhStats {
    /// Total number of nodes.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.leaf_count + self.internal_count
    }

    /// Average triangles per leaf.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_leaf_size(&self) -> f64 {
        if self.leaf_count == 0 {
            0.0
        } else {
            self.total_triangles_in_leaves as f64 / self.leaf_count as f64
        }
    }
}

/// Triangle reference used during construction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TriRef {
    /// Index into the compacted triangle list.
    pub index: u32,
    pub bbox: Aabb,
    pub centroid: Point3<f64>,
}

/// A tree node.
#[derive(Debug)]
pub(crate) enum BvhNode {
    Leaf {
        bbox: Aabb,
        triangles: SmallVec<[u32; 8]>,
    },
    Internal {
        bbox: Aabb,
        left: Box<Self>,
        right: Box<Self>,
    },
}

impl BvhNode {
    pub(crate) const fn bbox(&self) -> &Aabb {
        match self {
            Self::Leaf { bbox, .. } | Self::Internal { bbox, .. } => bbox,
        }
    }

    /// Build a subtree over `refs`, reordering the slice in place.
    pub(crate) fn build(refs: &mut [TriRef], config: &BvhConfig) -> Self {
        let bbox = refs.iter().fold(Aabb::empty(), |acc, r| acc.union(&r.bbox));

        if refs.len() <= config.max_leaf_size.max(1) {
            return Self::leaf(bbox, refs);
        }

        let mid = split(refs, config);
        let (left_refs, right_refs) = refs.split_at_mut(mid);

        let (left, right) = if config.parallel && left_refs.len().max(right_refs.len()) >= config.parallel_threshold
        {
            rayon::join(
                || Self::build(left_refs, config),
                || Self::build(right_refs, config),
            )
        } else {
            (Self::build(left_refs, config), Self::build(right_refs, config))
        };

        Self::Internal {
            bbox,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn leaf(bbox: Aabb, refs: &[TriRef]) -> Self {
        Self::Leaf {
            bbox,
            triangles: refs.iter().map(|r| r.index).collect(),
        }
    }

    /// Nearest-first traversal. `best` is tightened as hits are found.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn trace(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
        dir_inv: &Vector3<f64>,
        triangles: &[Triangle],
        t_min: f64,
        best: &mut f64,
        hit: &mut Option<(f64, u32, [f64; 3])>,
    ) {
        match self {
            Self::Leaf { triangles: ids, .. } => {
                for &id in ids {
                    if let Some((t, bary)) =
                        ray_triangle(origin, direction, &triangles[id as usize], t_min, *best)
                    {
                        if hit.is_none() || t < *best {
                            *best = t;
                            *hit = Some((t, id, bary));
                        }
                    }
                }
            }
            Self::Internal { left, right, .. } => {
                let tl = ray_box_entry(left.bbox(), origin, dir_inv, *best);
                let tr = ray_box_entry(right.bbox(), origin, dir_inv, *best);

                let (first, t_first, second, t_second) = match (tl, tr) {
                    (Some(a), Some(b)) if b < a => (right, Some(b), left, Some(a)),
                    _ => (left, tl, right, tr),
                };

                if t_first.is_some() {
                    first.trace(origin, direction, dir_inv, triangles, t_min, best, hit);
                }
                if let Some(t) = t_second {
                    if hit.is_none() || t <= *best {
                        second.trace(origin, direction, dir_inv, triangles, t_min, best, hit);
                    }
                }
            }
        }
    }

    pub(crate) fn collect_stats(&self, depth: usize, stats: &mut BvhStats) {
        stats.max_depth = stats.max_depth.max(depth);
        match self {
            Self::Leaf { triangles, .. } => {
                stats.leaf_count += 1;
                stats.total_triangles_in_leaves += triangles.len();
                stats.max_leaf_size = stats.max_leaf_size.max(triangles.len());
            }
            Self::Internal { left, right, .. } => {
                stats.internal_count += 1;
                left.collect_stats(depth + 1, stats);
                right.collect_stats(depth + 1, stats);
            }
        }
    }
}

/// Build a [`RayHit`] from a raw traversal result.
pub(crate) fn make_hit(
    t: f64,
    bary: [f64; 3],
    tri: &Triangle,
    source_triangle: usize,
    direction: &Vector3<f64>,
) -> RayHit {
    let normal = tri.normal().unwrap_or_else(Vector3::z);
    RayHit {
        point: tri.point_at(bary),
        barycentric: bary,
        normal,
        t,
        triangle: source_triangle,
        front_face: direction.dot(&normal) < 0.0,
    }
}

/// Partition `refs` and return the split point (always in `1..len`).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn split(refs: &mut [TriRef], config: &BvhConfig) -> usize {
    let centroid_bounds = Aabb::from_points(refs.iter().map(|r| &r.centroid));
    let axis = centroid_bounds.longest_axis();
    let lo = centroid_bounds.min[axis];
    let extent = centroid_bounds.extent(axis);

    if extent > f64::EPSILON {
        let bins = config.sah_bins.max(2);
        let bin_of = |r: &TriRef| {
            let b = ((r.centroid[axis] - lo) / extent * bins as f64) as usize;
            b.min(bins - 1)
        };

        let mut bin_bounds = vec![Aabb::empty(); bins];
        let mut bin_counts = vec![0usize; bins];
        for r in refs.iter() {
            let b = bin_of(r);
            bin_bounds[b].merge(&r.bbox);
            bin_counts[b] += 1;
        }

        // Sweep from the right so each candidate split costs O(1)
        let mut right_area = vec![0.0; bins];
        let mut acc = Aabb::empty();
        let mut count = 0usize;
        let mut right_count = vec![0usize; bins];
        for b in (1..bins).rev() {
            acc.merge(&bin_bounds[b]);
            count += bin_counts[b];
            right_area[b] = acc.surface_area();
            right_count[b] = count;
        }

        let mut best: Option<(usize, f64)> = None;
        let mut acc = Aabb::empty();
        let mut count = 0usize;
        for b in 1..bins {
            acc.merge(&bin_bounds[b - 1]);
            count += bin_counts[b - 1];
            if count == 0 || right_count[b] == 0 {
                continue;
            }
            let cost = acc.surface_area() * count as f64 + right_area[b] * right_count[b] as f64;
            if best.is_none_or(|(_, c)| cost < c) {
                best = Some((b, cost));
            }
        }

        if let Some((split_bin, _)) = best {
            let mut mid = 0;
            for i in 0..refs.len() {
                if bin_of(&refs[i]) < split_bin {
                    refs.swap(i, mid);
                    mid += 1;
                }
            }
            if mid > 0 && mid < refs.len() {
                return mid;
            }
        }
    }

    // Median split
    let mid = refs.len() / 2;
    refs.select_nth_unstable_by(mid, |a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
    mid
}
