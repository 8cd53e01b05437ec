//! Hop-limited vertex neighborhoods with Gaussian falloff.

use armor_types::VertexAdjacency;
use rayon::prelude::*;

/// Share of a source's influence left at the farthest observed hop.
const FAR_HOP_FALLOFF: f64 = 0.05;

/// Per-vertex weighted neighborhoods, built once per fit.
///
/// Each vertex's list includes itself at hop 0. Weights follow
/// `exp(-h^2 / (2 sigma^2))` over hop distance `h`, with sigma chosen so the
/// largest observed hop gets [`FAR_HOP_FALLOFF`] of the self weight, and are
/// normalized to sum 1 per vertex.
#[derive(Debug, Clone)]
pub(crate) struct Neighborhood {
    entries: Vec<Vec<(u32, f64)>>,
    max_hop: usize,
}

impl Neighborhood {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub(crate) fn build(adjacency: &VertexAdjacency, radius: usize, parallel: bool) -> Self {
        let walk = |v: usize| adjacency.within_hops(v as u32, radius);
        let hops: Vec<Vec<(u32, usize)>> = if parallel {
            (0..adjacency.vertex_count()).into_par_iter().map(walk).collect()
        } else {
            (0..adjacency.vertex_count()).map(walk).collect()
        };

        let max_hop = hops
            .iter()
            .flat_map(|h| h.iter().map(|&(_, d)| d))
            .max()
            .unwrap_or(0);
        let sigma = if max_hop == 0 {
            1.0
        } else {
            max_hop as f64 / (2.0 * (1.0 / FAR_HOP_FALLOFF).ln()).sqrt()
        };
        let two_sigma_sq = 2.0 * sigma * sigma;

        let entries = hops
            .into_iter()
            .map(|list| {
                let mut weighted: Vec<(u32, f64)> = list
                    .into_iter()
                    .map(|(n, h)| (n, (-((h * h) as f64) / two_sigma_sq).exp()))
                    .collect();
                let total: f64 = weighted.iter().map(|&(_, w)| w).sum();
                if total > 0.0 {
                    for (_, w) in &mut weighted {
                        *w /= total;
                    }
                }
                weighted
            })
            .collect();

        Self { entries, max_hop }
    }

    /// Weighted neighbors of `v`, self first.
    pub(crate) fn of(&self, v: usize) -> &[(u32, f64)] {
        self.entries.get(v).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) const fn max_hop(&self) -> usize {
        self.max_hop
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// 0 - 1 - 2 - 3 as two thin triangles plus a tail.
    fn make_strip() -> VertexAdjacency {
        VertexAdjacency::build(&[[0, 1, 4], [1, 2, 4], [2, 3, 4]], 5)
    }

    #[test]
    fn weights_are_normalized_with_self_first() {
        let hood = Neighborhood::build(&make_strip(), 2, false);
        assert_eq!(hood.len(), 5);
        for v in 0..5 {
            let list = hood.of(v);
            assert_eq!(list[0].0 as usize, v);
            let total: f64 = list.iter().map(|&(_, w)| w).sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn far_hop_gets_five_percent_of_self() {
        let hood = Neighborhood::build(&make_strip(), 2, false);
        assert_eq!(hood.max_hop(), 2);

        // Vertex 0 reaches 2 at hop 2 (0-1-2)
        let list = hood.of(0);
        let self_w = list[0].1;
        let (_, far_w) = list.iter().find(|&&(n, _)| n == 2).copied().unwrap_or((0, 0.0));
        assert_relative_eq!(far_w / self_w, FAR_HOP_FALLOFF, epsilon = 1e-12);
    }

    #[test]
    fn zero_radius_is_self_only() {
        let hood = Neighborhood::build(&make_strip(), 0, true);
        assert_eq!(hood.max_hop(), 0);
        assert_eq!(hood.of(3), &[(3, 1.0)]);
    }
}
