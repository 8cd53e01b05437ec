//! Nearest-vertex and radius queries over point sets.

use armor_types::Point3;
use hashbrown::HashMap;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Rotation3;

/// k-d tree over a fixed set of points.
///
/// Coincident points share one tree entry, so meshes without an index
/// buffer (one copy of a corner per triangle) build fine. Points are stored
/// in a rotated frame. Distances do not change, but axis-aligned grids (box
/// faces, rings of a sphere) no longer put dozens of points on one split
/// plane, which the tree cannot bucket. Non-finite points are not indexed.
///
/// # Example
///
/// ```
/// use armor_spatial::PointIndex;
/// use armor_types::Point3;
///
/// let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
/// let index = PointIndex::build(&points);
///
/// let (nearest, distance) = index.nearest(&Point3::new(0.9, 0.1, 0.0)).unwrap();
/// assert_eq!(nearest, 1);
/// assert!((distance - 0.02_f64.sqrt()).abs() < 1e-12);
/// ```
pub struct PointIndex {
    tree: KdTree<f64, 3>,
    frame: Rotation3<f64>,
    /// Input indices per tree entry, ascending.
    groups: Vec<Vec<usize>>,
    len: usize,
}

/// Exact-position key; `-0.0` and `0.0` collapse.
fn position_key(p: &Point3<f64>) -> [u64; 3] {
    [p.x, p.y, p.z].map(|c| (c + 0.0).to_bits())
}

impl PointIndex {
    /// Index the points; query results refer to their position in the input.
    #[must_use]
    pub fn build<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let frame = Rotation3::from_euler_angles(0.317, 0.731, 1.129);
        let mut tree: KdTree<f64, 3> = KdTree::new();
        let mut slots: HashMap<[u64; 3], usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut len = 0;
        for (i, p) in points.into_iter().enumerate() {
            if !p.coords.iter().all(|c| c.is_finite()) {
                continue;
            }
            len += 1;
            let slot = *slots.entry(position_key(p)).or_insert_with(|| {
                let q = frame * p;
                #[allow(clippy::cast_possible_truncation)]
                let item = groups.len() as u64;
                tree.add(&[q.x, q.y, q.z], item);
                groups.push(Vec::with_capacity(1));
                groups.len() - 1
            });
            groups[slot].push(i);
        }
        Self {
            tree,
            frame,
            groups,
            len,
        }
    }

    /// Number of indexed points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no point is indexed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Closest point as `(index, distance)`.
    ///
    /// Among coincident points the lowest input index wins.
    #[must_use]
    pub fn nearest(&self, p: &Point3<f64>) -> Option<(usize, f64)> {
        if self.is_empty() {
            return None;
        }
        let q = self.frame * p;
        let found = self.tree.nearest_one::<SquaredEuclidean>(&[q.x, q.y, q.z]);
        #[allow(clippy::cast_possible_truncation)]
        let first = self.groups.get(found.item as usize)?.first()?;
        Some((*first, found.distance.sqrt()))
    }

    /// Points within `radius` as `(index, distance)`, closest first.
    #[must_use]
    pub fn within(&self, p: &Point3<f64>, radius: f64) -> Vec<(usize, f64)> {
        if self.is_empty() || radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let q = self.frame * p;
        self.tree
            .within::<SquaredEuclidean>(&[q.x, q.y, q.z], radius * radius)
            .into_iter()
            .flat_map(|n| {
                #[allow(clippy::cast_possible_truncation)]
                let members = self.groups.get(n.item as usize).map_or(&[][..], Vec::as_slice);
                let distance = n.distance.sqrt();
                members.iter().map(move |&i| (i, distance))
            })
            .collect()
    }
}

impl std::fmt::Debug for PointIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointIndex").field("len", &self.len).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armor_types::subdivided_box;

    #[test]
    fn grid_faces_do_not_overflow_buckets() {
        // 17x17 points per face, all sharing one coordinate
        let cube = subdivided_box(Point3::origin(), 1.0, 16);
        let index = PointIndex::build(&cube.positions);
        assert_eq!(index.len(), cube.vertex_count());

        for (i, p) in cube.positions.iter().enumerate().step_by(37) {
            let (found, distance) = index.nearest(p).unwrap();
            assert_eq!(found, i);
            assert_relative_eq!(distance, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn within_is_sorted_and_bounded() {
        let points: Vec<Point3<f64>> = (0..10).map(|i| Point3::new(i as f64 * 0.1, 0.0, 0.0)).collect();
        let index = PointIndex::build(&points);

        let near = index.within(&Point3::origin(), 0.25);
        let ids: Vec<usize> = near.iter().map(|&(i, _)| i).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(near.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(index.within(&Point3::origin(), -1.0).is_empty());
    }

    #[test]
    fn coincident_points_share_an_entry() {
        let p = Point3::new(0.25, -0.5, 1.0);
        let mut points = vec![p; 64];
        points.push(Point3::new(2.0, 0.0, 0.0));
        points.push(Point3::new(-0.0, 0.0, 0.0));
        points.push(Point3::origin());
        let index = PointIndex::build(&points);
        assert_eq!(index.len(), 67);

        let (found, distance) = index.nearest(&Point3::new(0.25, -0.5, 1.1)).unwrap();
        assert_eq!(found, 0);
        assert_relative_eq!(distance, 0.1, epsilon = 1e-12);

        let near = index.within(&p, 0.01);
        let ids: Vec<usize> = near.iter().map(|&(i, _)| i).collect();
        assert_eq!(ids, (0..64).collect::<Vec<_>>());

        // Signed zeros are the same position
        let zeros = index.within(&Point3::origin(), 1e-9);
        assert_eq!(zeros.iter().map(|&(i, _)| i).collect::<Vec<_>>(), vec![65, 66]);
    }

    #[test]
    fn non_finite_points_are_skipped() {
        let points = vec![Point3::new(f64::NAN, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let index = PointIndex::build(&points);
        assert_eq!(index.len(), 1);
        assert_eq!(index.nearest(&Point3::origin()).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn empty_index_finds_nothing() {
        let index = PointIndex::build(&Vec::<Point3<f64>>::new());
        assert!(index.is_empty());
        assert!(index.nearest(&Point3::origin()).is_none());
    }
}
