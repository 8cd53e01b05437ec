//! Vertex connectivity derived from triangle faces.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};

/// 1-ring vertex adjacency plus edge-to-face lookup.
///
/// Built once per operation that needs it; the smoothing passes of the
/// shrinkwrap fitter and the collision resolver both walk it.
#[derive(Debug, Clone)]
pub struct VertexAdjacency {
    /// Sorted, deduplicated neighbor list per vertex.
    neighbors: Vec<Vec<u32>>,
    /// Maps edge (v0, v1) to incident face indices. v0 < v1.
    edge_to_faces: HashMap<(u32, u32), Vec<usize>>,
}

impl VertexAdjacency {
    /// Build adjacency for `vertex_count` vertices from triangle faces.
    ///
    /// Faces referencing vertices `>= vertex_count` are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use armor_types::VertexAdjacency;
    ///
    /// let adj = VertexAdjacency::build(&[[0, 1, 2], [1, 3, 2]], 4);
    /// assert_eq!(adj.neighbors(1), &[0, 2, 3]);
    /// assert_eq!(adj.boundary_vertices().len(), 4);
    /// ```
    #[must_use]
    pub fn build(faces: &[[u32; 3]], vertex_count: usize) -> Self {
        let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); vertex_count];
        let mut edge_to_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();

        for (face_idx, face) in faces.iter().enumerate() {
            if face.iter().any(|&v| v as usize >= vertex_count) {
                continue;
            }
            for k in 0..3 {
                let a = face[k];
                let b = face[(k + 1) % 3];
                if a == b {
                    continue;
                }
                neighbors[a as usize].push(b);
                neighbors[b as usize].push(a);
                edge_to_faces
                    .entry(normalize_edge(a, b))
                    .or_default()
                    .push(face_idx);
            }
        }

        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            neighbors,
            edge_to_faces,
        }
    }

    /// Number of vertices covered.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Direct neighbors of a vertex (empty for out-of-range indices).
    #[must_use]
    pub fn neighbors(&self, v: u32) -> &[u32] {
        self.neighbors.get(v as usize).map_or(&[], Vec::as_slice)
    }

    /// Faces incident to an edge, in either direction.
    #[must_use]
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> Option<&[usize]> {
        self.edge_to_faces
            .get(&normalize_edge(v0, v1))
            .map(Vec::as_slice)
    }

    /// Iterate edges shared by exactly two faces as `(edge, [f0, f1])`.
    pub fn interior_edges(&self) -> impl Iterator<Item = ((u32, u32), [usize; 2])> + '_ {
        self.edge_to_faces.iter().filter_map(|(&edge, faces)| {
            (faces.len() == 2).then(|| (edge, [faces[0], faces[1]]))
        })
    }

    /// Vertices touching an edge with exactly one incident face.
    ///
    /// On garments and armor these are the neckline, armholes and hems.
    #[must_use]
    pub fn boundary_vertices(&self) -> HashSet<u32> {
        let mut out = HashSet::new();
        for (&(a, b), faces) in &self.edge_to_faces {
            if faces.len() == 1 {
                out.insert(a);
                out.insert(b);
            }
        }
        out
    }

    /// Breadth-first walk from `start` up to `max_hops` edges away.
    ///
    /// Returns `(vertex, hop_distance)` pairs including `start` at hop 0,
    /// in BFS order.
    #[must_use]
    pub fn within_hops(&self, start: u32, max_hops: usize) -> Vec<(u32, usize)> {
        if start as usize >= self.neighbors.len() {
            return Vec::new();
        }

        let mut visited: HashSet<u32> = HashSet::new();
        let mut queue = VecDeque::new();
        let mut out = Vec::new();

        visited.insert(start);
        queue.push_back((start, 0usize));

        while let Some((v, hop)) = queue.pop_front() {
            out.push((v, hop));
            if hop == max_hops {
                continue;
            }
            for &n in self.neighbors(v) {
                if visited.insert(n) {
                    queue.push_back((n, hop + 1));
                }
            }
        }

        out
    }
}

/// Normalize edge direction so that v0 < v1.
#[inline]
const fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 { (v0, v1) } else { (v1, v0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip() -> VertexAdjacency {
        // 0 - 1 - 2 - 3 along the bottom, 4 - 5 - 6 - 7 along the top
        let faces = [
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
        ];
        VertexAdjacency::build(&faces, 8)
    }

    #[test]
    fn neighbors_are_sorted_and_unique() {
        let adj = strip();
        assert_eq!(adj.neighbors(1), &[0, 2, 5, 6]);
        assert_eq!(adj.neighbors(0), &[1, 4, 5]);
        assert!(adj.neighbors(42).is_empty());
    }

    #[test]
    fn open_strip_is_all_boundary() {
        let adj = strip();
        assert_eq!(adj.boundary_vertices().len(), 8);
        assert_eq!(adj.faces_for_edge(5, 1).map(<[usize]>::len), Some(2));
        assert_eq!(adj.interior_edges().count(), 5);
    }

    #[test]
    fn hops_limit_the_walk() {
        let adj = strip();
        let one = adj.within_hops(0, 1);
        assert_eq!(one[0], (0, 0));
        assert_eq!(one.len(), 4);

        let two = adj.within_hops(0, 2);
        assert!(two.iter().any(|&(v, h)| v == 6 && h == 2));
        assert!(!two.iter().any(|&(v, _)| v == 3 || v == 7));
    }
}
