//! Sub-surfaces of an avatar used as smoother fitting targets.

use armor_spatial::bake_current;
use armor_types::{Aabb, Mesh, Point3, SkinnedMesh};
use hashbrown::HashSet;
use tracing::{debug, info};

use crate::table::matches_patterns;

/// Bone patterns kept by [`extract_torso_hull`].
pub const TORSO_HULL_INCLUDE: &[&str] = &["spine", "chest", "hips", "pelvis"];

/// Bone patterns dropped by [`extract_torso_hull`].
pub const TORSO_HULL_EXCLUDE: &[&str] = &[
    "leg", "thigh", "arm", "shoulder", "clavicle", "neck", "head", "hand",
];

/// Weight threshold used by [`extract_torso_hull`].
pub const TORSO_HULL_THRESHOLD: f64 = 0.5;

/// Fewest vertices a hull may have.
const MIN_HULL_VERTICES: usize = 4;

/// A reduced avatar surface.
#[derive(Debug, Clone)]
pub struct HullResult {
    /// Posed world-space geometry with identity world transform.
    pub mesh: Mesh,
    /// Avatar vertex index for each hull vertex.
    pub source_vertices: Vec<u32>,
    /// World-space bounds of the hull.
    pub bounds: Aabb,
    /// Mean hull vertex position.
    pub centroid: Point3<f64>,
}

impl HullResult {
    /// Number of hull vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.source_vertices.len()
    }
}

/// Cut the part of an avatar skinned to a set of bones.
///
/// A bone is included when its name contains any `include` pattern and no
/// `exclude` pattern, case-insensitively. A vertex is kept when its summed
/// weight on included bones is at least `weight_threshold`. Triangles survive
/// only when all three corners are kept; kept vertices are renumbered densely
/// in their original order.
///
/// Returns `None` when fewer than 4 vertices qualify or no triangle survives.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use armor_regions::extract_hull;
/// use armor_types::{subdivided_box, BoneDef, Point3, Skeleton, SkinInfluence, SkinnedMesh};
///
/// let skeleton = Arc::new(Skeleton::new(vec![BoneDef::at("Spine", None, [0.0; 3])]).unwrap());
/// let mesh = subdivided_box(Point3::origin(), 0.5, 2);
/// let influences = vec![SkinInfluence::single(0); mesh.vertex_count()];
/// let avatar = SkinnedMesh::new(mesh, influences, skeleton).unwrap();
///
/// let hull = extract_hull(&avatar, &["spine"], &[], 0.5).unwrap();
/// assert_eq!(hull.vertex_count(), avatar.vertex_count());
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn extract_hull(
    skinned: &SkinnedMesh,
    include: &[&str],
    exclude: &[&str],
    weight_threshold: f64,
) -> Option<HullResult> {
    let bones: HashSet<u32> = skinned
        .skeleton()
        .bones()
        .iter()
        .enumerate()
        .filter(|(_, b)| matches_patterns(&b.name, include, exclude))
        .map(|(i, _)| i as u32)
        .collect();
    if bones.is_empty() {
        debug!(?include, "No bones match hull patterns");
        return None;
    }

    // Old index -> new index
    let mut remap: Vec<Option<u32>> = vec![None; skinned.vertex_count()];
    let mut source_vertices = Vec::new();
    for (v, inf) in skinned.influences().iter().enumerate() {
        if inf.weight_on(|b| bones.contains(&b)) >= weight_threshold {
            remap[v] = Some(source_vertices.len() as u32);
            source_vertices.push(v as u32);
        }
    }
    if source_vertices.len() < MIN_HULL_VERTICES {
        debug!(vertices = source_vertices.len(), "Too few vertices for a hull");
        return None;
    }

    let faces: Vec<[u32; 3]> = skinned
        .mesh
        .faces()
        .filter_map(|[a, b, c]| {
            Some([
                remap[a as usize]?,
                remap[b as usize]?,
                remap[c as usize]?,
            ])
        })
        .collect();
    if faces.is_empty() {
        debug!(vertices = source_vertices.len(), "No triangle survives hull cut");
        return None;
    }

    let posed = bake_current(skinned);
    let positions: Vec<Point3<f64>> = source_vertices
        .iter()
        .map(|&v| posed.positions[v as usize])
        .collect();
    let bounds = Aabb::from_points(&positions);
    let mesh = Mesh::new(positions, Some(faces), None).ok()?;
    let centroid = mesh.centroid();

    info!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        bones = bones.len(),
        "Extracted hull"
    );

    Some(HullResult {
        mesh,
        source_vertices,
        bounds,
        centroid,
    })
}

/// Hull over the spine, chest and pelvis, without limbs or head.
#[must_use]
pub fn extract_torso_hull(skinned: &SkinnedMesh) -> Option<HullResult> {
    extract_hull(
        skinned,
        TORSO_HULL_INCLUDE,
        TORSO_HULL_EXCLUDE,
        TORSO_HULL_THRESHOLD,
    )
}
