//! Vertex-to-region classification from skin weights.

use armor_spatial::bake_current;
use armor_types::{Aabb, Point3, Skeleton, SkinnedMesh, Vector3};
use hashbrown::HashSet;
use tracing::{debug, info, warn};

use crate::region::{BodyRegion, RegionSet, RegionSource};
use crate::table::{RegionRule, RegionTable, TorsoCorrection};
use crate::{RegionError, RegionName, RegionResult};

/// Segment an avatar with the default humanoid [`RegionTable`].
///
/// # Errors
///
/// Returns [`RegionError::MissingSkeleton`] if the skeleton has no bones.
pub fn compute_regions(skinned: &SkinnedMesh) -> RegionResult<RegionSet> {
    compute_regions_with(skinned, &RegionTable::default())
}

/// Segment an avatar into the regions of `table`.
///
/// For each rule, the matching bones are collected and every vertex whose
/// summed weight on them reaches the rule's threshold joins the region.
/// Bounds and centroid come from the posed, world-space vertex positions.
/// A region with fewer than `table.min_vertices` members takes its bounds
/// from spheres around its bones instead. Rules that match no bone produce
/// no region.
///
/// The computation only reads the mesh, so calling it twice on an unchanged
/// pose gives equal results.
///
/// # Errors
///
/// Returns [`RegionError::MissingSkeleton`] if the skeleton has no bones.
pub fn compute_regions_with(skinned: &SkinnedMesh, table: &RegionTable) -> RegionResult<RegionSet> {
    let skeleton = skinned.skeleton();
    if skeleton.is_empty() {
        return Err(RegionError::MissingSkeleton);
    }

    let up = table.up_axis.min(2);
    let posed = bake_current(skinned);
    let positions = &posed.positions;

    let mut body_bounds = Aabb::from_points(positions);
    if body_bounds.is_empty() {
        body_bounds = Aabb::from_points(&bone_positions(skinned, 0..skeleton.len()));
    }

    let mut regions = Vec::with_capacity(table.rules.len());
    for (name, rule) in &table.rules {
        let bones = matching_bones(skeleton, rule);
        if bones.is_empty() {
            debug!(region = %name, "No bones match region");
            continue;
        }

        let mut region = classify(skinned, positions, name, rule, &bones, table.min_vertices);
        if *name == RegionName::Torso {
            correct_torso(&mut region, skinned, &bones, &body_bounds, up, &table.torso);
        }
        regions.push(region);
    }

    info!(
        regions = regions.len(),
        vertices = positions.len(),
        bones = skeleton.len(),
        "Computed body regions"
    );

    Ok(RegionSet::new(regions, body_bounds, up))
}

#[allow(clippy::cast_possible_truncation)]
fn matching_bones(skeleton: &Skeleton, rule: &RegionRule) -> Vec<u32> {
    skeleton
        .bones()
        .iter()
        .enumerate()
        .filter(|(_, b)| rule.matches(&b.name))
        .map(|(i, _)| i as u32)
        .collect()
}

/// Bone origins in the same world frame as the baked vertices.
fn bone_positions(skinned: &SkinnedMesh, bones: impl IntoIterator<Item = usize>) -> Vec<Point3<f64>> {
    let skeleton = skinned.skeleton();
    let to_world = skinned.mesh.world() * skinned.bind_matrix_inverse();
    bones
        .into_iter()
        .map(|b| to_world.transform_point(&skeleton.bone_world_position(b)))
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn classify(
    skinned: &SkinnedMesh,
    positions: &[Point3<f64>],
    name: &RegionName,
    rule: &RegionRule,
    bones: &[u32],
    min_vertices: usize,
) -> BodyRegion {
    let bone_set: HashSet<u32> = bones.iter().copied().collect();
    let vertices: Vec<u32> = skinned
        .influences()
        .iter()
        .enumerate()
        .filter(|(_, inf)| inf.weight_on(|b| bone_set.contains(&b)) >= rule.weight_threshold)
        .map(|(v, _)| v as u32)
        .collect();

    let skeleton = skinned.skeleton();
    let bone_names = bones
        .iter()
        .filter_map(|&b| skeleton.bone(b as usize))
        .map(|b| b.name.clone())
        .collect();

    let (bounds, centroid, source) = if vertices.len() >= min_vertices.max(1) {
        let members = vertices.iter().map(|&v| &positions[v as usize]);
        let bounds = Aabb::from_points(members.clone());
        let sum = members.fold(Vector3::zeros(), |acc, p| acc + p.coords);
        (
            bounds,
            Point3::from(sum / vertices.len() as f64),
            RegionSource::Vertices,
        )
    } else {
        let mut bounds = Aabb::empty();
        for p in bone_positions(skinned, bones.iter().map(|&b| b as usize)) {
            bounds.merge(&Aabb::around(&p, rule.fallback_radius));
        }
        debug!(
            region = %name,
            vertices = vertices.len(),
            min_vertices,
            "Region uses bone-sphere fallback"
        );
        (bounds, bounds.center(), RegionSource::BoneFallback)
    };

    BodyRegion {
        name: name.clone(),
        bone_names,
        bounds,
        vertices,
        centroid,
        weight_threshold: rule.weight_threshold,
        source,
    }
}

/// Rebuild a torso box that is too short or sits too high on the body.
fn correct_torso(
    region: &mut BodyRegion,
    skinned: &SkinnedMesh,
    bones: &[u32],
    body: &Aabb,
    up: usize,
    correction: &TorsoCorrection,
) {
    if !correction.enabled || body.is_empty() {
        return;
    }
    let body_height = body.extent(up);
    if body_height <= f64::EPSILON {
        return;
    }

    let height = region.bounds.extent(up);
    let center = (region.bounds.center()[up] - body.min[up]) / body_height;
    let too_short = height < correction.min_height_fraction * body_height;
    let too_high = center > correction.max_center_fraction;
    if !too_short && !too_high {
        return;
    }

    let joints = bone_positions(skinned, bones.iter().map(|&b| b as usize));
    let mut bounds = Aabb::from_points(&joints).expanded(correction.padding_fraction * body_height);

    let min_height = correction.min_height_fraction * body_height;
    let half = bounds.extent(up).max(min_height) * 0.5;
    let target = body.min[up] + correction.center_fraction * body_height;
    bounds = bounds.with_axis_range(up, target - half, target + half);

    warn!(
        height,
        center_fraction = center,
        too_short,
        too_high,
        "Torso region rebuilt from bone positions"
    );

    region.bounds = bounds;
    region.centroid = bounds.center();
    region.source = RegionSource::Corrected;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss, clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armor_types::{BoneDef, Matrix4, Mesh, SkinInfluence, subdivided_box};
    use std::sync::Arc;

    /// Spine01, Spine02, LeftShoulder, RightShoulder, Head, LeftUpLeg over a
    /// stacked-box body. Each box is skinned fully to one bone.
    fn create_avatar() -> SkinnedMesh {
        let skeleton = Skeleton::new(vec![
            BoneDef::at("Spine01", None, [0.0, 1.0, 0.0]),
            BoneDef::at("Spine02", Some(0), [0.0, 0.25, 0.0]),
            BoneDef::at("LeftShoulder", Some(1), [0.2, 0.15, 0.0]),
            BoneDef::at("RightShoulder", Some(1), [-0.2, 0.15, 0.0]),
            BoneDef::at("Head", Some(1), [0.0, 0.35, 0.0]),
            BoneDef::at("LeftUpLeg", Some(0), [0.1, -0.1, 0.0]),
        ])
        .unwrap();

        let parts: [(Point3<f64>, f64, u32); 6] = [
            (Point3::new(0.0, 1.05, 0.0), 0.15, 0),
            (Point3::new(0.0, 1.3, 0.0), 0.12, 1),
            (Point3::new(0.3, 1.4, 0.0), 0.06, 2),
            (Point3::new(-0.3, 1.4, 0.0), 0.06, 3),
            (Point3::new(0.0, 1.7, 0.0), 0.1, 4),
            (Point3::new(0.1, 0.5, 0.0), 0.08, 5),
        ];

        let mut positions = Vec::new();
        let mut faces = Vec::new();
        let mut influences = Vec::new();
        for (center, half, bone) in parts {
            let part = subdivided_box(center, half, 2);
            let base = positions.len() as u32;
            positions.extend(part.positions.iter().copied());
            faces.extend(part.faces().map(|f| f.map(|i| i + base)));
            influences.extend(std::iter::repeat_n(SkinInfluence::single(bone), part.vertex_count()));
        }

        let mesh = Mesh::new(positions, Some(faces), None).unwrap();
        SkinnedMesh::new(mesh, influences, Arc::new(skeleton)).unwrap()
    }

    #[test]
    fn spine_bones_feed_torso_only() {
        let avatar = create_avatar();
        let regions = compute_regions(&avatar).unwrap();

        let torso = regions.require(&RegionName::Torso).unwrap();
        assert_eq!(torso.bone_names, vec!["Spine01".to_string(), "Spine02".to_string()]);
        assert!(torso.vertex_count() > 0);

        let arms = regions.require(&RegionName::Arms).unwrap();
        assert!(arms.bone_names.contains(&"LeftShoulder".to_string()));
        assert!(arms.bone_names.contains(&"RightShoulder".to_string()));

        assert_eq!(regions.require(&RegionName::Head).unwrap().bone_names, vec!["Head".to_string()]);
        assert_eq!(regions.require(&RegionName::Legs).unwrap().bone_names, vec!["LeftUpLeg".to_string()]);

        // No hips or pelvis bone in this rig
        assert!(regions.get(&RegionName::Hips).is_none());
        assert!(matches!(
            regions.require(&RegionName::Hips),
            Err(RegionError::NoRegionFound { .. })
        ));
    }

    #[test]
    fn regions_follow_table_order() {
        let avatar = create_avatar();
        let regions = compute_regions(&avatar).unwrap();
        let names: Vec<&str> = regions.names().map(RegionName::as_str).collect();
        assert_eq!(names, vec!["head", "torso", "arms", "legs"]);
    }

    #[test]
    fn member_weights_meet_threshold() {
        let avatar = create_avatar();
        let table = RegionTable::default();
        let regions = compute_regions_with(&avatar, &table).unwrap();

        for region in &regions {
            let bone_ids: Vec<u32> = region
                .bone_names
                .iter()
                .map(|n| avatar.skeleton().find_bone(n).unwrap() as u32)
                .collect();
            for &v in &region.vertices {
                let w = avatar.influences()[v as usize].weight_on(|b| bone_ids.contains(&b));
                assert!(w >= region.weight_threshold);
            }
        }
    }

    #[test]
    fn computing_twice_is_identical() {
        let avatar = create_avatar();
        assert_eq!(compute_regions(&avatar).unwrap(), compute_regions(&avatar).unwrap());
    }

    #[test]
    fn sparse_region_falls_back_to_bone_spheres() {
        let avatar = create_avatar();
        let table = RegionTable::default().with_min_vertices(1000);
        let regions = compute_regions_with(&avatar, &table).unwrap();

        let head = regions.require(&RegionName::Head).unwrap();
        assert_eq!(head.source, RegionSource::BoneFallback);
        let joint = avatar.skeleton().bone_world_position(4);
        assert_relative_eq!(head.centroid, joint, epsilon = 1e-12);
        assert_relative_eq!(head.bounds.extent(0), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn bone_boxes_follow_the_mesh_world_transform() {
        let shift = Vector3::new(10.0, 0.0, 0.0);
        let mut moved = create_avatar();
        moved.mesh.set_world(Matrix4::new_translation(&shift)).unwrap();

        let sparse = RegionTable::default().with_min_vertices(1000);
        let from_vertices = compute_regions(&moved).unwrap();
        let from_bones = compute_regions_with(&moved, &sparse).unwrap();

        let head = from_bones.require(&RegionName::Head).unwrap();
        assert_eq!(head.source, RegionSource::BoneFallback);
        let joint = moved.skeleton().bone_world_position(4) + shift;
        assert_relative_eq!(head.centroid, joint, epsilon = 1e-12);
        assert_relative_eq!(
            head.centroid.x,
            from_vertices.require(&RegionName::Head).unwrap().centroid.x,
            epsilon = 1e-9
        );

        // Corrected torso lands on the moved body too
        let rebuild = RegionTable::default().with_torso_correction(TorsoCorrection {
            min_height_fraction: 0.5,
            ..TorsoCorrection::default()
        });
        let still = compute_regions_with(&create_avatar(), &rebuild).unwrap();
        let shifted = compute_regions_with(&moved, &rebuild).unwrap();
        assert_relative_eq!(
            shifted.require(&RegionName::Torso).unwrap().centroid,
            still.require(&RegionName::Torso).unwrap().centroid + shift,
            epsilon = 1e-9
        );
    }

    #[test]
    fn thin_torso_is_rebuilt() {
        let avatar = create_avatar();
        // A huge minimum makes every torso "too short"
        let table = RegionTable::default().with_torso_correction(TorsoCorrection {
            min_height_fraction: 0.5,
            ..TorsoCorrection::default()
        });
        let regions = compute_regions_with(&avatar, &table).unwrap();
        let torso = regions.require(&RegionName::Torso).unwrap();
        let body = regions.body_bounds();

        assert_eq!(torso.source, RegionSource::Corrected);
        assert!(torso.bounds.extent(1) >= 0.5 * body.extent(1) - 1e-12);
        let expected = body.min.y + 0.6 * body.extent(1);
        assert_relative_eq!(torso.centroid.y, expected, epsilon = 1e-12);
    }

    #[test]
    fn disabled_correction_keeps_vertex_box() {
        let avatar = create_avatar();
        let table = RegionTable::default().with_torso_correction(TorsoCorrection {
            min_height_fraction: 0.9,
            ..TorsoCorrection::disabled()
        });
        let regions = compute_regions_with(&avatar, &table).unwrap();
        assert_eq!(regions.require(&RegionName::Torso).unwrap().source, RegionSource::Vertices);
    }

    #[test]
    fn empty_skeleton_is_missing_skeleton() {
        let mesh = Mesh::new(vec![Point3::origin(); 3], Some(vec![[0, 1, 2]]), None).unwrap();
        let skinned = SkinnedMesh::new(
            mesh,
            vec![SkinInfluence::new([0; 4], [0.0; 4]); 3],
            Arc::new(Skeleton::new(Vec::new()).unwrap()),
        )
        .unwrap();
        assert!(matches!(compute_regions(&skinned), Err(RegionError::MissingSkeleton)));
    }

    #[test]
    fn regions_use_posed_positions() {
        let avatar = create_avatar();
        let mut skeleton = (**avatar.skeleton()).clone();
        let head_local = skeleton.bone(4).unwrap().local;
        skeleton
            .set_local_transform(4, Matrix4::new_translation(&Vector3::new(0.0, 0.0, 0.5)) * head_local)
            .unwrap();
        skeleton.update_world_transforms();
        let posed = SkinnedMesh::new(
            avatar.mesh.clone(),
            avatar.influences().to_vec(),
            Arc::new(skeleton),
        )
        .unwrap();

        let before = compute_regions(&avatar).unwrap();
        let after = compute_regions(&posed).unwrap();
        let dz = after.require(&RegionName::Head).unwrap().centroid.z
            - before.require(&RegionName::Head).unwrap().centroid.z;
        assert_relative_eq!(dz, 0.5, epsilon = 1e-9);
    }
}
