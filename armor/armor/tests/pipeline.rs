//! End-to-end fitting workflow on a boxy humanoid.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use approx::assert_relative_eq;
use armor::prelude::*;
use armor::types::BoneDef;

/// Hips, spine, head, arms and legs as separate boxes, one bone each.
fn create_avatar() -> SkinnedMesh {
    let skeleton = Arc::new(
        Skeleton::new(vec![
            BoneDef::at("Hips", None, [0.0, 1.0, 0.0]),
            BoneDef::at("Spine", Some(0), [0.0, 0.32, 0.0]),
            BoneDef::at("Head", Some(1), [0.0, 0.38, 0.0]),
            BoneDef::at("LeftArm", Some(1), [0.4, 0.0, 0.0]),
            BoneDef::at("RightArm", Some(1), [-0.4, 0.0, 0.0]),
            BoneDef::at("LeftUpLeg", Some(0), [0.1, -0.4, 0.0]),
            BoneDef::at("RightUpLeg", Some(0), [-0.1, -0.4, 0.0]),
        ])
        .unwrap(),
    );
    let parts = [
        (Point3::new(0.0, 1.0, 0.0), 0.15, 0),
        (Point3::new(0.0, 1.32, 0.0), 0.15, 1),
        (Point3::new(0.0, 1.7, 0.0), 0.1, 2),
        (Point3::new(0.4, 1.32, 0.0), 0.08, 3),
        (Point3::new(-0.4, 1.32, 0.0), 0.08, 4),
        (Point3::new(0.1, 0.6, 0.0), 0.08, 5),
        (Point3::new(-0.1, 0.6, 0.0), 0.08, 6),
    ];

    let mut positions = Vec::new();
    let mut faces = Vec::new();
    let mut influences = Vec::new();
    for (center, half, bone) in parts {
        let part = subdivided_box(center, half, 4);
        let base = u32::try_from(positions.len()).unwrap();
        positions.extend(part.positions.iter().copied());
        faces.extend(part.faces().map(|f| f.map(|i| i + base)));
        influences.extend(std::iter::repeat_n(SkinInfluence::single(bone), part.vertex_count()));
    }
    let mesh = Mesh::new(positions, Some(faces), None).unwrap();
    SkinnedMesh::new(mesh, influences, skeleton).unwrap()
}

/// Armor box around the torso hull with some clearance.
fn create_chest_piece(avatar: &SkinnedMesh) -> Mesh {
    let hull = extract_torso_hull(avatar).unwrap();
    let half = (0..3)
        .map(|axis| hull.bounds.extent(axis))
        .fold(0.0_f64, f64::max)
        * 0.5;
    subdivided_box(hull.bounds.center(), half + 0.1, 6)
}

#[test]
fn fit_correct_and_bind() {
    let avatar = create_avatar();

    let regions = compute_regions(&avatar).unwrap();
    assert!(regions.get(&RegionName::Torso).is_some());
    assert!(regions.get(&RegionName::Head).is_some());

    let hull = extract_torso_hull(&avatar).unwrap();
    // Hips and Spine boxes only
    assert_eq!(hull.vertex_count(), 2 * 98);

    let mut session = FittingSession::new(create_chest_piece(&avatar));
    let params = FittingParameters::default()
        .with_iterations(15)
        .with_target_offset(0.01)
        .with_parallel(false);
    let report = session
        .fit_to_avatar(
            &avatar,
            FitTargetKind::TorsoHull,
            &params,
            &Progress::none(),
            &CancelToken::new(),
        )
        .unwrap()
        .clone();
    assert_eq!(session.status(), FitStatus::Fitted);
    let first = report.target_distance_history[0];
    assert!(report.final_target_distance().unwrap() < first);

    let body = build_target(&avatar, FitTargetKind::FullBody).unwrap();
    session
        .resolve_collisions(&body, 2, &CollisionParams::default())
        .unwrap();

    let transfer = session.bind(&avatar, &TransferOptions::default()).unwrap();
    assert_eq!(transfer.total(), session.mesh().vertex_count());
    let bound = session.skinned().unwrap();
    assert!(bound.influences().iter().all(SkinInfluence::is_normalized));
    assert!(Arc::ptr_eq(bound.skeleton(), avatar.skeleton()));
}

#[test]
fn bound_armor_follows_the_skeleton() {
    let avatar = create_avatar();
    let mut session = FittingSession::new(create_chest_piece(&avatar));
    session
        .fit_to_avatar(
            &avatar,
            FitTargetKind::TorsoHull,
            &FittingParameters::default().with_target_offset(0.01),
            &Progress::none(),
            &CancelToken::new(),
        )
        .unwrap();
    session.bind(&avatar, &TransferOptions::default()).unwrap();
    let fitted = session.mesh().world_positions();
    let bound = session.into_skinned().unwrap();

    // Unposed: bound armor sits exactly where it was fitted
    let rest = bake_current(&bound);
    for (a, b) in rest.positions.iter().zip(&fitted) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9);
    }

    // Moving the root carries every vertex along
    let shift = Vector3::new(0.0, 0.0, 0.3);
    let mut skeleton = (**bound.skeleton()).clone();
    let hips = skeleton.bone(0).unwrap().local;
    skeleton
        .set_local_transform(0, Matrix4::new_translation(&shift) * hips)
        .unwrap();
    skeleton.update_world_transforms();
    let moved = SkinnedMesh::new(
        bound.mesh.clone(),
        bound.influences().to_vec(),
        Arc::new(skeleton),
    )
    .unwrap();

    let posed = bake_current(&moved);
    for (a, b) in posed.positions.iter().zip(&fitted) {
        assert_relative_eq!(*a, *b + shift, epsilon = 1e-9);
    }
}

#[test]
fn torso_hull_target_ignores_limbs() {
    let avatar = create_avatar();
    let hull_target = build_target(&avatar, FitTargetKind::TorsoHull).unwrap();
    let full_target = build_target(&avatar, FitTargetKind::FullBody).unwrap();

    assert!(hull_target.triangle_count() < full_target.triangle_count());
    let head = Point3::new(0.03, 1.72, 0.02);
    assert!(full_target.is_inside(&head));
    assert!(!hull_target.is_inside(&head));
}
