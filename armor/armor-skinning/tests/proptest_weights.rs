//! Property-based tests for weight transfer.
//!
//! Run with: cargo test -p armor-skinning --test proptest_weights

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use armor_skinning::{TransferOptions, transfer_weights};
use armor_types::{
    BoneDef, Mesh, Point3, Skeleton, SkinInfluence, SkinnedMesh, Vector3, subdivided_box,
};
use proptest::prelude::*;

/// Three bones up a box, each vertex weighted by height.
fn avatar() -> SkinnedMesh {
    let skeleton = Arc::new(
        Skeleton::new(vec![
            BoneDef::at("Hips", None, [0.0, 0.0, 0.0]),
            BoneDef::at("Spine", Some(0), [0.0, 0.5, 0.0]),
            BoneDef::at("Head", Some(1), [0.0, 0.5, 0.0]),
        ])
        .unwrap(),
    );
    let mesh = subdivided_box(Point3::new(0.0, 0.5, 0.0), 0.5, 4);
    let influences = mesh
        .positions
        .iter()
        .map(|p| {
            SkinInfluence::from_pairs(&[
                (0, (1.0 - p.y).max(0.0)),
                (1, 0.5 - (p.y - 0.5).abs()),
                (2, p.y * p.y),
            ])
        })
        .collect();
    SkinnedMesh::new(mesh, influences, skeleton).unwrap()
}

/// Random triangle soup around and inside the avatar.
fn arb_target() -> impl Strategy<Value = Mesh> {
    prop::collection::vec(prop::array::uniform3(-1.5..1.5f64), 1..12).prop_map(|tris| {
        let positions: Vec<Point3<f64>> = tris
            .iter()
            .flat_map(|&[x, y, z]| {
                let p = Point3::new(x, y + 0.5, z);
                [p, p + Vector3::x() * 0.05, p + Vector3::z() * 0.05]
            })
            .collect();
        Mesh::new(positions, None, None).unwrap()
    })
}

// =============================================================================
// Property Tests: Transfer
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every output vertex has non-negative weights summing to 1.
    #[test]
    fn weights_are_normalized(target in arb_target()) {
        let source = avatar();
        let options = TransferOptions::default().with_parallel(false);
        let output = transfer_weights(&source, &target, &options).unwrap();

        prop_assert_eq!(output.report.total(), target.vertex_count());
        for inf in output.skinned.influences() {
            prop_assert!(inf.weights.iter().all(|&w| w >= 0.0));
            prop_assert!((inf.total() - 1.0).abs() <= 1e-5);
        }
    }

    /// Same inputs, same weights.
    #[test]
    fn transfer_is_deterministic(target in arb_target()) {
        let source = avatar();
        let options = TransferOptions::default().with_parallel(false);
        let a = transfer_weights(&source, &target, &options).unwrap();
        let b = transfer_weights(&source, &target, &options).unwrap();
        prop_assert_eq!(a.skinned.influences(), b.skinned.influences());
    }
}
