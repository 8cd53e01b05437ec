//! Property-based tests for shrinkwrap fitting.
//!
//! Run with: cargo test -p armor --test proptest_fitting

#![allow(clippy::unwrap_used)]

use armor::prelude::*;
use armor::shrinkwrap::Shrinkwrap;
use armor::types::uv_sphere;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_params() -> impl Strategy<Value = FittingParameters> {
    (
        0.05..=1.0f64,
        0.005..0.5f64,
        0.0..=1.0f64,
        0..4usize,
        -0.05..0.05f64,
        prop::bool::ANY,
    )
        .prop_map(|(step, max_disp, strength, radius, offset, features)| {
            FittingParameters::default()
                .with_iterations(3)
                .with_step_size(step)
                .with_max_displacement(max_disp)
                .with_smoothing_strength(strength)
                .with_smoothing_radius(radius)
                .with_target_offset(offset)
                .with_feature_preservation(features)
                .with_convergence_epsilon(0.0)
                .with_parallel(false)
        })
}

// =============================================================================
// Property Tests: Fitting
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// No vertex moves farther than `max_displacement` in one iteration.
    #[test]
    fn displacement_is_bounded(params in arb_params(), half in 0.6..2.0f64) {
        let target = SpatialIndex::build(&uv_sphere(Point3::origin(), 1.0, 16, 8)).unwrap();
        let mut armor = subdivided_box(Point3::origin(), half, 3);
        let mut fit = Shrinkwrap::new(&mut armor, &target, &params).unwrap();

        loop {
            let before = fit.mesh().world_positions();
            let Some(stats) = fit.step() else { break };
            prop_assert!(stats.max_displacement <= params.max_displacement + 1e-9);
            for (a, b) in fit.mesh().world_positions().iter().zip(&before) {
                prop_assert!((a - b).norm() <= params.max_displacement + 1e-9);
            }
        }
    }

    /// Opening vertices keep their exact positions through a whole fit.
    #[test]
    fn openings_never_move(
        params in arb_params(),
        pinned in prop::collection::btree_set(0u32..56, 1..12),
    ) {
        let target = SpatialIndex::build(&uv_sphere(Point3::origin(), 1.0, 16, 8)).unwrap();
        let mut armor = subdivided_box(Point3::origin(), 1.5, 3);
        let before = armor.positions.clone();
        let params = params.with_opening_vertices(pinned.iter().copied().collect());

        let report =
            fit_shrinkwrap(&mut armor, &target, &params, &Progress::none(), &CancelToken::new())
                .unwrap();
        prop_assert_eq!(report.fixed_vertices, pinned.len());
        for &v in &pinned {
            prop_assert_eq!(armor.positions[v as usize], before[v as usize]);
        }
    }
}
