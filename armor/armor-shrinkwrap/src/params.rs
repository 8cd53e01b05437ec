//! Fitting parameters.

use hashbrown::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{FitError, FitResult};

/// Parameters for [`fit_shrinkwrap`](crate::fit_shrinkwrap).
///
/// Distances are in world units of the target.
///
/// # Example
///
/// ```
/// use armor_shrinkwrap::FittingParameters;
///
/// let params = FittingParameters::default()
///     .with_iterations(20)
///     .with_target_offset(0.005)
///     .with_feature_preservation(true);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FittingParameters {
    /// Maximum number of iterations.
    ///
    /// Default: 10
    pub iterations: usize,

    /// Fraction of the remaining distance covered per iteration, in `(0, 1]`.
    ///
    /// Default: 0.5
    pub step_size: f64,

    /// Neighborhood size for displacement smoothing, in graph hops.
    ///
    /// Default: 2
    pub smoothing_radius: usize,

    /// How strongly neighbors' displacements are blended in, in `[0, 1]`.
    ///
    /// Default: 0.5
    pub smoothing_strength: f64,

    /// Distance to keep from the target surface along its normal.
    ///
    /// Default: 0.0
    pub target_offset: f64,

    /// Fraction of vertices projected per iteration, in `(0, 1]`.
    ///
    /// Default: 1.0
    pub sample_rate: f64,

    /// Largest distance any vertex may move in one iteration.
    ///
    /// Default: 0.5
    pub max_displacement: f64,

    /// Stop once an iteration's mean displacement falls below this.
    ///
    /// Default: 0.001
    pub convergence_epsilon: f64,

    /// Damp neighbor influence on sharp-edged vertices.
    ///
    /// Default: false
    pub preserve_features: bool,

    /// Dihedral angle (radians) above which a vertex counts as a feature.
    ///
    /// Default: 30 degrees
    pub feature_angle_threshold: f64,

    /// Multiplier on neighbor influence received by feature vertices.
    ///
    /// Default: 0.2
    pub feature_smoothing_factor: f64,

    /// Keep opening vertices fixed.
    ///
    /// Default: false
    pub preserve_openings: bool,

    /// Vertices that never move when `preserve_openings` is set.
    ///
    /// `None` uses the source mesh's boundary vertices.
    ///
    /// Default: None
    pub opening_vertices: Option<HashSet<u32>>,

    /// After fitting, restore vertices left inside the target.
    ///
    /// Default: false
    pub push_back_interior: bool,

    /// Project vertices in parallel.
    ///
    /// Default: true
    pub parallel: bool,
}

impl Default for FittingParameters {
    fn default() -> Self {
        Self {
            iterations: 10,
            step_size: 0.5,
            smoothing_radius: 2,
            smoothing_strength: 0.5,
            target_offset: 0.0,
            sample_rate: 1.0,
            max_displacement: 0.5,
            convergence_epsilon: 0.001,
            preserve_features: false,
            feature_angle_threshold: 30.0_f64.to_radians(),
            feature_smoothing_factor: 0.2,
            preserve_openings: false,
            opening_vertices: None,
            push_back_interior: false,
            parallel: true,
        }
    }
}

impl FittingParameters {
    /// Creates parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters for a quick preview: fewer iterations, half the vertices.
    #[must_use]
    pub fn preview() -> Self {
        Self {
            iterations: 5,
            sample_rate: 0.5,
            ..Self::default()
        }
    }

    /// Set the iteration count.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the step size.
    #[must_use]
    pub const fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    /// Set the smoothing radius in hops.
    #[must_use]
    pub const fn with_smoothing_radius(mut self, hops: usize) -> Self {
        self.smoothing_radius = hops;
        self
    }

    /// Set the smoothing strength.
    #[must_use]
    pub const fn with_smoothing_strength(mut self, strength: f64) -> Self {
        self.smoothing_strength = strength;
        self
    }

    /// Set the surface offset.
    #[must_use]
    pub const fn with_target_offset(mut self, offset: f64) -> Self {
        self.target_offset = offset;
        self
    }

    /// Set the sample rate.
    #[must_use]
    pub const fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Set the per-iteration displacement cap.
    #[must_use]
    pub const fn with_max_displacement(mut self, max: f64) -> Self {
        self.max_displacement = max;
        self
    }

    /// Set the convergence threshold.
    #[must_use]
    pub const fn with_convergence_epsilon(mut self, epsilon: f64) -> Self {
        self.convergence_epsilon = epsilon;
        self
    }

    /// Enable or disable feature preservation.
    #[must_use]
    pub const fn with_feature_preservation(mut self, enabled: bool) -> Self {
        self.preserve_features = enabled;
        self
    }

    /// Set the feature angle threshold in radians.
    #[must_use]
    pub const fn with_feature_angle_threshold(mut self, radians: f64) -> Self {
        self.feature_angle_threshold = radians;
        self
    }

    /// Keep the given vertices fixed.
    #[must_use]
    pub fn with_opening_vertices(mut self, vertices: HashSet<u32>) -> Self {
        self.preserve_openings = true;
        self.opening_vertices = Some(vertices);
        self
    }

    /// Enable or disable opening preservation.
    #[must_use]
    pub const fn with_opening_preservation(mut self, enabled: bool) -> Self {
        self.preserve_openings = enabled;
        self
    }

    /// Enable or disable interior push-back.
    #[must_use]
    pub const fn with_push_back_interior(mut self, enabled: bool) -> Self {
        self.push_back_interior = enabled;
        self
    }

    /// Enable or disable parallel projection.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::InvalidParams`] naming the first bad field.
    pub fn validate(&self) -> FitResult<()> {
        if !(self.step_size > 0.0 && self.step_size <= 1.0) {
            return Err(FitError::invalid_params(format!(
                "step_size must be in (0, 1], got {}",
                self.step_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_strength) {
            return Err(FitError::invalid_params(format!(
                "smoothing_strength must be in [0, 1], got {}",
                self.smoothing_strength
            )));
        }
        if !(self.sample_rate > 0.0 && self.sample_rate.is_finite()) {
            return Err(FitError::invalid_params(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !(self.max_displacement > 0.0 && self.max_displacement.is_finite()) {
            return Err(FitError::invalid_params(format!(
                "max_displacement must be positive, got {}",
                self.max_displacement
            )));
        }
        if !self.target_offset.is_finite() {
            return Err(FitError::invalid_params("target_offset must be finite"));
        }
        if self.convergence_epsilon.is_nan() || self.convergence_epsilon < 0.0 {
            return Err(FitError::invalid_params(
                "convergence_epsilon must be non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.feature_smoothing_factor) {
            return Err(FitError::invalid_params(format!(
                "feature_smoothing_factor must be in [0, 1], got {}",
                self.feature_smoothing_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(FittingParameters::default().validate().is_ok());
        assert!(FittingParameters::preview().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let bad = [
            FittingParameters::default().with_step_size(0.0),
            FittingParameters::default().with_step_size(1.5),
            FittingParameters::default().with_smoothing_strength(-0.1),
            FittingParameters::default().with_sample_rate(0.0),
            FittingParameters::default().with_max_displacement(f64::INFINITY),
            FittingParameters::default().with_target_offset(f64::NAN),
            FittingParameters::default().with_convergence_epsilon(f64::NAN),
        ];
        for params in bad {
            assert!(
                matches!(params.validate(), Err(FitError::InvalidParams(_))),
                "{params:?}"
            );
        }
    }

    #[test]
    fn opening_builder_enables_preservation() {
        let params = FittingParameters::default().with_opening_vertices([1, 2, 3].into_iter().collect());
        assert!(params.preserve_openings);
        assert_eq!(params.opening_vertices.map(|s| s.len()), Some(3));
    }
}
