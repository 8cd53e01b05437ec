//! Weight transfer options.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options for [`transfer_weights`](crate::transfer_weights).
///
/// Distances are in world units of the source avatar.
///
/// # Example
///
/// ```
/// use armor_skinning::TransferOptions;
///
/// let options = TransferOptions::default()
///     .with_max_ray_distance(0.2)
///     .with_bone_sigma(0.15);
/// assert!((options.max_ray_distance - 0.2).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferOptions {
    /// Farthest surface hit accepted by the projective strategies.
    ///
    /// Default: 0.5
    pub max_ray_distance: f64,

    /// Farthest source vertex accepted by the nearest-vertex strategy.
    ///
    /// Default: 0.25
    pub max_nearest_distance: f64,

    /// Farthest bone origin considered by the bone-distance strategy.
    ///
    /// Default: 1.0
    pub max_bone_distance: f64,

    /// Gaussian falloff width for bone-distance weights.
    ///
    /// Default: 0.1
    pub bone_sigma: f64,

    /// Blended weights below this are dropped before renormalizing.
    ///
    /// Default: 1e-6
    pub min_weight: f64,

    /// Resolve target vertices in parallel.
    ///
    /// Default: true
    pub parallel: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            max_ray_distance: 0.5,
            max_nearest_distance: 0.25,
            max_bone_distance: 1.0,
            bone_sigma: 0.1,
            min_weight: 1e-6,
            parallel: true,
        }
    }
}

impl TransferOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projective search distance.
    #[must_use]
    pub const fn with_max_ray_distance(mut self, distance: f64) -> Self {
        self.max_ray_distance = distance;
        self
    }

    /// Set the nearest-vertex search distance.
    #[must_use]
    pub const fn with_max_nearest_distance(mut self, distance: f64) -> Self {
        self.max_nearest_distance = distance;
        self
    }

    /// Set the bone search distance.
    #[must_use]
    pub const fn with_max_bone_distance(mut self, distance: f64) -> Self {
        self.max_bone_distance = distance;
        self
    }

    /// Set the bone falloff width.
    #[must_use]
    pub const fn with_bone_sigma(mut self, sigma: f64) -> Self {
        self.bone_sigma = sigma;
        self
    }

    /// Set the weight floor.
    #[must_use]
    pub const fn with_min_weight(mut self, min_weight: f64) -> Self {
        self.min_weight = min_weight;
        self
    }

    /// Enable or disable parallel resolution.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
