//! Collision parameters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CollisionError, CollisionResult};

/// Parameters for collision detection and resolution.
///
/// Distances are in world units. The defaults suit an avatar about 1.8
/// units tall.
///
/// # Example
///
/// ```
/// use armor_collision::CollisionParams;
///
/// let params = CollisionParams::default()
///     .with_sample_stride(2)
///     .with_margin(0.002);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionParams {
    /// Test every n-th armor vertex.
    ///
    /// Default: 1
    pub sample_stride: usize,

    /// How far outside each vertex the inward probe starts.
    ///
    /// Default: 0.05
    pub probe_distance: f64,

    /// Penetrations at or below this are ignored.
    ///
    /// Default: 0.0005
    pub min_depth: f64,

    /// Recorded depths are clamped to this.
    ///
    /// Default: 0.02
    pub max_depth: f64,

    /// Extra clearance added to each push.
    ///
    /// Default: 0.001
    pub margin: f64,

    /// Vertices within this distance of a pushed vertex follow it.
    ///
    /// Default: 0.05
    pub propagation_radius: f64,

    /// Share of a push received by a neighbor at zero distance; falls off
    /// linearly to 0 at `propagation_radius`.
    ///
    /// Default: 0.5
    pub propagation_strength: f64,

    /// Largest total distance any vertex may move during one resolve.
    ///
    /// Default: 0.05
    pub max_total_displacement: f64,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            sample_stride: 1,
            probe_distance: 0.05,
            min_depth: 0.0005,
            max_depth: 0.02,
            margin: 0.001,
            propagation_radius: 0.05,
            propagation_strength: 0.5,
            max_total_displacement: 0.05,
        }
    }
}

impl CollisionParams {
    /// Creates parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampling stride.
    #[must_use]
    pub const fn with_sample_stride(mut self, stride: usize) -> Self {
        self.sample_stride = stride;
        self
    }

    /// Set the probe distance.
    #[must_use]
    pub const fn with_probe_distance(mut self, distance: f64) -> Self {
        self.probe_distance = distance;
        self
    }

    /// Set the accepted depth band.
    #[must_use]
    pub const fn with_depth_range(mut self, min_depth: f64, max_depth: f64) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    /// Set the clearance margin.
    #[must_use]
    pub const fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Set the propagation radius and strength.
    #[must_use]
    pub const fn with_propagation(mut self, radius: f64, strength: f64) -> Self {
        self.propagation_radius = radius;
        self.propagation_strength = strength;
        self
    }

    /// Set the per-vertex displacement cap.
    #[must_use]
    pub const fn with_max_total_displacement(mut self, max: f64) -> Self {
        self.max_total_displacement = max;
        self
    }

    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError::InvalidParams`] naming the first bad field.
    pub fn validate(&self) -> CollisionResult<()> {
        if self.sample_stride == 0 {
            return Err(CollisionError::invalid_params("sample_stride must be at least 1"));
        }
        let positive = [
            ("probe_distance", self.probe_distance),
            ("max_depth", self.max_depth),
            ("max_total_displacement", self.max_total_displacement),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(CollisionError::invalid_params(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let non_negative = [
            ("min_depth", self.min_depth),
            ("margin", self.margin),
            ("propagation_radius", self.propagation_radius),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(CollisionError::invalid_params(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.propagation_strength) {
            return Err(CollisionError::invalid_params(format!(
                "propagation_strength must be in [0, 1], got {}",
                self.propagation_strength
            )));
        }
        if self.min_depth >= self.max_depth {
            return Err(CollisionError::invalid_params(
                "min_depth must be below max_depth",
            ));
        }
        Ok(())
    }
}
