//! Axis-aligned bounding box.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box (AABB).
///
/// Used for region extents, BVH node volumes and the body box that drives
/// the torso height correction.
///
/// # Example
///
/// ```
/// use armor_types::{Aabb, Point3};
///
/// let torso = Aabb::new(Point3::new(-0.2, 1.0, -0.1), Point3::new(0.2, 1.5, 0.15));
/// assert!(torso.contains(&Point3::new(0.0, 1.2, 0.0)));
/// assert!((torso.extent(1) - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from two corners, ordering each axis.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Create an empty (inverted) box, ready to be grown.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Point3::new is not const in nalgebra
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Box centered on `center` with half-size `radius` on every axis.
    #[must_use]
    pub fn around(center: &Point3<f64>, radius: f64) -> Self {
        let r = Vector3::repeat(radius.abs());
        Self {
            min: center - r,
            max: center + r,
        }
    }

    /// Smallest box containing every point of the iterator.
    ///
    /// Returns an empty box for an empty iterator.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.expand_to_include(p);
        }
        aabb
    }

    /// Whether the box contains no volume (min > max on some axis).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Width, height and depth.
    #[inline]
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    /// Size along one axis (0 = X, 1 = Y, 2 = Z).
    #[inline]
    #[must_use]
    pub fn extent(&self, axis: usize) -> f64 {
        self.size()[axis.min(2)]
    }

    /// Center point.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Index of the longest axis.
    #[must_use]
    pub fn longest_axis(&self) -> usize {
        let s = self.size();
        if s.x >= s.y && s.x >= s.z {
            0
        } else if s.y >= s.z {
            1
        } else {
            2
        }
    }

    /// Surface area, 0.0 for empty boxes.
    #[must_use]
    pub fn surface_area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let s = self.size();
        2.0 * s.z.mul_add(s.x, s.x.mul_add(s.y, s.y * s.z))
    }

    /// Length of the diagonal.
    #[inline]
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }

    /// Whether the point lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Grow to include a point.
    pub fn expand_to_include(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grow to include another box.
    pub fn merge(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Union of two boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out.merge(other);
        out
    }

    /// Box grown by `margin` on every side. Negative margins shrink it.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Copy of the box with one axis replaced by `[min, max]`.
    #[must_use]
    pub fn with_axis_range(&self, axis: usize, min: f64, max: f64) -> Self {
        let mut out = *self;
        let axis = axis.min(2);
        out.min[axis] = min.min(max);
        out.max[axis] = min.max(max);
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
