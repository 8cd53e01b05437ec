//! Triangle type for geometric calculations.

use nalgebra::{Point3, Vector3};

use crate::Aabb;

/// A triangle with concrete vertex positions.
///
/// Winding is counter-clockwise when viewed from the side the normal points to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex.
    pub v0: Point3<f64>,
    /// Second vertex.
    pub v1: Point3<f64>,
    /// Third vertex.
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a triangle from three points.
    #[inline]
    #[must_use]
    pub const fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unnormalized normal; its length is twice the area.
    #[inline]
    #[must_use]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal, or `None` for a degenerate triangle.
    #[must_use]
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len = n.norm();
        if len > f64::EPSILON && len.is_finite() {
            Some(n / len)
        } else {
            None
        }
    }

    /// Area.
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Whether the triangle has (numerically) zero area.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self, epsilon: f64) -> bool {
        !(self.area() > epsilon)
    }

    /// Centroid.
    #[inline]
    #[must_use]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Bounding box.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points([&self.v0, &self.v1, &self.v2])
    }

    /// Point at barycentric coordinates `[w0, w1, w2]`.
    #[must_use]
    pub fn point_at(&self, barycentric: [f64; 3]) -> Point3<f64> {
        Point3::from(
            self.v0.coords * barycentric[0]
                + self.v1.coords * barycentric[1]
                + self.v2.coords * barycentric[2],
        )
    }
}
