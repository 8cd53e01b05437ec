//! Segmentation output types.

use armor_types::{Aabb, Point3};

use crate::{RegionError, RegionName, RegionResult};

/// How a region's box was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSource {
    /// From the included vertex positions.
    Vertices,
    /// From spheres around the region's bones (too few vertices).
    BoneFallback,
    /// Rebuilt from bone positions by the torso correction.
    Corrected,
    /// Fixed fractions of the body box.
    Proportional,
}

/// A named anatomical part of the avatar.
///
/// Derived data: recompute whenever the pose or skeleton changes.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyRegion {
    /// Region name.
    pub name: RegionName,
    /// Names of the bones whose weights feed this region.
    pub bone_names: Vec<String>,
    /// World-space bounds.
    pub bounds: Aabb,
    /// Ascending indices of the member vertices.
    pub vertices: Vec<u32>,
    /// World-space centroid.
    pub centroid: Point3<f64>,
    /// Threshold the member vertices passed.
    pub weight_threshold: f64,
    /// Where the bounds came from.
    pub source: RegionSource,
}

impl BodyRegion {
    /// Number of member vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whether a vertex belongs to the region.
    #[must_use]
    pub fn contains_vertex(&self, v: u32) -> bool {
        self.vertices.binary_search(&v).is_ok()
    }

    /// Region box cut from fixed fractions of the body box.
    ///
    /// Used when segmentation found nothing for a region. The fractions are
    /// along `up_axis`; head and torso are also narrowed horizontally.
    ///
    /// # Example
    ///
    /// ```
    /// use armor_regions::{BodyRegion, RegionName};
    /// use armor_types::{Aabb, Point3};
    ///
    /// let body = Aabb::new(Point3::new(-0.5, 0.0, -0.2), Point3::new(0.5, 2.0, 0.2));
    /// let torso = BodyRegion::proportional(RegionName::Torso, &body, 1);
    /// assert!((torso.centroid.y - 1.2).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn proportional(name: RegionName, body: &Aabb, up_axis: usize) -> Self {
        let (lo, hi, width) = match name {
            RegionName::Head => (0.87, 1.0, 0.3),
            RegionName::Torso => (0.45, 0.75, 0.6),
            RegionName::Arms => (0.45, 0.82, 1.0),
            RegionName::Hips => (0.4, 0.55, 0.6),
            RegionName::Legs => (0.0, 0.47, 1.0),
            RegionName::Custom(_) => (0.0, 1.0, 1.0),
        };

        let up = up_axis.min(2);
        let base = body.min[up];
        let height = body.extent(up);
        let mut bounds = body.with_axis_range(up, base + lo * height, base + hi * height);

        let center = body.center();
        for axis in (0..3).filter(|&a| a != up) {
            let half = body.extent(axis) * width * 0.5;
            bounds = bounds.with_axis_range(axis, center[axis] - half, center[axis] + half);
        }

        Self {
            name,
            bone_names: Vec::new(),
            centroid: bounds.center(),
            bounds,
            vertices: Vec::new(),
            weight_threshold: 0.0,
            source: RegionSource::Proportional,
        }
    }
}

/// Regions in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSet {
    regions: Vec<BodyRegion>,
    body_bounds: Aabb,
    up_axis: usize,
}

impl RegionSet {
    pub(crate) const fn new(regions: Vec<BodyRegion>, body_bounds: Aabb, up_axis: usize) -> Self {
        Self {
            regions,
            body_bounds,
            up_axis,
        }
    }

    /// Region by name.
    #[must_use]
    pub fn get(&self, name: &RegionName) -> Option<&BodyRegion> {
        self.regions.iter().find(|r| r.name == *name)
    }

    /// Region by name, or [`RegionError::NoRegionFound`].
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::NoRegionFound`] when no region has this name.
    pub fn require(&self, name: &RegionName) -> RegionResult<&BodyRegion> {
        self.get(name).ok_or_else(|| RegionError::NoRegionFound {
            name: name.to_string(),
        })
    }

    /// Region by name, or its proportional stand-in.
    #[must_use]
    pub fn get_or_proportional(&self, name: &RegionName) -> BodyRegion {
        self.get(name).cloned().unwrap_or_else(|| {
            BodyRegion::proportional(name.clone(), &self.body_bounds, self.up_axis)
        })
    }

    /// Iterate regions in table order.
    pub fn iter(&self) -> impl Iterator<Item = &BodyRegion> {
        self.regions.iter()
    }

    /// Region names in table order.
    pub fn names(&self) -> impl Iterator<Item = &RegionName> {
        self.regions.iter().map(|r| &r.name)
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no region was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// World-space bounds of the whole posed avatar.
    #[must_use]
    pub const fn body_bounds(&self) -> &Aabb {
        &self.body_bounds
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a BodyRegion;
    type IntoIter = std::slice::Iter<'a, BodyRegion>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}
