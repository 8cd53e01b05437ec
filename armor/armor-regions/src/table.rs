//! Declarative bone-name rules for body regions.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Anatomical region name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RegionName {
    /// Head and neck.
    Head,
    /// Spine and chest.
    Torso,
    /// Shoulders down to the hands.
    Arms,
    /// Pelvis.
    Hips,
    /// Thighs down to the toes.
    Legs,
    /// Caller-defined region.
    Custom(String),
}

impl RegionName {
    /// Lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Head => "head",
            Self::Torso => "torso",
            Self::Arms => "arms",
            Self::Hips => "hips",
            Self::Legs => "legs",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which bones feed a region and how strictly vertices are admitted.
///
/// Bone names match case-insensitively by substring: a bone belongs to the
/// region when it contains any include pattern and no exclude pattern.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionRule {
    /// Substrings that pull a bone in.
    pub include_patterns: Vec<String>,
    /// Substrings that keep a bone out, checked after includes.
    pub exclude_patterns: Vec<String>,
    /// Minimum summed weight on region bones for a vertex to count.
    pub weight_threshold: f64,
    /// Sphere radius around each bone used when too few vertices qualify.
    pub fallback_radius: f64,
}

impl RegionRule {
    /// Rule with threshold 0.5 and fallback radius 0.15.
    ///
    /// Patterns are stored lowercase.
    #[must_use]
    pub fn new(include: &[&str], exclude: &[&str]) -> Self {
        Self {
            include_patterns: include.iter().map(|p| p.to_lowercase()).collect(),
            exclude_patterns: exclude.iter().map(|p| p.to_lowercase()).collect(),
            weight_threshold: 0.5,
            fallback_radius: 0.15,
        }
    }

    /// Set the vertex weight threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.weight_threshold = threshold;
        self
    }

    /// Set the fallback sphere radius.
    #[must_use]
    pub const fn with_fallback_radius(mut self, radius: f64) -> Self {
        self.fallback_radius = radius;
        self
    }

    /// Whether a bone name belongs to this region.
    ///
    /// # Example
    ///
    /// ```
    /// use armor_regions::RegionRule;
    ///
    /// let torso = RegionRule::new(&["spine", "chest"], &["shoulder"]);
    /// assert!(torso.matches("Spine02"));
    /// assert!(!torso.matches("LeftShoulder"));
    /// ```
    #[must_use]
    pub fn matches(&self, bone_name: &str) -> bool {
        matches_patterns(bone_name, &self.include_patterns, &self.exclude_patterns)
    }
}

/// Case-insensitive include-any / exclude-none substring match.
pub(crate) fn matches_patterns<S: AsRef<str>>(name: &str, include: &[S], exclude: &[S]) -> bool {
    let lower = name.to_lowercase();
    include
        .iter()
        .any(|p| lower.contains(&p.as_ref().to_lowercase()))
        && !exclude
            .iter()
            .any(|p| lower.contains(&p.as_ref().to_lowercase()))
}

/// Torso box repair for avatars whose spine weights are too diffuse.
///
/// All values are fractions of the avatar's height along the up axis. They
/// are tuned against typical humanoid rigs, not derived.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TorsoCorrection {
    /// Whether the correction runs at all.
    ///
    /// Default: true
    pub enabled: bool,

    /// A torso shorter than this fraction of the body is rebuilt.
    ///
    /// Default: 0.2
    pub min_height_fraction: f64,

    /// A torso centered above this fraction of the body is rebuilt.
    ///
    /// Default: 0.75
    pub max_center_fraction: f64,

    /// Padding added around the torso bones when rebuilding.
    ///
    /// Default: 0.08
    pub padding_fraction: f64,

    /// Vertical center of a rebuilt torso.
    ///
    /// Default: 0.6
    pub center_fraction: f64,
}

impl Default for TorsoCorrection {
    fn default() -> Self {
        Self {
            enabled: true,
            min_height_fraction: 0.2,
            max_center_fraction: 0.75,
            padding_fraction: 0.08,
            center_fraction: 0.6,
        }
    }
}

impl TorsoCorrection {
    /// Correction that never triggers.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Ordered region rules plus segmentation settings.
///
/// Region output follows table order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionTable {
    /// Rules in output order.
    pub rules: Vec<(RegionName, RegionRule)>,

    /// Regions with fewer vertices fall back to bone spheres.
    ///
    /// Default: 10
    pub min_vertices: usize,

    /// Vertical axis (0 = X, 1 = Y, 2 = Z).
    ///
    /// Default: 1
    pub up_axis: usize,

    /// Torso repair settings.
    pub torso: TorsoCorrection,
}

impl Default for RegionTable {
    /// The humanoid vocabulary: head, torso, arms, hips, legs.
    fn default() -> Self {
        let rules = vec![
            (
                RegionName::Head,
                RegionRule::new(&["head", "neck"], &[])
                    .with_threshold(0.5)
                    .with_fallback_radius(0.15),
            ),
            (
                RegionName::Torso,
                RegionRule::new(
                    &["spine", "chest", "torso"],
                    &["shoulder", "arm", "clavicle", "leg", "thigh", "head", "neck", "hand"],
                )
                .with_threshold(0.3)
                .with_fallback_radius(0.25),
            ),
            (
                RegionName::Arms,
                RegionRule::new(
                    &["shoulder", "arm", "elbow", "hand", "wrist", "clavicle"],
                    &["armature"],
                )
                .with_threshold(0.5)
                .with_fallback_radius(0.12),
            ),
            (
                RegionName::Hips,
                RegionRule::new(&["hips", "pelvis"], &["leg", "thigh"])
                    .with_threshold(0.4)
                    .with_fallback_radius(0.25),
            ),
            (
                RegionName::Legs,
                RegionRule::new(&["leg", "thigh", "knee", "calf", "shin", "foot", "toe"], &[])
                    .with_threshold(0.5)
                    .with_fallback_radius(0.2),
            ),
        ];

        Self {
            rules,
            min_vertices: 10,
            up_axis: 1,
            torso: TorsoCorrection::default(),
        }
    }
}

impl RegionTable {
    /// Table with no rules.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            ..Self::default()
        }
    }

    /// Add a rule, replacing any existing rule for the same region in place.
    #[must_use]
    pub fn with_rule(mut self, name: RegionName, rule: RegionRule) -> Self {
        if let Some(slot) = self.rules.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = rule;
        } else {
            self.rules.push((name, rule));
        }
        self
    }

    /// Drop the rule for a region.
    #[must_use]
    pub fn without(mut self, name: &RegionName) -> Self {
        self.rules.retain(|(n, _)| n != name);
        self
    }

    /// Set the minimum vertex count before falling back to bone spheres.
    #[must_use]
    pub const fn with_min_vertices(mut self, min_vertices: usize) -> Self {
        self.min_vertices = min_vertices;
        self
    }

    /// Set the vertical axis.
    #[must_use]
    pub const fn with_up_axis(mut self, axis: usize) -> Self {
        self.up_axis = if axis > 2 { 2 } else { axis };
        self
    }

    /// Set the torso correction.
    #[must_use]
    pub fn with_torso_correction(mut self, torso: TorsoCorrection) -> Self {
        self.torso = torso;
        self
    }

    /// Rule for a region.
    #[must_use]
    pub fn rule(&self, name: &RegionName) -> Option<&RegionRule> {
        self.rules.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }
}
