//! Constraint configuration: kinds, axis filters, blend weights.

use poselink_scene_core::{Axis, BlendTargetWeights, Channel};
use serde::{Deserialize, Serialize};

/// Constraint families this crate can build or tear down.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Parent,
    Aim,
}

impl ConstraintKind {
    /// Token embedded in the names of nodes belonging to this family; the
    /// legacy detection path matches on it.
    pub fn token(&self) -> &'static str {
        match self {
            ConstraintKind::Parent => "pconstrainedby",
            ConstraintKind::Aim => "aconstrainedby",
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            ConstraintKind::Parent => "parent",
            ConstraintKind::Aim => "aim",
        }
    }

    pub fn from_family(family: &str) -> Option<ConstraintKind> {
        match family {
            "parent" => Some(ConstraintKind::Parent),
            "aim" => Some(ConstraintKind::Aim),
            _ => None,
        }
    }
}

/// Per-channel boolean axis mask; all-true passes the channel through intact.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisFilter {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl Default for AxisFilter {
    fn default() -> Self {
        AxisFilter {
            x: true,
            y: true,
            z: true,
        }
    }
}

impl AxisFilter {
    pub const NONE: AxisFilter = AxisFilter {
        x: false,
        y: false,
        z: false,
    };

    /// All axes enabled: the filter is semantically a pass-through, so the
    /// builder may skip the decompose/compose pair entirely.
    pub fn all_enabled(&self) -> bool {
        self.x && self.y && self.z
    }

    pub fn none_enabled(&self) -> bool {
        !self.x && !self.y && !self.z
    }

    pub fn enabled(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Blend weights: one scalar per channel group plus the global envelope,
/// all clamped to [0, 1].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub translate: f32,
    pub rotate: f32,
    pub scale: f32,
    pub shear: f32,
    pub envelope: f32,
}

impl Default for BlendWeights {
    fn default() -> Self {
        BlendWeights {
            translate: 1.0,
            rotate: 1.0,
            scale: 1.0,
            shear: 1.0,
            envelope: 1.0,
        }
    }
}

impl BlendWeights {
    pub fn clamped(&self) -> BlendWeights {
        BlendWeights {
            translate: self.translate.clamp(0.0, 1.0),
            rotate: self.rotate.clamp(0.0, 1.0),
            scale: self.scale.clamp(0.0, 1.0),
            shear: self.shear.clamp(0.0, 1.0),
            envelope: self.envelope.clamp(0.0, 1.0),
        }
    }

    /// Per-target weights written onto every blend target.
    pub fn per_target(&self) -> BlendTargetWeights {
        let w = self.clamped();
        BlendTargetWeights {
            translate: w.translate,
            rotate: w.rotate,
            scale: w.scale,
            shear: w.shear,
        }
    }
}

/// Parse a weight field from UI text: clamp to [0, 1], fall back to 1.0 when
/// the text is not a number.
pub fn parse_weight(text: &str) -> f32 {
    text.trim()
        .parse::<f32>()
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(1.0)
}

/// Full configuration for one constraint build.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintConfig {
    pub driven: String,
    /// Ordered drivers; must be non-empty.
    pub drivers: Vec<String>,
    /// Maintain the initial driven-to-driver relative pose.
    pub offset: bool,
    /// Materialize the offset as an editable hold node instead of an inert
    /// baked constant.
    pub keep_hold: bool,
    /// Blend against the driven's pre-constraint pose.
    pub envelope: bool,
    pub translate: AxisFilter,
    pub rotate: AxisFilter,
    pub scale: AxisFilter,
    pub shear: AxisFilter,
    pub weights: BlendWeights,
}

impl ConstraintConfig {
    pub fn new(driven: impl Into<String>, drivers: Vec<String>) -> ConstraintConfig {
        ConstraintConfig {
            driven: driven.into(),
            drivers,
            offset: false,
            keep_hold: false,
            envelope: false,
            translate: AxisFilter::default(),
            rotate: AxisFilter::default(),
            scale: AxisFilter::default(),
            shear: AxisFilter::default(),
            weights: BlendWeights::default(),
        }
    }

    pub fn filter(&self, channel: Channel) -> &AxisFilter {
        match channel {
            Channel::Translate => &self.translate,
            Channel::Rotate => &self.rotate,
            Channel::Scale => &self.scale,
            Channel::Shear => &self.shear,
        }
    }

    /// Every filter fully enabled: drivers can feed their world matrix
    /// straight through.
    pub fn filters_all_enabled(&self) -> bool {
        Channel::ALL.iter().all(|c| self.filter(*c).all_enabled())
    }
}
