//! Runtime values carried by attributes and node ports.

use crate::math::Mat4;
use serde::{Deserialize, Serialize};

/// Coarse kind enum, handy for dispatch and type checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Bool,
    Vec3,
    Matrix,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Value {
    /// Scalar float
    Float(f32),

    /// Boolean flag
    Bool(bool),

    /// 3D vector
    Vec3([f32; 3]),

    /// Affine matrix
    Matrix(Mat4),
}

impl Default for Value {
    fn default() -> Self {
        Value::Float(0.0)
    }
}

impl Value {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Matrix(_) => ValueKind::Matrix,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Mat4> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }
}
