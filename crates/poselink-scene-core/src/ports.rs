//! Typed ports and connection sources.
//!
//! Connections are expressed as `Source -> (node, InPort)` pairs instead of
//! string attribute paths, so a caller can only reference ports that actually
//! exist for a node kind, and matrix/scalar mismatches are caught at connect
//! time rather than at evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transform channel groups.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Translate,
    Rotate,
    Scale,
    Shear,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Translate,
        Channel::Rotate,
        Channel::Scale,
        Channel::Shear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Translate => "translate",
            Channel::Rotate => "rotate",
            Channel::Scale => "scale",
            Channel::Shear => "shear",
        }
    }

    /// Identity value for a component of this channel.
    pub fn identity_component(&self) -> f32 {
        match self {
            Channel::Scale => 1.0,
            _ => 0.0,
        }
    }
}

/// Component axis within a channel. For shear the axes map to (xy, xz, yz).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// Output ports a graph node can expose.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutPort {
    /// The single matrix output of a matrix-producing node.
    Matrix,
    /// One decomposed scalar component.
    Scalar(Channel, Axis),
}

impl OutPort {
    pub fn is_matrix(&self) -> bool {
        matches!(self, OutPort::Matrix)
    }
}

/// Input ports a graph node can expose.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InPort {
    /// Ordered multiply-chain slot; unconnected slots evaluate as identity.
    MatrixIn(usize),
    /// Single matrix input of decompose / hold / pick nodes.
    InMatrix,
    /// One scalar component input of a compose node.
    Scalar(Channel, Axis),
    /// Blend base.
    BaseMatrix,
    /// Ordered blend target.
    TargetMatrix(usize),
}

impl InPort {
    pub fn is_matrix(&self) -> bool {
        !matches!(self, InPort::Scalar(_, _))
    }
}

/// Matrix outputs a scene object exposes to the graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectPort {
    WorldMatrix,
    WorldInverseMatrix,
}

/// One end of a connection: a node output or an object output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Node { node: String, port: OutPort },
    Object { object: String, port: ObjectPort },
}

impl Source {
    pub fn node(node: impl Into<String>) -> Source {
        Source::Node {
            node: node.into(),
            port: OutPort::Matrix,
        }
    }

    pub fn scalar(node: impl Into<String>, channel: Channel, axis: Axis) -> Source {
        Source::Node {
            node: node.into(),
            port: OutPort::Scalar(channel, axis),
        }
    }

    pub fn world(object: impl Into<String>) -> Source {
        Source::Object {
            object: object.into(),
            port: ObjectPort::WorldMatrix,
        }
    }

    pub fn world_inverse(object: impl Into<String>) -> Source {
        Source::Object {
            object: object.into(),
            port: ObjectPort::WorldInverseMatrix,
        }
    }

    /// Name of the node this source reads from, if it is a node output.
    pub fn node_name(&self) -> Option<&str> {
        match self {
            Source::Node { node, .. } => Some(node),
            Source::Object { .. } => None,
        }
    }

    pub fn is_matrix(&self) -> bool {
        match self {
            Source::Node { port, .. } => port.is_matrix(),
            Source::Object { .. } => true,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Node { node, port } => write!(f, "{node}.{port:?}"),
            Source::Object { object, port } => write!(f, "{object}.{port:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_component_is_one_only_for_scale() {
        for channel in Channel::ALL {
            let expected = if channel == Channel::Scale { 1.0 } else { 0.0 };
            assert_eq!(channel.identity_component(), expected);
        }
    }
}
