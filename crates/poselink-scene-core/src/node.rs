//! Graph node kinds and per-node data.

use crate::ports::{InPort, Source};
use crate::value::Value;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// The primitive matrix operations the graph supports.
///
/// Kind strings are stable and queryable; teardown heuristics rely on them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    MultMatrix,
    DecomposeMatrix,
    ComposeMatrix,
    HoldMatrix,
    BlendMatrix,
    PickMatrix,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::MultMatrix => "multMatrix",
            NodeKind::DecomposeMatrix => "decomposeMatrix",
            NodeKind::ComposeMatrix => "composeMatrix",
            NodeKind::HoldMatrix => "holdMatrix",
            NodeKind::BlendMatrix => "blendMatrix",
            NodeKind::PickMatrix => "pickMatrix",
        }
    }

    /// Whether the kind string marks this as a matrix-family node. Teardown
    /// filters candidate nodes with this.
    pub fn is_matrix_family(&self) -> bool {
        self.as_str().to_ascii_lowercase().contains("matrix")
    }
}

/// Per-channel weights for one blend target.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendTargetWeights {
    pub translate: f32,
    pub rotate: f32,
    pub scale: f32,
    pub shear: f32,
}

impl Default for BlendTargetWeights {
    fn default() -> Self {
        BlendTargetWeights {
            translate: 1.0,
            rotate: 1.0,
            scale: 1.0,
            shear: 1.0,
        }
    }
}

/// Channel-group mask of a pick node. Disabled groups collapse to identity;
/// shear always collapses since pick exposes no shear control.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickChannels {
    pub translate: bool,
    pub rotate: bool,
    pub scale: bool,
}

impl Default for PickChannels {
    fn default() -> Self {
        PickChannels {
            translate: true,
            rotate: true,
            scale: true,
        }
    }
}

/// Structured constraint-instance identifier stamped on every node a builder
/// creates. Teardown prefers an exact tag lookup over name inference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintTag {
    /// Name of the constrained object.
    pub driven: String,
    /// Constraint family, e.g. "parent".
    pub family: String,
}

/// Evaluation parameters that are not connections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeParams {
    /// Per-target weights of a blend node, indexed by target slot.
    pub target_weights: Vec<BlendTargetWeights>,
    /// Global blend envelope in [0, 1].
    pub envelope: f32,
    /// Pick-node channel mask.
    pub pick: PickChannels,
}

impl Default for NodeParams {
    fn default() -> Self {
        NodeParams {
            target_weights: Vec::new(),
            envelope: 1.0,
            pick: PickChannels::default(),
        }
    }
}

/// A created primitive instance in the host graph.
#[derive(Clone, Debug)]
pub struct GraphNode {
    pub name: String,
    pub kind: NodeKind,
    /// Live input connections.
    pub inputs: HashMap<InPort, Source>,
    /// Baked input constants; a live connection on the same port wins.
    pub constants: HashMap<InPort, Value>,
    pub params: NodeParams,
    pub tag: Option<ConstraintTag>,
}

impl GraphNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> GraphNode {
        GraphNode {
            name: name.into(),
            kind,
            inputs: HashMap::new(),
            constants: HashMap::new(),
            params: NodeParams::default(),
            tag: None,
        }
    }

    /// Highest multiply-chain / blend-target slot index in use, if any.
    pub fn max_slot(&self, matching: impl Fn(&InPort) -> Option<usize>) -> Option<usize> {
        self.inputs
            .keys()
            .chain(self.constants.keys())
            .filter_map(matching)
            .max()
    }
}
