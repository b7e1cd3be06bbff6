//! poselink-scene-core: the transform scene and matrix node graph that the
//! constraint builder wires against.
//!
//! The crate plays the role of the "host" a rigging tool would normally talk
//! to: it owns scene objects, the dependency-graph nodes, typed ports and
//! connections, and a demand-driven evaluator so a described graph can be read
//! back numerically. Nothing here builds constraints; that lives in
//! `poselink-constraint-core`.

pub mod error;
pub mod eval;
pub mod math;
pub mod node;
pub mod object;
pub mod ports;
pub mod scene;
pub mod value;

pub use error::SceneError;
pub use eval::{eval_source, node_output, world_inverse_matrix, world_matrix};
pub use math::{Mat4, Trs};
pub use node::{BlendTargetWeights, ConstraintTag, GraphNode, NodeKind, PickChannels};
pub use object::{CustomAttr, SceneObject};
pub use ports::{Axis, Channel, InPort, ObjectPort, OutPort, Source};
pub use scene::Scene;
pub use value::{Value, ValueKind};
