//! poselink-constraint-core: matrix-based parent constraints assembled from
//! graph primitives.
//!
//! Instead of a host's built-in constraint objects, a constraint here is a
//! small DAG of multiply / decompose / compose / hold / blend nodes feeding
//! the driven object's local-offset sink. [`build_parent_constraint`] selects
//! a topology from a [`ConstraintConfig`] and wires it; [`remove_constraint`]
//! rediscovers an attached constraint, restores the preserved pre-constraint
//! values, and deletes the subgraph.

pub mod builder;
pub mod config;
pub mod error;
pub mod preserve;
pub mod primitives;
pub mod remove;

pub use builder::{build_parent_constraint, ConstraintHandle};
pub use config::{parse_weight, AxisFilter, BlendWeights, ConstraintConfig, ConstraintKind};
pub use error::ConstraintError;
pub use remove::remove_constraint;

#[cfg(test)]
mod tests;
