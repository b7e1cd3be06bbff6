//! Scene-level error kinds.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    /// An object or node referenced by name does not exist.
    #[error("unresolved reference: `{0}`")]
    UnresolvedReference(String),

    /// A connection or constructor referenced a port that does not exist or
    /// has the wrong port class for the operation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An attribute write carried a value of the wrong kind.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Evaluation found a dependency cycle.
    #[error("dependency cycle through `{0}`")]
    Cycle(String),
}
