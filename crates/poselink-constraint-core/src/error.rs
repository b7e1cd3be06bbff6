//! Constraint-level error kinds.

use poselink_scene_core::SceneError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConstraintError {
    /// Host-layer failure: unresolved references, bad ports, type mismatches.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Teardown could not classify or locate a constraint on the object.
    #[error("no constraint found on `{0}`")]
    ConstraintNotFound(String),
}
