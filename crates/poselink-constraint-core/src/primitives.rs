//! Thin typed factories over the host graph.
//!
//! Each constructor creates exactly one node, wires the inputs it was given,
//! and returns the handles it created; callers keep their own bookkeeping
//! instead of relying on builder-global state. Constructors fail with
//! `InvalidInput` when a referenced source does not exist or is not
//! matrix-typed, before the node is created.

use poselink_scene_core::{
    eval_source, Axis, BlendTargetWeights, Channel, ConstraintTag, InPort, Mat4, NodeKind,
    PickChannels, Scene, SceneError, Source, Value,
};

/// Name and matrix output of a node a factory created.
#[derive(Clone, Debug)]
pub struct Created {
    pub node: String,
    pub out: Source,
}

impl Created {
    fn new(node: &str) -> Created {
        Created {
            node: node.to_string(),
            out: Source::node(node),
        }
    }
}

/// Left-to-right multiply chain. `None` slots stay unconnected and evaluate
/// as identity.
pub fn multiply_chain(
    scene: &mut Scene,
    name: &str,
    tag: Option<&ConstraintTag>,
    inputs: &[Option<Source>],
) -> Result<Created, SceneError> {
    for source in inputs.iter().flatten() {
        scene.ensure_matrix_source(source)?;
    }
    scene.create_node(name, NodeKind::MultMatrix, tag.cloned())?;
    for (slot, source) in inputs.iter().enumerate() {
        if let Some(source) = source {
            scene.connect(name, InPort::MatrixIn(slot), source.clone())?;
        }
    }
    Ok(Created::new(name))
}

/// Split a matrix into per-channel, per-axis scalar outputs.
pub fn decompose(
    scene: &mut Scene,
    name: &str,
    tag: Option<&ConstraintTag>,
    input: Source,
) -> Result<Created, SceneError> {
    scene.ensure_matrix_source(&input)?;
    scene.create_node(name, NodeKind::DecomposeMatrix, tag.cloned())?;
    scene.connect(name, InPort::InMatrix, input)?;
    Ok(Created::new(name))
}

/// Rebuild a matrix from a subset of scalar components. Unconnected
/// components keep their identity values (0, or 1 for scale).
pub fn compose(
    scene: &mut Scene,
    name: &str,
    tag: Option<&ConstraintTag>,
    wiring: &[((Channel, Axis), Source)],
) -> Result<Created, SceneError> {
    scene.create_node(name, NodeKind::ComposeMatrix, tag.cloned())?;
    for ((channel, axis), source) in wiring {
        scene.connect(name, InPort::Scalar(*channel, *axis), source.clone())?;
    }
    Ok(Created::new(name))
}

/// Read the current value of a matrix source once and return it baked. No
/// node is created and no live connection remains.
pub fn snapshot(scene: &Scene, source: &Source) -> Result<Mat4, SceneError> {
    scene.ensure_matrix_source(source)?;
    let value = eval_source(scene, source)?;
    value
        .as_matrix()
        .copied()
        .ok_or_else(|| SceneError::TypeMismatch(format!("source {source} did not yield a matrix")))
}

/// Identity pass-through node. Its input is expected to be set to a baked
/// constant afterwards; the output is wired live downstream so artists can
/// edit the constant later.
pub fn hold(
    scene: &mut Scene,
    name: &str,
    tag: Option<&ConstraintTag>,
) -> Result<Created, SceneError> {
    scene.create_node(name, NodeKind::HoldMatrix, tag.cloned())?;
    Ok(Created::new(name))
}

/// Weighted combination of ordered targets over an optional base (identity
/// when absent). Per-target channel weights and the global envelope are
/// written as node parameters.
pub fn blend(
    scene: &mut Scene,
    name: &str,
    tag: Option<&ConstraintTag>,
    base: Option<Source>,
    targets: &[(Source, BlendTargetWeights)],
    envelope: f32,
) -> Result<Created, SceneError> {
    if let Some(base) = &base {
        scene.ensure_matrix_source(base)?;
    }
    for (source, _) in targets {
        scene.ensure_matrix_source(source)?;
    }
    scene.create_node(name, NodeKind::BlendMatrix, tag.cloned())?;
    if let Some(base) = base {
        scene.connect(name, InPort::BaseMatrix, base)?;
    }
    for (slot, (source, _)) in targets.iter().enumerate() {
        scene.connect(name, InPort::TargetMatrix(slot), source.clone())?;
    }
    let node = scene.node_mut(name)?;
    node.params.target_weights = targets.iter().map(|(_, w)| *w).collect();
    node.params.envelope = envelope.clamp(0.0, 1.0);
    Ok(Created::new(name))
}

/// Mask whole channel groups of a matrix (coarser than decompose/compose).
pub fn pick_filter(
    scene: &mut Scene,
    name: &str,
    tag: Option<&ConstraintTag>,
    input: Source,
    channels: PickChannels,
) -> Result<Created, SceneError> {
    scene.ensure_matrix_source(&input)?;
    scene.create_node(name, NodeKind::PickMatrix, tag.cloned())?;
    scene.connect(name, InPort::InMatrix, input)?;
    scene.node_mut(name)?.params.pick = channels;
    Ok(Created::new(name))
}

/// Set a baked matrix constant onto a node input port.
pub fn set_matrix_constant(
    scene: &mut Scene,
    node: &str,
    port: InPort,
    value: Mat4,
) -> Result<(), SceneError> {
    scene.set_constant(node, port, Value::Matrix(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use poselink_scene_core::{node_output, world_matrix, OutPort, SceneObject};

    #[test]
    fn multiply_chain_rejects_missing_sources() {
        let mut scene = Scene::new();
        let err = multiply_chain(
            &mut scene,
            "m",
            None,
            &[Some(Source::world("nope"))],
        )
        .unwrap_err();
        assert!(matches!(err, SceneError::UnresolvedReference(_)));
        // Construction failed before the node appeared.
        assert!(!scene.has_node("m"));
    }

    #[test]
    fn snapshot_bakes_without_live_connection() {
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new("a").with_translate([2.0, 0.0, 0.0]));
        let baked = snapshot(&scene, &Source::world("a")).unwrap();
        assert_eq!(baked.translation(), [2.0, 0.0, 0.0]);

        // Moving the object afterwards does not affect the baked value.
        scene.object_mut("a").unwrap().translate = [9.0, 0.0, 0.0];
        assert_eq!(baked.translation(), [2.0, 0.0, 0.0]);
    }

    #[test]
    fn hold_passes_its_constant_through() {
        let mut scene = Scene::new();
        let created = hold(&mut scene, "h", None).unwrap();
        set_matrix_constant(
            &mut scene,
            &created.node,
            InPort::InMatrix,
            Mat4::from_translation([0.0, 4.0, 0.0]),
        )
        .unwrap();
        let out = node_output(&scene, "h", &OutPort::Matrix).unwrap();
        assert_eq!(out.as_matrix().unwrap().translation(), [0.0, 4.0, 0.0]);
    }

    #[test]
    fn chain_feeds_world_through_tagged_nodes() {
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new("driver").with_translate([1.0, 1.0, 1.0]));
        let tag = ConstraintTag {
            driven: "driven".into(),
            family: "parent".into(),
        };
        let created = multiply_chain(
            &mut scene,
            "chain",
            Some(&tag),
            &[None, Some(Source::world("driver"))],
        )
        .unwrap();
        assert_eq!(scene.node("chain").unwrap().tag.as_ref(), Some(&tag));

        let out = node_output(&scene, &created.node, &OutPort::Matrix).unwrap();
        let direct = world_matrix(&scene, "driver").unwrap();
        assert!(out.as_matrix().unwrap().approx_eq(&direct, 1e-5));
    }
}
