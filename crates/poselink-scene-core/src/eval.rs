//! Demand-driven evaluation of node outputs and object world matrices.
//!
//! The constraint core only describes wiring; this module is the stand-in for
//! the host's evaluation engine so the described graphs are observable in
//! tests. Evaluation is memo-free and recursive, with a visiting stack for
//! cycle detection.

use crate::error::SceneError;
use crate::math::{
    euler_from_quat, lerp, lerp3, quat_from_euler, slerp, Mat4, Trs,
};
use crate::node::{BlendTargetWeights, GraphNode, NodeKind};
use crate::object::SceneObject;
use crate::ports::{Axis, Channel, InPort, ObjectPort, OutPort, Source};
use crate::scene::Scene;
use crate::value::Value;

/// Evaluate an arbitrary source to its current value.
pub fn eval_source(scene: &Scene, source: &Source) -> Result<Value, SceneError> {
    let mut stack = Vec::new();
    eval_source_inner(scene, source, &mut stack)
}

/// Evaluate one output port of a node.
pub fn node_output(scene: &Scene, node: &str, port: &OutPort) -> Result<Value, SceneError> {
    eval_source(
        scene,
        &Source::Node {
            node: node.to_string(),
            port: *port,
        },
    )
}

/// World transform of an object: `local * offset_parent * parent_world`.
pub fn world_matrix(scene: &Scene, object: &str) -> Result<Mat4, SceneError> {
    let mut stack = Vec::new();
    object_world(scene, object, &mut stack)
}

pub fn world_inverse_matrix(scene: &Scene, object: &str) -> Result<Mat4, SceneError> {
    Ok(world_matrix(scene, object)?.affine_inverse())
}

fn eval_source_inner(
    scene: &Scene,
    source: &Source,
    stack: &mut Vec<String>,
) -> Result<Value, SceneError> {
    match source {
        Source::Node { node, port } => node_value(scene, node, port, stack),
        Source::Object { object, port } => {
            let world = object_world(scene, object, stack)?;
            Ok(Value::Matrix(match port {
                ObjectPort::WorldMatrix => world,
                ObjectPort::WorldInverseMatrix => world.affine_inverse(),
            }))
        }
    }
}

fn object_world(
    scene: &Scene,
    object: &str,
    stack: &mut Vec<String>,
) -> Result<Mat4, SceneError> {
    let key = format!("object:{object}");
    if stack.contains(&key) {
        return Err(SceneError::Cycle(object.to_string()));
    }
    stack.push(key);

    let obj = scene.object(object)?;
    let local = object_local(scene, obj, stack)?;
    let offset = match &obj.offset_parent_input {
        Some(source) => expect_matrix(eval_source_inner(scene, source, stack)?, source)?,
        None => obj.offset_parent,
    };
    let parent = match &obj.parent {
        Some(parent) => object_world(scene, parent, stack)?,
        None => Mat4::IDENTITY,
    };

    stack.pop();
    Ok(local.mul(&offset).mul(&parent))
}

fn object_local(
    scene: &Scene,
    obj: &SceneObject,
    stack: &mut Vec<String>,
) -> Result<Mat4, SceneError> {
    let mut trs = obj.local_trs();
    for ((channel, axis), source) in &obj.channel_inputs {
        let value = expect_float(eval_source_inner(scene, source, stack)?, source)?;
        set_component(&mut trs, *channel, *axis, value);
    }
    let mut local = Mat4::compose(&trs);
    if obj.is_joint && obj.joint_orient != [0.0; 3] {
        let orient = Mat4::compose(&Trs {
            rotate: obj.joint_orient,
            ..Trs::default()
        });
        local = local.mul(&orient);
    }
    Ok(local)
}

fn node_value(
    scene: &Scene,
    name: &str,
    port: &OutPort,
    stack: &mut Vec<String>,
) -> Result<Value, SceneError> {
    let key = format!("node:{name}");
    if stack.contains(&key) {
        return Err(SceneError::Cycle(name.to_string()));
    }
    stack.push(key);

    let node = scene.node(name)?;
    let result = match (node.kind, port) {
        (NodeKind::MultMatrix, OutPort::Matrix) => {
            Value::Matrix(eval_mult_chain(scene, node, stack)?)
        }
        (NodeKind::DecomposeMatrix, OutPort::Scalar(channel, axis)) => {
            let input = matrix_input(scene, node, InPort::InMatrix, stack)?;
            let trs = input.decompose();
            Value::Float(component(&trs, *channel, *axis))
        }
        (NodeKind::ComposeMatrix, OutPort::Matrix) => {
            Value::Matrix(eval_compose(scene, node, stack)?)
        }
        (NodeKind::HoldMatrix, OutPort::Matrix) => {
            Value::Matrix(matrix_input(scene, node, InPort::InMatrix, stack)?)
        }
        (NodeKind::PickMatrix, OutPort::Matrix) => Value::Matrix(eval_pick(scene, node, stack)?),
        (NodeKind::BlendMatrix, OutPort::Matrix) => Value::Matrix(eval_blend(scene, node, stack)?),
        (kind, port) => {
            stack.pop();
            return Err(SceneError::InvalidInput(format!(
                "node `{name}` ({}) has no output port {port:?}",
                kind.as_str()
            )));
        }
    };

    stack.pop();
    Ok(result)
}

/// Resolve a matrix input port: live connection wins, then baked constant,
/// then identity.
fn matrix_input(
    scene: &Scene,
    node: &GraphNode,
    port: InPort,
    stack: &mut Vec<String>,
) -> Result<Mat4, SceneError> {
    if let Some(source) = node.inputs.get(&port) {
        return expect_matrix(eval_source_inner(scene, source, stack)?, source);
    }
    if let Some(value) = node.constants.get(&port) {
        return value.as_matrix().copied().ok_or_else(|| {
            SceneError::TypeMismatch(format!(
                "constant on {port:?} of `{}` is not a matrix",
                node.name
            ))
        });
    }
    Ok(Mat4::IDENTITY)
}

fn eval_mult_chain(
    scene: &Scene,
    node: &GraphNode,
    stack: &mut Vec<String>,
) -> Result<Mat4, SceneError> {
    let last = node.max_slot(|port| match port {
        InPort::MatrixIn(i) => Some(*i),
        _ => None,
    });
    let mut product = Mat4::IDENTITY;
    if let Some(last) = last {
        for slot in 0..=last {
            let m = matrix_input(scene, node, InPort::MatrixIn(slot), stack)?;
            product = product.mul(&m);
        }
    }
    Ok(product)
}

fn eval_compose(
    scene: &Scene,
    node: &GraphNode,
    stack: &mut Vec<String>,
) -> Result<Mat4, SceneError> {
    let mut trs = Trs::default();
    for channel in Channel::ALL {
        for axis in Axis::ALL {
            let port = InPort::Scalar(channel, axis);
            let value = if let Some(source) = node.inputs.get(&port) {
                Some(expect_float(
                    eval_source_inner(scene, source, stack)?,
                    source,
                )?)
            } else {
                node.constants.get(&port).and_then(Value::as_float)
            };
            if let Some(v) = value {
                set_component(&mut trs, channel, axis, v);
            }
        }
    }
    Ok(Mat4::compose(&trs))
}

fn eval_pick(
    scene: &Scene,
    node: &GraphNode,
    stack: &mut Vec<String>,
) -> Result<Mat4, SceneError> {
    let input = matrix_input(scene, node, InPort::InMatrix, stack)?;
    let mut trs = input.decompose();
    let pick = node.params.pick;
    if !pick.translate {
        trs.translate = [Channel::Translate.identity_component(); 3];
    }
    if !pick.rotate {
        trs.rotate = [Channel::Rotate.identity_component(); 3];
    }
    if !pick.scale {
        trs.scale = [Channel::Scale.identity_component(); 3];
    }
    // Pick exposes no shear control; shear always collapses.
    trs.shear = [Channel::Shear.identity_component(); 3];
    Ok(Mat4::compose(&trs))
}

fn eval_blend(
    scene: &Scene,
    node: &GraphNode,
    stack: &mut Vec<String>,
) -> Result<Mat4, SceneError> {
    let base = matrix_input(scene, node, InPort::BaseMatrix, stack)?;
    let mut current = base.decompose();

    let last = node.max_slot(|port| match port {
        InPort::TargetMatrix(i) => Some(*i),
        _ => None,
    });
    if let Some(last) = last {
        let envelope = node.params.envelope.clamp(0.0, 1.0);
        for slot in 0..=last {
            let target = matrix_input(scene, node, InPort::TargetMatrix(slot), stack)?.decompose();
            let weights = node
                .params
                .target_weights
                .get(slot)
                .copied()
                .unwrap_or_default();
            current = blend_trs(&current, &target, &weights, envelope);
        }
    }
    Ok(Mat4::compose(&current))
}

/// Successive per-channel weighted interpolation toward `target`.
fn blend_trs(base: &Trs, target: &Trs, weights: &BlendTargetWeights, envelope: f32) -> Trs {
    let wt = (weights.translate * envelope).clamp(0.0, 1.0);
    let wr = (weights.rotate * envelope).clamp(0.0, 1.0);
    let ws = (weights.scale * envelope).clamp(0.0, 1.0);
    let wsh = (weights.shear * envelope).clamp(0.0, 1.0);

    let rotation = slerp(
        quat_from_euler(base.rotate),
        quat_from_euler(target.rotate),
        wr,
    );

    Trs {
        translate: lerp3(&base.translate, &target.translate, wt),
        rotate: euler_from_quat(rotation),
        scale: lerp3(&base.scale, &target.scale, ws),
        shear: [
            lerp(base.shear[0], target.shear[0], wsh),
            lerp(base.shear[1], target.shear[1], wsh),
            lerp(base.shear[2], target.shear[2], wsh),
        ],
    }
}

fn component(trs: &Trs, channel: Channel, axis: Axis) -> f32 {
    let i = axis.index();
    match channel {
        Channel::Translate => trs.translate[i],
        Channel::Rotate => trs.rotate[i],
        Channel::Scale => trs.scale[i],
        Channel::Shear => trs.shear[i],
    }
}

fn set_component(trs: &mut Trs, channel: Channel, axis: Axis, value: f32) {
    let i = axis.index();
    match channel {
        Channel::Translate => trs.translate[i] = value,
        Channel::Rotate => trs.rotate[i] = value,
        Channel::Scale => trs.scale[i] = value,
        Channel::Shear => trs.shear[i] = value,
    }
}

fn expect_matrix(value: Value, source: &Source) -> Result<Mat4, SceneError> {
    value
        .as_matrix()
        .copied()
        .ok_or_else(|| SceneError::TypeMismatch(format!("source {source} did not yield a matrix")))
}

fn expect_float(value: Value, source: &Source) -> Result<f32, SceneError> {
    value
        .as_float()
        .ok_or_else(|| SceneError::TypeMismatch(format!("source {source} did not yield a float")))
}
