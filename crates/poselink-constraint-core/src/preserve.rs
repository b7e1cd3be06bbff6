//! Preserved-value attributes on the driven object.
//!
//! Before a constraint takes over the driven's channels, their current values
//! and any live connections are recorded as custom attributes
//! (`initialTranslateX` .. `initialShearZ`, `initialMatrix` for the
//! local-offset sink, `W0..Wn` per driver). Teardown reads these back to
//! restore the pre-constraint state and then deletes them.

use poselink_scene_core::{Axis, Channel, CustomAttr, Scene, SceneError, Value};

pub const INITIAL_TRANSFORM_MARKER: &str = "initialTransform";
pub const INITIAL_MATRIX: &str = "initialMatrix";
pub const INITIAL_JOINT_ORIENT: &str = "initialJointOrient";

pub fn initial_channel_attr(channel: Channel, axis: Axis) -> String {
    format!("initial{}{}", capitalized(channel), axis.as_str())
}

fn capitalized(channel: Channel) -> String {
    let s = channel.as_str();
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
    }
    out.push_str(chars.as_str());
    out
}

pub fn weight_attr(index: usize) -> String {
    format!("W{index}")
}

/// `W0`, `W1`, ... style weight attributes.
pub fn is_weight_attr(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('W')
        && !chars.as_str().is_empty()
        && chars.as_str().chars().all(|c| c.is_ascii_digit())
}

fn is_initial_attr(name: &str) -> bool {
    name == INITIAL_TRANSFORM_MARKER || name == INITIAL_MATRIX || name.starts_with("initial")
}

/// Record the driven's raw channel values, channel connections, and sink
/// state. Live channel connections are moved onto the preserved attributes so
/// they no longer fight the constraint output.
pub fn preserve_initial_values(
    scene: &mut Scene,
    driven: &str,
    driver_count: usize,
) -> Result<(), SceneError> {
    for channel in Channel::ALL {
        for axis in Axis::ALL {
            let value = scene.object(driven)?.channel(channel, axis);
            let connection = scene.disconnect_channel(driven, channel, axis)?;
            scene.set_custom_attr(
                driven,
                &initial_channel_attr(channel, axis),
                CustomAttr {
                    value: Value::Float(value),
                    connection,
                },
            )?;
        }
    }
    scene.set_custom_attr(
        driven,
        INITIAL_TRANSFORM_MARKER,
        CustomAttr::value(Value::Bool(true)),
    )?;

    // Joints also lose their orient to the identity reset.
    let object = scene.object(driven)?;
    if object.is_joint {
        let orient = object.joint_orient;
        scene.set_custom_attr(
            driven,
            INITIAL_JOINT_ORIENT,
            CustomAttr::value(Value::Vec3(orient)),
        )?;
    }

    let object = scene.object(driven)?;
    let matrix = object.offset_parent;
    let connection = object.offset_parent_input.clone();
    scene.set_custom_attr(
        driven,
        INITIAL_MATRIX,
        CustomAttr {
            value: Value::Matrix(matrix),
            connection,
        },
    )?;

    for index in 0..driver_count {
        scene.set_custom_attr(
            driven,
            &weight_attr(index),
            CustomAttr::value(Value::Float(1.0)),
        )?;
    }
    Ok(())
}

/// Put preserved channel values or connections back. Per-channel failures are
/// logged and skipped; restoration is best-effort.
pub fn restore_transform_values(scene: &mut Scene, driven: &str) {
    if scene.custom_attr(driven, INITIAL_TRANSFORM_MARKER).is_none() {
        return;
    }
    for channel in Channel::ALL {
        for axis in Axis::ALL {
            let name = initial_channel_attr(channel, axis);
            let Some(attr) = scene.custom_attr(driven, &name).cloned() else {
                continue;
            };
            if let (Some(v), Ok(object)) = (attr.value.as_float(), scene.object_mut(driven)) {
                object.set_channel(channel, axis, v);
            }
            if let Some(source) = attr.connection {
                if let Err(err) = scene.connect_channel(driven, channel, axis, source) {
                    log::warn!(
                        "could not restore {}{} on `{driven}`: {err}",
                        channel.as_str(),
                        axis.as_str()
                    );
                }
            }
        }
    }

    if let Some(attr) = scene.custom_attr(driven, INITIAL_JOINT_ORIENT).cloned() {
        if let (Value::Vec3(orient), Ok(object)) = (attr.value, scene.object_mut(driven)) {
            object.joint_orient = orient;
        }
    }
}

/// Put the preserved local-offset sink state back, as a reconnection when a
/// live source was preserved, otherwise as the stored matrix.
pub fn restore_matrix_value(scene: &mut Scene, driven: &str) {
    let Some(attr) = scene.custom_attr(driven, INITIAL_MATRIX).cloned() else {
        return;
    };
    let result = match attr.connection {
        Some(source) => scene.connect_offset_parent(driven, source),
        None => match attr.value.as_matrix() {
            Some(m) => scene.set_offset_parent(driven, *m),
            None => return,
        },
    };
    if let Err(err) = result {
        log::warn!("could not restore local-offset matrix on `{driven}`: {err}");
    }
}

/// Drop every constraint-authored custom attribute from the driven object.
pub fn remove_constraint_attributes(scene: &mut Scene, driven: &str) {
    for name in scene.custom_attr_names(driven) {
        if is_weight_attr(&name) || is_initial_attr(&name) {
            if let Err(err) = scene.remove_custom_attr(driven, &name) {
                log::warn!("could not delete attribute `{name}` on `{driven}`: {err}");
            }
        }
    }
}
