//! Constraint graph construction.
//!
//! `build_parent_constraint` wires multiply / decompose / compose / hold /
//! blend primitives into the topology the configuration asks for and feeds
//! the result into the driven object's local-offset sink. The whole build runs
//! inside one scene transaction; validation happens before any node exists.

use crate::config::{ConstraintConfig, ConstraintKind};
use crate::error::ConstraintError;
use crate::preserve;
use crate::primitives::{
    blend, compose, decompose, hold, multiply_chain, pick_filter, set_matrix_constant, snapshot,
};
use poselink_scene_core::{
    world_inverse_matrix, world_matrix, Axis, Channel, ConstraintTag, InPort, Mat4, PickChannels,
    Scene, SceneError, Source,
};

/// Handles to everything one build created, sufficient for a later removal
/// without any name inference.
#[derive(Clone, Debug)]
pub struct ConstraintHandle {
    pub driven: String,
    pub kind: ConstraintKind,
    /// Every node this build created.
    pub nodes: Vec<String>,
    /// Per-driver multiply chains, in driver order.
    pub chains: Vec<String>,
    /// Hold nodes, present only with `offset` + `keep_hold`.
    pub holds: Vec<String>,
    /// The blend node, when one was needed.
    pub blend: Option<String>,
}

pub fn build_parent_constraint(
    scene: &mut Scene,
    config: &ConstraintConfig,
) -> Result<ConstraintHandle, ConstraintError> {
    // Everything must resolve before any node is created.
    scene.object(&config.driven)?;
    if config.drivers.is_empty() {
        return Err(ConstraintError::Scene(SceneError::InvalidInput(
            "at least one driver is required".into(),
        )));
    }
    for driver in &config.drivers {
        scene.object(driver)?;
    }

    scene.transaction("build_parent_constraint", |scene| {
        build_inner(scene, config)
    })
}

fn build_inner(
    scene: &mut Scene,
    config: &ConstraintConfig,
) -> Result<ConstraintHandle, ConstraintError> {
    let kind = ConstraintKind::Parent;
    let token = kind.token();
    let driven = &config.driven;
    let tag = ConstraintTag {
        driven: driven.clone(),
        family: kind.family().to_string(),
    };

    let parent = scene.object(driven)?.parent.clone();
    if let Some(parent) = &parent {
        scene.object(parent)?;
    }
    // No parent: the chain slot stays unconnected and contributes identity.
    let parent_inverse = parent.as_ref().map(Source::world_inverse);

    // The pre-constraint parent-relative pose, captured while the driven is
    // still in its original state.
    let envelope_base = if config.envelope {
        let driven_world = world_matrix(scene, driven)?;
        let parent_inv = match &parent {
            Some(p) => world_inverse_matrix(scene, p)?,
            None => Mat4::IDENTITY,
        };
        Some(driven_world.mul(&parent_inv))
    } else {
        None
    };

    let mut handle = ConstraintHandle {
        driven: driven.clone(),
        kind,
        nodes: Vec::new(),
        chains: Vec::new(),
        holds: Vec::new(),
        blend: None,
    };
    let mut chain_outs = Vec::new();

    for driver in &config.drivers {
        let effective = driver_effective(scene, config, driver, &tag, &mut handle)?;

        // Offset captured once at build time; never recomputed afterwards.
        let offset = if config.offset {
            Some(capture_offset(scene, driven, driver)?)
        } else {
            None
        };

        let chain_name = format!("multmatrix_{driven}_{token}_{driver}");
        let chain = multiply_chain(
            scene,
            &chain_name,
            Some(&tag),
            &[None, Some(effective), parent_inverse.clone()],
        )?;

        if let Some(offset) = offset {
            if config.keep_hold {
                let hold_name = format!("holdmatrix_{driven}_{token}_{driver}");
                let held = hold(scene, &hold_name, Some(&tag))?;
                set_matrix_constant(scene, &held.node, InPort::InMatrix, offset)?;
                scene.connect(&chain.node, InPort::MatrixIn(0), held.out)?;
                handle.holds.push(held.node.clone());
                handle.nodes.push(held.node);
            } else {
                set_matrix_constant(scene, &chain.node, InPort::MatrixIn(0), offset)?;
            }
        }

        handle.chains.push(chain.node.clone());
        handle.nodes.push(chain.node.clone());
        chain_outs.push(chain.out);
    }

    preserve::preserve_initial_values(scene, driven, config.drivers.len())?;

    // The builder owns the sink from here on.
    scene.disconnect_offset_parent(driven)?;

    if config.drivers.len() > 1 || config.envelope {
        let blend_name = format!("blendmat_{driven}");
        let weights = config.weights.per_target();
        let targets: Vec<_> = chain_outs.into_iter().map(|out| (out, weights)).collect();
        let blended = blend(
            scene,
            &blend_name,
            Some(&tag),
            None,
            &targets,
            config.weights.envelope,
        )?;
        if let Some(base) = envelope_base {
            set_matrix_constant(scene, &blended.node, InPort::BaseMatrix, base)?;
        }
        scene.connect_offset_parent(driven, blended.out)?;
        handle.blend = Some(blended.node.clone());
        handle.nodes.push(blended.node);
    } else if let Some(out) = chain_outs.into_iter().next() {
        scene.connect_offset_parent(driven, out)?;
    }

    // The sink now fully encodes the transform; non-identity raw channels
    // would double-apply it.
    scene.object_mut(driven)?.reset_identity();

    Ok(handle)
}

/// Effective driver matrix source per the axis filters: world matrix when
/// every filter passes through, a pick node when exactly one whole channel
/// group survives, else a lossy decompose/compose pair over the enabled axes.
fn driver_effective(
    scene: &mut Scene,
    config: &ConstraintConfig,
    driver: &str,
    tag: &ConstraintTag,
    handle: &mut ConstraintHandle,
) -> Result<Source, ConstraintError> {
    if config.filters_all_enabled() {
        return Ok(Source::world(driver));
    }

    let driven = &config.driven;
    let token = ConstraintKind::Parent.token();

    if let Some(pick) = whole_group_pick(config) {
        let name = format!("pickmatrix_{driven}_{token}_{driver}");
        let created = pick_filter(scene, &name, Some(tag), Source::world(driver), pick)?;
        handle.nodes.push(created.node.clone());
        return Ok(created.out);
    }

    let decompose_name = format!("decomposematrix_{driven}_{token}_{driver}");
    let decomposed = decompose(scene, &decompose_name, Some(tag), Source::world(driver))?;
    handle.nodes.push(decomposed.node.clone());

    let mut wiring = Vec::new();
    for channel in Channel::ALL {
        let filter = config.filter(channel);
        for axis in Axis::ALL {
            if filter.enabled(axis) {
                wiring.push((
                    (channel, axis),
                    Source::scalar(&decomposed.node, channel, axis),
                ));
            }
        }
    }
    let compose_name = format!("composematrix_{driven}_{token}_{driver}");
    let composed = compose(scene, &compose_name, Some(tag), &wiring)?;
    handle.nodes.push(composed.node.clone());
    Ok(composed.out)
}

/// Pick-node shortcut: exactly one channel group fully enabled, the rest
/// fully disabled, and shear not the survivor (pick has no shear control).
fn whole_group_pick(config: &ConstraintConfig) -> Option<PickChannels> {
    let full: Vec<Channel> = Channel::ALL
        .into_iter()
        .filter(|c| config.filter(*c).all_enabled())
        .collect();
    let empty = Channel::ALL
        .into_iter()
        .filter(|c| config.filter(*c).none_enabled())
        .count();
    if full.len() == 1 && empty == 3 && full[0] != Channel::Shear {
        Some(PickChannels {
            translate: full[0] == Channel::Translate,
            rotate: full[0] == Channel::Rotate,
            scale: full[0] == Channel::Scale,
        })
    } else {
        None
    }
}

/// Bake `driven.world * driver.world^-1` through a temporary multiply chain,
/// reading its current result exactly once.
fn capture_offset(scene: &mut Scene, driven: &str, driver: &str) -> Result<Mat4, ConstraintError> {
    let tmp_name = format!("tmp_multmatrix_{driven}_{driver}");
    let tmp = multiply_chain(
        scene,
        &tmp_name,
        None,
        &[
            Some(Source::world(driven)),
            Some(Source::world_inverse(driver)),
        ],
    )?;
    let baked = snapshot(scene, &tmp.out)?;
    scene.delete_node(&tmp.node)?;
    Ok(baked)
}
