//! Constraint discovery and teardown.
//!
//! Detection prefers the exact constraint tags the builder stamps on every
//! node; the legacy name-token and node-kind heuristics remain as fallbacks
//! for graphs authored without tags. Restoration and deletion are best-effort
//! per item and run inside one scene transaction.

use crate::config::ConstraintKind;
use crate::error::ConstraintError;
use crate::preserve;
use poselink_scene_core::{Scene, SceneError};

/// Bound on the upstream history walk during heuristic discovery.
const HISTORY_DEPTH: usize = 8;

/// Remove the constraint attached to `driven`, restoring its pre-constraint
/// state. With no `declared` kind, the kind is inferred; failure to classify
/// is a hard error with zero side effects.
pub fn remove_constraint(
    scene: &mut Scene,
    driven: &str,
    declared: Option<ConstraintKind>,
) -> Result<(), ConstraintError> {
    scene.object(driven)?;

    let kind = match declared {
        Some(kind) => kind,
        None => detect_kind(scene, driven)
            .ok_or_else(|| ConstraintError::ConstraintNotFound(driven.to_string()))?,
    };

    let nodes = gather_nodes(scene, driven, kind);
    if nodes.is_empty() {
        log::warn!(
            "no constraint nodes found for `{driven}` with kind `{}`",
            kind.family()
        );
        return Ok(());
    }

    scene.transaction("remove_constraint", |scene| {
        scene.disconnect_offset_parent(driven)?;

        preserve::restore_transform_values(scene, driven);
        preserve::restore_matrix_value(scene, driven);

        for node in &nodes {
            if !scene.has_node(node) {
                continue;
            }
            if let Err(err) = scene.delete_node(node) {
                log::warn!("could not delete node `{node}`: {err}");
            }
        }

        preserve::remove_constraint_attributes(scene, driven);
        Ok::<(), SceneError>(())
    })?;

    log::debug!(
        "removed {} constraint from `{driven}` ({} nodes)",
        kind.family(),
        nodes.len()
    );
    Ok(())
}

/// Classify which constraint family is attached to `driven`.
fn detect_kind(scene: &Scene, driven: &str) -> Option<ConstraintKind> {
    // Exact tag lookup first.
    for name in scene.tagged_nodes(driven) {
        if let Some(tag) = scene.node(&name).ok().and_then(|n| n.tag.clone()) {
            if let Some(kind) = ConstraintKind::from_family(&tag.family) {
                return Some(kind);
            }
        }
    }

    // Legacy: classify the node feeding the sink.
    if let Some(upstream) = scene.sink_upstream(driven) {
        if let Some(kind) = kind_from_token(upstream) {
            return Some(kind);
        }
        let matrix_family = scene
            .node_kind(upstream)
            .is_some_and(|k| k.is_matrix_family());
        if matrix_family && upstream.contains(driven) {
            return Some(ConstraintKind::Parent);
        }
    }

    // Legacy: token scan over upstream history and direct connections.
    for name in scene
        .history(driven, HISTORY_DEPTH)
        .into_iter()
        .chain(scene.direct_connections(driven))
    {
        if let Some(kind) = kind_from_token(&name) {
            return Some(kind);
        }
    }

    // Legacy: weight-style attributes imply the default kind.
    let has_weights = scene
        .custom_attr_names(driven)
        .iter()
        .any(|a| preserve::is_weight_attr(a));
    if has_weights {
        return Some(ConstraintKind::Parent);
    }

    None
}

fn kind_from_token(name: &str) -> Option<ConstraintKind> {
    if name.contains(ConstraintKind::Parent.token()) {
        Some(ConstraintKind::Parent)
    } else if name.contains(ConstraintKind::Aim.token()) {
        Some(ConstraintKind::Aim)
    } else {
        None
    }
}

/// Enumerate the nodes implementing the constraint. Tagged nodes are an exact
/// answer; otherwise fall back to the legacy name/kind heuristics.
fn gather_nodes(scene: &Scene, driven: &str, kind: ConstraintKind) -> Vec<String> {
    let tagged: Vec<String> = scene
        .tagged_nodes(driven)
        .into_iter()
        .filter(|name| {
            scene
                .node(name)
                .ok()
                .and_then(|n| n.tag.as_ref().map(|t| t.family == kind.family()))
                .unwrap_or(false)
        })
        .collect();
    if !tagged.is_empty() {
        return tagged;
    }

    let token = kind.token();
    let matches = |name: &str| -> bool {
        if name.contains(token) {
            return true;
        }
        name.contains(driven)
            && scene
                .node_kind(name)
                .is_some_and(|k| k.is_matrix_family())
    };

    let mut found: Vec<String> = Vec::new();
    let mut push = |name: String, found: &mut Vec<String>| {
        if !found.contains(&name) {
            found.push(name);
        }
    };

    if let Some(upstream) = scene.sink_upstream(driven) {
        if matches(upstream) {
            push(upstream.to_string(), &mut found);
        }
    }

    for name in scene.history(driven, HISTORY_DEPTH) {
        if matches(&name) {
            push(name, &mut found);
        }
    }

    for name in scene.direct_connections(driven) {
        if !matches(&name) {
            continue;
        }
        // Each direct match also pulls in its one-hop upstream matrix
        // neighbors that belong to the driven.
        for neighbor in scene.upstream_neighbors(&name) {
            let neighbor_matches = neighbor.contains(driven)
                && scene
                    .node_kind(&neighbor)
                    .is_some_and(|k| k.is_matrix_family());
            if neighbor_matches {
                push(neighbor, &mut found);
            }
        }
        push(name, &mut found);
    }

    found.sort();
    found
}
