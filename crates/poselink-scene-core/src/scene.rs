//! The in-memory scene: objects plus the matrix node graph, with the
//! connection management and query surface the constraint core builds against.

use crate::error::SceneError;
use crate::math::Mat4;
use crate::node::{ConstraintTag, GraphNode, NodeKind};
use crate::object::{CustomAttr, SceneObject};
use crate::ports::{Axis, Channel, InPort, Source};
use crate::value::{Value, ValueKind};
use hashbrown::{HashMap, HashSet};
use std::collections::VecDeque;

#[derive(Clone, Debug, Default)]
pub struct Scene {
    objects: HashMap<String, SceneObject>,
    nodes: HashMap<String, GraphNode>,
}

impl Scene {
    pub fn new() -> Scene {
        Scene::default()
    }

    // --- objects ---------------------------------------------------------

    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.insert(object.name.clone(), object);
    }

    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn object(&self, name: &str) -> Result<&SceneObject, SceneError> {
        self.objects
            .get(name)
            .ok_or_else(|| SceneError::UnresolvedReference(name.to_string()))
    }

    pub fn object_mut(&mut self, name: &str) -> Result<&mut SceneObject, SceneError> {
        self.objects
            .get_mut(name)
            .ok_or_else(|| SceneError::UnresolvedReference(name.to_string()))
    }

    // --- nodes -----------------------------------------------------------

    pub fn create_node(
        &mut self,
        name: &str,
        kind: NodeKind,
        tag: Option<ConstraintTag>,
    ) -> Result<(), SceneError> {
        if self.nodes.contains_key(name) || self.objects.contains_key(name) {
            return Err(SceneError::InvalidInput(format!(
                "a node or object named `{name}` already exists"
            )));
        }
        let mut node = GraphNode::new(name, kind);
        node.tag = tag;
        self.nodes.insert(name.to_string(), node);
        Ok(())
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Result<&GraphNode, SceneError> {
        self.nodes
            .get(name)
            .ok_or_else(|| SceneError::UnresolvedReference(name.to_string()))
    }

    pub fn node_mut(&mut self, name: &str) -> Result<&mut GraphNode, SceneError> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| SceneError::UnresolvedReference(name.to_string()))
    }

    pub fn node_kind(&self, name: &str) -> Option<NodeKind> {
        self.nodes.get(name).map(|n| n.kind)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Names of nodes carrying a tag for `driven` (any family).
    pub fn tagged_nodes(&self, driven: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .nodes
            .values()
            .filter(|n| n.tag.as_ref().is_some_and(|t| t.driven == driven))
            .map(|n| n.name.clone())
            .collect();
        out.sort();
        out
    }

    /// Delete a node and purge every connection that referenced it, so
    /// downstream ports fall back to their defaults.
    pub fn delete_node(&mut self, name: &str) -> Result<(), SceneError> {
        if self.nodes.remove(name).is_none() {
            return Err(SceneError::UnresolvedReference(name.to_string()));
        }
        let refers = |source: &Source| source.node_name() == Some(name);
        for node in self.nodes.values_mut() {
            node.inputs.retain(|_, src| !refers(src));
        }
        for object in self.objects.values_mut() {
            object.channel_inputs.retain(|_, src| !refers(src));
            if object.offset_parent_input.as_ref().is_some_and(refers) {
                object.offset_parent_input = None;
            }
            for attr in object.custom.values_mut() {
                if attr.connection.as_ref().is_some_and(refers) {
                    attr.connection = None;
                }
            }
        }
        Ok(())
    }

    // --- connections -----------------------------------------------------

    /// Validate that `source` exists and is matrix-typed.
    pub fn ensure_matrix_source(&self, source: &Source) -> Result<(), SceneError> {
        self.ensure_source_exists(source)?;
        if !source.is_matrix() {
            return Err(SceneError::InvalidInput(format!(
                "source {source} is not matrix-typed"
            )));
        }
        Ok(())
    }

    fn ensure_source_exists(&self, source: &Source) -> Result<(), SceneError> {
        match source {
            Source::Node { node, port } => {
                let n = self.node(node)?;
                if !output_allowed(n.kind, port.is_matrix()) {
                    return Err(SceneError::InvalidInput(format!(
                        "node `{node}` ({}) has no output port {port:?}",
                        n.kind.as_str()
                    )));
                }
                Ok(())
            }
            Source::Object { object, .. } => self.object(object).map(|_| ()),
        }
    }

    /// Connect a source to a node input port. The port must belong to the
    /// node's kind and the source's port class must match.
    pub fn connect(&mut self, node: &str, port: InPort, source: Source) -> Result<(), SceneError> {
        self.ensure_source_exists(&source)?;
        let kind = self
            .node_kind(node)
            .ok_or_else(|| SceneError::UnresolvedReference(node.to_string()))?;
        if !input_allowed(kind, &port) {
            return Err(SceneError::InvalidInput(format!(
                "node `{node}` ({}) has no input port {port:?}",
                kind.as_str()
            )));
        }
        if port.is_matrix() != source.is_matrix() {
            return Err(SceneError::TypeMismatch(format!(
                "cannot connect {source} into {port:?} of `{node}`"
            )));
        }
        self.node_mut(node)?.inputs.insert(port, source);
        Ok(())
    }

    pub fn disconnect(&mut self, node: &str, port: &InPort) -> Result<Option<Source>, SceneError> {
        Ok(self.node_mut(node)?.inputs.remove(port))
    }

    /// Set a baked constant on a node input port.
    pub fn set_constant(
        &mut self,
        node: &str,
        port: InPort,
        value: Value,
    ) -> Result<(), SceneError> {
        let kind = self
            .node_kind(node)
            .ok_or_else(|| SceneError::UnresolvedReference(node.to_string()))?;
        if !input_allowed(kind, &port) {
            return Err(SceneError::InvalidInput(format!(
                "node `{node}` ({}) has no input port {port:?}",
                kind.as_str()
            )));
        }
        let expected = if port.is_matrix() {
            ValueKind::Matrix
        } else {
            ValueKind::Float
        };
        if value.kind() != expected {
            return Err(SceneError::TypeMismatch(format!(
                "port {port:?} of `{node}` expects {expected:?}, got {:?}",
                value.kind()
            )));
        }
        self.node_mut(node)?.constants.insert(port, value);
        Ok(())
    }

    // --- object attributes -----------------------------------------------

    pub fn connect_offset_parent(&mut self, object: &str, source: Source) -> Result<(), SceneError> {
        self.ensure_matrix_source(&source)?;
        self.object_mut(object)?.offset_parent_input = Some(source);
        Ok(())
    }

    pub fn disconnect_offset_parent(&mut self, object: &str) -> Result<Option<Source>, SceneError> {
        Ok(self.object_mut(object)?.offset_parent_input.take())
    }

    pub fn offset_parent_source(&self, object: &str) -> Result<Option<&Source>, SceneError> {
        Ok(self.object(object)?.offset_parent_input.as_ref())
    }

    pub fn set_offset_parent(&mut self, object: &str, value: Mat4) -> Result<(), SceneError> {
        self.object_mut(object)?.offset_parent = value;
        Ok(())
    }

    pub fn connect_channel(
        &mut self,
        object: &str,
        channel: Channel,
        axis: Axis,
        source: Source,
    ) -> Result<(), SceneError> {
        self.ensure_source_exists(&source)?;
        if source.is_matrix() {
            return Err(SceneError::TypeMismatch(format!(
                "cannot connect matrix source {source} into scalar channel {}{}",
                channel.as_str(),
                axis.as_str()
            )));
        }
        self.object_mut(object)?
            .channel_inputs
            .insert((channel, axis), source);
        Ok(())
    }

    pub fn disconnect_channel(
        &mut self,
        object: &str,
        channel: Channel,
        axis: Axis,
    ) -> Result<Option<Source>, SceneError> {
        Ok(self
            .object_mut(object)?
            .channel_inputs
            .remove(&(channel, axis)))
    }

    pub fn set_custom_attr(
        &mut self,
        object: &str,
        name: &str,
        attr: CustomAttr,
    ) -> Result<(), SceneError> {
        self.object_mut(object)?
            .custom
            .insert(name.to_string(), attr);
        Ok(())
    }

    pub fn custom_attr(&self, object: &str, name: &str) -> Option<&CustomAttr> {
        self.objects.get(object).and_then(|o| o.custom.get(name))
    }

    pub fn remove_custom_attr(
        &mut self,
        object: &str,
        name: &str,
    ) -> Result<Option<CustomAttr>, SceneError> {
        Ok(self.object_mut(object)?.custom.remove(name))
    }

    pub fn custom_attr_names(&self, object: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .objects
            .get(object)
            .map(|o| o.custom.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    // --- graph queries ----------------------------------------------------

    /// Node feeding the object's local-offset sink, if any.
    pub fn sink_upstream(&self, object: &str) -> Option<&str> {
        self.objects
            .get(object)
            .and_then(|o| o.offset_parent_input.as_ref())
            .and_then(|s| s.node_name())
    }

    /// Node names directly feeding the given node's inputs.
    pub fn upstream_neighbors(&self, node: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .nodes
            .get(node)
            .map(|n| {
                n.inputs
                    .values()
                    .filter_map(|s| s.node_name())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        out.sort();
        out.dedup();
        out
    }

    /// Every node directly feeding any attribute of `object`: the sink, raw
    /// channels, and custom attributes.
    pub fn direct_connections(&self, object: &str) -> Vec<String> {
        let Some(obj) = self.objects.get(object) else {
            return Vec::new();
        };
        let mut out: Vec<String> = obj
            .offset_parent_input
            .iter()
            .chain(obj.channel_inputs.values())
            .chain(obj.custom.values().filter_map(|a| a.connection.as_ref()))
            .filter_map(|s| s.node_name())
            .map(str::to_string)
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Breadth-first upstream traversal from all of the object's inputs,
    /// visiting nodes only (scene objects are pruned), bounded by depth.
    pub fn history(&self, object: &str, max_depth: usize) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut order: Vec<String> = Vec::new();
        let mut queue: VecDeque<(String, usize)> = self
            .direct_connections(object)
            .into_iter()
            .map(|n| (n, 0))
            .collect();

        while let Some((name, depth)) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            order.push(name.clone());
            if depth + 1 >= max_depth {
                continue;
            }
            for upstream in self.upstream_neighbors(&name) {
                queue.push_back((upstream, depth + 1));
            }
        }
        order
    }

    // --- transaction boundary --------------------------------------------

    /// Run `f` inside an undo scope: on `Err` the scene is rolled back to the
    /// state at entry, on `Ok` the whole mutation commits as one step.
    pub fn transaction<T, E>(
        &mut self,
        label: &str,
        f: impl FnOnce(&mut Scene) -> Result<T, E>,
    ) -> Result<T, E> {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => {
                log::debug!("transaction `{label}` committed");
                Ok(value)
            }
            Err(err) => {
                *self = snapshot;
                log::debug!("transaction `{label}` cancelled, scene restored");
                Err(err)
            }
        }
    }
}

/// Which input ports exist for a node kind.
fn input_allowed(kind: NodeKind, port: &InPort) -> bool {
    match kind {
        NodeKind::MultMatrix => matches!(port, InPort::MatrixIn(_)),
        NodeKind::DecomposeMatrix | NodeKind::HoldMatrix | NodeKind::PickMatrix => {
            matches!(port, InPort::InMatrix)
        }
        NodeKind::ComposeMatrix => matches!(port, InPort::Scalar(_, _)),
        NodeKind::BlendMatrix => matches!(port, InPort::BaseMatrix | InPort::TargetMatrix(_)),
    }
}

/// Which output port classes exist for a node kind.
fn output_allowed(kind: NodeKind, matrix: bool) -> bool {
    match kind {
        NodeKind::DecomposeMatrix => !matrix,
        _ => matrix,
    }
}
