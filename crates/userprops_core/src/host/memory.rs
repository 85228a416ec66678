//! In-process scene-graph host.
//!
//! # Responsibility
//! - Model nodes, hierarchy, lock flags and string attributes in memory.
//! - Offer authoring helpers (create/rename/reparent/lock) for tools and tests.
//!
//! # Invariants
//! - Full DAG paths are unique.
//! - Dependency nodes have no parent and no path; their names are unique
//!   across every node, so a short name always addresses them.
//! - Locked nodes reject rename, reparent and attribute add/remove; attribute
//!   values stay writable.

use super::{
    join_path, validate_node_name, AttributeSpec, HostError, HostResult, NodeId, NodeKind,
    NodeRef, NodeSummary, SceneHost, PATH_SEPARATOR,
};
use log::debug;
use std::cell::RefCell;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct AttributeRecord {
    spec: AttributeSpec,
    value: String,
}

impl AttributeRecord {
    fn matches(&self, name: &str) -> bool {
        self.spec.long_name == name || self.spec.short_name == name
    }
}

#[derive(Debug, Clone)]
struct NodeRecord {
    id: NodeId,
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
    locked: bool,
    attributes: Vec<AttributeRecord>,
}

/// Scene graph held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: RefCell<Vec<NodeRecord>>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node and returns its stable handle.
    ///
    /// # Errors
    /// - `InvalidName` when `name` breaks naming rules.
    /// - `InvalidHierarchy` when the parent is not a DAG node, a dependency
    ///   node is given a parent, or the resulting address is already taken.
    pub fn create_node(
        &self,
        name: &str,
        parent: Option<NodeId>,
        kind: NodeKind,
    ) -> HostResult<NodeId> {
        validate_node_name(name)?;
        let mut nodes = self.nodes.borrow_mut();
        check_parent(&nodes, parent, kind)?;
        check_address_free(&nodes, None, name, parent, kind)?;

        let id = Uuid::new_v4();
        nodes.push(NodeRecord {
            id,
            name: name.to_string(),
            parent,
            kind,
            locked: false,
            attributes: Vec::new(),
        });
        debug!("event=node_create module=host.memory status=ok node_id={id} name={name}");
        Ok(id)
    }

    pub fn rename_node(&self, node: NodeId, new_name: &str) -> HostResult<()> {
        validate_node_name(new_name)?;
        let mut nodes = self.nodes.borrow_mut();
        let index = index_of(&nodes, node)?;
        if nodes[index].locked {
            return Err(HostError::Locked(nodes[index].name.clone()));
        }
        let (parent, kind) = (nodes[index].parent, nodes[index].kind);
        check_address_free(&nodes, Some(node), new_name, parent, kind)?;

        nodes[index].name = new_name.to_string();
        Ok(())
    }

    /// Moves a DAG node under `new_parent`, or to the root when `None`.
    pub fn reparent_node(&self, node: NodeId, new_parent: Option<NodeId>) -> HostResult<()> {
        let mut nodes = self.nodes.borrow_mut();
        let index = index_of(&nodes, node)?;
        let record = &nodes[index];
        if record.kind != NodeKind::Dag {
            return Err(HostError::InvalidHierarchy(format!(
                "dependency node `{}` cannot be parented",
                record.name
            )));
        }
        if record.locked {
            return Err(HostError::Locked(record.name.clone()));
        }
        check_parent(&nodes, new_parent, NodeKind::Dag)?;

        let mut cursor = new_parent;
        while let Some(ancestor) = cursor {
            if ancestor == node {
                return Err(HostError::InvalidHierarchy(
                    "node cannot be parented under its own descendant".to_string(),
                ));
            }
            cursor = nodes[index_of(&nodes, ancestor)?].parent;
        }
        let name = nodes[index].name.clone();
        check_address_free(&nodes, Some(node), &name, new_parent, NodeKind::Dag)?;

        nodes[index].parent = new_parent;
        Ok(())
    }

    pub fn set_locked(&self, node: NodeId, locked: bool) -> HostResult<()> {
        let mut nodes = self.nodes.borrow_mut();
        let index = index_of(&nodes, node)?;
        nodes[index].locked = locked;
        Ok(())
    }

    /// Deletes an attribute from an unlocked node.
    pub fn remove_attribute(&self, node_path: &str, attribute: &str) -> HostResult<()> {
        let mut nodes = self.nodes.borrow_mut();
        let index = find_by_address(&nodes, node_path)?;
        if nodes[index].locked {
            return Err(HostError::Locked(node_path.to_string()));
        }
        let before = nodes[index].attributes.len();
        nodes[index].attributes.retain(|attr| !attr.matches(attribute));
        if nodes[index].attributes.len() == before {
            return Err(attribute_missing(node_path, attribute));
        }
        Ok(())
    }

    /// Lists every node in creation order.
    pub fn list_nodes(&self) -> Vec<NodeSummary> {
        let nodes = self.nodes.borrow();
        nodes
            .iter()
            .enumerate()
            .map(|(index, node)| NodeSummary {
                id: node.id,
                name: node.name.clone(),
                path: full_path(&nodes, index),
                kind: node.kind,
                locked: node.locked,
            })
            .collect()
    }
}

impl SceneHost for MemoryScene {
    fn resolve(&self, reference: &NodeRef) -> HostResult<NodeId> {
        let nodes = self.nodes.borrow();
        let index = match reference {
            NodeRef::Id(id) => index_of(&nodes, *id)?,
            NodeRef::Path(path) => find_by_path(&nodes, path)?,
            NodeRef::Name(name) => find_by_name(&nodes, name)?,
        };
        Ok(nodes[index].id)
    }

    fn node_name(&self, node: NodeId) -> HostResult<String> {
        let nodes = self.nodes.borrow();
        Ok(nodes[index_of(&nodes, node)?].name.clone())
    }

    fn dag_path(&self, node: NodeId) -> HostResult<Option<String>> {
        let nodes = self.nodes.borrow();
        let index = index_of(&nodes, node)?;
        Ok(full_path(&nodes, index))
    }

    fn has_attribute(&self, node_path: &str, attribute: &str) -> HostResult<bool> {
        let nodes = self.nodes.borrow();
        let index = find_by_address(&nodes, node_path)?;
        Ok(nodes[index]
            .attributes
            .iter()
            .any(|attr| attr.matches(attribute)))
    }

    fn is_locked(&self, node_path: &str) -> HostResult<bool> {
        let nodes = self.nodes.borrow();
        Ok(nodes[find_by_address(&nodes, node_path)?].locked)
    }

    fn add_string_attribute(&self, node_path: &str, spec: &AttributeSpec) -> HostResult<()> {
        let mut nodes = self.nodes.borrow_mut();
        let index = find_by_address(&nodes, node_path)?;
        let record = &mut nodes[index];
        if record.locked {
            debug!(
                "event=attr_add module=host.memory status=skipped reason=locked node={node_path}"
            );
            return Ok(());
        }
        let exists = record.attributes.iter().any(|attr| {
            attr.matches(&spec.long_name) || attr.matches(&spec.short_name)
        });
        if !exists {
            record.attributes.push(AttributeRecord {
                spec: spec.clone(),
                value: String::new(),
            });
        }
        Ok(())
    }

    fn get_string_attribute(&self, node_path: &str, attribute: &str) -> HostResult<String> {
        let nodes = self.nodes.borrow();
        let index = find_by_address(&nodes, node_path)?;
        nodes[index]
            .attributes
            .iter()
            .find(|attr| attr.matches(attribute))
            .map(|attr| attr.value.clone())
            .ok_or_else(|| attribute_missing(node_path, attribute))
    }

    fn set_string_attribute(
        &self,
        node_path: &str,
        attribute: &str,
        value: &str,
    ) -> HostResult<()> {
        let mut nodes = self.nodes.borrow_mut();
        let index = find_by_address(&nodes, node_path)?;
        let slot = nodes[index]
            .attributes
            .iter_mut()
            .find(|attr| attr.matches(attribute))
            .ok_or_else(|| attribute_missing(node_path, attribute))?;
        slot.value = value.to_string();
        Ok(())
    }
}

fn attribute_missing(node_path: &str, attribute: &str) -> HostError {
    HostError::AttributeMissing {
        node: node_path.to_string(),
        attribute: attribute.to_string(),
    }
}

fn index_of(nodes: &[NodeRecord], node: NodeId) -> HostResult<usize> {
    nodes
        .iter()
        .position(|record| record.id == node)
        .ok_or_else(|| HostError::NodeNotFound(node.to_string()))
}

fn full_path(nodes: &[NodeRecord], index: usize) -> Option<String> {
    let record = &nodes[index];
    if record.kind != NodeKind::Dag {
        return None;
    }
    let mut segments = vec![record.name.as_str()];
    let mut cursor = record.parent;
    while let Some(parent) = cursor {
        let parent_record = nodes.iter().find(|node| node.id == parent)?;
        segments.push(parent_record.name.as_str());
        cursor = parent_record.parent;
    }
    segments.reverse();
    Some(segments.into_iter().fold(String::new(), |path, segment| {
        join_path(Some(path.as_str()), segment)
    }))
}

fn find_by_path(nodes: &[NodeRecord], path: &str) -> HostResult<usize> {
    (0..nodes.len())
        .find(|&index| full_path(nodes, index).as_deref() == Some(path))
        .ok_or_else(|| HostError::NodeNotFound(path.to_string()))
}

fn find_by_name(nodes: &[NodeRecord], name: &str) -> HostResult<usize> {
    let mut matches = nodes
        .iter()
        .enumerate()
        .filter(|(_, record)| record.name == name)
        .map(|(index, _)| index);
    match (matches.next(), matches.next()) {
        (Some(index), None) => Ok(index),
        (Some(_), Some(_)) => Err(HostError::AmbiguousName(name.to_string())),
        (None, _) => Err(HostError::NodeNotFound(name.to_string())),
    }
}

fn find_by_address(nodes: &[NodeRecord], address: &str) -> HostResult<usize> {
    if address.starts_with(PATH_SEPARATOR) {
        find_by_path(nodes, address)
    } else {
        find_by_name(nodes, address)
    }
}

fn check_parent(nodes: &[NodeRecord], parent: Option<NodeId>, kind: NodeKind) -> HostResult<()> {
    let Some(parent) = parent else {
        return Ok(());
    };
    if kind != NodeKind::Dag {
        return Err(HostError::InvalidHierarchy(
            "dependency nodes cannot have a parent".to_string(),
        ));
    }
    let parent_record = &nodes[index_of(nodes, parent)?];
    if parent_record.kind != NodeKind::Dag {
        return Err(HostError::InvalidHierarchy(format!(
            "parent `{}` is not a DAG node",
            parent_record.name
        )));
    }
    Ok(())
}

fn check_address_free(
    nodes: &[NodeRecord],
    moving: Option<NodeId>,
    name: &str,
    parent: Option<NodeId>,
    kind: NodeKind,
) -> HostResult<()> {
    let clash = nodes.iter().any(|record| {
        Some(record.id) != moving
            && record.name == name
            && (kind == NodeKind::Dependency
                || record.kind == NodeKind::Dependency
                || record.parent == parent)
    });
    if clash {
        return Err(HostError::InvalidHierarchy(format!(
            "a node named `{name}` already exists at that location"
        )));
    }
    Ok(())
}
