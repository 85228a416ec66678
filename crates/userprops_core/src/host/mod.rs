//! Scene-graph host contracts.
//!
//! # Responsibility
//! - Define the narrow host surface a property store depends on: node
//!   resolution, attribute query/creation/read/write and path lookup.
//! - Provide in-memory and SQLite-backed host implementations.
//!
//! # Invariants
//! - Node handles (`NodeId`) are stable across renames and reparenting.
//! - Attribute creation on a locked node is a silent no-op.
//! - Attribute access is addressed by node path (or name) plus attribute name.
//!
//! # See also
//! - `store::user_properties` for the consumer of this contract.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryScene;
pub use sqlite::{
    open_scene_file, open_scene_in_memory, scene_schema_version, SqliteScene, SCENE_SCHEMA_VERSION,
};

/// Separator between DAG path segments (`|root|child`).
pub const PATH_SEPARATOR: char = '|';

static NODE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid node name regex"));

/// Stable opaque node handle.
pub type NodeId = Uuid;

pub type HostResult<T> = Result<T, HostError>;

/// Ways a caller can point at a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    /// Short node name; must match exactly one node.
    Name(String),
    /// Full DAG path such as `|rig|arm_L`.
    Path(String),
    Id(NodeId),
}

impl NodeRef {
    /// Interprets free-form text: UUIDs become ids, `|`-prefixed text
    /// becomes a path, anything else a name.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(id) = Uuid::parse_str(trimmed) {
            return Self::Id(id);
        }
        if trimmed.starts_with(PATH_SEPARATOR) {
            return Self::Path(trimmed.to_string());
        }
        Self::Name(trimmed.to_string())
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Path(path) => write!(f, "{path}"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for NodeRef {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<NodeId> for NodeRef {
    fn from(value: NodeId) -> Self {
        Self::Id(value)
    }
}

/// Node category in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Hierarchical node with a full path.
    Dag,
    /// Plain dependency node addressed by name only.
    Dependency,
}

/// Declaration of a string attribute to add on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub long_name: String,
    pub short_name: String,
    /// Value is stored with the node rather than recomputed.
    pub cached_internally: bool,
}

impl AttributeSpec {
    pub fn new(long_name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            long_name: long_name.into(),
            short_name: short_name.into(),
            cached_internally: true,
        }
    }
}

impl Default for AttributeSpec {
    /// The conventional user-notes attribute (`notes` / `nts`).
    fn default() -> Self {
        Self::new("notes", "nts")
    }
}

/// Listing row describing one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    /// Full path for DAG nodes.
    pub path: Option<String>,
    pub kind: NodeKind,
    pub locked: bool,
}

/// Host-side failure.
#[derive(Debug)]
pub enum HostError {
    NodeNotFound(String),
    /// Short name matches more than one node.
    AmbiguousName(String),
    AttributeMissing { node: String, attribute: String },
    /// Structural change attempted on a locked node.
    Locked(String),
    InvalidName(String),
    /// Operation would make the hierarchy inconsistent.
    InvalidHierarchy(String),
    /// Scene file storage failure.
    Sqlite(rusqlite::Error),
    /// Scene file layout differs from the one this build reads and writes.
    SchemaMismatch { found: u32, expected: u32 },
    InvalidData(String),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(reference) => write!(f, "node not found: {reference}"),
            Self::AmbiguousName(name) => write!(f, "more than one node is named `{name}`"),
            Self::AttributeMissing { node, attribute } => {
                write!(f, "attribute does not exist: {node}.{attribute}")
            }
            Self::Locked(node) => write!(f, "node is locked: {node}"),
            Self::InvalidName(name) => write!(f, "invalid node name: `{name}`"),
            Self::InvalidHierarchy(message) => write!(f, "invalid hierarchy: {message}"),
            Self::Sqlite(err) => write!(f, "scene storage error: {err}"),
            Self::SchemaMismatch { found, expected } => write!(
                f,
                "scene file layout version {found} is not the supported version {expected}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted scene data: {message}"),
        }
    }
}

impl Error for HostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for HostError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Scene-graph operations required by a property store.
///
/// All methods take `&self`; implementations own their interior mutability
/// and are expected to be driven from a single thread.
pub trait SceneHost {
    /// Resolves a reference to a live node handle.
    fn resolve(&self, reference: &NodeRef) -> HostResult<NodeId>;
    /// Returns the short display name of a node.
    fn node_name(&self, node: NodeId) -> HostResult<String>;
    /// Returns the full path of a DAG node, `None` for dependency nodes.
    fn dag_path(&self, node: NodeId) -> HostResult<Option<String>>;
    /// Returns whether `attribute` (long or short name) exists on the node.
    fn has_attribute(&self, node_path: &str, attribute: &str) -> HostResult<bool>;
    fn is_locked(&self, node_path: &str) -> HostResult<bool>;
    /// Adds a string attribute. Does nothing when the node is locked or the
    /// attribute already exists.
    fn add_string_attribute(&self, node_path: &str, spec: &AttributeSpec) -> HostResult<()>;
    /// Reads a string attribute; `HostError::AttributeMissing` when absent.
    fn get_string_attribute(&self, node_path: &str, attribute: &str) -> HostResult<String>;
    /// Writes a string attribute; `HostError::AttributeMissing` when absent.
    fn set_string_attribute(&self, node_path: &str, attribute: &str, value: &str)
        -> HostResult<()>;
}

/// Validates a short node name against host naming rules.
pub fn validate_node_name(name: &str) -> HostResult<()> {
    if NODE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(HostError::InvalidName(name.to_string()))
    }
}

/// Joins a parent path (or none for a root) and a child name.
pub(crate) fn join_path(parent_path: Option<&str>, name: &str) -> String {
    format!("{}{PATH_SEPARATOR}{name}", parent_path.unwrap_or(""))
}
