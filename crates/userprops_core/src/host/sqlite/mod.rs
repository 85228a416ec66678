//! SQLite-backed scene-graph host.
//!
//! # Responsibility
//! - Persist nodes, hierarchy, lock flags and string attributes in a scene
//!   file so properties outlive the process.
//! - Keep SQL details inside the host boundary.
//!
//! # Invariants
//! - Same semantics as `MemoryScene` (paths, locking, name resolution).
//! - Read paths reject invalid persisted state instead of masking it.
//! - Only connections at `SCENE_SCHEMA_VERSION` are wrapped.

use super::{
    validate_node_name, AttributeSpec, HostError, HostResult, NodeId, NodeKind, NodeRef,
    NodeSummary, SceneHost, PATH_SEPARATOR,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

mod scene_file;

pub use scene_file::{
    open_scene_file, open_scene_in_memory, scene_schema_version, SCENE_SCHEMA_VERSION,
};

/// Scene host over a SQLite connection at the current layout.
pub struct SqliteScene<'conn> {
    conn: &'conn Connection,
}

struct NodeRow {
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
    locked: bool,
}

impl<'conn> SqliteScene<'conn> {
    /// Wraps a connection opened through `open_scene_file` or
    /// `open_scene_in_memory`.
    ///
    /// # Errors
    /// - `SchemaMismatch` when the connection is not at the current layout.
    pub fn new(conn: &'conn Connection) -> HostResult<Self> {
        scene_file::ensure_current_layout(conn)?;
        Ok(Self { conn })
    }

    pub fn create_node(
        &self,
        name: &str,
        parent: Option<NodeId>,
        kind: NodeKind,
    ) -> HostResult<NodeId> {
        validate_node_name(name)?;
        self.check_parent(parent, kind)?;
        self.check_address_free(None, name, parent, kind)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO nodes (uuid, name, parent_uuid, kind) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                name,
                parent.map(|parent| parent.to_string()),
                node_kind_to_db(kind),
            ],
        )?;
        debug!("event=node_create module=host.sqlite status=ok node_id={id} name={name}");
        Ok(id)
    }

    pub fn rename_node(&self, node: NodeId, new_name: &str) -> HostResult<()> {
        validate_node_name(new_name)?;
        let row = self.node_row(node)?;
        if row.locked {
            return Err(HostError::Locked(row.name));
        }
        self.check_address_free(Some(node), new_name, row.parent, row.kind)?;

        self.conn.execute(
            "UPDATE nodes SET name = ?2 WHERE uuid = ?1;",
            params![node.to_string(), new_name],
        )?;
        Ok(())
    }

    /// Moves a DAG node under `new_parent`, or to the root when `None`.
    pub fn reparent_node(&self, node: NodeId, new_parent: Option<NodeId>) -> HostResult<()> {
        let row = self.node_row(node)?;
        if row.kind != NodeKind::Dag {
            return Err(HostError::InvalidHierarchy(format!(
                "dependency node `{}` cannot be parented",
                row.name
            )));
        }
        if row.locked {
            return Err(HostError::Locked(row.name));
        }
        self.check_parent(new_parent, NodeKind::Dag)?;

        let mut cursor = new_parent;
        while let Some(ancestor) = cursor {
            if ancestor == node {
                return Err(HostError::InvalidHierarchy(
                    "node cannot be parented under its own descendant".to_string(),
                ));
            }
            cursor = self.node_row(ancestor)?.parent;
        }
        self.check_address_free(Some(node), &row.name, new_parent, NodeKind::Dag)?;

        self.conn.execute(
            "UPDATE nodes SET parent_uuid = ?2 WHERE uuid = ?1;",
            params![node.to_string(), new_parent.map(|parent| parent.to_string())],
        )?;
        Ok(())
    }

    pub fn set_locked(&self, node: NodeId, locked: bool) -> HostResult<()> {
        let changed = self.conn.execute(
            "UPDATE nodes SET is_locked = ?2 WHERE uuid = ?1;",
            params![node.to_string(), bool_to_int(locked)],
        )?;
        if changed == 0 {
            return Err(HostError::NodeNotFound(node.to_string()));
        }
        Ok(())
    }

    /// Deletes an attribute from an unlocked node.
    pub fn remove_attribute(&self, node_path: &str, attribute: &str) -> HostResult<()> {
        let node = self.find_by_address(node_path)?;
        if self.node_row(node)?.locked {
            return Err(HostError::Locked(node_path.to_string()));
        }
        let changed = self.conn.execute(
            "DELETE FROM node_attributes
             WHERE node_uuid = ?1 AND (long_name = ?2 OR short_name = ?2);",
            params![node.to_string(), attribute],
        )?;
        if changed == 0 {
            return Err(attribute_missing(node_path, attribute));
        }
        Ok(())
    }

    /// Lists every node in creation order.
    pub fn list_nodes(&self) -> HostResult<Vec<NodeSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM nodes ORDER BY created_at ASC, rowid ASC;")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        ids.iter()
            .map(|text| -> HostResult<NodeSummary> {
                let id = parse_node_id(text)?;
                let row = self.node_row(id)?;
                Ok(NodeSummary {
                    id,
                    path: self.dag_path(id)?,
                    name: row.name,
                    kind: row.kind,
                    locked: row.locked,
                })
            })
            .collect()
    }

    fn node_row(&self, node: NodeId) -> HostResult<NodeRow> {
        let raw = self
            .conn
            .query_row(
                "SELECT name, parent_uuid, kind, is_locked FROM nodes WHERE uuid = ?1;",
                [node.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;
        let (name, parent, kind, locked) =
            raw.ok_or_else(|| HostError::NodeNotFound(node.to_string()))?;

        Ok(NodeRow {
            name,
            parent: parent.as_deref().map(parse_node_id).transpose()?,
            kind: parse_node_kind(&kind).ok_or_else(|| {
                HostError::InvalidData(format!("invalid node kind `{kind}` in nodes.kind"))
            })?,
            locked: match locked {
                0 => false,
                1 => true,
                other => {
                    return Err(HostError::InvalidData(format!(
                        "invalid is_locked value `{other}` in nodes.is_locked"
                    )));
                }
            },
        })
    }

    fn find_by_path(&self, path: &str) -> HostResult<NodeId> {
        let not_found = || HostError::NodeNotFound(path.to_string());
        let relative = path.strip_prefix(PATH_SEPARATOR).ok_or_else(not_found)?;

        let mut parent: Option<NodeId> = None;
        for segment in relative.split(PATH_SEPARATOR) {
            let found: Option<String> = self
                .conn
                .query_row(
                    "SELECT uuid FROM nodes
                     WHERE name = ?1 AND kind = 'dag' AND parent_uuid IS ?2;",
                    params![segment, parent.map(|id| id.to_string())],
                    |row| row.get(0),
                )
                .optional()?;
            let text = found.ok_or_else(not_found)?;
            parent = Some(parse_node_id(&text)?);
        }
        parent.ok_or_else(not_found)
    }

    fn find_by_name(&self, name: &str) -> HostResult<NodeId> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM nodes WHERE name = ?1 LIMIT 2;")?;
        let matches = stmt
            .query_map([name], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        match matches.as_slice() {
            [only] => parse_node_id(only),
            [] => Err(HostError::NodeNotFound(name.to_string())),
            _ => Err(HostError::AmbiguousName(name.to_string())),
        }
    }

    fn find_by_address(&self, address: &str) -> HostResult<NodeId> {
        if address.starts_with(PATH_SEPARATOR) {
            self.find_by_path(address)
        } else {
            self.find_by_name(address)
        }
    }

    fn check_parent(&self, parent: Option<NodeId>, kind: NodeKind) -> HostResult<()> {
        let Some(parent) = parent else {
            return Ok(());
        };
        if kind != NodeKind::Dag {
            return Err(HostError::InvalidHierarchy(
                "dependency nodes cannot have a parent".to_string(),
            ));
        }
        let row = self.node_row(parent)?;
        if row.kind != NodeKind::Dag {
            return Err(HostError::InvalidHierarchy(format!(
                "parent `{}` is not a DAG node",
                row.name
            )));
        }
        Ok(())
    }

    fn check_address_free(
        &self,
        moving: Option<NodeId>,
        name: &str,
        parent: Option<NodeId>,
        kind: NodeKind,
    ) -> HostResult<()> {
        let clashes: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nodes
             WHERE name = ?1
               AND (?2 = 'dependency' OR kind = 'dependency' OR parent_uuid IS ?3)
               AND uuid IS NOT ?4;",
            params![
                name,
                node_kind_to_db(kind),
                parent.map(|id| id.to_string()),
                moving.map(|id| id.to_string()),
            ],
            |row| row.get(0),
        )?;
        if clashes > 0 {
            return Err(HostError::InvalidHierarchy(format!(
                "a node named `{name}` already exists at that location"
            )));
        }
        Ok(())
    }
}

impl SceneHost for SqliteScene<'_> {
    fn resolve(&self, reference: &NodeRef) -> HostResult<NodeId> {
        match reference {
            NodeRef::Id(id) => self.node_row(*id).map(|_| *id),
            NodeRef::Path(path) => self.find_by_path(path),
            NodeRef::Name(name) => self.find_by_name(name),
        }
    }

    fn node_name(&self, node: NodeId) -> HostResult<String> {
        Ok(self.node_row(node)?.name)
    }

    fn dag_path(&self, node: NodeId) -> HostResult<Option<String>> {
        let row = self.node_row(node)?;
        if row.kind != NodeKind::Dag {
            return Ok(None);
        }

        let mut segments = vec![row.name];
        let mut cursor = row.parent;
        while let Some(parent) = cursor {
            let parent_row = self.node_row(parent)?;
            segments.push(parent_row.name);
            cursor = parent_row.parent;
        }
        segments.reverse();

        let mut path = String::new();
        for segment in segments {
            path.push(PATH_SEPARATOR);
            path.push_str(&segment);
        }
        Ok(Some(path))
    }

    fn has_attribute(&self, node_path: &str, attribute: &str) -> HostResult<bool> {
        let node = self.find_by_address(node_path)?;
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM node_attributes
             WHERE node_uuid = ?1 AND (long_name = ?2 OR short_name = ?2);",
            params![node.to_string(), attribute],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn is_locked(&self, node_path: &str) -> HostResult<bool> {
        let node = self.find_by_address(node_path)?;
        Ok(self.node_row(node)?.locked)
    }

    fn add_string_attribute(&self, node_path: &str, spec: &AttributeSpec) -> HostResult<()> {
        let node = self.find_by_address(node_path)?;
        if self.node_row(node)?.locked {
            debug!(
                "event=attr_add module=host.sqlite status=skipped reason=locked node={node_path}"
            );
            return Ok(());
        }
        if self.has_attribute(node_path, &spec.long_name)?
            || self.has_attribute(node_path, &spec.short_name)?
        {
            return Ok(());
        }

        self.conn.execute(
            "INSERT INTO node_attributes (node_uuid, long_name, short_name, cached_internally)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                node.to_string(),
                spec.long_name,
                spec.short_name,
                bool_to_int(spec.cached_internally),
            ],
        )?;
        Ok(())
    }

    fn get_string_attribute(&self, node_path: &str, attribute: &str) -> HostResult<String> {
        let node = self.find_by_address(node_path)?;
        self.conn
            .query_row(
                "SELECT value FROM node_attributes
                 WHERE node_uuid = ?1 AND (long_name = ?2 OR short_name = ?2);",
                params![node.to_string(), attribute],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .ok_or_else(|| attribute_missing(node_path, attribute))
    }

    fn set_string_attribute(
        &self,
        node_path: &str,
        attribute: &str,
        value: &str,
    ) -> HostResult<()> {
        let node = self.find_by_address(node_path)?;
        let changed = self.conn.execute(
            "UPDATE node_attributes
             SET value = ?3, updated_at = (strftime('%s', 'now') * 1000)
             WHERE node_uuid = ?1 AND (long_name = ?2 OR short_name = ?2);",
            params![node.to_string(), attribute, value],
        )?;
        if changed == 0 {
            return Err(attribute_missing(node_path, attribute));
        }
        Ok(())
    }
}

fn attribute_missing(node_path: &str, attribute: &str) -> HostError {
    HostError::AttributeMissing {
        node: node_path.to_string(),
        attribute: attribute.to_string(),
    }
}

fn parse_node_id(text: &str) -> HostResult<NodeId> {
    Uuid::parse_str(text)
        .map_err(|_| HostError::InvalidData(format!("invalid uuid value `{text}` in nodes.uuid")))
}

fn node_kind_to_db(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Dag => "dag",
        NodeKind::Dependency => "dependency",
    }
}

fn parse_node_kind(value: &str) -> Option<NodeKind> {
    match value {
        "dag" => Some(NodeKind::Dag),
        "dependency" => Some(NodeKind::Dependency),
        _ => None,
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
