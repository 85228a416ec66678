//! Mutable-mapping facade over a node's serialized property buffer.
//!
//! # Responsibility
//! - Load the node's buffer into an ordered in-memory mapping.
//! - Write the whole mapping back after every mutation.
//! - Create the backing attribute lazily, respecting the node lock flag.
//!
//! # Invariants
//! - Reads never touch the host.
//! - Node name/path are looked up on every call, never cached.
//! - `flush` is a no-op on an empty mapping; only the decode-discard path
//!   persists an empty mapping.
//! - A mutation whose mapping cannot be encoded is rolled back.

use super::{DecodeFailurePolicy, StoreError, StoreOptions, StoreResult};
use crate::codec::{ExtendedJsonCodec, PropertyCodec};
use crate::host::{HostError, NodeId, NodeRef, SceneHost};
use crate::model::key::PropertyKey;
use crate::model::property_map::PropertyMap;
use crate::model::value::PropertyValue;
use log::{debug, info, warn};

/// User properties of one scene node.
pub struct PropertyStore<'h, H: SceneHost + ?Sized, C: PropertyCodec = ExtendedJsonCodec> {
    host: &'h H,
    node: NodeId,
    properties: PropertyMap,
    codec: C,
    options: StoreOptions,
}

impl<'h, H: SceneHost + ?Sized> PropertyStore<'h, H> {
    /// Binds a store to a node with default options and loads its buffer.
    ///
    /// # Errors
    /// - `NodeResolution` when `reference` does not name exactly one node.
    /// - Host/codec errors raised by the initial reload.
    pub fn open(host: &'h H, reference: impl Into<NodeRef>) -> StoreResult<Self> {
        Self::open_with_options(host, reference, StoreOptions::default())
    }

    pub fn open_with_options(
        host: &'h H,
        reference: impl Into<NodeRef>,
        options: StoreOptions,
    ) -> StoreResult<Self> {
        Self::open_with_codec(host, reference, options, ExtendedJsonCodec::new())
    }
}

impl<'h, H: SceneHost + ?Sized, C: PropertyCodec> PropertyStore<'h, H, C> {
    /// Binds a store using a caller-provided codec.
    pub fn open_with_codec(
        host: &'h H,
        reference: impl Into<NodeRef>,
        options: StoreOptions,
        codec: C,
    ) -> StoreResult<Self> {
        let reference = reference.into();
        let node = host.resolve(&reference).map_err(|err| match err {
            HostError::NodeNotFound(_) | HostError::AmbiguousName(_) => {
                StoreError::NodeResolution {
                    reference: reference.to_string(),
                    source: err,
                }
            }
            other => StoreError::from(other),
        })?;

        let mut store = Self {
            host,
            node,
            properties: PropertyMap::new(),
            codec,
            options,
        };
        store.reload()?;
        Ok(store)
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: impl Into<PropertyKey>) -> StoreResult<&PropertyValue> {
        let key = key.into();
        self.properties
            .get(&key)
            .ok_or(StoreError::KeyNotFound(key))
    }

    pub fn contains_key(&self, key: impl Into<PropertyKey>) -> bool {
        self.properties.contains_key(&key.into())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> {
        self.properties.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &PropertyValue> {
        self.properties.values()
    }

    pub fn items(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyValue)> {
        self.properties.iter()
    }

    /// Read-only view of the in-memory mapping.
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Stores one property and writes the mapping back.
    pub fn set(
        &mut self,
        key: impl Into<PropertyKey>,
        value: impl Into<PropertyValue>,
    ) -> StoreResult<()> {
        let previous = self.properties.clone();
        self.properties.insert(key.into(), value.into());
        self.flush_or_restore(previous)
    }

    /// Removes one property and writes the mapping back.
    ///
    /// A missing key fails with `KeyNotFound` and writes nothing.
    pub fn delete(&mut self, key: impl Into<PropertyKey>) -> StoreResult<PropertyValue> {
        let key = key.into();
        let previous = self.properties.clone();
        let removed = self
            .properties
            .remove(&key)
            .ok_or(StoreError::KeyNotFound(key))?;
        self.flush_or_restore(previous)?;
        Ok(removed)
    }

    /// Copies every pair into the mapping, then writes it back once.
    pub fn update<I, K, V>(&mut self, pairs: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<PropertyKey>,
        V: Into<PropertyValue>,
    {
        let previous = self.properties.clone();
        self.properties.extend(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        self.flush_or_restore(previous)
    }

    pub fn node_object(&self) -> NodeId {
        self.node
    }

    pub fn node_name(&self) -> StoreResult<String> {
        Ok(self.host.node_name(self.node)?)
    }

    /// Full DAG path, or the short name for nodes outside the hierarchy.
    pub fn node_path(&self) -> StoreResult<String> {
        match self.host.dag_path(self.node)? {
            Some(path) => Ok(path),
            None => self.node_name(),
        }
    }

    /// Creates the backing attribute when absent and the node is unlocked.
    pub fn ensure_attribute(&self) -> StoreResult<()> {
        let path = self.node_path()?;
        let spec = &self.options.attribute;
        if self.host.has_attribute(&path, &spec.long_name)? {
            return Ok(());
        }
        if self.host.is_locked(&path)? {
            debug!(
                "event=props_attr_ensure module=store status=skipped reason=locked node={path}"
            );
            return Ok(());
        }

        self.host.add_string_attribute(&path, spec)?;
        info!(
            "event=props_attr_ensure module=store status=created node={path} attribute={}",
            spec.long_name
        );
        Ok(())
    }

    /// Reads the raw buffer, treating a missing attribute as empty.
    pub fn try_read_buffer(&self) -> StoreResult<String> {
        match self.read_buffer() {
            Err(StoreError::AttributeMissing { .. }) => Ok(String::new()),
            other => other,
        }
    }

    /// Reads the raw buffer; fails with `AttributeMissing` when absent.
    pub fn read_buffer(&self) -> StoreResult<String> {
        let path = self.node_path()?;
        Ok(self
            .host
            .get_string_attribute(&path, &self.options.attribute.long_name)?)
    }

    /// Replaces the mapping with the decoded `buffer`.
    ///
    /// Empty text leaves the current mapping untouched. Undecodable text is
    /// handled per `StoreOptions::decode_failure`.
    pub fn load_buffer(&mut self, buffer: &str) -> StoreResult<()> {
        if buffer.is_empty() {
            return Ok(());
        }

        self.ensure_attribute()?;
        match self.codec.decode(buffer) {
            Ok(properties) => {
                self.properties = properties;
                self.flush()
            }
            Err(err) => match self.options.decode_failure {
                DecodeFailurePolicy::Discard => {
                    warn!(
                        "event=props_decode module=store status=discarded node={} bytes={} error={}",
                        self.node,
                        buffer.len(),
                        err
                    );
                    self.properties.clear();
                    self.write_properties()
                }
                DecodeFailurePolicy::Surface => Err(StoreError::Codec(err)),
            },
        }
    }

    /// Refreshes the mapping from the persisted buffer.
    pub fn reload(&mut self) -> StoreResult<()> {
        let buffer = self.try_read_buffer()?;
        self.load_buffer(&buffer)
    }

    /// Writes the mapping back to the node. Does nothing when it is empty.
    pub fn flush(&self) -> StoreResult<()> {
        if self.properties.is_empty() {
            return Ok(());
        }
        self.write_properties()
    }

    /// Alias of [`flush`](Self::flush).
    pub fn invalidate(&self) -> StoreResult<()> {
        self.flush()
    }

    fn flush_or_restore(&mut self, previous: PropertyMap) -> StoreResult<()> {
        let result = self.flush();
        if let Err(StoreError::Codec(err)) = &result {
            warn!(
                "event=props_flush module=store status=rolled_back node={} error={err}",
                self.node
            );
            self.properties = previous;
        }
        result
    }

    fn write_properties(&self) -> StoreResult<()> {
        self.ensure_attribute()?;
        let buffer = self.codec.encode(&self.properties)?;
        let path = self.node_path()?;
        self.host
            .set_string_attribute(&path, &self.options.attribute.long_name, &buffer)?;
        debug!(
            "event=props_flush module=store status=ok node={path} entries={} bytes={}",
            self.properties.len(),
            buffer.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PropertyStore;
    use crate::host::{MemoryScene, NodeKind, SceneHost};
    use crate::model::value::PropertyValue;
    use crate::store::StoreError;

    #[test]
    fn reads_never_create_the_attribute() {
        let scene = MemoryScene::new();
        scene.create_node("pCube1", None, NodeKind::Dag).unwrap();

        let store = PropertyStore::open(&scene, "pCube1").unwrap();
        assert!(store.is_empty());
        assert!(!store.contains_key("scale"));
        assert!(!scene.has_attribute("|pCube1", "notes").unwrap());
    }

    #[test]
    fn empty_update_does_not_create_the_attribute() {
        let scene = MemoryScene::new();
        scene.create_node("pCube1", None, NodeKind::Dag).unwrap();

        let mut store = PropertyStore::open(&scene, "pCube1").unwrap();
        store.update(Vec::<(&str, i64)>::new()).unwrap();
        assert!(!scene.has_attribute("|pCube1", "notes").unwrap());
    }

    #[test]
    fn delete_returns_removed_value() {
        let scene = MemoryScene::new();
        scene.create_node("pCube1", None, NodeKind::Dag).unwrap();

        let mut store = PropertyStore::open(&scene, "pCube1").unwrap();
        store.set("lod", 2).unwrap();
        assert_eq!(store.delete("lod").unwrap(), PropertyValue::Int(2));
        assert!(matches!(
            store.delete("lod"),
            Err(StoreError::KeyNotFound(_))
        ));
    }
}
