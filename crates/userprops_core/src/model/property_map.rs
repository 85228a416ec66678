//! Ordered property mapping.
//!
//! # Responsibility
//! - Hold the in-memory property bag of one node.
//! - Preserve insertion/decode order for stable iteration.
//!
//! # Invariants
//! - Keys are unique.
//! - Overwriting an existing key keeps its original position.
//! - Removing a key keeps the relative order of the remaining entries.

use super::key::PropertyKey;
use super::value::PropertyValue;
use indexmap::IndexMap;

/// Insertion-ordered map from property key to value.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: IndexMap<PropertyKey, PropertyValue>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &PropertyKey) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &PropertyKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or overwrites one entry and returns the previous value.
    pub fn insert(&mut self, key: PropertyKey, value: PropertyValue) -> Option<PropertyValue> {
        self.entries.insert(key, value)
    }

    /// Removes one entry and returns its value.
    pub fn remove(&mut self, key: &PropertyKey) -> Option<PropertyValue> {
        self.entries.shift_remove(key)
    }

    /// Copies every pair into this map, overwriting existing keys.
    pub fn extend<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (PropertyKey, PropertyValue)>,
    {
        self.entries.extend(pairs);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &PropertyValue> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyValue)> {
        self.entries.iter()
    }
}

/// Two mappings are equal when they hold the same entries in the same order.
impl PartialEq for PropertyMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyMap
where
    K: Into<PropertyKey>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        let mut map = Self::new();
        map.extend(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        map
    }
}

impl IntoIterator for PropertyMap {
    type Item = (PropertyKey, PropertyValue);
    type IntoIter = indexmap::map::IntoIter<PropertyKey, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::PropertyMap;
    use crate::model::key::PropertyKey;
    use crate::model::value::PropertyValue;

    #[test]
    fn overwrite_keeps_original_position() {
        let mut map: PropertyMap = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        let previous = map.insert("a".into(), PropertyValue::Int(10));

        assert_eq!(previous, Some(PropertyValue::Int(1)));
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                PropertyKey::from("a"),
                PropertyKey::from("b"),
                PropertyKey::from("c")
            ]
        );
    }

    #[test]
    fn remove_preserves_relative_order() {
        let mut map: PropertyMap = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        assert_eq!(map.remove(&"b".into()), Some(PropertyValue::Int(2)));
        assert_eq!(map.remove(&"b".into()), None);

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![PropertyKey::from("a"), PropertyKey::from("c")]);
    }

    #[test]
    fn string_and_integer_keys_are_distinct() {
        let mut map = PropertyMap::new();
        map.insert(PropertyKey::Int(1), PropertyValue::from("int"));
        map.insert(PropertyKey::from("1"), PropertyValue::from("str"));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&PropertyKey::Int(1)), Some(&PropertyValue::from("int")));
    }

    #[test]
    fn equality_depends_on_order() {
        let forward: PropertyMap = [("a", 1), ("b", 2)].into_iter().collect();
        let backward: PropertyMap = [("b", 2), ("a", 1)].into_iter().collect();

        assert_ne!(forward, backward);
        assert_eq!(forward, forward.clone());
    }
}
