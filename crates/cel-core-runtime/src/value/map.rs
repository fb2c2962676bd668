//! The CEL map value.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::number::{double_as_int, double_as_uint};
use super::Value;

/// A map key that supports CEL's key types.
///
/// CEL allows bool, int, uint, and string as map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    UInt(u64),
    String(Arc<str>),
}

impl MapKey {
    /// Create a map key from a Value.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Int(i) => Some(MapKey::Int(*i)),
            Value::UInt(u) => Some(MapKey::UInt(*u)),
            Value::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }

    /// Convert back to a Value.
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(i) => Value::Int(*i),
            MapKey::UInt(u) => Value::UInt(*u),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }

    /// The same number under the other integer kind, if representable.
    fn numeric_alias(&self) -> Option<MapKey> {
        match self {
            MapKey::Int(i) => u64::try_from(*i).ok().map(MapKey::UInt),
            MapKey::UInt(u) => i64::try_from(*u).ok().map(MapKey::Int),
            _ => None,
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::String(Arc::from(s))
    }
}

/// A CEL map with heterogeneous keys.
///
/// Entries keep their insertion order. Lookups go through a hash index, and
/// a numeric key also finds an entry stored under the other integer kind
/// (`m[1u]` finds the key `1`).
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: Vec<(MapKey, Value)>,
    index: FxHashMap<MapKey, usize>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Create a map from an iterator of key-value pairs. Later duplicates
    /// replace earlier values in place.
    pub fn from_entries(entries: impl IntoIterator<Item = (MapKey, Value)>) -> Self {
        let mut map = Self::new();
        for (key, value) in entries {
            map.insert(key, value);
        }
        map
    }

    /// Look up an exact key, falling back to its numeric alias.
    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.position(key).map(|pos| &self.entries[pos].1)
    }

    /// Look up by an arbitrary value, matching numeric keys across kinds.
    ///
    /// Integral doubles find integer keys; other key kinds never match.
    pub fn get_value(&self, key: &Value) -> Option<&Value> {
        match key {
            Value::Double(d) => double_as_int(*d)
                .and_then(|i| self.get(&MapKey::Int(i)))
                .or_else(|| double_as_uint(*d).and_then(|u| self.get(&MapKey::UInt(u)))),
            other => MapKey::from_value(other).and_then(|k| self.get(&k)),
        }
    }

    /// Insert a key-value pair, returning the previous value for that key.
    pub fn insert(&mut self, key: MapKey, value: Value) -> Option<Value> {
        match self.position(&key) {
            Some(pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.position(key).is_some()
    }

    pub fn contains_value_key(&self, key: &Value) -> bool {
        self.get_value(key).is_some()
    }

    fn position(&self, key: &MapKey) -> Option<usize> {
        self.index.get(key).copied().or_else(|| {
            key.numeric_alias()
                .and_then(|alias| self.index.get(&alias).copied())
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order() {
        let map = ValueMap::from_entries([
            (MapKey::from("b"), Value::Int(1)),
            (MapKey::from("a"), Value::Int(2)),
            (MapKey::Int(3), Value::Int(3)),
        ]);
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![MapKey::from("b"), MapKey::from("a"), MapKey::Int(3)]
        );
    }

    #[test]
    fn test_numeric_key_lookup() {
        let map = ValueMap::from_entries([(MapKey::Int(1), Value::string("one"))]);
        assert_eq!(map.get(&MapKey::UInt(1)), Some(&Value::string("one")));
        assert_eq!(map.get_value(&Value::Double(1.0)), Some(&Value::string("one")));
        assert_eq!(map.get_value(&Value::Double(1.5)), None);
        assert!(!map.contains_key(&MapKey::Bool(true)));
    }

    #[test]
    fn test_insert_replaces() {
        let mut map = ValueMap::new();
        assert!(map.insert(MapKey::from("k"), Value::Int(1)).is_none());
        assert_eq!(
            map.insert(MapKey::from("k"), Value::Int(2)),
            Some(Value::Int(1))
        );
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = ValueMap::from_entries([
            (MapKey::from("x"), Value::Int(1)),
            (MapKey::from("y"), Value::Int(2)),
        ]);
        let b = ValueMap::from_entries([
            (MapKey::from("y"), Value::Int(2)),
            (MapKey::from("x"), Value::Int(1)),
        ]);
        assert_eq!(a, b);
    }
}
