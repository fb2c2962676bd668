//! Append-only builders for list and map values.
//!
//! A builder is owned by the code constructing the container and is
//! consumed by `build`, so no caller can observe or mutate the value after
//! it is frozen.

use std::sync::Arc;

use super::{EvalError, MapKey, Value, ValueMap};

/// Builds a [`Value::List`].
#[derive(Debug, Default)]
pub struct ListBuilder {
    elements: Vec<Value>,
}

impl ListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        self.elements.reserve(additional);
    }

    pub fn add(&mut self, value: Value) {
        self.elements.push(value);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn build(self) -> Value {
        Value::List(Arc::from(self.elements))
    }
}

/// Builds a [`Value::Map`], rejecting duplicate and unsupported keys.
#[derive(Debug, Default)]
pub struct MapBuilder {
    map: ValueMap,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: ValueMap::with_capacity(capacity),
        }
    }

    /// Insert an entry. Fails if the key kind cannot be a map key, or if an
    /// equal key (numerically equal, across integer kinds) is already present.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), EvalError> {
        let map_key = MapKey::from_value(&key).ok_or_else(|| {
            EvalError::invalid_argument(format!("unsupported key type: {}", key.kind().name()))
        })?;
        if self.map.contains_key(&map_key) {
            return Err(EvalError::invalid_argument(format!(
                "duplicate map key: {}",
                key
            )));
        }
        self.map.insert(map_key, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn build(self) -> Value {
        Value::Map(Arc::new(self.map))
    }
}
