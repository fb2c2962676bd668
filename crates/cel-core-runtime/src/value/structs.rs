//! Struct (message) values supplied by the host.
//!
//! The engine only sees structs through [`StructValue`]: field access by
//! name, where an absent field is distinct from a field holding `null`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{EvalError, Value};

/// A host message exposed to expressions.
pub trait StructValue: fmt::Debug + Send + Sync {
    /// Fully qualified type name.
    fn type_name(&self) -> &str;

    /// Field value, or `None` when the field is not present.
    fn field(&self, name: &str) -> Option<Value>;

    /// Presence test used by `has()`.
    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Names of the fields that are present.
    fn field_names(&self) -> Vec<String>;
}

/// Constructs a struct value field by field.
pub trait StructBuilder: Send {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), EvalError>;

    fn build(self: Box<Self>) -> Value;
}

pub(crate) fn struct_equals(a: &dyn StructValue, b: &dyn StructValue) -> bool {
    if a.type_name() != b.type_name() {
        return false;
    }
    let names = a.field_names();
    names.len() == b.field_names().len()
        && names
            .iter()
            .all(|name| match (a.field(name), b.field(name)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            })
}

/// A struct stored as a name-to-value table.
///
/// This is what the default builder of a registered struct type produces.
#[derive(Debug, Clone)]
pub struct DynamicStruct {
    type_name: Arc<str>,
    fields: BTreeMap<Arc<str>, Value>,
}

impl DynamicStruct {
    pub fn new(type_name: impl Into<Arc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<Arc<str>>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn into_value(self) -> Value {
        Value::Struct(Arc::new(self))
    }
}

impl StructValue for DynamicStruct {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.keys().map(|k| k.to_string()).collect()
    }
}

/// Builder for [`DynamicStruct`].
#[derive(Debug)]
pub struct DynamicStructBuilder {
    value: DynamicStruct,
}

impl DynamicStructBuilder {
    pub fn new(type_name: impl Into<Arc<str>>) -> Self {
        Self {
            value: DynamicStruct::new(type_name),
        }
    }
}

impl StructBuilder for DynamicStructBuilder {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        if self.value.fields.contains_key(name) {
            return Err(EvalError::invalid_argument(format!(
                "field '{}' set more than once",
                name
            )));
        }
        self.value.fields.insert(Arc::from(name), value);
        Ok(())
    }

    fn build(self: Box<Self>) -> Value {
        self.value.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let mut builder: Box<dyn StructBuilder> = Box::new(DynamicStructBuilder::new("acme.User"));
        builder.set_field("age", Value::Int(30)).unwrap();
        builder.set_field("nickname", Value::Null).unwrap();
        assert!(builder.set_field("age", Value::Int(31)).is_err());

        let value = builder.build();
        let Value::Struct(s) = &value else {
            panic!("expected struct, got {:?}", value);
        };
        assert_eq!(s.type_name(), "acme.User");
        assert_eq!(s.field("age"), Some(Value::Int(30)));
        // Present but null is not the same as absent.
        assert_eq!(s.field("nickname"), Some(Value::Null));
        assert_eq!(s.field("email"), None);
    }

    #[test]
    fn test_struct_equality() {
        let a = DynamicStruct::new("T").with_field("x", Value::Int(1));
        let b = DynamicStruct::new("T").with_field("x", Value::UInt(1));
        let c = DynamicStruct::new("U").with_field("x", Value::Int(1));
        assert!(struct_equals(&a, &b));
        assert!(!struct_equals(&a, &c));
    }
}
