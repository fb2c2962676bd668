//! Registry of host struct types, enum types and type identifiers.
//!
//! The registry is built once, wrapped in an `Arc` by the planner, and never
//! mutated afterwards. Planning consults it to resolve struct literals and to
//! fold qualified constant names (`Color.RED`, `int`) into constants.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::value::{DynamicStructBuilder, EnumValue, StructBuilder, TypeValue, Value};

/// Produces a fresh builder for one struct literal.
pub type StructBuilderFactory = Arc<dyn Fn() -> Box<dyn StructBuilder> + Send + Sync>;

/// A host message type that struct literals can construct.
#[derive(Clone)]
pub struct StructType {
    name: Arc<str>,
    fields: Vec<String>,
    factory: StructBuilderFactory,
}

impl StructType {
    /// A type whose instances are [`DynamicStruct`](crate::value::DynamicStruct)s.
    pub fn new(name: impl Into<Arc<str>>, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let name: Arc<str> = name.into();
        let type_name = name.clone();
        Self {
            name,
            fields: fields.into_iter().map(Into::into).collect(),
            factory: Arc::new(move || {
                Box::new(DynamicStructBuilder::new(type_name.clone())) as Box<dyn StructBuilder>
            }),
        }
    }

    /// Replace the builder factory with a host-provided one.
    pub fn with_factory(mut self, factory: StructBuilderFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn new_builder(&self) -> Box<dyn StructBuilder> {
        (self.factory)()
    }
}

impl fmt::Debug for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// An enum type and its named constants.
#[derive(Debug, Clone)]
pub struct EnumType {
    name: Arc<str>,
    constants: Vec<(String, i64)>,
}

impl EnumType {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            constants: Vec::new(),
        }
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: i64) -> Self {
        self.constants.push((name.into(), value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constants(&self) -> &[(String, i64)] {
        &self.constants
    }
}

/// Types known to the planner.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    structs: FxHashMap<String, StructType>,
    constants: FxHashMap<String, Value>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry holding only the builtin type identifiers.
    pub fn new() -> Self {
        let mut constants = FxHashMap::default();
        for ty in [
            TypeValue::null_type(),
            TypeValue::bool_type(),
            TypeValue::int_type(),
            TypeValue::uint_type(),
            TypeValue::double_type(),
            TypeValue::string_type(),
            TypeValue::bytes_type(),
            TypeValue::list_type(),
            TypeValue::map_type(),
            TypeValue::type_type(),
            TypeValue::timestamp_type(),
            TypeValue::duration_type(),
        ] {
            constants.insert(ty.name.to_string(), Value::Type(ty));
        }
        Self {
            structs: FxHashMap::default(),
            constants,
        }
    }

    /// Register a struct type. Its name also becomes a type identifier.
    pub fn with_struct(mut self, struct_type: StructType) -> Self {
        self.constants.insert(
            struct_type.name().to_string(),
            Value::new_type(struct_type.name.clone()),
        );
        self.structs
            .insert(struct_type.name().to_string(), struct_type);
        self
    }

    /// Register an enum type and its qualified constants.
    pub fn with_enum(mut self, enum_type: EnumType) -> Self {
        self.constants.insert(
            enum_type.name().to_string(),
            Value::new_type(enum_type.name.clone()),
        );
        for (constant, value) in enum_type.constants() {
            self.constants.insert(
                format!("{}.{}", enum_type.name(), constant),
                Value::Enum(EnumValue::new(enum_type.name.clone(), *value)),
            );
        }
        self
    }

    pub fn find_struct(&self, name: &str) -> Option<&StructType> {
        self.structs.get(name)
    }

    /// Resolve a (possibly dotted) name to a constant value.
    pub fn find_constant(&self, qualified_name: &str) -> Option<Value> {
        self.constants.get(qualified_name).cloned()
    }
}
