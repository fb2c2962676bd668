//! Runtime values for CEL evaluation.
//!
//! `Value` represents all CEL values at runtime, including primitive types,
//! collections, timestamps, durations, host structs and opaque values, and
//! the two special kinds every operation must check first: `Error` and
//! `Unknown`. Both are ordinary values that flow through the evaluator.

mod builder;
mod error;
mod map;
pub(crate) mod number;
mod opaque;
mod structs;
mod time;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub use builder::{ListBuilder, MapBuilder};
pub use error::{EvalError, EvalErrorKind};
pub use map::{MapKey, ValueMap};
pub(crate) use opaque::MutableList;
pub use opaque::OpaqueValue;
pub use structs::{DynamicStruct, DynamicStructBuilder, StructBuilder, StructValue};
pub use time::{Duration, Timestamp};

use crate::attribute::UnknownSet;
use crate::error::EngineError;
use number::{compare_int_double, compare_int_uint, compare_uint_double};

/// A CEL runtime value.
///
/// Large payloads sit behind `Arc`, so cloning a value is cheap and a value
/// can be shared by evaluations running on different threads.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    List(Arc<[Value]>),
    Map(Arc<ValueMap>),
    Timestamp(Timestamp),
    Duration(Duration),
    /// Host message.
    Struct(Arc<dyn StructValue>),
    Enum(EnumValue),
    /// Type value (represents a CEL type at runtime).
    Type(TypeValue),
    Optional(OptionalValue),
    /// Error value (evaluation errors propagate as values).
    Error(Arc<EvalError>),
    /// Result that depends on attributes the caller marked unknown.
    Unknown(Arc<UnknownSet>),
    /// Host-extension value.
    Opaque(Arc<dyn OpaqueValue>),
}

/// The kind of a [`Value`], as used in function descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Wildcard: matches any kind.
    Any,
    Null,
    Bool,
    Int,
    UInt,
    Double,
    String,
    Bytes,
    List,
    Map,
    Timestamp,
    Duration,
    Struct,
    Enum,
    Type,
    Optional,
    Error,
    Unknown,
    Opaque,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Any => "dyn",
            ValueKind::Null => "null_type",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Duration => "duration",
            ValueKind::Struct => "struct",
            ValueKind::Enum => "enum",
            ValueKind::Type => "type",
            ValueKind::Optional => "optional_type",
            ValueKind::Error => "error",
            ValueKind::Unknown => "unknown",
            ValueKind::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A CEL type value (runtime representation of types).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeValue {
    /// The type name as it appears in CEL.
    pub name: Arc<str>,
}

impl TypeValue {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn null_type() -> Self {
        Self::new("null_type")
    }
    pub fn bool_type() -> Self {
        Self::new("bool")
    }
    pub fn int_type() -> Self {
        Self::new("int")
    }
    pub fn uint_type() -> Self {
        Self::new("uint")
    }
    pub fn double_type() -> Self {
        Self::new("double")
    }
    pub fn string_type() -> Self {
        Self::new("string")
    }
    pub fn bytes_type() -> Self {
        Self::new("bytes")
    }
    pub fn list_type() -> Self {
        Self::new("list")
    }
    pub fn map_type() -> Self {
        Self::new("map")
    }
    pub fn timestamp_type() -> Self {
        Self::new("google.protobuf.Timestamp")
    }
    pub fn duration_type() -> Self {
        Self::new("google.protobuf.Duration")
    }
    pub fn type_type() -> Self {
        Self::new("type")
    }
}

/// A constant of a registered enum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: Arc<str>,
    pub value: i64,
}

impl EnumValue {
    pub fn new(type_name: impl Into<Arc<str>>, value: i64) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }
}

/// A CEL optional value.
#[derive(Debug, Clone)]
pub enum OptionalValue {
    /// An absent optional value.
    None,
    /// A present optional value.
    Some(Box<Value>),
}

impl OptionalValue {
    pub fn none() -> Self {
        OptionalValue::None
    }

    pub fn some(value: Value) -> Self {
        OptionalValue::Some(Box::new(value))
    }

    pub fn is_present(&self) -> bool {
        matches!(self, OptionalValue::Some(_))
    }

    /// Get the inner value, or None if absent.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            OptionalValue::None => None,
            OptionalValue::Some(v) => Some(v),
        }
    }

    /// Unwrap the value or return a default.
    pub fn unwrap_or(self, default: Value) -> Value {
        match self {
            OptionalValue::None => default,
            OptionalValue::Some(v) => *v,
        }
    }
}

// ==================== Value Constructors ====================

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn bytes(b: impl Into<Arc<[u8]>>) -> Self {
        Value::Bytes(b.into())
    }

    pub fn list(elements: impl Into<Arc<[Value]>>) -> Self {
        Value::List(elements.into())
    }

    pub fn map(entries: impl IntoIterator<Item = (MapKey, Value)>) -> Self {
        Value::Map(Arc::new(ValueMap::from_entries(entries)))
    }

    pub fn timestamp(seconds: i64, nanos: i32) -> Self {
        Value::Timestamp(Timestamp::new(seconds, nanos))
    }

    pub fn duration(seconds: i64, nanos: i32) -> Self {
        Value::Duration(Duration::new(seconds, nanos))
    }

    pub fn new_type(name: impl Into<Arc<str>>) -> Self {
        Value::Type(TypeValue::new(name))
    }

    pub fn optional_none() -> Self {
        Value::Optional(OptionalValue::None)
    }

    pub fn optional_some(value: Value) -> Self {
        Value::Optional(OptionalValue::some(value))
    }

    pub fn error(err: impl Into<EvalError>) -> Self {
        Value::Error(Arc::new(err.into()))
    }

    pub fn unknown(set: UnknownSet) -> Self {
        Value::Unknown(Arc::new(set))
    }
}

// ==================== Type Information ====================

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::UInt(_) => ValueKind::UInt,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Duration(_) => ValueKind::Duration,
            Value::Struct(_) => ValueKind::Struct,
            Value::Enum(_) => ValueKind::Enum,
            Value::Type(_) => ValueKind::Type,
            Value::Optional(_) => ValueKind::Optional,
            Value::Error(_) => ValueKind::Error,
            Value::Unknown(_) => ValueKind::Unknown,
            Value::Opaque(_) => ValueKind::Opaque,
        }
    }

    /// Name used in error messages. Structs, enums and opaques report their
    /// own type names.
    pub fn type_name(&self) -> String {
        match self {
            Value::Struct(s) => s.type_name().to_string(),
            Value::Enum(e) => e.type_name.to_string(),
            Value::Opaque(o) => o.type_name().to_string(),
            other => other.kind().name().to_string(),
        }
    }

    /// Get the CEL type value for this value (for the `type()` function).
    pub fn type_value(&self) -> TypeValue {
        match self {
            Value::Null => TypeValue::null_type(),
            Value::Bool(_) => TypeValue::bool_type(),
            Value::Int(_) => TypeValue::int_type(),
            Value::UInt(_) => TypeValue::uint_type(),
            Value::Double(_) => TypeValue::double_type(),
            Value::String(_) => TypeValue::string_type(),
            Value::Bytes(_) => TypeValue::bytes_type(),
            Value::List(_) => TypeValue::list_type(),
            Value::Map(_) => TypeValue::map_type(),
            Value::Timestamp(_) => TypeValue::timestamp_type(),
            Value::Duration(_) => TypeValue::duration_type(),
            Value::Type(_) => TypeValue::type_type(),
            Value::Optional(_) => TypeValue::new("optional_type"),
            Value::Struct(s) => TypeValue::new(s.type_name()),
            Value::Enum(e) => TypeValue::new(e.type_name.clone()),
            Value::Opaque(o) => TypeValue::new(o.type_name()),
            Value::Error(_) => TypeValue::new("error"),
            Value::Unknown(_) => TypeValue::new("unknown"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    /// True for the two kinds that strict operations never see.
    pub fn is_error_or_unknown(&self) -> bool {
        matches!(self, Value::Error(_) | Value::Unknown(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for the zero value of the kind (`0`, `""`, `[]`, `false`, ...).
    pub fn is_zero_value(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::UInt(u) => *u == 0,
            Value::Double(d) => *d == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::Timestamp(t) => t.seconds == 0 && t.nanos == 0,
            Value::Duration(d) => d.seconds == 0 && d.nanos == 0,
            Value::Enum(e) => e.value == 0,
            Value::Optional(o) => !o.is_present(),
            Value::Struct(s) => s.field_names().is_empty(),
            Value::Type(_) | Value::Error(_) | Value::Unknown(_) | Value::Opaque(_) => false,
        }
    }
}

// ==================== Value Accessors ====================

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_optional(&self) -> Option<&OptionalValue> {
        match self {
            Value::Optional(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&EvalError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_unknown(&self) -> Option<&UnknownSet> {
        match self {
            Value::Unknown(u) => Some(u),
            _ => None,
        }
    }
}

// ==================== Host Conversions ====================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::List(elements.into())
    }
}

macro_rules! impl_try_from_value {
    ($target:ty, $variant:ident, $name:literal) => {
        impl TryFrom<Value> for $target {
            type Error = EngineError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(EngineError::UnsupportedConversion {
                        from: other.type_name(),
                        to: $name,
                    }),
                }
            }
        }
    };
}

impl_try_from_value!(bool, Bool, "bool");
impl_try_from_value!(i64, Int, "i64");
impl_try_from_value!(u64, UInt, "u64");
impl_try_from_value!(f64, Double, "f64");

impl TryFrom<Value> for String {
    type Error = EngineError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            other => Err(EngineError::UnsupportedConversion {
                from: other.type_name(),
                to: "String",
            }),
        }
    }
}

// ==================== Equality ====================

impl PartialEq for Value {
    /// CEL equality: numbers compare by mathematical value across kinds,
    /// other kinds only equal themselves. Errors never compare equal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(_) | Value::UInt(_) | Value::Double(_), _) => {
                self.compare(other) == Some(Ordering::Equal)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => structs::struct_equals(a.as_ref(), b.as_ref()),
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Optional(a), Value::Optional(b)) => match (a, b) {
                (OptionalValue::None, OptionalValue::None) => true,
                (OptionalValue::Some(va), OptionalValue::Some(vb)) => va == vb,
                _ => false,
            },
            (Value::Unknown(a), Value::Unknown(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a.equals(b.as_ref()),
            _ => false,
        }
    }
}

// ==================== Comparison ====================

impl Value {
    /// Compare two values, returning an ordering if comparable.
    ///
    /// CEL supports comparison between values of the same type, and
    /// between the numeric types (int, uint, double) by exact value.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::UInt(b)) => Some(compare_int_uint(*a, *b)),
            (Value::UInt(a), Value::Int(b)) => Some(compare_int_uint(*b, *a).reverse()),
            (Value::Int(a), Value::Double(b)) => compare_int_double(*a, *b),
            (Value::Double(a), Value::Int(b)) => compare_int_double(*b, *a).map(Ordering::reverse),
            (Value::UInt(a), Value::Double(b)) => compare_uint_double(*a, *b),
            (Value::Double(a), Value::UInt(b)) => {
                compare_uint_double(*b, *a).map(Ordering::reverse)
            }
            _ => None,
        }
    }
}

// ==================== Display ====================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}u", v),
            Value::Double(v) => write!(f, "{}", format_double(*v)),
            Value::String(v) => write!(f, "\"{}\"", v),
            Value::Bytes(v) => write!(f, "b\"{}\"", String::from_utf8_lossy(v)),
            Value::List(v) => {
                write!(f, "[")?;
                for (i, elem) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (key, value)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key.to_value(), value)?;
                }
                write!(f, "}}")
            }
            Value::Timestamp(t) => write!(f, "timestamp(\"{}\")", t),
            Value::Duration(d) => write!(f, "duration(\"{}\")", d),
            Value::Struct(s) => {
                write!(f, "{}{{", s.type_name())?;
                for (i, name) in s.field_names().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match s.field(name) {
                        Some(value) => write!(f, "{}: {}", name, value)?,
                        None => write!(f, "{}: <unset>", name)?,
                    }
                }
                write!(f, "}}")
            }
            Value::Enum(e) => write!(f, "{}({})", e.type_name, e.value),
            Value::Type(t) => write!(f, "type({})", t.name),
            Value::Optional(o) => match o {
                OptionalValue::None => write!(f, "optional.none()"),
                OptionalValue::Some(v) => write!(f, "optional.of({})", v),
            },
            Value::Error(e) => write!(f, "error({})", e),
            Value::Unknown(u) => write!(f, "unknown({})", u),
            Value::Opaque(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

/// Format a double value according to CEL conventions.
pub(crate) fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d.is_sign_positive() {
            "+infinity".to_string()
        } else {
            "-infinity".to_string()
        }
    } else if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{:.1}", d)
    } else {
        d.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Int(42), Value::Int(42));
        assert_ne!(Value::Int(42), Value::Int(43));
        assert_eq!(Value::string("hello"), Value::string("hello"));
        assert_ne!(Value::string("1"), Value::Int(1));
    }

    #[test]
    fn test_numeric_cross_equality() {
        assert_eq!(Value::Int(1), Value::UInt(1));
        assert_eq!(Value::UInt(2), Value::Double(2.0));
        assert_ne!(Value::Int(-1), Value::UInt(u64::MAX));
        assert_ne!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_eq!(
            Value::list(vec![Value::Int(1)]),
            Value::list(vec![Value::Double(1.0)])
        );
    }

    #[test]
    fn test_errors_never_equal() {
        let err = Value::error(EvalError::division_by_zero());
        assert_ne!(err.clone(), err);
    }

    #[test]
    fn test_unknowns_compare_by_set() {
        let a = Value::unknown(UnknownSet::from_attribute(Attribute::new("x")));
        let b = Value::unknown(UnknownSet::from_attribute(Attribute::new("x")));
        let c = Value::unknown(UnknownSet::from_attribute(Attribute::new("y")));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_value_comparison() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Ordering::Less));
        assert_eq!(Value::Int(-1).compare(&Value::UInt(1)), Some(Ordering::Less));
        assert_eq!(
            Value::UInt(1).compare(&Value::Int(-1)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Double(1.5).compare(&Value::Int(1)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::string("a").compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_zero_values() {
        assert!(Value::Int(0).is_zero_value());
        assert!(Value::string("").is_zero_value());
        assert!(Value::list(Vec::new()).is_zero_value());
        assert!(!Value::Bool(true).is_zero_value());
    }

    #[test]
    fn test_try_from() {
        assert_eq!(i64::try_from(Value::Int(7)), Ok(7));
        assert_eq!(String::try_from(Value::string("x")), Ok("x".to_string()));
        assert_eq!(
            bool::try_from(Value::Int(1)),
            Err(EngineError::UnsupportedConversion {
                from: "int".to_string(),
                to: "bool",
            })
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Value::Null), "null");
        assert_eq!(format!("{}", Value::UInt(42)), "42u");
        assert_eq!(format!("{}", Value::Double(2.0)), "2.0");
        assert_eq!(format!("{}", Value::string("hello")), "\"hello\"");
        assert_eq!(
            format!("{}", Value::optional_some(Value::Int(1))),
            "optional.of(1)"
        );
    }
}
