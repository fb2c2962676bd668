//! Opaque host-extension values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Value;

/// A value whose representation only the host understands.
pub trait OpaqueValue: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    fn equals(&self, _other: &dyn OpaqueValue) -> bool {
        false
    }
}

/// Accumulator for list-building comprehensions.
///
/// `map` and `filter` append one element per iteration. Appending in place
/// avoids copying the whole list each time. The list only ever lives in a
/// comprehension's accumulator slot and is frozen into a plain list by the
/// comprehension's finish step.
#[derive(Debug, Default)]
pub(crate) struct MutableList {
    elements: Mutex<Vec<Value>>,
}

impl MutableList {
    pub(crate) fn new_value() -> Value {
        Value::Opaque(Arc::new(MutableList::default()))
    }

    pub(crate) fn append(&self, values: &[Value]) {
        self.elements.lock().extend(values.iter().cloned());
    }

    /// Take the collected elements as an immutable list.
    pub(crate) fn freeze(&self) -> Value {
        let elements = std::mem::take(&mut *self.elements.lock());
        Value::List(elements.into())
    }
}

impl OpaqueValue for MutableList {
    fn type_name(&self) -> &str {
        "cel.MutableList"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Value {
    pub(crate) fn as_mutable_list(&self) -> Option<&MutableList> {
        match self {
            Value::Opaque(o) => o.as_any().downcast_ref::<MutableList>(),
            _ => None,
        }
    }
}
