//! Function descriptors and overloads.

use std::fmt;
use std::sync::Arc;

use crate::value::{Value, ValueKind};

/// A function implementation that takes arguments and returns a value.
///
/// The implementation receives a slice of already-evaluated argument values
/// (including the receiver for member functions as the first argument).
pub type FunctionImpl = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// The identity of one overload: name, call style, argument kinds and
/// strictness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    name: String,
    receiver_style: bool,
    arg_kinds: Vec<ValueKind>,
    strict: bool,
}

impl FunctionDescriptor {
    /// A strict descriptor. For receiver-style functions the receiver is the
    /// first entry of `arg_kinds`.
    pub fn new(name: impl Into<String>, receiver_style: bool, arg_kinds: Vec<ValueKind>) -> Self {
        Self {
            name: name.into(),
            receiver_style,
            arg_kinds,
            strict: true,
        }
    }

    /// Mark the function as non-strict: it receives `Error` and `Unknown`
    /// arguments as-is.
    pub fn non_strict(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn receiver_style(&self) -> bool {
        self.receiver_style
    }

    pub fn arg_kinds(&self) -> &[ValueKind] {
        &self.arg_kinds
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn arity(&self) -> usize {
        self.arg_kinds.len()
    }

    /// True if both descriptors have the same call style and argument kinds.
    /// Name and strictness are not part of the shape.
    pub fn same_shape(&self, other: &FunctionDescriptor) -> bool {
        self.receiver_style == other.receiver_style && self.arg_kinds == other.arg_kinds
    }

    /// True if the arity matches and every argument's kind matches the
    /// declared kind at its position. `Any` matches every kind.
    pub fn match_arguments(&self, args: &[Value]) -> bool {
        args.len() == self.arg_kinds.len()
            && self
                .arg_kinds
                .iter()
                .zip(args)
                .all(|(kind, arg)| *kind == ValueKind::Any || *kind == arg.kind())
    }
}

/// A function overload with its implementation.
#[derive(Clone)]
pub struct Overload {
    /// The overload ID (e.g., "add_int64_int64").
    pub id: String,
    pub descriptor: FunctionDescriptor,
    /// The implementation function.
    pub implementation: FunctionImpl,
}

impl Overload {
    pub fn new(
        id: impl Into<String>,
        descriptor: FunctionDescriptor,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            id: id.into(),
            descriptor,
            implementation,
        }
    }

    /// Shorthand for a strict global function.
    pub fn global<F>(id: impl Into<String>, name: &str, arg_kinds: Vec<ValueKind>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self::new(id, FunctionDescriptor::new(name, false, arg_kinds), Arc::new(f))
    }

    /// Shorthand for a strict receiver-style function.
    pub fn member<F>(id: impl Into<String>, name: &str, arg_kinds: Vec<ValueKind>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self::new(id, FunctionDescriptor::new(name, true, arg_kinds), Arc::new(f))
    }

    /// Call this overload with the given arguments.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.implementation)(args)
    }
}

impl fmt::Debug for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overload")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}
