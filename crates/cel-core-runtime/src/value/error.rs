//! Evaluation error values.

use std::fmt;

use cel_core_common::ExprId;

/// An error that occurred during CEL evaluation.
///
/// Errors are values: they are carried by [`Value::Error`] and flow through
/// the evaluator like any other result.
///
/// [`Value::Error`]: super::Value::Error
#[derive(Debug, Clone)]
pub struct EvalError {
    /// The error message.
    pub message: String,
    /// The kind of error.
    pub kind: EvalErrorKind,
    /// Id of the expression node that produced the error, when known.
    pub expr_id: Option<ExprId>,
}

/// The kind of evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Division by zero.
    DivisionByZero,
    /// Modulo by zero.
    ModuloByZero,
    /// Integer overflow.
    Overflow,
    /// Type mismatch at runtime.
    TypeMismatch,
    /// Unknown identifier (variable not found).
    UnknownIdentifier,
    /// Index out of bounds.
    IndexOutOfBounds,
    /// Key not found in map.
    NoSuchKey,
    /// Field not present on a struct.
    NoSuchField,
    /// Invalid argument.
    InvalidArgument,
    /// No matching overload found.
    NoMatchingOverload,
    /// More than one overload matched.
    AmbiguousOverload,
    /// Invalid conversion.
    InvalidConversion,
    /// The attribute was declared missing by the activation.
    MissingAttribute,
    /// Timestamp or duration out of range.
    Range,
    /// A comprehension ran past its iteration limit.
    IterationBudgetExceeded,
    /// Error raised by a host-provided function.
    Custom,
}

impl EvalError {
    /// Create a new error with the given kind and message.
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            expr_id: None,
        }
    }

    /// Attribute this error to an expression node.
    pub fn at(mut self, expr_id: ExprId) -> Self {
        self.expr_id = Some(expr_id);
        self
    }

    pub fn division_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "division by zero")
    }

    pub fn modulo_by_zero() -> Self {
        Self::new(EvalErrorKind::ModuloByZero, "modulo by zero")
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Overflow, message)
    }

    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::new(
            EvalErrorKind::TypeMismatch,
            format!("expected {}, got {}", expected, actual),
        )
    }

    pub fn unknown_identifier(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownIdentifier,
            format!("undeclared reference to '{}'", name),
        )
    }

    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            EvalErrorKind::IndexOutOfBounds,
            format!("index {} out of bounds for length {}", index, len),
        )
    }

    pub fn no_such_key(key: &str) -> Self {
        Self::new(EvalErrorKind::NoSuchKey, format!("no such key: {}", key))
    }

    pub fn no_such_field(field: &str) -> Self {
        Self::new(EvalErrorKind::NoSuchField, format!("no such field: {}", field))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::InvalidArgument, message)
    }

    pub fn no_matching_overload(func: &str) -> Self {
        Self::new(
            EvalErrorKind::NoMatchingOverload,
            format!("no matching overload for function: {}", func),
        )
    }

    pub fn ambiguous_overload(func: &str) -> Self {
        Self::new(
            EvalErrorKind::AmbiguousOverload,
            format!("ambiguous overloads for function: {}", func),
        )
    }

    pub fn invalid_conversion(from: &str, to: &str) -> Self {
        Self::new(
            EvalErrorKind::InvalidConversion,
            format!("cannot convert {} to {}", from, to),
        )
    }

    /// Create an error for an attribute the activation declared missing.
    pub fn missing_attribute(attribute: &str) -> Self {
        Self::new(
            EvalErrorKind::MissingAttribute,
            format!("missing attribute: {}", attribute),
        )
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Range, message)
    }

    pub fn iteration_budget_exceeded(limit: usize) -> Self {
        Self::new(
            EvalErrorKind::IterationBudgetExceeded,
            format!("comprehension exceeded the iteration limit of {}", limit),
        )
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

impl From<&str> for EvalError {
    fn from(s: &str) -> Self {
        Self::new(EvalErrorKind::Custom, s)
    }
}

impl From<String> for EvalError {
    fn from(s: String) -> Self {
        Self::new(EvalErrorKind::Custom, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let err = EvalError::no_matching_overload("_+_");
        assert_eq!(err.kind, EvalErrorKind::NoMatchingOverload);
        assert_eq!(err.to_string(), "no matching overload for function: _+_");

        let err = EvalError::missing_attribute("a.b").at(7);
        assert_eq!(err.kind, EvalErrorKind::MissingAttribute);
        assert_eq!(err.expr_id, Some(7));
    }

    #[test]
    fn test_from_string_is_custom() {
        let err: EvalError = "boom".into();
        assert_eq!(err.kind, EvalErrorKind::Custom);
        assert_eq!(err.to_string(), "boom");
    }
}
