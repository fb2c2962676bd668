//! Engine and planning error types.
//!
//! These are the hard-failure universes. Expression-level failures such as
//! division by zero never show up here; they travel as [`Value::Error`]
//! values instead.
//!
//! [`Value::Error`]: crate::Value::Error

use cel_core_common::ExprId;
use thiserror::Error;

/// A malformed plan or an internal invariant violation detected while
/// evaluating. Evaluation aborts as soon as one is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A step needed more values than the stack holds.
    #[error("value stack underflow: needed {needed}, found {available}")]
    StackUnderflow { needed: usize, available: usize },

    /// Evaluation finished with something other than exactly one value.
    #[error("value stack holds {size} values at end of evaluation, expected 1")]
    StackImbalance { size: usize },

    /// A slot index outside the plan's slot table.
    #[error("slot index {index} out of range for {count} slots")]
    InvalidSlot { index: usize, count: usize },

    /// A slot was read before anything was assigned to it.
    #[error("slot {index} read before assignment")]
    EmptySlot { index: usize },

    /// A jump left the bounds of its step sequence.
    #[error("jump from step {step} to {target} leaves a sequence of {len} steps")]
    InvalidJump {
        step: usize,
        target: isize,
        len: usize,
    },

    /// A list construction step declared a size that cannot be satisfied.
    #[error("invalid list size {size}")]
    InvalidListSize { size: i64 },

    /// A call into a subexpression that the plan does not contain.
    #[error("subexpression {index} does not exist")]
    InvalidSubexpression { index: usize },

    /// A comprehension step ran outside of any comprehension.
    #[error("comprehension step executed without an iteration context")]
    MissingIterationContext,

    /// A value could not be converted to the requested host type.
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion { from: String, to: &'static str },
}

/// Errors raised while turning an expression tree into a [`Program`].
///
/// [`Program`]: crate::Program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A call site whose name, call style and arity match no registered
    /// overload.
    #[error("expr {expr_id}: no overloads registered for '{function}' with {arity} argument(s)")]
    NoOverloads {
        expr_id: ExprId,
        function: String,
        arity: usize,
    },

    /// A struct literal names a type the registry does not know.
    #[error("expr {expr_id}: unknown struct type '{type_name}'")]
    UnknownStructType { expr_id: ExprId, type_name: String },

    /// A struct literal sets a field its type does not declare.
    #[error("expr {expr_id}: struct type '{type_name}' has no field '{field}'")]
    NoSuchField {
        expr_id: ExprId,
        type_name: String,
        field: String,
    },

    /// Jump validation found a target outside of its step sequence.
    #[error("step {step} jumps to {target}, outside of a sequence of {len} steps")]
    InvalidJump {
        step: usize,
        target: isize,
        len: usize,
    },

    /// The tree contains a node that cannot be planned.
    #[error("expr {expr_id}: {message}")]
    InvalidExpression { expr_id: ExprId, message: String },

    /// An overload with the same shape is already registered.
    #[error("overload '{overload_id}' conflicts with an existing overload of '{function}'")]
    OverloadConflict {
        function: String,
        overload_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::StackUnderflow {
            needed: 2,
            available: 1,
        };
        assert_eq!(err.to_string(), "value stack underflow: needed 2, found 1");
        assert_eq!(
            EngineError::InvalidListSize { size: -1 }.to_string(),
            "invalid list size -1"
        );
    }

    #[test]
    fn test_plan_error_display() {
        let err = PlanError::NoOverloads {
            expr_id: 4,
            function: "frobnicate".to_string(),
            arity: 2,
        };
        assert_eq!(
            err.to_string(),
            "expr 4: no overloads registered for 'frobnicate' with 2 argument(s)"
        );
    }
}
