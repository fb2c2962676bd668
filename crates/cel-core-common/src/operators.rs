//! Function names used for CEL operators after parsing.
//!
//! The parser lowers every operator to a call with one of these names, so
//! the runtime sees `a + b` as `_+_(a, b)`.

pub const LOGICAL_AND: &str = "_&&_";
pub const LOGICAL_OR: &str = "_||_";
pub const LOGICAL_NOT: &str = "!_";
pub const CONDITIONAL: &str = "_?_:_";
pub const NOT_STRICTLY_FALSE: &str = "@not_strictly_false";

pub const EQUALS: &str = "_==_";
pub const NOT_EQUALS: &str = "_!=_";
pub const LESS: &str = "_<_";
pub const LESS_EQUALS: &str = "_<=_";
pub const GREATER: &str = "_>_";
pub const GREATER_EQUALS: &str = "_>=_";

pub const ADD: &str = "_+_";
pub const SUBTRACT: &str = "_-_";
pub const MULTIPLY: &str = "_*_";
pub const DIVIDE: &str = "_/_";
pub const MODULO: &str = "_%_";
pub const NEGATE: &str = "-_";

pub const INDEX: &str = "_[_]";
pub const OPTIONAL_INDEX: &str = "_[?_]";
pub const IN: &str = "@in";

/// Name of the local binding macro.
pub const BIND: &str = "cel.bind";

/// Accumulator variable name used by the standard macro expansions.
pub const ACCUMULATOR_VAR: &str = "@result";

/// Placeholder iteration variable used by the `cel.bind` expansion.
pub const UNUSED_ITER_VAR: &str = "#unused";

/// Returns true for the operators whose evaluation may skip an operand.
pub fn is_short_circuit_function(function: &str) -> bool {
    matches!(function, LOGICAL_AND | LOGICAL_OR | CONDITIONAL)
}

/// Returns true for the container index operators.
pub fn is_index_function(function: &str) -> bool {
    matches!(function, INDEX | OPTIONAL_INDEX)
}
