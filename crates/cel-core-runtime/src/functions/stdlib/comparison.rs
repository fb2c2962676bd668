//! Equality and ordering operators.

use std::cmp::Ordering;

use super::binary;
use crate::functions::Overload;
use crate::value::{EvalError, Value, ValueKind as K};
use cel_core_common::operators;

const ORDERED_KINDS: [K; 8] = [
    K::Bool,
    K::Int,
    K::UInt,
    K::Double,
    K::String,
    K::Bytes,
    K::Timestamp,
    K::Duration,
];

const NUMERIC_KINDS: [K; 3] = [K::Int, K::UInt, K::Double];

pub(super) fn register(out: &mut Vec<Overload>) {
    binary(out, operators::EQUALS, "equals", K::Any, K::Any, equals);
    binary(out, operators::NOT_EQUALS, "not_equals", K::Any, K::Any, not_equals);

    let mut pairs: Vec<(K, K)> = ORDERED_KINDS.iter().map(|k| (*k, *k)).collect();
    for lhs in NUMERIC_KINDS {
        for rhs in NUMERIC_KINDS {
            if lhs != rhs {
                pairs.push((lhs, rhs));
            }
        }
    }
    for (lhs, rhs) in pairs {
        binary(out, operators::LESS, "less", lhs, rhs, less);
        binary(out, operators::LESS_EQUALS, "less_equals", lhs, rhs, less_equals);
        binary(out, operators::GREATER, "greater", lhs, rhs, greater);
        binary(out, operators::GREATER_EQUALS, "greater_equals", lhs, rhs, greater_equals);
    }
}

fn equals(left: &Value, right: &Value) -> Value {
    Value::Bool(left == right)
}

fn not_equals(left: &Value, right: &Value) -> Value {
    Value::Bool(left != right)
}

/// Apply `test` to the ordering of the operands. NaN orders against
/// nothing, so every relation involving it is false.
fn relation(
    function: &str,
    left: &Value,
    right: &Value,
    test: fn(Ordering) -> bool,
) -> Value {
    match left.compare(right) {
        Some(ordering) => Value::Bool(test(ordering)),
        None if is_numeric(left) && is_numeric(right) => Value::Bool(false),
        None => Value::error(EvalError::no_matching_overload(function)),
    }
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::UInt(_) | Value::Double(_))
}

fn less(left: &Value, right: &Value) -> Value {
    relation(operators::LESS, left, right, Ordering::is_lt)
}

fn less_equals(left: &Value, right: &Value) -> Value {
    relation(operators::LESS_EQUALS, left, right, Ordering::is_le)
}

fn greater(left: &Value, right: &Value) -> Value {
    relation(operators::GREATER, left, right, Ordering::is_gt)
}

fn greater_equals(left: &Value, right: &Value) -> Value {
    relation(operators::GREATER_EQUALS, left, right, Ordering::is_ge)
}
