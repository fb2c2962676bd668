//! Arithmetic operators.

use std::sync::Arc;

use super::{binary, unary};
use crate::functions::Overload;
use crate::value::{EvalError, Value, ValueKind as K};
use cel_core_common::operators;

pub(super) fn register(out: &mut Vec<Overload>) {
    for (lhs, rhs) in [
        (K::Int, K::Int),
        (K::UInt, K::UInt),
        (K::Double, K::Double),
        (K::String, K::String),
        (K::Bytes, K::Bytes),
        (K::List, K::List),
        (K::Timestamp, K::Duration),
        (K::Duration, K::Timestamp),
        (K::Duration, K::Duration),
    ] {
        binary(out, operators::ADD, "add", lhs, rhs, add);
    }
    binary(out, operators::ADD, "add", K::Opaque, K::List, append_in_place);

    for (lhs, rhs) in [
        (K::Int, K::Int),
        (K::UInt, K::UInt),
        (K::Double, K::Double),
        (K::Timestamp, K::Timestamp),
        (K::Timestamp, K::Duration),
        (K::Duration, K::Duration),
    ] {
        binary(out, operators::SUBTRACT, "subtract", lhs, rhs, subtract);
    }

    for kind in [K::Int, K::UInt, K::Double] {
        binary(out, operators::MULTIPLY, "multiply", kind, kind, multiply);
        binary(out, operators::DIVIDE, "divide", kind, kind, divide);
    }
    for kind in [K::Int, K::UInt] {
        binary(out, operators::MODULO, "modulo", kind, kind, modulo);
    }
    for kind in [K::Int, K::Double, K::Duration] {
        unary(out, operators::NEGATE, "negate", kind, negate);
    }
}

fn timestamp_range_error() -> Value {
    Value::error(EvalError::range_error(
        "timestamp out of range: must be between year 0001 and 9999",
    ))
}

fn duration_range_error() -> Value {
    Value::error(EvalError::range_error(
        "duration out of range: must be within approximately 10000 years",
    ))
}

fn add(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .unwrap_or_else(|| Value::error(EvalError::overflow("integer addition overflow"))),
        (Value::UInt(a), Value::UInt(b)) => a
            .checked_add(*b)
            .map(Value::UInt)
            .unwrap_or_else(|| Value::error(EvalError::overflow("unsigned addition overflow"))),
        (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
        (Value::String(a), Value::String(b)) => {
            let mut result = String::with_capacity(a.len() + b.len());
            result.push_str(a);
            result.push_str(b);
            Value::String(Arc::from(result))
        }
        (Value::Bytes(a), Value::Bytes(b)) => {
            let mut result = Vec::with_capacity(a.len() + b.len());
            result.extend_from_slice(a);
            result.extend_from_slice(b);
            Value::Bytes(Arc::from(result))
        }
        (Value::List(a), Value::List(b)) => {
            let mut result = Vec::with_capacity(a.len() + b.len());
            result.extend(a.iter().cloned());
            result.extend(b.iter().cloned());
            Value::List(Arc::from(result))
        }
        (Value::Timestamp(t), Value::Duration(d)) | (Value::Duration(d), Value::Timestamp(t)) => t
            .checked_add(d)
            .map(Value::Timestamp)
            .unwrap_or_else(timestamp_range_error),
        (Value::Duration(a), Value::Duration(b)) => a
            .checked_add(b)
            .map(Value::Duration)
            .unwrap_or_else(duration_range_error),
        _ => Value::error(EvalError::no_matching_overload(operators::ADD)),
    }
}

/// `accumulator + [elements]` where the accumulator is a comprehension's
/// mutable list: appends and hands back the same list.
fn append_in_place(left: &Value, right: &Value) -> Value {
    match (left.as_mutable_list(), right) {
        (Some(list), Value::List(elements)) => {
            list.append(elements);
            left.clone()
        }
        _ => Value::error(EvalError::no_matching_overload(operators::ADD)),
    }
}

fn subtract(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.checked_sub(*b).map(Value::Int).unwrap_or_else(|| {
            Value::error(EvalError::overflow("integer subtraction overflow"))
        }),
        (Value::UInt(a), Value::UInt(b)) => a.checked_sub(*b).map(Value::UInt).unwrap_or_else(
            || Value::error(EvalError::overflow("unsigned subtraction overflow")),
        ),
        (Value::Double(a), Value::Double(b)) => Value::Double(a - b),
        (Value::Timestamp(a), Value::Timestamp(b)) => a
            .checked_diff(b)
            .map(Value::Duration)
            .unwrap_or_else(duration_range_error),
        (Value::Timestamp(t), Value::Duration(d)) => t
            .checked_sub(d)
            .map(Value::Timestamp)
            .unwrap_or_else(timestamp_range_error),
        (Value::Duration(a), Value::Duration(b)) => a
            .checked_sub(b)
            .map(Value::Duration)
            .unwrap_or_else(duration_range_error),
        _ => Value::error(EvalError::no_matching_overload(operators::SUBTRACT)),
    }
}

fn multiply(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.checked_mul(*b).map(Value::Int).unwrap_or_else(|| {
            Value::error(EvalError::overflow("integer multiplication overflow"))
        }),
        (Value::UInt(a), Value::UInt(b)) => a.checked_mul(*b).map(Value::UInt).unwrap_or_else(
            || Value::error(EvalError::overflow("unsigned multiplication overflow")),
        ),
        (Value::Double(a), Value::Double(b)) => Value::Double(a * b),
        _ => Value::error(EvalError::no_matching_overload(operators::MULTIPLY)),
    }
}

fn divide(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Value::error(EvalError::division_by_zero()),
        (Value::Int(a), Value::Int(b)) => a
            .checked_div(*b)
            .map(Value::Int)
            .unwrap_or_else(|| Value::error(EvalError::overflow("integer division overflow"))),
        (Value::UInt(_), Value::UInt(0)) => Value::error(EvalError::division_by_zero()),
        (Value::UInt(a), Value::UInt(b)) => Value::UInt(a / b),
        (Value::Double(a), Value::Double(b)) => Value::Double(a / b),
        _ => Value::error(EvalError::no_matching_overload(operators::DIVIDE)),
    }
}

fn modulo(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Value::error(EvalError::modulo_by_zero()),
        (Value::Int(a), Value::Int(b)) => a
            .checked_rem(*b)
            .map(Value::Int)
            .unwrap_or_else(|| Value::error(EvalError::overflow("integer modulo overflow"))),
        (Value::UInt(_), Value::UInt(0)) => Value::error(EvalError::modulo_by_zero()),
        (Value::UInt(a), Value::UInt(b)) => Value::UInt(a % b),
        _ => Value::error(EvalError::no_matching_overload(operators::MODULO)),
    }
}

fn negate(value: &Value) -> Value {
    match value {
        Value::Int(i) => i
            .checked_neg()
            .map(Value::Int)
            .unwrap_or_else(|| Value::error(EvalError::overflow("integer negation overflow"))),
        Value::Double(d) => Value::Double(-d),
        Value::Duration(d) => d
            .checked_neg()
            .map(Value::Duration)
            .unwrap_or_else(duration_range_error),
        _ => Value::error(EvalError::no_matching_overload(operators::NEGATE)),
    }
}
