//! Logical negation, membership and size.

use std::sync::Arc;

use super::{binary, member, unary};
use crate::functions::{FunctionDescriptor, Overload};
use crate::value::{EvalError, Value, ValueKind as K};
use cel_core_common::operators;

pub(super) fn register(out: &mut Vec<Overload>) {
    unary(out, operators::LOGICAL_NOT, "logical_not", K::Bool, logical_not);

    out.push(Overload::new(
        "not_strictly_false",
        FunctionDescriptor::new(operators::NOT_STRICTLY_FALSE, false, vec![K::Any]).non_strict(),
        Arc::new(|args: &[Value]| match args {
            [Value::Bool(b)] => Value::Bool(*b),
            [_] => Value::Bool(true),
            _ => Value::error(EvalError::no_matching_overload(operators::NOT_STRICTLY_FALSE)),
        }),
    ));

    binary(out, operators::IN, "in", K::Any, K::List, in_list);
    binary(out, operators::IN, "in", K::Any, K::Map, in_map);

    for kind in [K::String, K::Bytes, K::List, K::Map] {
        unary(out, "size", "size", kind, size);
        member(out, "size", "size_member", vec![kind], |args| match args {
            [v] => size(v),
            _ => Value::error(EvalError::no_matching_overload("size")),
        });
    }
}

fn logical_not(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(!b),
        _ => Value::error(EvalError::no_matching_overload(operators::LOGICAL_NOT)),
    }
}

fn in_list(element: &Value, list: &Value) -> Value {
    match list {
        Value::List(items) => Value::Bool(items.iter().any(|item| item == element)),
        _ => Value::error(EvalError::no_matching_overload(operators::IN)),
    }
}

/// Key membership. A key of a kind maps cannot hold is simply absent.
fn in_map(key: &Value, map: &Value) -> Value {
    match map {
        Value::Map(m) => Value::Bool(m.contains_value_key(key)),
        _ => Value::error(EvalError::no_matching_overload(operators::IN)),
    }
}

fn size(value: &Value) -> Value {
    let len = match value {
        Value::String(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(l) => l.len(),
        Value::Map(m) => m.len(),
        _ => return Value::error(EvalError::no_matching_overload("size")),
    };
    i64::try_from(len)
        .map(Value::Int)
        .unwrap_or_else(|_| Value::error(EvalError::overflow("size exceeds int range")))
}
