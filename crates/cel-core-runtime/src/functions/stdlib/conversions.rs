//! Type conversion functions: `int`, `uint`, `double`, `string`, `bytes`,
//! `bool`, `timestamp`, `duration`, `type` and `dyn`.

use std::sync::Arc;

use super::unary;
use crate::functions::Overload;
use crate::value::{format_double, EvalError, Timestamp, Value, ValueKind as K};

/// 2^63 as a double: the first value past the `i64` range.
const INT_LIMIT: f64 = 9_223_372_036_854_775_808.0;
/// 2^64 as a double: the first value past the `u64` range.
const UINT_LIMIT: f64 = 18_446_744_073_709_551_616.0;

pub(super) fn register(out: &mut Vec<Overload>) {
    for kind in [K::Int, K::UInt, K::Double, K::String, K::Timestamp, K::Enum] {
        unary(out, "int", "int", kind, convert_to_int);
    }
    for kind in [K::UInt, K::Int, K::Double, K::String] {
        unary(out, "uint", "uint", kind, convert_to_uint);
    }
    for kind in [K::Double, K::Int, K::UInt, K::String] {
        unary(out, "double", "double", kind, convert_to_double);
    }
    for kind in [
        K::String,
        K::Int,
        K::UInt,
        K::Double,
        K::Bool,
        K::Bytes,
        K::Timestamp,
        K::Duration,
    ] {
        unary(out, "string", "string", kind, convert_to_string);
    }
    for kind in [K::Bytes, K::String] {
        unary(out, "bytes", "bytes", kind, convert_to_bytes);
    }
    for kind in [K::Bool, K::String] {
        unary(out, "bool", "bool", kind, convert_to_bool);
    }
    for kind in [K::Timestamp, K::String, K::Int] {
        unary(out, "timestamp", "timestamp", kind, convert_to_timestamp);
    }
    for kind in [K::Duration, K::String] {
        unary(out, "duration", "duration", kind, convert_to_duration);
    }
    unary(out, "type", "type", K::Any, |v| Value::Type(v.type_value()));
    unary(out, "dyn", "dyn", K::Any, Value::clone);
}

fn convert_to_int(value: &Value) -> Value {
    match value {
        Value::Int(i) => Value::Int(*i),
        Value::UInt(u) => i64::try_from(*u)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::error(EvalError::range_error("uint to int overflow"))),
        Value::Double(d) => {
            let truncated = d.trunc();
            if truncated.is_finite() && (-INT_LIMIT..INT_LIMIT).contains(&truncated) {
                Value::Int(truncated as i64)
            } else {
                Value::error(EvalError::range_error("double to int overflow"))
            }
        }
        Value::String(s) => s
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::error(EvalError::invalid_conversion("string", "int"))),
        Value::Timestamp(t) => Value::Int(t.seconds),
        Value::Enum(e) => Value::Int(e.value),
        _ => Value::error(EvalError::invalid_conversion(&value.type_name(), "int")),
    }
}

fn convert_to_uint(value: &Value) -> Value {
    match value {
        Value::UInt(u) => Value::UInt(*u),
        Value::Int(i) => u64::try_from(*i)
            .map(Value::UInt)
            .unwrap_or_else(|_| Value::error(EvalError::range_error("negative int to uint"))),
        Value::Double(d) => {
            let truncated = d.trunc();
            if truncated.is_finite() && (0.0..UINT_LIMIT).contains(&truncated) {
                Value::UInt(truncated as u64)
            } else {
                Value::error(EvalError::range_error("double to uint overflow"))
            }
        }
        Value::String(s) => s
            .parse::<u64>()
            .map(Value::UInt)
            .unwrap_or_else(|_| Value::error(EvalError::invalid_conversion("string", "uint"))),
        _ => Value::error(EvalError::invalid_conversion(&value.type_name(), "uint")),
    }
}

fn convert_to_double(value: &Value) -> Value {
    match value {
        Value::Double(d) => Value::Double(*d),
        Value::Int(i) => Value::Double(*i as f64),
        Value::UInt(u) => Value::Double(*u as f64),
        Value::String(s) => s
            .parse::<f64>()
            .map(Value::Double)
            .unwrap_or_else(|_| Value::error(EvalError::invalid_conversion("string", "double"))),
        _ => Value::error(EvalError::invalid_conversion(&value.type_name(), "double")),
    }
}

fn convert_to_string(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.clone()),
        Value::Int(i) => Value::String(Arc::from(i.to_string())),
        Value::UInt(u) => Value::String(Arc::from(u.to_string())),
        Value::Double(d) => Value::String(Arc::from(format_double(*d))),
        Value::Bool(b) => Value::String(Arc::from(b.to_string())),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::String(Arc::from(s)),
            Err(_) => Value::error(EvalError::invalid_conversion("bytes", "string")),
        },
        Value::Timestamp(t) => Value::String(Arc::from(t.to_string())),
        Value::Duration(d) => Value::String(Arc::from(d.to_string())),
        _ => Value::error(EvalError::invalid_conversion(&value.type_name(), "string")),
    }
}

fn convert_to_bytes(value: &Value) -> Value {
    match value {
        Value::Bytes(b) => Value::Bytes(b.clone()),
        Value::String(s) => Value::Bytes(Arc::from(s.as_bytes())),
        _ => Value::error(EvalError::invalid_conversion(&value.type_name(), "bytes")),
    }
}

fn convert_to_bool(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(*b),
        Value::String(s) => match s.as_ref() {
            "true" | "True" | "TRUE" | "t" | "1" => Value::Bool(true),
            "false" | "False" | "FALSE" | "f" | "0" => Value::Bool(false),
            _ => Value::error(EvalError::invalid_conversion("string", "bool")),
        },
        _ => Value::error(EvalError::invalid_conversion(&value.type_name(), "bool")),
    }
}

fn convert_to_timestamp(value: &Value) -> Value {
    match value {
        Value::Timestamp(t) => Value::Timestamp(*t),
        Value::String(s) => s
            .parse()
            .map(Value::Timestamp)
            .unwrap_or_else(Value::error),
        Value::Int(i) => {
            let ts = Timestamp::from_seconds(*i);
            if ts.is_valid() {
                Value::Timestamp(ts)
            } else {
                Value::error(EvalError::range_error(
                    "timestamp out of range: must be between year 0001 and 9999",
                ))
            }
        }
        _ => Value::error(EvalError::invalid_conversion(&value.type_name(), "timestamp")),
    }
}

fn convert_to_duration(value: &Value) -> Value {
    match value {
        Value::Duration(d) => Value::Duration(*d),
        Value::String(s) => s
            .parse()
            .map(Value::Duration)
            .unwrap_or_else(Value::error),
        _ => Value::error(EvalError::invalid_conversion(&value.type_name(), "duration")),
    }
}
