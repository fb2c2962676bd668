//! String predicates.

use super::member;
use crate::functions::Overload;
use crate::value::{EvalError, Value, ValueKind as K};

pub(super) fn register(out: &mut Vec<Overload>) {
    let kinds = || vec![K::String, K::String];
    member(out, "contains", "contains", kinds(), |args| {
        string_test(args, "contains", |s, sub| s.contains(sub))
    });
    member(out, "startsWith", "starts_with", kinds(), |args| {
        string_test(args, "startsWith", |s, prefix| s.starts_with(prefix))
    });
    member(out, "endsWith", "ends_with", kinds(), |args| {
        string_test(args, "endsWith", |s, suffix| s.ends_with(suffix))
    });
    member(out, "matches", "matches", kinds(), matches);
}

fn string_test(args: &[Value], function: &str, test: fn(&str, &str) -> bool) -> Value {
    match args {
        [Value::String(s), Value::String(arg)] => Value::Bool(test(s, arg)),
        _ => Value::error(EvalError::no_matching_overload(function)),
    }
}

fn matches(args: &[Value]) -> Value {
    match args {
        [Value::String(s), Value::String(pattern)] => match regex::Regex::new(pattern) {
            Ok(re) => Value::Bool(re.is_match(s)),
            Err(e) => Value::error(EvalError::invalid_argument(format!("invalid regex: {}", e))),
        },
        _ => Value::error(EvalError::no_matching_overload("matches")),
    }
}
