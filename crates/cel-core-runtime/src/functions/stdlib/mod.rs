//! The standard function library.
//!
//! Every operator and builtin function is an ordinary overload, so the
//! planner resolves `a + b` exactly as it resolves a host function.

mod arithmetic;
mod comparison;
mod containers;
mod conversions;
mod optional;
mod strings;
mod time;

use super::Overload;
use crate::value::{EvalError, Value, ValueKind};

/// All overloads of the standard library.
pub(crate) fn overloads() -> Vec<Overload> {
    let mut out = Vec::new();
    arithmetic::register(&mut out);
    comparison::register(&mut out);
    containers::register(&mut out);
    conversions::register(&mut out);
    strings::register(&mut out);
    time::register(&mut out);
    optional::register(&mut out);
    out
}

fn overload_id(prefix: &str, kinds: &[ValueKind]) -> String {
    let mut id = prefix.to_string();
    for kind in kinds {
        id.push('_');
        id.push_str(kind.name());
    }
    id
}

/// Register `f` as a strict global function of one argument.
fn unary(
    out: &mut Vec<Overload>,
    name: &'static str,
    prefix: &str,
    kind: ValueKind,
    f: fn(&Value) -> Value,
) {
    out.push(Overload::global(
        overload_id(prefix, &[kind]),
        name,
        vec![kind],
        move |args| match args {
            [a] => f(a),
            _ => Value::error(EvalError::no_matching_overload(name)),
        },
    ));
}

/// Register `f` as a strict global function of two arguments.
fn binary(
    out: &mut Vec<Overload>,
    name: &'static str,
    prefix: &str,
    lhs: ValueKind,
    rhs: ValueKind,
    f: fn(&Value, &Value) -> Value,
) {
    out.push(Overload::global(
        overload_id(prefix, &[lhs, rhs]),
        name,
        vec![lhs, rhs],
        move |args| match args {
            [a, b] => f(a, b),
            _ => Value::error(EvalError::no_matching_overload(name)),
        },
    ));
}

/// Register `f` as a strict receiver-style function; the receiver is the
/// first argument.
fn member(
    out: &mut Vec<Overload>,
    name: &'static str,
    prefix: &str,
    kinds: Vec<ValueKind>,
    f: fn(&[Value]) -> Value,
) {
    out.push(Overload::member(overload_id(prefix, &kinds), name, kinds, f));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionRegistry;

    #[test]
    fn test_library_shapes_are_distinct() {
        let mut registry = FunctionRegistry::new();
        for overload in overloads() {
            let id = overload.id.clone();
            assert!(registry.register(overload).is_ok(), "conflict on {id}");
        }
    }

    #[test]
    fn test_overload_id() {
        assert_eq!(
            overload_id("add", &[ValueKind::Int, ValueKind::Int]),
            "add_int_int"
        );
    }
}
