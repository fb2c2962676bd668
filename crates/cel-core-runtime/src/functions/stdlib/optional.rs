//! Optional values: `optional.of`, `optional.none`,
//! `optional.ofNonZeroValue`, `hasValue`, `value` and `orValue`.

use super::{member, unary};
use crate::functions::Overload;
use crate::value::{EvalError, OptionalValue, Value, ValueKind as K};

pub(super) fn register(out: &mut Vec<Overload>) {
    unary(out, "optional.of", "optional_of", K::Any, |v| {
        Value::optional_some(v.clone())
    });
    unary(out, "optional.ofNonZeroValue", "optional_of_non_zero_value", K::Any, |v| {
        if v.is_zero_value() {
            Value::optional_none()
        } else {
            Value::optional_some(v.clone())
        }
    });
    out.push(Overload::global(
        "optional_none",
        "optional.none",
        Vec::new(),
        |_| Value::optional_none(),
    ));

    member(out, "hasValue", "optional_has_value", vec![K::Optional], |args| {
        match args {
            [Value::Optional(o)] => Value::Bool(o.is_present()),
            _ => Value::error(EvalError::no_matching_overload("hasValue")),
        }
    });
    member(out, "value", "optional_value", vec![K::Optional], |args| match args {
        [Value::Optional(OptionalValue::Some(v))] => (**v).clone(),
        [Value::Optional(OptionalValue::None)] => {
            Value::error(EvalError::invalid_argument("optional.none() dereference"))
        }
        _ => Value::error(EvalError::no_matching_overload("value")),
    });
    member(
        out,
        "orValue",
        "optional_or_value",
        vec![K::Optional, K::Any],
        |args| match args {
            [Value::Optional(o), default] => o.clone().unwrap_or(default.clone()),
            _ => Value::error(EvalError::no_matching_overload("orValue")),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(name: &str, arity: usize) -> Overload {
        let mut out = Vec::new();
        register(&mut out);
        out.into_iter()
            .find(|o| o.descriptor.name() == name && o.descriptor.arity() == arity)
            .unwrap()
    }

    #[test]
    fn test_of_non_zero_value() {
        let f = find("optional.ofNonZeroValue", 1);
        assert_eq!(f.call(&[Value::Int(0)]), Value::optional_none());
        assert_eq!(
            f.call(&[Value::string("x")]),
            Value::optional_some(Value::string("x"))
        );
    }

    #[test]
    fn test_value_and_or_value() {
        let some = Value::optional_some(Value::Int(3));
        assert_eq!(find("value", 1).call(&[some.clone()]), Value::Int(3));
        assert!(find("value", 1).call(&[Value::optional_none()]).is_error());
        assert_eq!(
            find("orValue", 2).call(&[Value::optional_none(), Value::Int(9)]),
            Value::Int(9)
        );
        assert_eq!(find("hasValue", 1).call(&[some]), Value::Bool(true));
    }
}
