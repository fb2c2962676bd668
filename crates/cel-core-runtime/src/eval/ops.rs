//! Operations shared by the step evaluator and the direct evaluator.
//!
//! Each function takes already-evaluated operands with their attribute
//! trails and produces the node's value and trail. Expression-level
//! failures come back as `Value::Error`, attributed to the node's id.

use std::sync::Arc;

use cel_core_common::{operators, ExprId};
use rustc_hash::FxHashSet;

use super::frame::ExecutionFrame;
use crate::attribute::{AttributeTrail, Qualifier};
use crate::functions::{dispatch::dispatch, Overload};
use crate::types::StructType;
use crate::value::{EvalError, EvalErrorKind, ListBuilder, MapBuilder, OptionalValue, Value};

/// Attach `expr_id` to an error that does not carry one yet.
pub(crate) fn attribute_error(value: Value, expr_id: ExprId) -> Value {
    match value {
        Value::Error(err) if err.expr_id.is_none() => {
            Value::error(EvalError::clone(&err).at(expr_id))
        }
        other => other,
    }
}

fn error_at(err: EvalError, expr_id: ExprId) -> Value {
    Value::error(err.at(expr_id))
}

/// Resolve a variable against the activation.
pub(crate) fn resolve_ident(
    frame: &ExecutionFrame<'_>,
    name: &str,
    expr_id: ExprId,
) -> (Value, AttributeTrail) {
    let trail = if frame.enable_attribute_tracking() {
        AttributeTrail::new(name)
    } else {
        AttributeTrail::empty()
    };
    if let Some(value) = check_attribute(frame, &trail, expr_id) {
        return (value, trail);
    }
    let value = frame
        .activation
        .find_variable(name)
        .unwrap_or_else(|| error_at(EvalError::unknown_identifier(name), expr_id));
    (value, trail)
}

/// A missing-attribute error or an unknown if the trail matches one of the
/// activation's patterns.
pub(crate) fn check_attribute(
    frame: &ExecutionFrame<'_>,
    trail: &AttributeTrail,
    expr_id: ExprId,
) -> Option<Value> {
    if frame.enable_missing_attribute_errors() && frame.utility.check_for_missing_attribute(trail) {
        return Some(error_at(
            frame.utility.create_missing_attribute_error(trail),
            expr_id,
        ));
    }
    if frame.enable_unknowns() && frame.utility.check_for_unknown(trail, false) {
        return Some(Value::unknown(frame.utility.create_unknown_set(trail)));
    }
    None
}

/// Field selection, `has()` and optional field selection (`a.?b`).
pub(crate) fn select(
    frame: &ExecutionFrame<'_>,
    operand: Value,
    trail: AttributeTrail,
    field: &str,
    test_only: bool,
    optional: bool,
    expr_id: ExprId,
) -> (Value, AttributeTrail) {
    if operand.is_error_or_unknown() {
        return (operand, trail);
    }
    let trail = trail.step(Qualifier::field(field));

    if frame.enable_unknowns() && frame.utility.check_for_unknown(&trail, false) {
        let unknown = Value::unknown(frame.utility.create_unknown_set(&trail));
        return (unknown, trail);
    }
    if test_only {
        return (test_field(&operand, field, expr_id), trail);
    }
    if frame.enable_missing_attribute_errors() && frame.utility.check_for_missing_attribute(&trail) {
        let err = error_at(frame.utility.create_missing_attribute_error(&trail), expr_id);
        return (err, trail);
    }

    let value = match &operand {
        Value::Optional(OptionalValue::None) => Value::optional_none(),
        Value::Optional(OptionalValue::Some(inner)) => optional_field(inner, field, expr_id),
        _ if optional => optional_field(&operand, field, expr_id),
        _ => match lookup_field(&operand, field, expr_id) {
            Ok(Some(value)) => value,
            Ok(None) => match &operand {
                Value::Map(_) => error_at(EvalError::no_such_key(field), expr_id),
                _ => error_at(EvalError::no_such_field(field), expr_id),
            },
            Err(err) => err,
        },
    };
    (value, trail)
}

/// `Ok(None)` when the field or key is absent, `Err` when the operand cannot
/// be selected from at all.
fn lookup_field(operand: &Value, field: &str, expr_id: ExprId) -> Result<Option<Value>, Value> {
    match operand {
        Value::Map(map) => Ok(map.get_value(&Value::string(field)).cloned()),
        Value::Struct(s) => Ok(s.field(field)),
        other => Err(error_at(
            EvalError::type_mismatch("map or struct", &other.type_name()),
            expr_id,
        )),
    }
}

fn optional_field(operand: &Value, field: &str, expr_id: ExprId) -> Value {
    match lookup_field(operand, field, expr_id) {
        Ok(Some(value)) => Value::optional_some(value),
        Ok(None) => Value::optional_none(),
        Err(err) => err,
    }
}

fn test_field(operand: &Value, field: &str, expr_id: ExprId) -> Value {
    match operand {
        Value::Map(map) => Value::Bool(map.contains_value_key(&Value::string(field))),
        Value::Struct(s) => Value::Bool(s.has_field(field)),
        other => error_at(
            EvalError::type_mismatch("map or struct", &other.type_name()),
            expr_id,
        ),
    }
}

/// Indexing: `list[i]`, `map[k]` and their optional forms.
pub(crate) fn index(
    frame: &ExecutionFrame<'_>,
    container: Value,
    container_trail: AttributeTrail,
    key: Value,
    optional: bool,
    expr_id: ExprId,
) -> (Value, AttributeTrail) {
    if container.is_error() {
        return (container, container_trail);
    }
    if key.is_error() {
        return (key, AttributeTrail::empty());
    }
    if let Some(unknowns) = frame.utility.merge_unknowns([&container, &key]) {
        return (Value::unknown(unknowns), container_trail);
    }

    let trail = match Qualifier::from_value(&key) {
        Some(qualifier) => container_trail.step(qualifier),
        None => AttributeTrail::empty(),
    };
    if let Some(value) = check_attribute(frame, &trail, expr_id) {
        return (value, trail);
    }

    let value = match &container {
        Value::Optional(OptionalValue::None) => Value::optional_none(),
        Value::Optional(OptionalValue::Some(inner)) => optional_element(inner, &key, expr_id),
        _ if optional => optional_element(&container, &key, expr_id),
        _ => match lookup_element(&container, &key, expr_id) {
            Ok(value) => value,
            Err(err) => err,
        },
    };
    (value, trail)
}

fn optional_element(container: &Value, key: &Value, expr_id: ExprId) -> Value {
    match lookup_element(container, key, expr_id) {
        Ok(value) => Value::optional_some(value),
        Err(Value::Error(err)) if is_absent(&err) => Value::optional_none(),
        Err(err) => err,
    }
}

fn is_absent(err: &EvalError) -> bool {
    matches!(err.kind, EvalErrorKind::NoSuchKey | EvalErrorKind::IndexOutOfBounds)
}

fn lookup_element(container: &Value, key: &Value, expr_id: ExprId) -> Result<Value, Value> {
    match container {
        Value::List(list) => {
            let index = list_index(key).ok_or_else(|| {
                error_at(EvalError::no_matching_overload(operators::INDEX), expr_id)
            })?;
            usize::try_from(index)
                .ok()
                .and_then(|i| list.get(i))
                .cloned()
                .ok_or_else(|| error_at(EvalError::index_out_of_bounds(index, list.len()), expr_id))
        }
        Value::Map(map) => map
            .get_value(key)
            .cloned()
            .ok_or_else(|| error_at(EvalError::no_such_key(&key.to_string()), expr_id)),
        _ => Err(error_at(
            EvalError::no_matching_overload(operators::INDEX),
            expr_id,
        )),
    }
}

/// List positions may be given as int, uint or an integral double.
fn list_index(key: &Value) -> Option<i64> {
    match key {
        Value::Int(i) => Some(*i),
        Value::UInt(u) => i64::try_from(*u).ok(),
        Value::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
        _ => None,
    }
}

/// Dispatch a call to one of the overloads resolved at plan time.
pub(crate) fn call(
    frame: &ExecutionFrame<'_>,
    function: &str,
    overloads: &[Arc<Overload>],
    args: &[Value],
    trails: &[AttributeTrail],
    expr_id: ExprId,
) -> Value {
    let result = dispatch(
        function,
        overloads,
        args,
        trails,
        &frame.utility,
        frame.options.strict_overload_errors_on_ambiguous_match,
    );
    attribute_error(result, expr_id)
}

/// The first error among the elements, else the merged unknowns.
fn propagate(frame: &ExecutionFrame<'_>, values: &[Value], trails: &[AttributeTrail]) -> Option<Value> {
    if let Some(err) = values.iter().find(|v| v.is_error()) {
        return Some(err.clone());
    }
    frame
        .utility
        .identify_and_merge_unknowns(values, trails, true)
        .map(Value::unknown)
}

/// Unwrap the value at an optional position. `Ok(None)` means the element
/// is an empty optional and is left out.
fn unwrap_optional(value: Value, expr_id: ExprId) -> Result<Option<Value>, Value> {
    match value {
        Value::Optional(OptionalValue::None) => Ok(None),
        Value::Optional(OptionalValue::Some(inner)) => Ok(Some(*inner)),
        other => Err(error_at(
            EvalError::type_mismatch("optional_type", other.kind().name()),
            expr_id,
        )),
    }
}

pub(crate) fn create_list(
    frame: &ExecutionFrame<'_>,
    values: Vec<Value>,
    trails: &[AttributeTrail],
    optional_indices: &FxHashSet<usize>,
    expr_id: ExprId,
) -> Value {
    if let Some(value) = propagate(frame, &values, trails) {
        return value;
    }
    let mut builder = ListBuilder::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        if !optional_indices.contains(&i) {
            builder.add(value);
            continue;
        }
        match unwrap_optional(value, expr_id) {
            Ok(Some(inner)) => builder.add(inner),
            Ok(None) => {}
            Err(err) => return err,
        }
    }
    builder.build()
}

/// `values` holds keys and values interleaved: `k0, v0, k1, v1, ...`.
/// Optional indices refer to entries.
pub(crate) fn create_map(
    frame: &ExecutionFrame<'_>,
    values: Vec<Value>,
    trails: &[AttributeTrail],
    optional_indices: &FxHashSet<usize>,
    expr_id: ExprId,
) -> Value {
    if let Some(value) = propagate(frame, &values, trails) {
        return value;
    }
    let mut builder = MapBuilder::with_capacity(values.len() / 2);
    let mut iter = values.into_iter();
    let mut entry = 0;
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        let value = if optional_indices.contains(&entry) {
            match unwrap_optional(value, expr_id) {
                Ok(Some(inner)) => inner,
                Ok(None) => {
                    entry += 1;
                    continue;
                }
                Err(err) => return err,
            }
        } else {
            value
        };
        if let Err(err) = builder.insert(key, value) {
            return error_at(err, expr_id);
        }
        entry += 1;
    }
    builder.build()
}

pub(crate) fn create_struct(
    frame: &ExecutionFrame<'_>,
    struct_type: &StructType,
    fields: &[Arc<str>],
    values: Vec<Value>,
    trails: &[AttributeTrail],
    optional_indices: &FxHashSet<usize>,
    expr_id: ExprId,
) -> Value {
    if let Some(value) = propagate(frame, &values, trails) {
        return value;
    }
    let mut builder = struct_type.new_builder();
    for (i, (field, value)) in fields.iter().zip(values).enumerate() {
        let value = if optional_indices.contains(&i) {
            match unwrap_optional(value, expr_id) {
                Ok(Some(inner)) => inner,
                Ok(None) => continue,
                Err(err) => return err,
            }
        } else {
            value
        };
        if let Err(err) = builder.set_field(field, value) {
            return error_at(err, expr_id);
        }
    }
    builder.build()
}
