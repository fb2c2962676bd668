//! Comprehension loop steps.
//!
//! A comprehension is planned as
//!
//! ```text
//!     [range] [accu_init] Init
//! N:  Next
//! R:  [result]
//! F:  Finish
//!     Jump -> END
//! B:  [loop_condition] Cond
//!     [loop_step] AssignSlot(accu, pop) Jump -> N
//! END:
//! ```
//!
//! The iteration cursor lives in an [`IterationContext`] on the frame; the
//! iteration variable and the accumulator live in slots.

use std::sync::Arc;

use cel_core_common::ExprId;

use super::frame::ExecutionFrame;
use super::ops;
use super::step::Control;
use crate::attribute::{AttributeTrail, Qualifier};
use crate::error::EngineError;
use crate::value::{EvalError, Value};

/// Cursor over the range of one running comprehension.
#[derive(Debug)]
pub(crate) struct IterationContext {
    range: Arc<[Value]>,
    index: usize,
    trail: AttributeTrail,
    is_map: bool,
}

impl IterationContext {
    fn new(range: Arc<[Value]>, trail: AttributeTrail, is_map: bool) -> Self {
        Self {
            range,
            index: 0,
            trail,
            is_map,
        }
    }

    fn has_next(&self) -> bool {
        self.index < self.range.len()
    }

    /// The next element and its trail. List elements are qualified by their
    /// position; map keys are not attributes of the map.
    fn advance(&mut self) -> Option<(Value, AttributeTrail)> {
        let value = self.range.get(self.index)?.clone();
        let trail = if self.is_map {
            AttributeTrail::empty()
        } else {
            self.trail.step(Qualifier::Int(self.index as i64))
        };
        self.index += 1;
        Some((value, trail))
    }
}

/// Pops the accumulator's initial value and the range. An iterable range
/// opens an iteration context; anything else becomes the comprehension's
/// result and control leaves the loop.
pub(crate) fn init(
    frame: &mut ExecutionFrame<'_>,
    accu_slot: usize,
    end_offset: isize,
    expr_id: ExprId,
) -> Result<Control, EngineError> {
    let (accu_init, accu_trail) = frame.stack.pop()?;
    let (range, range_trail) = frame.stack.pop()?;

    let context = match &range {
        Value::List(elements) => IterationContext::new(elements.clone(), range_trail, false),
        Value::Map(map) => {
            let keys: Arc<[Value]> = map.keys().map(|k| k.to_value()).collect();
            IterationContext::new(keys, range_trail, true)
        }
        Value::Error(_) | Value::Unknown(_) => {
            frame.stack.push_with_trail(range, range_trail);
            return Ok(Control::Jump(end_offset));
        }
        other => {
            let err = EvalError::no_matching_overload("<iter_range>").at(expr_id);
            tracing::trace!(kind = %other.kind(), "comprehension range is not iterable");
            frame.stack.push(Value::error(err));
            return Ok(Control::Jump(end_offset));
        }
    };

    frame.slots.set(accu_slot, accu_init, accu_trail)?;
    frame.iterations.push(context);
    Ok(Control::Continue)
}

/// Binds the next element to the iteration slot and enters the body, or
/// falls through to the result when the range is exhausted. An element
/// whose trail matches an unknown or missing-attribute pattern is bound as
/// that unknown or error instead of its value.
pub(crate) fn next(
    frame: &mut ExecutionFrame<'_>,
    iter_slot: usize,
    body_offset: isize,
    error_offset: isize,
    expr_id: ExprId,
) -> Result<Control, EngineError> {
    let limit = frame.options.comprehension_max_iterations;
    let context = frame.current_iteration()?;
    if !context.has_next() {
        return Ok(Control::Continue);
    }
    if limit > 0 && context.index >= limit {
        frame
            .stack
            .push(Value::error(EvalError::iteration_budget_exceeded(limit)));
        return Ok(Control::Jump(error_offset));
    }
    let Some((value, trail)) = context.advance() else {
        return Ok(Control::Continue);
    };
    let value = ops::check_attribute(frame, &trail, expr_id).unwrap_or(value);
    frame.slots.set(iter_slot, value, trail)?;
    Ok(Control::Jump(body_offset))
}

/// Checks the loop condition. A false condition ends the loop early when
/// the comprehension allows it; an error or unknown condition ends it with
/// that value as the result.
pub(crate) fn cond(
    frame: &mut ExecutionFrame<'_>,
    short_circuit: bool,
    result_offset: isize,
    finish_offset: isize,
    expr_id: ExprId,
) -> Result<Control, EngineError> {
    let (condition, trail) = frame.stack.pop()?;
    match condition {
        Value::Bool(true) => Ok(Control::Continue),
        Value::Bool(false) if short_circuit && frame.options.short_circuiting => {
            tracing::trace!(expr_id, "comprehension loop condition is false, exiting early");
            Ok(Control::Jump(result_offset))
        }
        Value::Bool(false) => Ok(Control::Continue),
        Value::Error(_) | Value::Unknown(_) => {
            frame.stack.push_with_trail(condition, trail);
            Ok(Control::Jump(finish_offset))
        }
        _ => {
            let err = EvalError::no_matching_overload("<loop_condition>").at(expr_id);
            frame.stack.push(Value::error(err));
            Ok(Control::Jump(finish_offset))
        }
    }
}

/// Closes the iteration context and releases the loop's slots. The result
/// is left on the stack; a list built in place is frozen first.
pub(crate) fn finish(
    frame: &mut ExecutionFrame<'_>,
    iter_slot: usize,
    accu_slot: usize,
) -> Result<Control, EngineError> {
    frame
        .iterations
        .pop()
        .ok_or(EngineError::MissingIterationContext)?;
    let frozen = frame.stack.peek()?.as_mutable_list().map(|list| list.freeze());
    if let Some(list) = frozen {
        frame.stack.replace_top(list)?;
    }
    frame.slots.clear(iter_slot)?;
    frame.slots.clear(accu_slot)?;
    Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::{EmptyActivation, MapActivation};
    use crate::attribute::{Attribute, AttributePattern, UnknownSet};
    use crate::options::RuntimeOptions;
    use crate::value::{EvalErrorKind, MapKey};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_init_rejects_non_iterable_range() {
        let options = RuntimeOptions::default();
        let mut frame = ExecutionFrame::new(&EmptyActivation, &options, 2, 4);
        frame.stack.push(Value::Int(3));
        frame.stack.push(Value::Bool(false));

        let control = init(&mut frame, 1, 7, 9).unwrap();
        assert_eq!(control, Control::Jump(7));
        let result = frame.stack.pop_value().unwrap();
        assert_eq!(
            result.as_error().map(|e| e.kind),
            Some(EvalErrorKind::NoMatchingOverload)
        );
        assert!(frame.iterations.is_empty());
    }

    #[test]
    fn test_map_ranges_iterate_keys() {
        let options = RuntimeOptions::default();
        let mut frame = ExecutionFrame::new(&EmptyActivation, &options, 2, 4);
        frame.stack.push(Value::map([
            (MapKey::from("a"), Value::Int(1)),
            (MapKey::from("b"), Value::Int(2)),
        ]));
        frame.stack.push(Value::Int(0));

        assert_eq!(init(&mut frame, 1, 7, 9).unwrap(), Control::Continue);
        assert_eq!(next(&mut frame, 0, 3, 1, 9).unwrap(), Control::Jump(3));
        assert_eq!(frame.slots.read(0).unwrap().value, Value::string("a"));
        assert_eq!(next(&mut frame, 0, 3, 1, 9).unwrap(), Control::Jump(3));
        assert_eq!(frame.slots.read(0).unwrap().value, Value::string("b"));
        assert_eq!(next(&mut frame, 0, 3, 1, 9).unwrap(), Control::Continue);
    }

    #[test]
    fn test_iteration_budget() {
        let options = RuntimeOptions::default().with_comprehension_max_iterations(1);
        let mut frame = ExecutionFrame::new(&EmptyActivation, &options, 2, 4);
        frame.stack.push(Value::list(vec![Value::Int(1), Value::Int(2)]));
        frame.stack.push(Value::Int(0));
        init(&mut frame, 1, 7, 9).unwrap();

        assert_eq!(next(&mut frame, 0, 3, 1, 9).unwrap(), Control::Jump(3));
        assert_eq!(next(&mut frame, 0, 3, 1, 9).unwrap(), Control::Jump(1));
        assert_eq!(
            frame.stack.pop_value().unwrap().as_error().map(|e| e.kind),
            Some(EvalErrorKind::IterationBudgetExceeded)
        );
    }

    fn list_range(frame: &mut ExecutionFrame<'_>) {
        frame.stack.push_with_trail(
            Value::list(vec![Value::Bool(false), Value::Bool(true)]),
            AttributeTrail::new("xs"),
        );
        frame.stack.push(Value::Bool(false));
        init(frame, 1, 7, 9).unwrap();
    }

    #[test]
    fn test_next_binds_matching_element_as_unknown() {
        let activation = MapActivation::new()
            .with_unknown_patterns([AttributePattern::new("xs").index(1)]);
        let options = RuntimeOptions::default().with_unknown_processing(true);
        let mut frame = ExecutionFrame::new(&activation, &options, 2, 4);
        list_range(&mut frame);

        assert_eq!(next(&mut frame, 0, 3, 1, 9).unwrap(), Control::Jump(3));
        assert_eq!(frame.slots.read(0).unwrap().value, Value::Bool(false));

        assert_eq!(next(&mut frame, 0, 3, 1, 9).unwrap(), Control::Jump(3));
        let slot = frame.slots.read(0).unwrap();
        let element = Attribute::new("xs").with_qualifier(Qualifier::Int(1));
        assert_eq!(
            slot.value,
            Value::unknown(UnknownSet::from_attribute(element.clone()))
        );
        assert_eq!(slot.trail.attribute(), Some(&element));
    }

    #[test]
    fn test_next_binds_missing_element_as_error() {
        let activation = MapActivation::new()
            .with_missing_patterns([AttributePattern::new("xs").index(0)]);
        let options = RuntimeOptions::default().with_missing_attribute_errors(true);
        let mut frame = ExecutionFrame::new(&activation, &options, 2, 4);
        list_range(&mut frame);

        assert_eq!(next(&mut frame, 0, 3, 1, 9).unwrap(), Control::Jump(3));
        assert_eq!(
            frame.slots.read(0).unwrap().value.as_error().map(|e| e.kind),
            Some(EvalErrorKind::MissingAttribute)
        );
        assert_eq!(next(&mut frame, 0, 3, 1, 9).unwrap(), Control::Jump(3));
        assert_eq!(frame.slots.read(0).unwrap().value, Value::Bool(true));
    }

    #[test]
    fn test_next_ignores_patterns_when_processing_is_off() {
        let activation = MapActivation::new()
            .with_unknown_patterns([AttributePattern::new("xs").index(0)]);
        let options = RuntimeOptions::default();
        let mut frame = ExecutionFrame::new(&activation, &options, 2, 4);
        list_range(&mut frame);

        assert_eq!(next(&mut frame, 0, 3, 1, 9).unwrap(), Control::Jump(3));
        assert_eq!(frame.slots.read(0).unwrap().value, Value::Bool(false));
    }

    #[test]
    fn test_cond_outcomes() {
        let options = RuntimeOptions::default();
        let mut frame = ExecutionFrame::new(&EmptyActivation, &options, 2, 4);

        frame.stack.push(Value::Bool(true));
        assert_eq!(cond(&mut frame, true, -5, -3, 1).unwrap(), Control::Continue);

        frame.stack.push(Value::Bool(false));
        assert_eq!(cond(&mut frame, true, -5, -3, 1).unwrap(), Control::Jump(-5));

        frame.stack.push(Value::Bool(false));
        assert_eq!(cond(&mut frame, false, -5, -3, 1).unwrap(), Control::Continue);

        frame.stack.push(Value::Int(1));
        assert_eq!(cond(&mut frame, true, -5, -3, 1).unwrap(), Control::Jump(-3));
        assert!(frame.stack.pop_value().unwrap().is_error());
    }

    #[test]
    fn test_finish_without_context_is_an_engine_error() {
        let options = RuntimeOptions::default();
        let mut frame = ExecutionFrame::new(&EmptyActivation, &options, 2, 4);
        frame.stack.push(Value::Null);
        assert_eq!(
            finish(&mut frame, 0, 1).unwrap_err(),
            EngineError::MissingIterationContext
        );
    }
}
