//! Stack-machine steps.

use std::fmt;
use std::sync::Arc;

use cel_core_common::{operators, ExprId};
use rustc_hash::FxHashSet;

use super::comprehension;
use super::direct::DirectNode;
use super::frame::ExecutionFrame;
use super::ops;
use crate::attribute::AttributeTrail;
use crate::error::EngineError;
use crate::functions::Overload;
use crate::types::StructType;
use crate::value::{EvalError, MutableList, Value};

/// What the executor does after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    /// Proceed to the next step.
    Continue,
    /// Move the program counter by this many steps past the next one.
    Jump(isize),
    /// Run a subexpression to completion, then resume `return_offset` steps
    /// past the calling step.
    Call {
        subexpression: usize,
        return_offset: isize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    /// The operand value that decides the result on its own.
    pub(crate) fn absorbing(self) -> bool {
        matches!(self, LogicOp::Or)
    }

    fn function(self) -> &'static str {
        match self {
            LogicOp::And => operators::LOGICAL_AND,
            LogicOp::Or => operators::LOGICAL_OR,
        }
    }
}

pub(crate) enum Step {
    Const(Value),
    Ident {
        name: Arc<str>,
        expr_id: ExprId,
    },
    Slot(usize),
    Select {
        field: Arc<str>,
        test_only: bool,
        optional: bool,
        expr_id: ExprId,
    },
    Index {
        optional: bool,
        expr_id: ExprId,
    },
    Call {
        function: Arc<str>,
        overloads: Arc<[Arc<Overload>]>,
        arity: usize,
        expr_id: ExprId,
    },
    CreateList {
        size: i64,
        optional_indices: FxHashSet<usize>,
        expr_id: ExprId,
    },
    CreateMap {
        entries: usize,
        optional_indices: FxHashSet<usize>,
        expr_id: ExprId,
    },
    CreateStruct {
        struct_type: StructType,
        fields: Arc<[Arc<str>]>,
        optional_indices: FxHashSet<usize>,
        expr_id: ExprId,
    },
    /// Seeds a list-append accumulator.
    CreateMutableList,
    Jump(isize),
    /// Skips the right operand of `&&`/`||` when the left one already
    /// decides the result.
    JumpIfBool {
        absorbing: bool,
        offset: isize,
    },
    Logic {
        op: LogicOp,
        expr_id: ExprId,
    },
    /// Ternary branch selection.
    CondJump {
        else_offset: isize,
        error_offset: isize,
        expr_id: ExprId,
    },
    ComprehensionInit {
        accu_slot: usize,
        end_offset: isize,
        expr_id: ExprId,
    },
    ComprehensionNext {
        iter_slot: usize,
        body_offset: isize,
        error_offset: isize,
        expr_id: ExprId,
    },
    ComprehensionCond {
        short_circuit: bool,
        result_offset: isize,
        finish_offset: isize,
        expr_id: ExprId,
    },
    ComprehensionFinish {
        iter_slot: usize,
        accu_slot: usize,
    },
    /// Pushes a lazily bound value, computing it on first use.
    CheckLazyInit {
        slot: usize,
        subexpression: usize,
    },
    AssignSlot {
        slot: usize,
        pop: bool,
    },
    ClearSlot(usize),
    Direct(DirectNode),
}

impl Step {
    pub(crate) fn evaluate(&self, frame: &mut ExecutionFrame<'_>) -> Result<Control, EngineError> {
        match self {
            Step::Const(value) => frame.stack.push(value.clone()),
            Step::Ident { name, expr_id } => {
                let (value, trail) = ops::resolve_ident(frame, name, *expr_id);
                frame.stack.push_with_trail(value, trail);
            }
            Step::Slot(index) => {
                let slot = frame.slots.read(*index)?;
                let (value, trail) = (slot.value.clone(), slot.trail.clone());
                frame.stack.push_with_trail(value, trail);
            }
            Step::Select {
                field,
                test_only,
                optional,
                expr_id,
            } => {
                let (operand, trail) = frame.stack.pop()?;
                let (value, trail) =
                    ops::select(frame, operand, trail, field, *test_only, *optional, *expr_id);
                frame.stack.push_with_trail(value, trail);
            }
            Step::Index { optional, expr_id } => {
                if !frame.stack.has_enough(2) {
                    return Err(EngineError::StackUnderflow {
                        needed: 2,
                        available: frame.stack.len(),
                    });
                }
                let key = frame.stack.pop_value()?;
                let (container, container_trail) = frame.stack.pop()?;
                let (value, trail) =
                    ops::index(frame, container, container_trail, key, *optional, *expr_id);
                frame.stack.push_with_trail(value, trail);
            }
            Step::Call {
                function,
                overloads,
                arity,
                expr_id,
            } => {
                let (args, trails) = frame.stack.pop_n(*arity)?;
                let result = ops::call(frame, function, overloads, &args, &trails, *expr_id);
                frame.stack.push(result);
            }
            Step::CreateList {
                size,
                optional_indices,
                expr_id,
            } => {
                let size = usize::try_from(*size)
                    .map_err(|_| EngineError::InvalidListSize { size: *size })?;
                let (values, trails) = frame.stack.pop_n(size)?;
                let list = ops::create_list(frame, values, &trails, optional_indices, *expr_id);
                frame.stack.push(list);
            }
            Step::CreateMap {
                entries,
                optional_indices,
                expr_id,
            } => {
                let (values, trails) = frame.stack.pop_n(entries * 2)?;
                let map = ops::create_map(frame, values, &trails, optional_indices, *expr_id);
                frame.stack.push(map);
            }
            Step::CreateStruct {
                struct_type,
                fields,
                optional_indices,
                expr_id,
            } => {
                let (values, trails) = frame.stack.pop_n(fields.len())?;
                let value = ops::create_struct(
                    frame,
                    struct_type,
                    fields,
                    values,
                    &trails,
                    optional_indices,
                    *expr_id,
                );
                frame.stack.push(value);
            }
            Step::CreateMutableList => frame.stack.push(MutableList::new_value()),
            Step::Jump(offset) => return Ok(Control::Jump(*offset)),
            Step::JumpIfBool { absorbing, offset } => {
                if frame.stack.peek()?.as_bool() == Some(*absorbing) {
                    return Ok(Control::Jump(*offset));
                }
            }
            Step::Logic { op, expr_id } => {
                let (values, trails) = frame.stack.pop_n(2)?;
                let result = combine_logic(frame, *op, &values, &trails, *expr_id);
                frame.stack.push(result);
            }
            Step::CondJump {
                else_offset,
                error_offset,
                expr_id,
            } => {
                let (condition, trail) = frame.stack.pop()?;
                match condition {
                    Value::Bool(true) => {}
                    Value::Bool(false) => return Ok(Control::Jump(*else_offset)),
                    Value::Error(_) | Value::Unknown(_) => {
                        frame.stack.push_with_trail(condition, trail);
                        return Ok(Control::Jump(*error_offset));
                    }
                    _ => {
                        let err = EvalError::no_matching_overload(operators::CONDITIONAL).at(*expr_id);
                        frame.stack.push(Value::error(err));
                        return Ok(Control::Jump(*error_offset));
                    }
                }
            }
            Step::ComprehensionInit {
                accu_slot,
                end_offset,
                expr_id,
            } => return comprehension::init(frame, *accu_slot, *end_offset, *expr_id),
            Step::ComprehensionNext {
                iter_slot,
                body_offset,
                error_offset,
                expr_id,
            } => {
                return comprehension::next(frame, *iter_slot, *body_offset, *error_offset, *expr_id)
            }
            Step::ComprehensionCond {
                short_circuit,
                result_offset,
                finish_offset,
                expr_id,
            } => {
                return comprehension::cond(
                    frame,
                    *short_circuit,
                    *result_offset,
                    *finish_offset,
                    *expr_id,
                )
            }
            Step::ComprehensionFinish {
                iter_slot,
                accu_slot,
            } => return comprehension::finish(frame, *iter_slot, *accu_slot),
            Step::CheckLazyInit {
                slot,
                subexpression,
            } => {
                if let Some(cached) = frame.slots.get(*slot)? {
                    let (value, trail) = (cached.value.clone(), cached.trail.clone());
                    frame.stack.push_with_trail(value, trail);
                    return Ok(Control::Jump(1));
                }
                tracing::trace!(slot, subexpression, "initializing lazy binding");
                return Ok(Control::Call {
                    subexpression: *subexpression,
                    return_offset: 0,
                });
            }
            Step::AssignSlot { slot, pop } => {
                let (value, trail) = frame.stack.pop()?;
                if !*pop {
                    frame.stack.push_with_trail(value.clone(), trail.clone());
                }
                frame.slots.set(*slot, value, trail)?;
            }
            Step::ClearSlot(slot) => frame.slots.clear(*slot)?,
            Step::Direct(node) => {
                let (value, trail) = node.evaluate(frame)?;
                frame.stack.push_with_trail(value, trail);
            }
        }
        Ok(Control::Continue)
    }

    /// Jump offsets this step can produce, for plan validation.
    pub(crate) fn jump_offsets(&self) -> Vec<isize> {
        match self {
            Step::Jump(offset) | Step::JumpIfBool { offset, .. } => vec![*offset],
            Step::CondJump {
                else_offset,
                error_offset,
                ..
            } => vec![*else_offset, *error_offset],
            Step::ComprehensionInit { end_offset, .. } => vec![*end_offset],
            Step::ComprehensionNext {
                body_offset,
                error_offset,
                ..
            } => vec![*body_offset, *error_offset],
            Step::ComprehensionCond {
                result_offset,
                finish_offset,
                ..
            } => vec![*result_offset, *finish_offset],
            Step::CheckLazyInit { .. } => vec![1],
            _ => Vec::new(),
        }
    }
}

/// Non-strict `&&`/`||` over two evaluated operands.
///
/// The absorbing value wins over everything, then a non-bool operand is an
/// overload error, then an error (left first), then the merged unknowns.
pub(crate) fn combine_logic(
    frame: &ExecutionFrame<'_>,
    op: LogicOp,
    values: &[Value],
    trails: &[AttributeTrail],
    expr_id: ExprId,
) -> Value {
    let absorbing = op.absorbing();
    if values.iter().any(|v| v.as_bool() == Some(absorbing)) {
        return Value::Bool(absorbing);
    }
    if values
        .iter()
        .any(|v| !matches!(v, Value::Bool(_) | Value::Error(_) | Value::Unknown(_)))
    {
        return Value::error(EvalError::no_matching_overload(op.function()).at(expr_id));
    }
    if let Some(err) = values.iter().find(|v| v.is_error()) {
        return err.clone();
    }
    if let Some(unknowns) = frame.utility.identify_and_merge_unknowns(values, trails, false) {
        return Value::unknown(unknowns);
    }
    Value::Bool(!absorbing)
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Const(value) => write!(f, "Const({})", value),
            Step::Ident { name, .. } => write!(f, "Ident({})", name),
            Step::Slot(index) => write!(f, "Slot({})", index),
            Step::Select {
                field, test_only, ..
            } => write!(f, "Select({}, test_only={})", field, test_only),
            Step::Index { optional, .. } => write!(f, "Index(optional={})", optional),
            Step::Call {
                function, arity, ..
            } => write!(f, "Call({}/{})", function, arity),
            Step::CreateList { size, .. } => write!(f, "CreateList({})", size),
            Step::CreateMap { entries, .. } => write!(f, "CreateMap({})", entries),
            Step::CreateStruct { struct_type, .. } => {
                write!(f, "CreateStruct({})", struct_type.name())
            }
            Step::CreateMutableList => write!(f, "CreateMutableList"),
            Step::Jump(offset) => write!(f, "Jump({})", offset),
            Step::JumpIfBool { absorbing, offset } => {
                write!(f, "JumpIfBool({}, {})", absorbing, offset)
            }
            Step::Logic { op, .. } => write!(f, "Logic({:?})", op),
            Step::CondJump {
                else_offset,
                error_offset,
                ..
            } => write!(f, "CondJump({}, {})", else_offset, error_offset),
            Step::ComprehensionInit { end_offset, .. } => {
                write!(f, "ComprehensionInit({})", end_offset)
            }
            Step::ComprehensionNext {
                body_offset,
                error_offset,
                ..
            } => write!(f, "ComprehensionNext({}, {})", body_offset, error_offset),
            Step::ComprehensionCond {
                result_offset,
                finish_offset,
                ..
            } => write!(f, "ComprehensionCond({}, {})", result_offset, finish_offset),
            Step::ComprehensionFinish { .. } => write!(f, "ComprehensionFinish"),
            Step::CheckLazyInit {
                slot,
                subexpression,
            } => write!(f, "CheckLazyInit({}, {})", slot, subexpression),
            Step::AssignSlot { slot, pop } => write!(f, "AssignSlot({}, pop={})", slot, pop),
            Step::ClearSlot(slot) => write!(f, "ClearSlot({})", slot),
            Step::Direct(node) => write!(f, "Direct({:?})", node),
        }
    }
}
