//! Direct (recursive) evaluation of subtrees without control flow.
//!
//! A `DirectNode` tree computes its value by evaluating children in order
//! and applying the node's operation. Strict positions stop at the first
//! error child; unknowns are only merged once every child has been seen.

use std::fmt;
use std::sync::Arc;

use cel_core_common::ExprId;
use rustc_hash::FxHashSet;

use super::frame::ExecutionFrame;
use super::ops;
use crate::attribute::AttributeTrail;
use crate::error::EngineError;
use crate::functions::Overload;
use crate::types::StructType;
use crate::value::Value;

type Evaluated = (Value, AttributeTrail);

pub(crate) enum DirectNode {
    Const(Value),
    Ident {
        name: Arc<str>,
        expr_id: ExprId,
    },
    Slot(usize),
    Select {
        operand: Box<DirectNode>,
        field: Arc<str>,
        test_only: bool,
        optional: bool,
        expr_id: ExprId,
    },
    Index {
        container: Box<DirectNode>,
        key: Box<DirectNode>,
        optional: bool,
        expr_id: ExprId,
    },
    Call {
        function: Arc<str>,
        overloads: Arc<[Arc<Overload>]>,
        args: Vec<DirectNode>,
        expr_id: ExprId,
    },
    CreateList {
        elements: Vec<DirectNode>,
        optional_indices: FxHashSet<usize>,
        expr_id: ExprId,
    },
    /// Keys and values interleaved.
    CreateMap {
        entries: Vec<DirectNode>,
        optional_indices: FxHashSet<usize>,
        expr_id: ExprId,
    },
    CreateStruct {
        struct_type: StructType,
        fields: Arc<[Arc<str>]>,
        values: Vec<DirectNode>,
        optional_indices: FxHashSet<usize>,
        expr_id: ExprId,
    },
}

impl DirectNode {
    pub(crate) fn evaluate(&self, frame: &ExecutionFrame<'_>) -> Result<Evaluated, EngineError> {
        match self {
            DirectNode::Const(value) => Ok((value.clone(), AttributeTrail::empty())),
            DirectNode::Ident { name, expr_id } => Ok(ops::resolve_ident(frame, name, *expr_id)),
            DirectNode::Slot(index) => {
                let slot = frame.slots.read(*index)?;
                Ok((slot.value.clone(), slot.trail.clone()))
            }
            DirectNode::Select {
                operand,
                field,
                test_only,
                optional,
                expr_id,
            } => {
                let (value, trail) = operand.evaluate(frame)?;
                Ok(ops::select(
                    frame, value, trail, field, *test_only, *optional, *expr_id,
                ))
            }
            DirectNode::Index {
                container,
                key,
                optional,
                expr_id,
            } => {
                let (container, trail) = container.evaluate(frame)?;
                if container.is_error() {
                    return Ok((container, trail));
                }
                let (key, _) = key.evaluate(frame)?;
                Ok(ops::index(frame, container, trail, key, *optional, *expr_id))
            }
            DirectNode::Call {
                function,
                overloads,
                args,
                expr_id,
            } => {
                let strict = overloads.iter().all(|o| o.descriptor.is_strict());
                let (values, trails) = match evaluate_all(frame, args, strict)? {
                    Ok(evaluated) => evaluated,
                    Err(error) => return Ok((error, AttributeTrail::empty())),
                };
                let result = ops::call(frame, function, overloads, &values, &trails, *expr_id);
                Ok((result, AttributeTrail::empty()))
            }
            DirectNode::CreateList {
                elements,
                optional_indices,
                expr_id,
            } => {
                let value = match evaluate_all(frame, elements, true)? {
                    Ok((values, trails)) => {
                        ops::create_list(frame, values, &trails, optional_indices, *expr_id)
                    }
                    Err(error) => error,
                };
                Ok((value, AttributeTrail::empty()))
            }
            DirectNode::CreateMap {
                entries,
                optional_indices,
                expr_id,
            } => {
                let value = match evaluate_all(frame, entries, true)? {
                    Ok((values, trails)) => {
                        ops::create_map(frame, values, &trails, optional_indices, *expr_id)
                    }
                    Err(error) => error,
                };
                Ok((value, AttributeTrail::empty()))
            }
            DirectNode::CreateStruct {
                struct_type,
                fields,
                values,
                optional_indices,
                expr_id,
            } => {
                let value = match evaluate_all(frame, values, true)? {
                    Ok((values, trails)) => ops::create_struct(
                        frame,
                        struct_type,
                        fields,
                        values,
                        &trails,
                        optional_indices,
                        *expr_id,
                    ),
                    Err(error) => error,
                };
                Ok((value, AttributeTrail::empty()))
            }
        }
    }
}

/// Evaluate sibling nodes in order. With `stop_at_error`, the first error
/// is returned as `Err` and the remaining siblings are skipped.
fn evaluate_all(
    frame: &ExecutionFrame<'_>,
    nodes: &[DirectNode],
    stop_at_error: bool,
) -> Result<Result<(Vec<Value>, Vec<AttributeTrail>), Value>, EngineError> {
    let mut values = Vec::with_capacity(nodes.len());
    let mut trails = Vec::with_capacity(nodes.len());
    for node in nodes {
        let (value, trail) = node.evaluate(frame)?;
        if stop_at_error && value.is_error() {
            return Ok(Err(value));
        }
        values.push(value);
        trails.push(trail);
    }
    Ok(Ok((values, trails)))
}

impl fmt::Debug for DirectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectNode::Const(value) => write!(f, "{}", value),
            DirectNode::Ident { name, .. } => write!(f, "{}", name),
            DirectNode::Slot(index) => write!(f, "${}", index),
            DirectNode::Select {
                operand,
                field,
                test_only,
                ..
            } => {
                if *test_only {
                    write!(f, "has({:?}.{})", operand, field)
                } else {
                    write!(f, "{:?}.{}", operand, field)
                }
            }
            DirectNode::Index { container, key, .. } => write!(f, "{:?}[{:?}]", container, key),
            DirectNode::Call { function, args, .. } => {
                f.debug_tuple(function).field(args).finish()
            }
            DirectNode::CreateList { elements, .. } => f.debug_list().entries(elements).finish(),
            DirectNode::CreateMap { entries, .. } => {
                f.debug_map().entries(entries.chunks(2).filter_map(|pair| match pair {
                    [k, v] => Some((k, v)),
                    _ => None,
                }))
                .finish()
            }
            DirectNode::CreateStruct {
                struct_type,
                fields,
                values,
                ..
            } => {
                let mut s = f.debug_struct(struct_type.name());
                for (name, value) in fields.iter().zip(values) {
                    s.field(name, value);
                }
                s.finish()
            }
        }
    }
}
