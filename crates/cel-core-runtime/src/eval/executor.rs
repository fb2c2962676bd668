//! The program-counter loop that runs a plan.

use super::frame::ExecutionFrame;
use super::step::{Control, Step};
use super::Plan;
use crate::error::EngineError;
use crate::value::Value;

/// Which step sequence is running.
#[derive(Debug, Clone, Copy)]
enum Sequence {
    Main,
    Subexpression(usize),
}

fn steps(plan: &Plan, sequence: Sequence) -> Result<&[Step], EngineError> {
    match sequence {
        Sequence::Main => Ok(&plan.main),
        Sequence::Subexpression(index) => plan
            .subexpressions
            .get(index)
            .map(Vec::as_slice)
            .ok_or(EngineError::InvalidSubexpression { index }),
    }
}

/// The step index `offset` steps past the one after `pc`. The end of the
/// sequence is a valid target.
pub(crate) fn jump_target(pc: usize, offset: isize, len: usize) -> Result<usize, EngineError> {
    let target = pc as isize + 1 + offset;
    if target < 0 || target as usize > len {
        return Err(EngineError::InvalidJump {
            step: pc,
            target,
            len,
        });
    }
    Ok(target as usize)
}

/// Run the plan to completion and return the single value it leaves.
pub(crate) fn execute(plan: &Plan, frame: &mut ExecutionFrame<'_>) -> Result<Value, EngineError> {
    let mut sequence = Sequence::Main;
    let mut current = steps(plan, sequence)?;
    let mut pc = 0;
    let mut returns: Vec<(Sequence, usize)> = Vec::new();

    loop {
        let Some(step) = current.get(pc) else {
            match returns.pop() {
                Some((caller, resume)) => {
                    sequence = caller;
                    current = steps(plan, sequence)?;
                    pc = resume;
                    continue;
                }
                None => break,
            }
        };

        match step.evaluate(frame)? {
            Control::Continue => pc += 1,
            Control::Jump(offset) => pc = jump_target(pc, offset, current.len())?,
            Control::Call {
                subexpression,
                return_offset,
            } => {
                let resume = jump_target(pc, return_offset, current.len())?;
                returns.push((sequence, resume));
                sequence = Sequence::Subexpression(subexpression);
                current = steps(plan, sequence)?;
                pc = 0;
            }
        }
    }

    if frame.stack.len() != 1 {
        return Err(EngineError::StackImbalance {
            size: frame.stack.len(),
        });
    }
    frame.stack.pop_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::EmptyActivation;
    use crate::options::RuntimeOptions;
    use pretty_assertions::assert_eq;

    fn run(plan: &Plan) -> Result<Value, EngineError> {
        let options = RuntimeOptions::default();
        let mut frame = ExecutionFrame::new(&EmptyActivation, &options, plan.slot_count, 4);
        execute(plan, &mut frame)
    }

    #[test]
    fn test_jump_target_bounds() {
        assert_eq!(jump_target(0, 2, 3).unwrap(), 3);
        assert_eq!(jump_target(2, -3, 3).unwrap(), 0);
        assert!(jump_target(0, 3, 3).is_err());
        assert!(jump_target(0, -2, 3).is_err());
    }

    #[test]
    fn test_stack_imbalance() {
        let plan = Plan {
            main: vec![Step::Const(Value::Int(1)), Step::Const(Value::Int(2))],
            subexpressions: Vec::new(),
            slot_count: 0,
        };
        assert_eq!(run(&plan).unwrap_err(), EngineError::StackImbalance { size: 2 });
    }

    #[test]
    fn test_jump_skips_steps() {
        let plan = Plan {
            main: vec![
                Step::Const(Value::Int(1)),
                Step::Jump(1),
                Step::Const(Value::Int(2)),
            ],
            subexpressions: Vec::new(),
            slot_count: 0,
        };
        assert_eq!(run(&plan).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_lazy_subexpression_runs_once() {
        // cel.bind(y, 20, y + y) with `y` computed by subexpression 0.
        let registry = crate::functions::FunctionRegistry::with_standard_library();
        let add = registry.find_overloads("_+_", false, 2);
        let plan = Plan {
            main: vec![
                Step::CheckLazyInit {
                    slot: 0,
                    subexpression: 0,
                },
                Step::AssignSlot { slot: 0, pop: false },
                Step::CheckLazyInit {
                    slot: 0,
                    subexpression: 0,
                },
                Step::AssignSlot { slot: 0, pop: false },
                Step::Call {
                    function: "_+_".into(),
                    overloads: add.into(),
                    arity: 2,
                    expr_id: 1,
                },
                Step::ClearSlot(0),
            ],
            subexpressions: vec![vec![Step::Const(Value::Int(20))]],
            slot_count: 1,
        };
        assert_eq!(run(&plan).unwrap(), Value::Int(40));
    }

    #[test]
    fn test_missing_subexpression() {
        let plan = Plan {
            main: vec![Step::CheckLazyInit {
                slot: 0,
                subexpression: 3,
            }],
            subexpressions: Vec::new(),
            slot_count: 1,
        };
        assert_eq!(
            run(&plan).unwrap_err(),
            EngineError::InvalidSubexpression { index: 3 }
        );
    }
}
