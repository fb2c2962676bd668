//! The evaluator: plans, steps, direct trees and the execution frame.

mod comprehension;
mod direct;
mod executor;
mod frame;
mod ops;
mod slots;
mod stack;
mod step;

pub(crate) use direct::DirectNode;
pub(crate) use executor::execute;
pub(crate) use frame::ExecutionFrame;
pub(crate) use step::{LogicOp, Step};

use crate::error::PlanError;

/// A compiled expression: the main step sequence, the subexpressions that
/// lazy bindings call into, and the number of slots a frame must provide.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub(crate) main: Vec<Step>,
    pub(crate) subexpressions: Vec<Vec<Step>>,
    pub(crate) slot_count: usize,
}

impl Plan {
    pub(crate) fn step_count(&self) -> usize {
        self.main.len() + self.subexpressions.iter().map(Vec::len).sum::<usize>()
    }

    /// Check every jump of every sequence against that sequence's bounds,
    /// and every lazy call against the subexpression table.
    pub(crate) fn validate(&self) -> Result<(), PlanError> {
        for sequence in std::iter::once(&self.main).chain(&self.subexpressions) {
            for (pc, step) in sequence.iter().enumerate() {
                for offset in step.jump_offsets() {
                    executor::jump_target(pc, offset, sequence.len()).map_err(|_| {
                        PlanError::InvalidJump {
                            step: pc,
                            target: pc as isize + 1 + offset,
                            len: sequence.len(),
                        }
                    })?;
                }
                if let Step::CheckLazyInit { subexpression, .. } = step {
                    if *subexpression >= self.subexpressions.len() {
                        return Err(PlanError::InvalidExpression {
                            expr_id: 0,
                            message: format!("lazy binding calls missing subexpression {}", subexpression),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_rejects_out_of_range_jumps() {
        let plan = Plan {
            main: vec![Step::Jump(2), Step::Const(Value::Null)],
            subexpressions: Vec::new(),
            slot_count: 0,
        };
        assert_eq!(
            plan.validate().unwrap_err(),
            PlanError::InvalidJump {
                step: 0,
                target: 3,
                len: 2
            }
        );
    }

    #[test]
    fn test_validate_accepts_jump_to_end() {
        let plan = Plan {
            main: vec![Step::Const(Value::Null), Step::Jump(0)],
            subexpressions: vec![vec![Step::Jump(-1)]],
            slot_count: 0,
        };
        assert!(plan.validate().is_ok());
        assert_eq!(plan.step_count(), 3);
    }
}
