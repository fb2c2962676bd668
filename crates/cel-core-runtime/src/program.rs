//! Planned CEL program ready for evaluation.
//!
//! A `Program` owns an immutable plan. Each call to [`Program::evaluate`]
//! builds its own execution frame, so one program can be evaluated against
//! many activations, from many threads at once.

use std::fmt;
use std::sync::Arc;

use crate::activation::Activation;
use crate::error::EngineError;
use crate::eval::{execute, ExecutionFrame, Plan};
use crate::options::RuntimeOptions;
use crate::value::Value;

/// Stack capacity reserved up front for each evaluation.
const INITIAL_STACK_CAPACITY: usize = 16;

struct ProgramInner {
    plan: Plan,
    options: RuntimeOptions,
    uses_recursive_root: bool,
}

/// A planned expression. Cloning is cheap and shares the plan.
#[derive(Clone)]
pub struct Program {
    inner: Arc<ProgramInner>,
}

impl Program {
    pub(crate) fn new(plan: Plan, options: RuntimeOptions, uses_recursive_root: bool) -> Self {
        Self {
            inner: Arc::new(ProgramInner {
                plan,
                options,
                uses_recursive_root,
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn plan(&self) -> &Plan {
        &self.inner.plan
    }

    /// Evaluate the program against the given variable bindings.
    ///
    /// Expression-level failures (a division by zero, a missing key) come
    /// back as `Ok(Value::Error(..))`. `Err` means the plan itself is
    /// malformed.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn evaluate(&self, activation: &dyn Activation) -> Result<Value, EngineError> {
        let inner = &*self.inner;
        let mut frame = ExecutionFrame::new(
            activation,
            &inner.options,
            inner.plan.slot_count,
            INITIAL_STACK_CAPACITY,
        );
        execute(&inner.plan, &mut frame).map_err(|err| {
            tracing::warn!(error = %err, "evaluation aborted");
            err
        })
    }

    /// Total number of steps across the main sequence and all
    /// subexpressions.
    pub fn step_count(&self) -> usize {
        self.inner.plan.step_count()
    }

    /// True if the whole expression was planned as one direct tree.
    pub fn uses_recursive_root(&self) -> bool {
        self.inner.uses_recursive_root
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.inner.options
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("steps", &self.step_count())
            .field("slots", &self.inner.plan.slot_count)
            .field("uses_recursive_root", &self.inner.uses_recursive_root)
            .finish()
    }
}
