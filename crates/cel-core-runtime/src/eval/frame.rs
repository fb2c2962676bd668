//! Mutable state for one evaluation of a program.

use super::comprehension::IterationContext;
use super::slots::SlotTable;
use super::stack::ValueStack;
use crate::activation::Activation;
use crate::attribute::{AttributePattern, AttributeUtility};
use crate::error::EngineError;
use crate::options::RuntimeOptions;

/// Everything one evaluation owns: the value stack, the slot table and the
/// stack of active comprehensions. The activation, the pattern slices and
/// the options are borrowed for the duration of the evaluation.
pub(crate) struct ExecutionFrame<'a> {
    pub(crate) stack: ValueStack,
    pub(crate) slots: SlotTable,
    pub(crate) iterations: Vec<IterationContext>,
    pub(crate) activation: &'a dyn Activation,
    pub(crate) utility: AttributeUtility<'a>,
    pub(crate) options: &'a RuntimeOptions,
}

impl<'a> ExecutionFrame<'a> {
    pub(crate) fn new(
        activation: &'a dyn Activation,
        options: &'a RuntimeOptions,
        slot_count: usize,
        stack_capacity: usize,
    ) -> Self {
        let unknown_patterns: &[AttributePattern] = if options.unknown_processing {
            activation.unknown_attribute_patterns()
        } else {
            &[]
        };
        let missing_patterns: &[AttributePattern] = if options.enable_missing_attribute_errors {
            activation.missing_attribute_patterns()
        } else {
            &[]
        };
        Self {
            stack: ValueStack::with_capacity(stack_capacity),
            slots: SlotTable::new(slot_count),
            iterations: Vec::new(),
            activation,
            utility: AttributeUtility::new(unknown_patterns, missing_patterns),
            options,
        }
    }

    pub(crate) fn enable_unknowns(&self) -> bool {
        self.options.unknown_processing
    }

    pub(crate) fn enable_missing_attribute_errors(&self) -> bool {
        self.options.enable_missing_attribute_errors
    }

    pub(crate) fn enable_attribute_tracking(&self) -> bool {
        self.options.attribute_tracking_enabled()
    }

    pub(crate) fn current_iteration(&mut self) -> Result<&mut IterationContext, EngineError> {
        self.iterations
            .last_mut()
            .ok_or(EngineError::MissingIterationContext)
    }
}
