//! The evaluator's value stack.
//!
//! Values and their attribute trails are kept in two vectors that always
//! have the same length, so a trail can be read back for any value on the
//! stack without allocating pairs.

use crate::attribute::AttributeTrail;
use crate::error::EngineError;
use crate::value::Value;

#[derive(Debug, Default)]
pub(crate) struct ValueStack {
    values: Vec<Value>,
    trails: Vec<AttributeTrail>,
}

impl ValueStack {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            trails: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn has_enough(&self, n: usize) -> bool {
        self.values.len() >= n
    }

    fn ensure(&self, n: usize) -> Result<(), EngineError> {
        if self.has_enough(n) {
            Ok(())
        } else {
            Err(EngineError::StackUnderflow {
                needed: n,
                available: self.values.len(),
            })
        }
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.push_with_trail(value, AttributeTrail::empty());
    }

    pub(crate) fn push_with_trail(&mut self, value: Value, trail: AttributeTrail) {
        self.values.push(value);
        self.trails.push(trail);
    }

    pub(crate) fn pop(&mut self) -> Result<(Value, AttributeTrail), EngineError> {
        self.ensure(1)?;
        match (self.values.pop(), self.trails.pop()) {
            (Some(value), Some(trail)) => Ok((value, trail)),
            _ => Err(EngineError::StackUnderflow {
                needed: 1,
                available: 0,
            }),
        }
    }

    pub(crate) fn pop_value(&mut self) -> Result<Value, EngineError> {
        self.pop().map(|(value, _)| value)
    }

    /// Pop the top `n` entries, returned in push order.
    pub(crate) fn pop_n(&mut self, n: usize) -> Result<(Vec<Value>, Vec<AttributeTrail>), EngineError> {
        self.ensure(n)?;
        let at = self.values.len() - n;
        Ok((self.values.split_off(at), self.trails.split_off(at)))
    }

    pub(crate) fn peek(&self) -> Result<&Value, EngineError> {
        self.ensure(1)?;
        self.values.last().ok_or(EngineError::StackUnderflow {
            needed: 1,
            available: 0,
        })
    }

    /// Replace the value on top of the stack, keeping its trail.
    pub(crate) fn replace_top(&mut self, value: Value) -> Result<(), EngineError> {
        self.ensure(1)?;
        if let Some(top) = self.values.last_mut() {
            *top = value;
        }
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
        self.trails.clear();
    }
}
