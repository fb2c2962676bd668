//! Per-evaluation variable slots.
//!
//! Comprehension variables and `cel.bind` values live here, addressed by an
//! index the planner assigns. The table belongs to the frame, never to the
//! plan, so concurrent evaluations of one program cannot observe each
//! other's bindings.

use crate::attribute::AttributeTrail;
use crate::error::EngineError;
use crate::value::Value;

#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub(crate) value: Value,
    pub(crate) trail: AttributeTrail,
}

#[derive(Debug)]
pub(crate) struct SlotTable {
    slots: Vec<Option<Slot>>,
}

impl SlotTable {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
        }
    }

    fn entry(&mut self, index: usize) -> Result<&mut Option<Slot>, EngineError> {
        let count = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(EngineError::InvalidSlot { index, count })
    }

    /// The slot's contents, or `None` if nothing is assigned.
    pub(crate) fn get(&self, index: usize) -> Result<Option<&Slot>, EngineError> {
        self.slots
            .get(index)
            .map(Option::as_ref)
            .ok_or(EngineError::InvalidSlot {
                index,
                count: self.slots.len(),
            })
    }

    /// The slot's contents; reading an unassigned slot is a malformed plan.
    pub(crate) fn read(&self, index: usize) -> Result<&Slot, EngineError> {
        self.get(index)?.ok_or(EngineError::EmptySlot { index })
    }

    pub(crate) fn set(&mut self, index: usize, value: Value, trail: AttributeTrail) -> Result<(), EngineError> {
        *self.entry(index)? = Some(Slot { value, trail });
        Ok(())
    }

    pub(crate) fn clear(&mut self, index: usize) -> Result<(), EngineError> {
        *self.entry(index)? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_read_clear() {
        let mut slots = SlotTable::new(2);
        assert!(slots.get(1).unwrap().is_none());
        slots.set(1, Value::Int(4), AttributeTrail::empty()).unwrap();
        assert_eq!(slots.read(1).unwrap().value, Value::Int(4));
        slots.clear(1).unwrap();
        assert_eq!(slots.read(1).unwrap_err(), EngineError::EmptySlot { index: 1 });
    }

    #[test]
    fn test_out_of_range_slot() {
        let mut slots = SlotTable::new(1);
        assert_eq!(
            slots.set(3, Value::Null, AttributeTrail::empty()).unwrap_err(),
            EngineError::InvalidSlot { index: 3, count: 1 }
        );
        assert!(slots.get(1).is_err());
    }
}
