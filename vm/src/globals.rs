use log::debug;
use memory::Value;

use crate::error::LinkError;

/// Slot-indexed bindings shared by every unit linked into the image.
///
/// The length only ever grows. Code bound by an earlier turn holds raw slot
/// indices, so growth must never move or reorder a slot.
#[derive(Debug, Default)]
pub struct GlobalTable {
    slots: Vec<Value>,
}

impl GlobalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend to exactly `min_len` slots, filling new ones with the empty
    /// sentinel. A no-op when the table is already long enough.
    pub fn ensure_capacity(&mut self, min_len: usize) {
        if self.slots.len() < min_len {
            debug!("global table grows {} -> {}", self.slots.len(), min_len);
            self.slots.resize(min_len, Value::empty());
        }
    }

    pub fn get(&self, index: usize) -> Result<Value, LinkError> {
        self.slots
            .get(index)
            .copied()
            .ok_or(LinkError::OutOfRange {
                index,
                len: self.slots.len(),
            })
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<(), LinkError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(LinkError::OutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `index` is in range and holds something other than the sentinel.
    pub fn is_bound(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Value)> + '_ {
        self.slots.iter().copied().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let table = GlobalTable::new();
        assert_eq!(table.len(), 0);
        assert_eq!(
            table.get(0),
            Err(LinkError::OutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn growth_is_exact_and_fills_with_empty() {
        let mut table = GlobalTable::new();
        table.ensure_capacity(3);
        assert_eq!(table.len(), 3);
        assert!(table.get(2).unwrap().is_empty());
        assert!(!table.is_bound(2));
    }

    #[test]
    fn shrinking_request_is_ignored() {
        let mut table = GlobalTable::new();
        table.ensure_capacity(4);
        table.set(3, Value::int(9)).unwrap();
        table.ensure_capacity(1);
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(3).unwrap().as_int(), Some(9));
    }

    #[test]
    fn set_out_of_range_fails() {
        let mut table = GlobalTable::new();
        table.ensure_capacity(2);
        assert_eq!(
            table.set(2, Value::nil()),
            Err(LinkError::OutOfRange { index: 2, len: 2 })
        );
    }
}
