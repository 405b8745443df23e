//! Load-bearing slots and the capability shared by everything that has them.
//!
//! A slot holds at most one object and an ordered set of reservation tags.
//! A tag is the id of an order that has claimed the slot for future traffic:
//! an inbound delivery, or a pickup of the object already sitting there.
//! Reserving twice for the same order is a no-op.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::OrderId;

/// Index of a slot within its holder.
pub type SlotIndex = usize;

/// Display label of a slot index (`slot_0`, `slot_1`, ...).
pub fn slot_label(index: SlotIndex) -> String {
    format!("slot_{index}")
}

/// A single object-holding position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Occupying object, if any.
    pub object_id: Option<String>,
    /// Orders that have claimed this slot, in claim order.
    pub reservations: Vec<OrderId>,
}

impl Slot {
    /// Whether no object occupies the slot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.object_id.is_none()
    }

    /// Whether any order has claimed the slot.
    #[inline]
    pub fn is_reserved(&self) -> bool {
        !self.reservations.is_empty()
    }

    /// Whether `order_id` has claimed the slot.
    #[inline]
    pub fn is_reserved_by(&self, order_id: OrderId) -> bool {
        self.reservations.contains(&order_id)
    }

    /// Adds a reservation tag. Returns `false` if the tag was already present.
    pub fn reserve(&mut self, order_id: OrderId) -> bool {
        if self.is_reserved_by(order_id) {
            return false;
        }
        self.reservations.push(order_id);
        true
    }

    /// Removes a reservation tag. Returns `false` if it was not present.
    pub fn release(&mut self, order_id: OrderId) -> bool {
        match self.reservations.iter().position(|&o| o == order_id) {
            Some(idx) => {
                self.reservations.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// Anything exposing a fixed array of slots (robots and stations).
pub trait SlotHolder {
    /// Entity id, used in logs and errors.
    fn holder_id(&self) -> &str;

    /// All slots, indexed by slot number.
    fn slots(&self) -> &[Slot];

    /// Mutable access to all slots.
    fn slots_mut(&mut self) -> &mut [Slot];

    /// Total number of slots.
    fn capacity(&self) -> usize {
        self.slots().len()
    }

    /// Number of slots without an object.
    fn free_count(&self) -> usize {
        self.slots().iter().filter(|s| s.is_empty()).count()
    }

    /// Number of slots holding an object.
    fn occupied_count(&self) -> usize {
        self.capacity() - self.free_count()
    }

    /// Number of slots that are empty and not claimed by any order.
    fn unreserved_free_count(&self) -> usize {
        self.slots()
            .iter()
            .filter(|s| s.is_empty() && !s.is_reserved())
            .count()
    }

    /// Slot holding `object_id`.
    fn find_object(&self, object_id: &str) -> Option<SlotIndex> {
        self.slots()
            .iter()
            .position(|s| s.object_id.as_deref() == Some(object_id))
    }

    /// First empty slot.
    fn find_free_slot(&self) -> Option<SlotIndex> {
        self.slots().iter().position(Slot::is_empty)
    }

    /// First slot claimed by `order_id`.
    fn reserved_slot(&self, order_id: OrderId) -> Option<SlotIndex> {
        self.slots().iter().position(|s| s.is_reserved_by(order_id))
    }

    /// Whether `object_id` occupies one of the slots.
    fn holds(&self, object_id: &str) -> bool {
        self.find_object(object_id).is_some()
    }

    /// Set of objects currently held.
    fn objects(&self) -> BTreeSet<String> {
        self.slots()
            .iter()
            .filter_map(|s| s.object_id.clone())
            .collect()
    }

    /// Removes every tag of `order_id`. Returns how many were removed.
    fn release_order(&mut self, order_id: OrderId) -> usize {
        let mut released = 0;
        for slot in self.slots_mut() {
            if slot.release(order_id) {
                released += 1;
            }
        }
        released
    }
}

pub(crate) fn empty_slots(capacity: usize) -> Vec<Slot> {
    vec![Slot::default(); capacity]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rack {
        slots: Vec<Slot>,
    }

    impl SlotHolder for Rack {
        fn holder_id(&self) -> &str {
            "rack"
        }
        fn slots(&self) -> &[Slot] {
            &self.slots
        }
        fn slots_mut(&mut self) -> &mut [Slot] {
            &mut self.slots
        }
    }

    #[test]
    fn test_reserve_is_idempotent() {
        let mut slot = Slot::default();
        assert!(slot.reserve(7));
        assert!(!slot.reserve(7));
        assert_eq!(slot.reservations, vec![7]);
        assert!(slot.release(7));
        assert!(!slot.release(7));
        assert!(!slot.is_reserved());
    }

    #[test]
    fn test_holder_queries() {
        let mut rack = Rack {
            slots: empty_slots(3),
        };
        rack.slots[1].object_id = Some("Object01".into());
        rack.slots[2].reserve(4);

        assert_eq!(rack.capacity(), 3);
        assert_eq!(rack.free_count(), 2);
        assert_eq!(rack.occupied_count(), 1);
        assert_eq!(rack.unreserved_free_count(), 1);
        assert_eq!(rack.find_object("Object01"), Some(1));
        assert_eq!(rack.find_free_slot(), Some(0));
        assert_eq!(rack.reserved_slot(4), Some(2));
        assert!(rack.holds("Object01"));
        assert_eq!(rack.objects().len(), 1);

        rack.slots[0].reserve(4);
        assert_eq!(rack.release_order(4), 2);
        assert_eq!(rack.unreserved_free_count(), 2);
    }

    #[test]
    fn test_slot_label() {
        assert_eq!(slot_label(2), "slot_2");
    }
}
