//! Fixed-capacity slot table for live connections.
//!
//! ```text
//!   slot:   0          1         2          3         4
//!        ┌──────────┬────────┬──────────┬────────┬────────┐
//!        │ Occupied │ Vacant │ Occupied │ Vacant │ Vacant │
//!        └──────────┴────────┴──────────┴────────┴────────┘
//!             ▲                   ▲
//!             └─ insert() fills the first Vacant slot, scanning upward
//! ```
//!
//! A handle never moves once it has a slot. Removing it hands ownership back
//! to the caller, so the handle is closed exactly once when the caller drops
//! it.

use std::fmt;

/// Index of a slot in a [`ConnectionTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(pub usize);

impl SlotIndex {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned by [`ConnectionTable::insert`] when every slot is occupied.
///
/// Carries the rejected handle so the caller decides how to close it.
pub struct TableFull<T>(pub T);

impl<T> TableFull<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for TableFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TableFull")
    }
}

#[derive(Debug)]
enum Slot<T> {
    Vacant,
    Occupied(T),
}

impl<T> Slot<T> {
    fn as_ref(&self) -> Option<&T> {
        match self {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant => None,
        }
    }

    fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, Slot::Vacant) {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant => None,
        }
    }
}

#[derive(Debug)]
pub struct ConnectionTable<T> {
    slots: Vec<Slot<T>>,
    len: usize,
}

impl<T> ConnectionTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot::Vacant);
        Self { slots, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Places `handle` in the lowest vacant slot.
    pub fn insert(&mut self, handle: T) -> Result<SlotIndex, TableFull<T>> {
        match self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Vacant))
        {
            Some(index) => {
                self.slots[index] = Slot::Occupied(handle);
                self.len += 1;
                Ok(SlotIndex(index))
            }
            None => Err(TableFull(handle)),
        }
    }

    /// Vacates `slot` and returns its handle. Out-of-range or vacant slots
    /// yield `None`.
    pub fn remove(&mut self, slot: SlotIndex) -> Option<T> {
        let removed = self.slots.get_mut(slot.0)?.take();
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Removes the handle in the lowest occupied slot.
    pub fn remove_first_open(&mut self) -> Option<(SlotIndex, T)> {
        let index = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Occupied(_)))?;
        let slot = SlotIndex(index);
        self.remove(slot).map(|handle| (slot, handle))
    }

    pub fn get(&self, slot: SlotIndex) -> Option<&T> {
        self.slots.get(slot.0).and_then(Slot::as_ref)
    }

    pub fn get_mut(&mut self, slot: SlotIndex) -> Option<&mut T> {
        match self.slots.get_mut(slot.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant => None,
        }
    }

    /// Occupied slots in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (SlotIndex(index), value)))
    }

    /// Snapshot of the occupied indices, so the caller can mutate the table
    /// while walking them.
    pub fn occupied(&self) -> Vec<SlotIndex> {
        self.iter().map(|(slot, _)| slot).collect()
    }

    /// Removes every handle, lowest slot first.
    pub fn drain(&mut self) -> Vec<(SlotIndex, T)> {
        self.len = 0;
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.take().map(|value| (SlotIndex(index), value)))
            .collect()
    }
}
