//! Hash index implementation
//!
//! Linear-probing table with backward-shift deletion.

use crate::error::{Result, StoreError};

use super::djb2;

/// One occupied slot
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    key: Box<[u8]>,
    offset: u32,
}

/// Fixed-capacity key → region offset map
#[derive(Debug, Clone)]
pub struct HashIndex {
    /// `None` is an empty slot
    slots: Vec<Option<Slot>>,
    /// Occupied slot count
    len: usize,
}

impl HashIndex {
    /// Create an empty index; `capacity` must be a power of two
    pub fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            slots: vec![None; capacity],
            len: 0,
        }
    }

    /// Look up a key's record offset
    pub fn get(&self, key: &[u8]) -> Option<u32> {
        self.find(key).and_then(|idx| self.slots[idx].as_ref().map(|s| s.offset))
    }

    /// Check membership without touching flash
    pub fn contains(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Insert or update a mapping
    ///
    /// Returns the previous offset for the key, if any. Fails with
    /// `HashFull` when the key is new and no empty slot is left.
    pub fn insert(&mut self, key: &[u8], offset: u32) -> Result<Option<u32>> {
        let mask = self.mask();
        let home = self.home(key);

        for probe in 0..self.capacity() {
            let idx = (home + probe) & mask;
            match self.slots[idx].as_mut() {
                Some(slot) if &*slot.key == key => {
                    let previous = slot.offset;
                    slot.offset = offset;
                    return Ok(Some(previous));
                }
                Some(_) => continue,
                None => {
                    self.slots[idx] = Some(Slot {
                        key: key.into(),
                        offset,
                    });
                    self.len += 1;
                    return Ok(None);
                }
            }
        }

        Err(StoreError::HashFull)
    }

    /// Remove a mapping, returning its offset
    ///
    /// Later entries of the same cluster are shifted back so that no probe
    /// sequence is cut short by the freed slot.
    pub fn remove(&mut self, key: &[u8]) -> Option<u32> {
        let mask = self.mask();
        let mut hole = self.find(key)?;
        let removed = self.slots[hole].take().map(|s| s.offset);
        self.len -= 1;

        let mut next = (hole + 1) & mask;
        while let Some(slot) = &self.slots[next] {
            let home = self.home(&slot.key);
            // Distance from home to the hole vs. to the current slot; the
            // entry may fill the hole only if the hole lies on its probe path.
            let to_hole = hole.wrapping_sub(home) & mask;
            let to_next = next.wrapping_sub(home) & mask;
            if to_hole < to_next {
                self.slots[hole] = self.slots[next].take();
                hole = next;
            }
            next = (next + 1) & mask;
        }

        removed
    }

    /// Drop every mapping
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.len = 0;
    }

    /// Number of keys mapped
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// True when a new key can no longer be inserted
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Iterate over `(key, offset)` pairs in slot order
    pub fn iter(&self) -> Slots<'_> {
        Slots {
            inner: self.slots.iter(),
        }
    }

    /// Mapping stored at a slot position, if occupied
    pub(crate) fn slot(&self, position: usize) -> Option<(&[u8], u32)> {
        self.slots
            .get(position)
            .and_then(|s| s.as_ref())
            .map(|s| (&*s.key, s.offset))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn find(&self, key: &[u8]) -> Option<usize> {
        let mask = self.mask();
        let home = self.home(key);

        for probe in 0..self.capacity() {
            let idx = (home + probe) & mask;
            match &self.slots[idx] {
                None => return None,
                Some(slot) if &*slot.key == key => return Some(idx),
                Some(_) => {}
            }
        }
        None
    }

    fn home(&self, key: &[u8]) -> usize {
        djb2(key) as usize & self.mask()
    }

    fn mask(&self) -> usize {
        self.capacity() - 1
    }
}

/// Iterator over occupied index slots
pub struct Slots<'a> {
    inner: std::slice::Iter<'a, Option<Slot>>,
}

impl<'a> Iterator for Slots<'a> {
    type Item = (&'a [u8], u32);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .find_map(|s| s.as_ref())
            .map(|s| (&*s.key, s.offset))
    }
}
