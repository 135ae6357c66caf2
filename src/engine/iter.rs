//! Enumeration of live pairs

use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::flash::Flash;
use crate::region::RecordSlot;

use super::Engine;

impl<F: Flash> Engine<F> {
    /// Lazily read every live `(key, value)` pair
    ///
    /// Pairs come out in index order, not insertion order. Each call starts
    /// a fresh pass. The iterator borrows the engine mutably, so the store
    /// cannot change underneath it.
    pub fn iter(&mut self) -> Result<Iter<'_, F>> {
        self.ensure_initialized()?;
        Ok(Iter {
            engine: self,
            position: 0,
        })
    }
}

/// Iterator over live pairs
///
/// A record that no longer verifies yields `CrcFailure`; iteration then
/// continues with the next key.
pub struct Iter<'a, F: Flash> {
    engine: &'a mut Engine<F>,
    position: usize,
}

impl<'a, F: Flash> Iterator for Iter<'a, F> {
    type Item = Result<(Bytes, Bytes)>;

    fn next(&mut self) -> Option<Self::Item> {
        let engine = &mut *self.engine;

        while self.position < engine.index.capacity() {
            let position = self.position;
            self.position += 1;

            let Some((_, offset)) = engine.index.slot(position) else {
                continue;
            };

            let log = engine.active_log();
            let item = match log.read_slot(&mut engine.flash, offset) {
                Ok(RecordSlot::Live(record)) => Ok((record.key, record.value)),
                Ok(_) => Err(StoreError::CrcFailure { offset }),
                Err(e) => Err(e.into()),
            };
            return Some(item);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.engine.index.len()))
    }
}
