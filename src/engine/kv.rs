//! Key-value operations on the active region

use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::flash::Flash;
use crate::region::{Record, RecordSlot};

use super::Engine;

impl<F: Flash> Engine<F> {
    /// Store a key-value pair
    ///
    /// Steps:
    /// 1. Validate lengths and index capacity
    /// 2. Compact once if the active region has no free slot
    /// 3. Append the new record and point the index at it
    /// 4. Tombstone the record it supersedes, if any
    ///
    /// A crash between steps 3 and 4 leaves two live records for the key;
    /// recovery keeps the later one. A failed tombstone write is logged and
    /// the call still succeeds: the new value is stored and indexed, and the
    /// stale copy is retired on the next open or compaction.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        let layout = self.active_log().layout();
        layout.check_key(key)?;
        layout.check_value(value)?;

        if !self.index.contains(key) && self.index.is_full() {
            return Err(StoreError::HashFull);
        }

        if !self.has_free_slot() {
            tracing::debug!(
                "Instance {}: active region full at {:#x}, compacting",
                self.config.instance_id,
                self.cursor
            );
            self.gc()?;
            if !self.has_free_slot() {
                return Err(StoreError::NoSpace);
            }
        }

        // The superseded offset comes from the index after any compaction
        let offset = self.append(&Record::live(key, value))?;
        let previous = self.index.insert(key, offset)?;

        match previous {
            Some(old) => {
                if let Err(e) = self.tombstone_at(old) {
                    tracing::warn!(
                        "Instance {}: superseded record at {:#x} left live: {}",
                        self.config.instance_id,
                        old,
                        e
                    );
                }
            }
            None => self.record_count += 1,
        }

        tracing::trace!(
            "Instance {}: set {} bytes at {:#x}",
            self.config.instance_id,
            value.len(),
            offset
        );
        Ok(())
    }

    /// Fetch the value stored for `key`
    ///
    /// `NotFound` when the key has no live record; `CrcFailure` when the
    /// indexed record no longer checks out.
    pub fn get(&mut self, key: &[u8]) -> Result<Bytes> {
        self.ensure_initialized()?;
        self.active_log().layout().check_key(key)?;

        let offset = self.index.get(key).ok_or(StoreError::NotFound)?;
        let log = self.active_log();

        match log.read_slot(&mut self.flash, offset)? {
            RecordSlot::Live(record) => Ok(record.value),
            RecordSlot::Dead(_) => Err(StoreError::NotFound),
            RecordSlot::Erased | RecordSlot::Corrupt => Err(StoreError::CrcFailure { offset }),
        }
    }

    /// Delete a key by tombstoning its record
    ///
    /// Deleting an absent key is `NotFound`, not a no-op.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        self.active_log().layout().check_key(key)?;

        let offset = self.index.get(key).ok_or(StoreError::NotFound)?;
        self.tombstone_at(offset)?;

        self.index.remove(key);
        self.record_count -= 1;

        tracing::trace!("Instance {}: deleted record at {:#x}", self.config.instance_id, offset);
        Ok(())
    }

    /// Index-only membership check; never touches flash
    pub fn exists(&self, key: &[u8]) -> bool {
        self.initialized && self.index.contains(key)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn has_free_slot(&self) -> bool {
        self.active_log().fits(self.cursor)
    }

    /// Write a record at the cursor and return its offset
    ///
    /// The slot is consumed even when the write fails: a partially
    /// programmed slot cannot be written again before an erase.
    fn append(&mut self, record: &Record) -> Result<u32> {
        let log = self.active_log();
        let offset = self.cursor;
        self.cursor += log.layout().size();
        log.write_record(&mut self.flash, offset, record)?;
        Ok(offset)
    }

    /// Flip the record at `offset` to DELETED if it is still live
    pub(super) fn tombstone_at(&mut self, offset: u32) -> Result<()> {
        let log = self.active_log();
        if let RecordSlot::Live(record) = log.read_slot(&mut self.flash, offset)? {
            log.tombstone(&mut self.flash, offset, &record)?;
        }
        Ok(())
    }
}
