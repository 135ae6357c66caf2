//! Compaction into the standby region
//!
//! ```text
//!   active (v)                      standby (v+1)
//!  ┌──────────┐                    ┌──────────┐
//!  │ hdr      │      erase         │ hdr  ◄───┼── written last
//!  │ a  live  │ ─────────────────► │ a        │
//!  │ b  dead  │    copy live       │ c        │
//!  │ c  live  │                    │ (free)   │
//!  │ ...      │                    │          │
//!  └──────────┘                    └──────────┘
//! ```
//!
//! Every live record on flash survives: the one the index points at for
//! keys it knows, the latest one for keys it does not. The source is read
//! in full before the standby is erased, so a read failure aborts with
//! nothing changed.
//!
//! The roles flip in memory only after the standby header has been written
//! and read back. Until then the old region keeps the higher valid version,
//! so a crash at any point reopens the pre-compaction state. A failed pass
//! leaves the standby partially written; the next pass erases it first.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::flash::Flash;
use crate::index::HashIndex;
use crate::region::{Record, RecordSlot, RegionHeader, TxState, HEADER_SIZE};

use super::Engine;

/// Outcome of one compaction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Live records carried into the new region
    pub records_copied: u32,

    /// Written slots not carried forward (tombstones, corrupt, superseded)
    pub slots_dropped: u32,

    /// Bytes returned to the free part of the record area
    pub bytes_reclaimed: u32,
}

impl<F: Flash> Engine<F> {
    /// Compact live records into the standby region and make it active
    pub fn gc(&mut self) -> Result<GcStats> {
        self.ensure_initialized()?;

        let stats = self.compact(true)?;

        tracing::info!(
            "Instance {}: gc copied {} records, dropped {} slots, reclaimed {} bytes; region {} active (version {})",
            self.config.instance_id,
            stats.records_copied,
            stats.slots_dropped,
            stats.bytes_reclaimed,
            self.active,
            self.version
        );
        Ok(stats)
    }

    /// Remove every key
    ///
    /// Implemented as a compaction that carries nothing forward, so an
    /// interrupted clear reopens either the old contents or an empty store.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_initialized()?;

        let stats = self.compact(false)?;

        tracing::info!(
            "Instance {}: cleared {} slots; region {} active (version {})",
            self.config.instance_id,
            stats.slots_dropped,
            self.active,
            self.version
        );
        Ok(())
    }

    fn compact(&mut self, carry_live: bool) -> Result<GcStats> {
        let source = self.regions[self.active];
        let target_region = 1 - self.active;
        let target = self.regions[target_region];
        let stride = source.layout().size();

        let version = self
            .version
            .checked_add(1)
            .ok_or_else(|| StoreError::GcFailure("region version counter exhausted".to_string()))?;

        let mut stats = GcStats::default();

        // Step 1: read everything worth keeping before touching the standby
        let survivors = if carry_live {
            self.collect_survivors(&mut stats)?
        } else {
            stats.slots_dropped = (self.cursor - HEADER_SIZE) / stride;
            Vec::new()
        };

        // Step 2: the standby region may hold anything, including a
        // half-finished earlier pass
        target.erase(&mut self.flash)?;

        // Step 3: copy survivors in log order and index the copies
        let mut index = HashIndex::with_capacity(self.config.index_capacity);
        let mut write_offset = HEADER_SIZE;

        for record in &survivors {
            target.write_record(&mut self.flash, write_offset, record)?;
            if let Err(e) = index.insert(&record.key, write_offset) {
                // Kept on flash; a store opened with a larger index finds it
                tracing::warn!(
                    "Instance {}: carried record at {:#x} is not indexed: {}",
                    self.config.instance_id,
                    write_offset,
                    e
                );
            }
            write_offset += stride;
            stats.records_copied += 1;
        }

        // Step 4: stamp the header last, then confirm it reads back valid
        let header = RegionHeader {
            magic: RegionHeader::alternate_magic(self.magic),
            version,
            record_count: index.len() as u32,
            active_offset: write_offset,
            tx_state: TxState::Idle,
        };
        target.write_header(&mut self.flash, &header)?;

        if target.read_header(&mut self.flash)? != Some(header) {
            return Err(StoreError::GcFailure(format!(
                "header of region {} did not verify after writing",
                target_region
            )));
        }

        // Step 5: swap roles
        stats.bytes_reclaimed = self.cursor - write_offset;
        self.active = target_region;
        self.version = version;
        self.magic = header.magic;
        self.record_count = index.len() as u32;
        self.index = index;
        self.cursor = write_offset;

        Ok(stats)
    }

    /// Live records to carry forward, in log order
    ///
    /// A key the index knows keeps only the record the index points at. A
    /// live record for a key the index does not know (skipped by a truncated
    /// scan or a full index at open) is still carried, latest copy only;
    /// the bytes on flash are the only copy of that data.
    fn collect_survivors(&mut self, stats: &mut GcStats) -> Result<Vec<Record>> {
        let source = self.regions[self.active];
        let written_end = self.cursor;

        let mut live = Vec::new();
        let mut latest_unindexed: HashMap<Bytes, u32> = HashMap::new();

        for offset in source.slot_offsets().take_while(|&o| o < written_end) {
            match source.read_slot(&mut self.flash, offset)? {
                RecordSlot::Erased => {}
                RecordSlot::Live(record) => {
                    if !self.index.contains(&record.key) {
                        latest_unindexed.insert(record.key.clone(), offset);
                    }
                    live.push((offset, record));
                }
                RecordSlot::Dead(_) | RecordSlot::Corrupt => stats.slots_dropped += 1,
            }
        }

        let mut survivors = Vec::with_capacity(live.len());
        for (offset, record) in live {
            let keep = match self.index.get(&record.key) {
                Some(indexed) => indexed == offset,
                None => latest_unindexed.get(&record.key) == Some(&offset),
            };
            if keep {
                survivors.push(record);
            } else {
                stats.slots_dropped += 1;
            }
        }

        if !latest_unindexed.is_empty() {
            tracing::warn!(
                "Instance {}: carrying {} keys found on flash but missing from the index",
                self.config.instance_id,
                latest_unindexed.len()
            );
        }
        Ok(survivors)
    }
}
