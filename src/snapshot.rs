//! Snapshot export/import
//!
//! A snapshot is the set of live pairs at one point in time, encoded with
//! bincode. It carries no region layout, so it can be restored into a store
//! with a different geometry as long as every pair fits.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::{Result, StoreError};
use crate::flash::Flash;

/// Snapshot encoding version
pub const SNAPSHOT_FORMAT: u16 = 1;

/// One exported pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Live pairs of a store, sorted by key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    format: u16,
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Read every live pair out of `engine`
    pub fn capture<F: Flash>(engine: &mut Engine<F>) -> Result<Self> {
        let mut entries = engine
            .iter()?
            .map(|item| {
                item.map(|(key, value)| SnapshotEntry {
                    key: key.to_vec(),
                    value: value.to_vec(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::debug!("Captured snapshot of {} entries", entries.len());

        Ok(Self {
            format: SNAPSHOT_FORMAT,
            entries,
        })
    }

    /// Set every pair into `engine`, returning how many were written
    ///
    /// Existing keys not in the snapshot are left alone. Stops at the first
    /// failing `set`.
    pub fn restore<F: Flash>(&self, engine: &mut Engine<F>) -> Result<usize> {
        for entry in &self.entries {
            engine.set(&entry.key, &entry.value)?;
        }
        tracing::debug!("Restored {} snapshot entries", self.entries.len());
        Ok(self.entries.len())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let snapshot: Snapshot = bincode::deserialize(data)?;
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(StoreError::Serialization(format!(
                "unsupported snapshot format {}",
                snapshot.format
            )));
        }
        Ok(snapshot)
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
