//! Engine Module
//!
//! The store engine that coordinates the flash adapter, the two region logs
//! and the hash index.
//!
//! ## Responsibilities
//! - Pick and recover the active region on open
//! - Dispatch set/get/delete against the active region
//! - Compact into the standby region when the active one fills up
//! - Report status and enumerate live pairs
//!
//! ## Concurrency Model
//! Single-threaded and synchronous. Every method takes `&mut self` or
//! `&self` and blocks on the adapter; a `set` may run a full compaction
//! before returning. Wrap the adapter in [`SharedFlash`] when the device
//! itself is shared.
//!
//! [`SharedFlash`]: crate::flash::SharedFlash

mod gc;
mod iter;
mod kv;
mod tx;

pub use gc::GcStats;
pub use iter::Iter;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::flash::Flash;
use crate::index::HashIndex;
use crate::region::{Record, RecordLayout, RecordSlot, RegionHeader, RegionLog, TxState, HEADER_SIZE};

/// What `open` found and did while recovering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Region chosen as active (0 or 1)
    pub active_region: usize,

    /// Header version of the active region
    pub version: u32,

    /// Regions whose header failed validation and were reformatted
    pub reinitialized: [bool; 2],

    /// Live records indexed
    pub records_recovered: u32,

    /// Tombstoned slots skipped
    pub tombstones_skipped: u32,

    /// Written slots that failed their CRC
    pub corrupt_skipped: u32,

    /// Live records replaced by a later live record for the same key
    pub superseded: u32,

    /// A read failed mid-scan; the index only covers slots before it
    pub scan_truncated: bool,
}

/// Space accounting for the active region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Bytes available to records (region minus header and reserved tail)
    pub total: u32,

    /// Bytes consumed by written slots, live or not
    pub used: u32,
}

/// The store engine
///
/// One value per store instance; instances on different partitions are
/// independent values with their own index.
pub struct Engine<F: Flash> {
    /// Engine configuration
    config: Config,

    /// Media adapter (exclusive for the engine's lifetime)
    flash: F,

    /// Region 0 and region 1
    regions: [RegionLog; 2],

    /// Index into `regions` of the active region
    active: usize,

    /// Header version and magic of the active region
    version: u32,
    magic: u32,

    /// Live keys
    record_count: u32,

    /// Region-relative offset of the next free slot
    cursor: u32,

    /// In-memory key → offset map over the active region
    index: HashIndex,

    /// Transaction state and the single staged write
    tx_state: TxState,
    pending: Option<Record>,

    recovery: RecoveryReport,

    /// Cleared by `deinit`
    initialized: bool,
}

impl<F: Flash> Engine<F> {
    /// Open a store on `flash`
    ///
    /// On startup:
    /// 1. Read and validate both region headers
    /// 2. Reformat any region whose header is invalid
    /// 3. Pick the valid region with the higher version (ties go to region 1)
    /// 4. Scan its record area to rebuild the index
    ///
    /// A read failure during the scan stops it early and the store opens
    /// with the records indexed so far; `recovery().scan_truncated` is set
    /// and the region is treated as full so the next write compacts.
    pub fn open(mut flash: F, config: Config) -> Result<Self> {
        let layout = RecordLayout::new(config.max_key_len, config.max_value_len);
        config.validate(HEADER_SIZE, layout.size())?;

        flash.init()?;

        let addrs = config.region_addrs();
        let regions = [
            RegionLog::new(addrs[0], config.region_size(), config.block_size, layout),
            RegionLog::new(addrs[1], config.region_size(), config.block_size, layout),
        ];

        let mut report = RecoveryReport::default();

        // Step 1-2: validate, reformat what does not check out
        for (i, region) in regions.iter().enumerate() {
            let header = region.read_header(&mut flash).unwrap_or_else(|e| {
                tracing::warn!("Instance {}: reading region {} header failed: {}", config.instance_id, i, e);
                None
            });

            if header.is_none() {
                tracing::info!(
                    "Instance {}: region {} at {:#x} has no valid header, formatting",
                    config.instance_id,
                    i,
                    region.base()
                );
                if let Err(e) = region.format(&mut flash, &RegionHeader::fresh()) {
                    tracing::warn!("Instance {}: formatting region {} failed: {}", config.instance_id, i, e);
                }
                report.reinitialized[i] = true;
            }
        }

        // Step 3: choose the active region
        let h0 = regions[0].read_header(&mut flash).ok().flatten();
        let h1 = regions[1].read_header(&mut flash).ok().flatten();

        let (active, header) = match (h0, h1) {
            (Some(a), Some(b)) if b.version >= a.version => (1, b),
            (Some(a), Some(_)) => (0, a),
            (Some(a), None) => (0, a),
            (None, Some(b)) => (1, b),
            (None, None) => {
                tracing::error!(
                    "Instance {}: neither region holds a valid header after formatting",
                    config.instance_id
                );
                return Err(StoreError::InvalidRegion);
            }
        };

        report.active_region = active;
        report.version = header.version;

        let mut engine = Self {
            index: HashIndex::with_capacity(config.index_capacity),
            config,
            flash,
            regions,
            active,
            version: header.version,
            magic: header.magic,
            record_count: 0,
            cursor: HEADER_SIZE,
            tx_state: TxState::Idle,
            pending: None,
            recovery: report,
            initialized: true,
        };

        // Step 4: rebuild the index from the record log
        let stale = engine.rebuild_index();

        // A crash between append and tombstone leaves two live copies
        for offset in stale {
            if let Err(e) = engine.tombstone_at(offset) {
                tracing::warn!(
                    "Instance {}: could not tombstone superseded record at {:#x}: {}",
                    engine.config.instance_id,
                    offset,
                    e
                );
            }
        }

        if engine.record_count != header.record_count {
            tracing::debug!(
                "Instance {}: header records {} live records, scan found {}",
                engine.config.instance_id,
                header.record_count,
                engine.record_count
            );
        }

        tracing::info!(
            "Instance {}: opened region {} (version {}), {} live records, {}% free",
            engine.config.instance_id,
            engine.active,
            engine.version,
            engine.record_count,
            engine.free_percent()
        );

        Ok(engine)
    }

    /// Scan the active region into a fresh index
    ///
    /// Returns the offsets of live records that a later record superseded.
    fn rebuild_index(&mut self) -> Vec<u32> {
        let log = self.active_log();
        let stride = log.layout().size();
        let mut index = HashIndex::with_capacity(self.config.index_capacity);
        let mut cursor = HEADER_SIZE;
        let mut stale = Vec::new();
        let report = &mut self.recovery;

        for item in log.scan(&mut self.flash) {
            let (offset, slot) = match item {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(
                        "Instance {}: scan stopped by read failure ({}); {} records indexed",
                        self.config.instance_id,
                        e,
                        index.len()
                    );
                    report.scan_truncated = true;
                    cursor = log.records_end();
                    break;
                }
            };

            match slot {
                RecordSlot::Erased => continue,
                RecordSlot::Corrupt => report.corrupt_skipped += 1,
                RecordSlot::Dead(_) => report.tombstones_skipped += 1,
                RecordSlot::Live(record) => match index.insert(&record.key, offset) {
                    Ok(Some(old)) => {
                        report.superseded += 1;
                        stale.push(old);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            "Instance {}: dropping record at {:#x}: {}",
                            self.config.instance_id,
                            offset,
                            e
                        );
                    }
                },
            }
            cursor = offset + stride;
        }

        if report.corrupt_skipped > 0 {
            tracing::warn!(
                "Instance {}: skipped {} corrupt records during recovery",
                self.config.instance_id,
                report.corrupt_skipped
            );
        }

        report.records_recovered = index.len() as u32;
        self.record_count = index.len() as u32;
        self.cursor = cursor;
        self.index = index;
        stale
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Number of live keys
    pub fn count(&self) -> u32 {
        self.record_count
    }

    /// Record-area size and the part of it already written
    pub fn status(&self) -> Status {
        let log = self.active_log();
        Status {
            total: log.record_area(),
            used: self.cursor - HEADER_SIZE,
        }
    }

    /// Unwritten share of the record area, 0..=100
    pub fn free_percent(&self) -> u8 {
        let Status { total, used } = self.status();
        if total == 0 {
            return 0;
        }
        ((total - used) as u64 * 100 / total as u64) as u8
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Mark the instance uninitialized; later calls return `NotInitialized`
    ///
    /// The status accessors do not fail but report an empty store.
    /// Flash is left untouched; reopen to see the data again.
    pub fn deinit(&mut self) {
        tracing::debug!("Instance {}: deinit", self.config.instance_id);
        self.initialized = false;
        self.index.clear();
        self.record_count = 0;
        self.cursor = HEADER_SIZE;
        self.pending = None;
        self.tx_state = TxState::Idle;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Give the adapter back (e.g. to reopen it after a simulated reboot)
    pub fn into_flash(self) -> F {
        self.flash
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Index of the active region (0 or 1)
    pub fn active_region(&self) -> usize {
        self.active
    }

    /// Header version of the active region
    pub fn version(&self) -> u32 {
        self.version
    }

    /// What recovery found when the store was opened
    pub fn recovery(&self) -> &RecoveryReport {
        &self.recovery
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Absolute base address of a region
    pub fn region_base(&self, region: usize) -> u32 {
        self.regions[region].base()
    }

    /// Region-relative offset where the next record will be written
    pub fn write_offset(&self) -> u32 {
        self.cursor
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn active_log(&self) -> RegionLog {
        self.regions[self.active]
    }

    fn ensure_initialized(&self) -> Result<()> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }
        Ok(())
    }
}
