//! Region log
//!
//! Append-only record log within one region: header validation, slot
//! reads/writes, and the sequential scan used to rebuild the index.

use crate::error::FlashError;
use crate::flash::{Flash, FlashResult};

use super::{Record, RecordLayout, RecordSlot, RegionHeader, FLAG_DELETED, HEADER_SIZE};

/// One region's address range and record geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLog {
    base: u32,
    size: u32,
    block_size: u32,
    layout: RecordLayout,
}

impl RegionLog {
    pub fn new(base: u32, size: u32, block_size: u32, layout: RecordLayout) -> Self {
        Self {
            base,
            size,
            block_size,
            layout,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// First byte of the reserved tail (exclusive end of the record area)
    pub fn records_end(&self) -> u32 {
        self.size - self.block_size
    }

    /// Bytes available to records
    pub fn record_area(&self) -> u32 {
        self.records_end() - HEADER_SIZE
    }

    /// Number of record slots that fit before the reserved tail
    pub fn slot_count(&self) -> u32 {
        self.record_area() / self.layout.size()
    }

    /// Whether a record starting at `offset` fits before the reserved tail
    pub fn fits(&self, offset: u32) -> bool {
        offset >= HEADER_SIZE && offset + self.layout.size() <= self.records_end()
    }

    /// Region-relative offsets of every record slot, in log order
    pub fn slot_offsets(&self) -> impl Iterator<Item = u32> {
        let stride = self.layout.size();
        (0..self.slot_count()).map(move |i| HEADER_SIZE + i * stride)
    }

    // =========================================================================
    // Header
    // =========================================================================

    /// Read the header; `Ok(None)` when magic or CRC do not check out
    pub fn read_header<F: Flash>(&self, flash: &mut F) -> FlashResult<Option<RegionHeader>> {
        let mut raw = [0u8; HEADER_SIZE as usize];
        flash.read(self.base, &mut raw)?;
        Ok(RegionHeader::decode(&raw))
    }

    /// Program a header into an erased header area
    pub fn write_header<F: Flash>(&self, flash: &mut F, header: &RegionHeader) -> FlashResult<()> {
        flash.write(self.base, &header.encode())
    }

    /// Erase the whole region
    pub fn erase<F: Flash>(&self, flash: &mut F) -> FlashResult<()> {
        flash.erase(self.base, self.size)
    }

    /// Erase the region and stamp a header
    pub fn format<F: Flash>(&self, flash: &mut F, header: &RegionHeader) -> FlashResult<()> {
        self.erase(flash)?;
        self.write_header(flash, header)
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Read and classify the slot at `offset`
    pub fn read_slot<F: Flash>(&self, flash: &mut F, offset: u32) -> FlashResult<RecordSlot> {
        self.check_slot(offset)?;
        let mut raw = vec![0u8; self.layout.size() as usize];
        flash.read(self.base + offset, &mut raw)?;
        Ok(self.layout.decode(&raw))
    }

    /// Program a record into the slot at `offset`
    pub fn write_record<F: Flash>(&self, flash: &mut F, offset: u32, record: &Record) -> FlashResult<()> {
        self.check_slot(offset)?;
        flash.write(self.base + offset, &self.layout.encode(record))
    }

    /// Rewrite a record in place with the DELETED flag and a fresh CRC
    ///
    /// Flash ANDs the new bytes into the old ones; the decoder recognizes
    /// the result as a tombstone.
    pub fn tombstone<F: Flash>(&self, flash: &mut F, offset: u32, record: &Record) -> FlashResult<()> {
        let mut dead = record.clone();
        dead.flags = FLAG_DELETED;
        self.write_record(flash, offset, &dead)
    }

    /// Sequential scan over every slot of the record area
    pub fn scan<'a, F: Flash>(&'a self, flash: &'a mut F) -> Scan<'a, F> {
        Scan {
            log: self,
            flash,
            next: 0,
        }
    }

    fn check_slot(&self, offset: u32) -> FlashResult<()> {
        if !self.fits(offset) {
            return Err(FlashError::OutOfBounds {
                address: self.base + offset,
                len: self.layout.size() as usize,
            });
        }
        Ok(())
    }
}

/// Iterator over `(offset, slot)` pairs of a region, in log order
///
/// Yields the read error and then stops if the device fails a read.
pub struct Scan<'a, F> {
    log: &'a RegionLog,
    flash: &'a mut F,
    next: u32,
}

impl<'a, F: Flash> Iterator for Scan<'a, F> {
    type Item = FlashResult<(u32, RecordSlot)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.log.slot_count() {
            return None;
        }

        let offset = HEADER_SIZE + self.next * self.log.layout.size();
        self.next += 1;

        match self.log.read_slot(&mut *self.flash, offset) {
            Ok(slot) => Some(Ok((offset, slot))),
            Err(e) => {
                self.next = self.log.slot_count();
                Some(Err(e))
            }
        }
    }
}
