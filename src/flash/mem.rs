//! In-memory flash
//!
//! Simulates a NOR device in RAM, with failure injection for recovery tests.

use crate::error::FlashError;

use super::{block_span, Flash, FlashResult, ERASED};

/// RAM-backed flash image
///
/// Supports:
/// - Bitwise-AND writes and block-rounded erases
/// - Per-block erase counters
/// - Failing reads at or beyond an address
/// - Failing the next write or erase, or a write a few calls ahead
/// - Power loss during the next write (only a prefix lands)
///
/// # Example
///
/// ```
/// use flashkv::flash::{Flash, MemFlash};
///
/// let mut flash = MemFlash::new(8192, 1024);
/// flash.write(0, &[0x0F]).unwrap();
/// flash.write(0, &[0xF3]).unwrap();
///
/// let mut buf = [0u8; 1];
/// flash.read(0, &mut buf).unwrap();
/// assert_eq!(buf[0], 0x03);
/// ```
#[derive(Debug, Clone)]
pub struct MemFlash {
    storage: Vec<u8>,
    block_size: u32,
    erase_counts: Vec<u32>,
    /// Reads touching this address or above fail
    fail_reads_from: Option<u32>,
    /// Writes still allowed before one fails
    fail_write_in: Option<u32>,
    fail_next_erase: bool,
    /// Next write lands only this many bytes
    power_loss_after: Option<usize>,
    writes: u64,
}

impl MemFlash {
    /// Create an erased image of `capacity` bytes
    pub fn new(capacity: u32, block_size: u32) -> Self {
        let blocks = capacity.div_ceil(block_size.max(1)) as usize;
        Self {
            storage: vec![ERASED; capacity as usize],
            block_size: block_size.max(1),
            erase_counts: vec![0; blocks],
            fail_reads_from: None,
            fail_write_in: None,
            fail_next_erase: false,
            power_loss_after: None,
            writes: 0,
        }
    }

    /// Image size in bytes
    pub fn capacity(&self) -> u32 {
        self.storage.len() as u32
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Copy of the raw bytes (for test verification)
    pub fn contents(&self, address: u32, len: usize) -> Vec<u8> {
        self.storage[address as usize..address as usize + len].to_vec()
    }

    /// Overwrite bytes directly, ignoring flash semantics
    ///
    /// Used to plant corruption that a real device could produce.
    pub fn corrupt(&mut self, address: u32, bytes: &[u8]) {
        let start = address as usize;
        self.storage[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Number of times the block containing `address` was erased
    pub fn erase_count(&self, address: u32) -> u32 {
        self.erase_counts[(address / self.block_size) as usize]
    }

    /// Number of successful write calls
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Fail every read that touches `address` or anything after it
    pub fn fail_reads_from(&mut self, address: u32) {
        self.fail_reads_from = Some(address);
    }

    pub fn fail_next_write(&mut self) {
        self.fail_write_in = Some(0);
    }

    /// Let `writes` more writes succeed, then fail the one after
    pub fn fail_write_after(&mut self, writes: u32) {
        self.fail_write_in = Some(writes);
    }

    pub fn fail_next_erase(&mut self) {
        self.fail_next_erase = true;
    }

    /// Let only the first `bytes` bytes of the next write reach the array
    pub fn power_loss_after(&mut self, bytes: usize) {
        self.power_loss_after = Some(bytes);
    }

    /// Remove all injected faults
    pub fn heal(&mut self) {
        self.fail_reads_from = None;
        self.fail_write_in = None;
        self.fail_next_erase = false;
        self.power_loss_after = None;
    }

    fn check_range(&self, address: u32, len: usize) -> FlashResult<()> {
        if address as usize + len > self.storage.len() {
            return Err(FlashError::OutOfBounds { address, len });
        }
        Ok(())
    }
}

impl Flash for MemFlash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> FlashResult<()> {
        self.check_range(address, buf.len())?;

        if let Some(limit) = self.fail_reads_from {
            if address as u64 + buf.len() as u64 > limit as u64 {
                return Err(FlashError::ReadFailed(address));
            }
        }

        let start = address as usize;
        buf.copy_from_slice(&self.storage[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> FlashResult<()> {
        self.check_range(address, data.len())?;

        match self.fail_write_in {
            Some(0) => {
                self.fail_write_in = None;
                return Err(FlashError::WriteFailed(address));
            }
            Some(n) => self.fail_write_in = Some(n - 1),
            None => {}
        }

        let landed = match self.power_loss_after.take() {
            Some(n) => n.min(data.len()),
            None => data.len(),
        };

        // Programming can only clear bits
        let start = address as usize;
        for (cell, &byte) in self.storage[start..start + landed].iter_mut().zip(data) {
            *cell &= byte;
        }

        self.writes += 1;
        Ok(())
    }

    fn erase(&mut self, address: u32, len: u32) -> FlashResult<()> {
        let (start, end) = block_span(address, len, self.block_size);
        if end > self.storage.len() as u64 {
            return Err(FlashError::OutOfBounds {
                address,
                len: len as usize,
            });
        }

        if std::mem::take(&mut self.fail_next_erase) {
            return Err(FlashError::EraseFailed(address));
        }

        self.storage[start as usize..end as usize].fill(ERASED);

        let first = (start / self.block_size as u64) as usize;
        let last = (end / self.block_size as u64) as usize;
        for count in &mut self.erase_counts[first..last] {
            *count += 1;
        }
        Ok(())
    }
}
