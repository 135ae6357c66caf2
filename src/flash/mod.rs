//! Media Adapter Module
//!
//! The raw read/write/erase boundary between the store and a device.
//!
//! ## Flash Characteristics
//! - Erase sets a range to 0xFF, rounded out to the device's block size
//! - Write can only clear bits (the stored byte becomes `old & new`)
//! - Every call blocks until the device reports success or failure
//!
//! Implementations should not retry internally unless that is the device's
//! documented behavior; the store surfaces every failure as
//! `StoreError::Flash` and does not retry either.
//!
//! ## Adapters
//! - [`MemFlash`]: RAM image with fault injection, for tests and host tools
//! - [`FileFlash`]: file-backed image, used by the CLI
//! - [`SharedFlash`]: mutex-guarded handle; the place to add exclusion when
//!   several owners must reach one device

mod file;
mod mem;
mod shared;

pub use file::FileFlash;
pub use mem::MemFlash;
pub use shared::SharedFlash;

use crate::error::FlashError;

/// Result type for adapter operations
pub type FlashResult<T> = std::result::Result<T, FlashError>;

/// Value of an erased byte
pub const ERASED: u8 = 0xFF;

/// Raw access to a block-erasable device
pub trait Flash {
    /// Prepare the device; called once by `Engine::open`
    fn init(&mut self) -> FlashResult<()> {
        Ok(())
    }

    /// Read `buf.len()` bytes starting at `address`
    fn read(&mut self, address: u32, buf: &mut [u8]) -> FlashResult<()>;

    /// Program `data` at `address` (bitwise AND with current contents)
    fn write(&mut self, address: u32, data: &[u8]) -> FlashResult<()>;

    /// Erase `len` bytes starting at `address`, rounded out to whole blocks
    fn erase(&mut self, address: u32, len: u32) -> FlashResult<()>;
}

impl<F: Flash + ?Sized> Flash for &mut F {
    fn init(&mut self) -> FlashResult<()> {
        (**self).init()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> FlashResult<()> {
        (**self).read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> FlashResult<()> {
        (**self).write(address, data)
    }

    fn erase(&mut self, address: u32, len: u32) -> FlashResult<()> {
        (**self).erase(address, len)
    }
}

/// Block-aligned `[start, end)` covering `address..address + len`
pub(crate) fn block_span(address: u32, len: u32, block_size: u32) -> (u64, u64) {
    let block = block_size as u64;
    let start = (address as u64 / block) * block;
    let end = (address as u64 + len as u64).div_ceil(block) * block;
    (start, end)
}
