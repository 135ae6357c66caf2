//! File-backed flash
//!
//! Keeps a flash image in a regular file so host tools can inspect or seed
//! the exact bytes a device would hold.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::FlashError;

use super::{block_span, Flash, FlashResult, ERASED};

/// Flash image stored in a file
pub struct FileFlash {
    path: PathBuf,
    file: File,
    capacity: u32,
    block_size: u32,
}

impl FileFlash {
    /// Open an image, creating it fully erased if missing
    ///
    /// An existing shorter file is extended with erased bytes.
    pub fn open(path: &Path, capacity: u32, block_size: u32) -> FlashResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let current = file.metadata()?.len();
        if current < capacity as u64 {
            file.seek(SeekFrom::Start(current))?;
            let padding = vec![ERASED; (capacity as u64 - current) as usize];
            file.write_all(&padding)?;
            file.sync_all()?;
            tracing::debug!(
                "Extended flash image {} from {} to {} bytes",
                path.display(),
                current,
                capacity
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            capacity,
            block_size: block_size.max(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn check_range(&self, address: u32, len: usize) -> FlashResult<()> {
        if address as u64 + len as u64 > self.capacity as u64 {
            return Err(FlashError::OutOfBounds { address, len });
        }
        Ok(())
    }
}

impl Flash for FileFlash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> FlashResult<()> {
        self.check_range(address, buf.len())?;
        self.file.seek(SeekFrom::Start(address as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> FlashResult<()> {
        self.check_range(address, data.len())?;

        // Read-modify-write so the file obeys the same 1→0 rule as the device
        let mut current = vec![0u8; data.len()];
        self.file.seek(SeekFrom::Start(address as u64))?;
        self.file.read_exact(&mut current)?;
        for (cell, &byte) in current.iter_mut().zip(data) {
            *cell &= byte;
        }

        self.file.seek(SeekFrom::Start(address as u64))?;
        self.file.write_all(&current)?;
        self.file.sync_data()?;
        Ok(())
    }

    fn erase(&mut self, address: u32, len: u32) -> FlashResult<()> {
        let (start, end) = block_span(address, len, self.block_size);
        if end > self.capacity as u64 {
            return Err(FlashError::OutOfBounds {
                address,
                len: len as usize,
            });
        }

        self.file.seek(SeekFrom::Start(start))?;
        self.file.write_all(&vec![ERASED; (end - start) as usize])?;
        self.file.sync_data()?;
        Ok(())
    }
}
