//! Configuration for flashkv
//!
//! Centralized configuration with sensible defaults. Geometry (key/value
//! sizes, index capacity) is fixed once a store is created: changing it
//! against an existing image makes every record fail its CRC.

use crate::error::{Result, StoreError};

/// Largest key or value length representable by the one-byte length prefix
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Main configuration for a flashkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Instance
    // -------------------------------------------------------------------------
    /// Instance id, attached to log events
    pub instance_id: u8,

    // -------------------------------------------------------------------------
    // Flash Layout
    // -------------------------------------------------------------------------
    /// Base address of region 0
    pub start_addr: u32,

    /// Total bytes reserved for the store; split evenly into two regions
    ///   [start_addr]                  region 0
    ///   [start_addr + total_size / 2] region 1
    pub total_size: u32,

    /// Erase granularity. One block at the end of each region is never
    /// written with records.
    pub block_size: u32,

    // -------------------------------------------------------------------------
    // Record Geometry
    // -------------------------------------------------------------------------
    /// Maximum key length in bytes (at most 255)
    pub max_key_len: usize,

    /// Maximum value length in bytes (at most 255)
    pub max_value_len: usize,

    // -------------------------------------------------------------------------
    // Index
    // -------------------------------------------------------------------------
    /// Number of hash index slots; must be a power of two
    pub index_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance_id: 0,
            start_addr: 0,
            total_size: 64 * 1024, // 64 KB, two 32 KB regions
            block_size: 2048,
            max_key_len: 32,
            max_value_len: 64,
            index_capacity: 128,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Size of one region in bytes
    pub fn region_size(&self) -> u32 {
        self.total_size / 2
    }

    /// Base addresses of region 0 and region 1
    pub fn region_addrs(&self) -> [u32; 2] {
        [self.start_addr, self.start_addr + self.region_size()]
    }

    /// Check the layout is usable on block-erasable media
    pub(crate) fn validate(&self, header_size: u32, record_size: u32) -> Result<()> {
        if self.block_size == 0 {
            return Err(invalid("block_size must be non-zero"));
        }
        if self.start_addr % self.block_size != 0 {
            return Err(invalid(format!(
                "start_addr {:#x} is not aligned to block_size {}",
                self.start_addr, self.block_size
            )));
        }
        let region_size = self.region_size();
        if region_size == 0 || region_size % self.block_size != 0 {
            return Err(invalid(format!(
                "region size {} is not a non-zero multiple of block_size {}",
                region_size, self.block_size
            )));
        }
        if self.start_addr.checked_add(self.total_size).is_none() {
            return Err(invalid("start_addr + total_size overflows the address space"));
        }
        let needed = header_size + record_size + self.block_size;
        if region_size < needed {
            return Err(invalid(format!(
                "region size {} cannot hold a header, one {}-byte record and the reserved block",
                region_size, record_size
            )));
        }
        if self.max_key_len == 0 || self.max_key_len > MAX_FIELD_LEN {
            return Err(invalid(format!("max_key_len must be 1..={}", MAX_FIELD_LEN)));
        }
        if self.max_value_len > MAX_FIELD_LEN {
            return Err(invalid(format!("max_value_len must be at most {}", MAX_FIELD_LEN)));
        }
        if !self.index_capacity.is_power_of_two() {
            return Err(invalid(format!(
                "index_capacity {} is not a power of two",
                self.index_capacity
            )));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> StoreError {
    StoreError::InvalidParameter(msg.into())
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the instance id
    pub fn instance_id(mut self, id: u8) -> Self {
        self.config.instance_id = id;
        self
    }

    /// Set the base address of region 0
    pub fn start_addr(mut self, addr: u32) -> Self {
        self.config.start_addr = addr;
        self
    }

    /// Set the total size of both regions together (in bytes)
    pub fn total_size(mut self, size: u32) -> Self {
        self.config.total_size = size;
        self
    }

    /// Set the erase block size (in bytes)
    pub fn block_size(mut self, size: u32) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the maximum key length (in bytes)
    pub fn max_key_len(mut self, len: usize) -> Self {
        self.config.max_key_len = len;
        self
    }

    /// Set the maximum value length (in bytes)
    pub fn max_value_len(mut self, len: usize) -> Self {
        self.config.max_value_len = len;
        self
    }

    /// Set the number of hash index slots
    pub fn index_capacity(mut self, slots: usize) -> Self {
        self.config.index_capacity = slots;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
