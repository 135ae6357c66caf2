//! Error types for flashkv
//!
//! Provides a unified error type for all store operations, and the
//! narrower error type media adapters report.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Key not found")]
    NotFound,

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Store not initialized")]
    NotInitialized,

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("No space left in active region")]
    NoSpace,

    #[error("Hash index is full")]
    HashFull,

    // -------------------------------------------------------------------------
    // Integrity Errors
    // -------------------------------------------------------------------------
    #[error("CRC mismatch in record at offset {offset:#x}")]
    CrcFailure { offset: u32 },

    #[error("No usable region")]
    InvalidRegion,

    #[error("Garbage collection failed: {0}")]
    GcFailure(String),

    // -------------------------------------------------------------------------
    // Media Errors
    // -------------------------------------------------------------------------
    #[error("Flash error: {0}")]
    Flash(#[from] FlashError),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors reported by a media adapter
#[derive(Debug, Error)]
pub enum FlashError {
    #[error("address range {address:#x}+{len} is out of bounds")]
    OutOfBounds { address: u32, len: usize },

    #[error("read failed at {0:#x}")]
    ReadFailed(u32),

    #[error("write failed at {0:#x}")]
    WriteFailed(u32),

    #[error("erase failed at {0:#x}")]
    EraseFailed(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
