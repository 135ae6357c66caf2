//! # flashkv
//!
//! An embedded key-value store for raw NOR-style flash with:
//! - Fixed-size, CRC-protected records appended to a log
//! - Two ping-pong regions; compaction copies live records into the standby
//!   region and flips roles by header version
//! - Crash recovery that picks the newest valid region and rebuilds an
//!   in-memory hash index from its record log
//! - A pluggable media adapter with RAM and file-backed implementations
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Engine (set/get/delete/tx)                  │
//! └──────────┬──────────────────────┬───────────────────────────┘
//!            │                      │
//!            ▼                      ▼
//!   ┌─────────────────┐    ┌─────────────────┐
//!   │    HashIndex    │    │  RegionLog × 2  │
//!   │ (key → offset)  │    │ (active/standby)│
//!   └─────────────────┘    └────────┬────────┘
//!                                   │ header + record codecs (CRC)
//!                                   ▼
//!                          ┌─────────────────┐
//!                          │   dyn Flash     │
//!                          │ (read/write/    │
//!                          │  erase)         │
//!                          └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use flashkv::{Config, Engine, MemFlash};
//!
//! let config = Config::default();
//! let flash = MemFlash::new(config.total_size, config.block_size);
//! let mut store = Engine::open(flash, config).unwrap();
//!
//! store.set(b"mcu", b"STM32F407VG").unwrap();
//! assert_eq!(&store.get(b"mcu").unwrap()[..], b"STM32F407VG");
//! assert_eq!(store.count(), 1);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod crc;

pub mod index;
pub mod flash;
pub mod region;
pub mod engine;
pub mod snapshot;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::{Engine, GcStats, RecoveryReport, Status};
pub use error::{FlashError, Result, StoreError};
pub use flash::{FileFlash, Flash, MemFlash, SharedFlash};
pub use region::TxState;
pub use snapshot::Snapshot;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of flashkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
