//! Region Module
//!
//! On-flash layout of one of the two ping-pong regions.
//!
//! ## Region Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Region Header (24 bytes)                                    │
//! │   Magic (4) | Version (4) | RecordCount (4) | ActiveOff (4) │
//! │   TxState (1) | Reserved (3) | CRC-32 (4)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Record 0                                                    │
//! │   KeyLen (1) | Key (max_key) | ValLen (1) | Value (max_val) │
//! │   Flags (1) | Reserved (3) | CRC-16 (2)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Record 1 ... (fixed stride, append-only)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Reserved tail (one erase block, never holds records)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Unused key/value bytes are zero.

mod header;
mod log;
mod record;

pub use header::{RegionHeader, TxState, HEADER_SIZE, MAGIC_A, MAGIC_B};
pub use log::{RegionLog, Scan};
pub use record::{Record, RecordLayout, RecordSlot, FLAG_DELETED, FLAG_VALID};
