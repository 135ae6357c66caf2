//! Hash Index Module
//!
//! In-memory map from key to record offset within the active region.
//!
//! ## Responsibilities
//! - O(1) lookup of a key's latest record offset
//! - Fixed capacity chosen at configuration time
//! - Rebuilt from a region scan on open and after every GC; never persisted
//!
//! ## Data Structure Choice
//! Open addressing with linear probing, DJB2 hash folded into a power-of-two
//! table. Deletion uses backward shifting instead of tombstones, so an empty
//! slot always terminates a probe sequence correctly:
//!
//! ```text
//!  home(k) = djb2(k) & (capacity - 1)
//!
//!  slot:  [ a ][ b ][ c ][   ]      delete(a):  [ b ][ c ][   ][   ]
//!          h=0  h=0  h=1                          h=0  h=1
//! ```

mod table;

pub use table::{HashIndex, Slots};

/// DJB2 over the raw key bytes (`hash * 33 + byte`, seed 5381)
pub fn djb2(key: &[u8]) -> u32 {
    key.iter()
        .fold(5381u32, |hash, &b| hash.wrapping_mul(33).wrapping_add(b as u32))
}
