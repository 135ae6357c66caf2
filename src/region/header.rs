//! Region header
//!
//! The first 24 bytes of a region. A region is valid only when the magic is
//! one of the two accepted values and the CRC-32 over the first 20 bytes
//! matches.

use bytes::{Buf, BufMut};

use crate::crc::crc32;

/// Header size in bytes
pub const HEADER_SIZE: u32 = 24;

/// Primary magic ("ASVK" little-endian)
pub const MAGIC_A: u32 = 0x4B56_5341;

/// Alternate magic, stamped on every other compaction
pub const MAGIC_B: u32 = 0x4B56_5342;

/// Bytes covered by the header CRC
const BODY_SIZE: usize = HEADER_SIZE as usize - 4;

/// Transaction state byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TxState {
    #[default]
    Idle = 0,
    Prepared = 1,
    Committed = 2,
}

impl TxState {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(TxState::Idle),
            1 => Some(TxState::Prepared),
            2 => Some(TxState::Committed),
            _ => None,
        }
    }
}

/// Decoded region header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionHeader {
    pub magic: u32,
    /// Higher version wins when both regions are valid
    pub version: u32,
    /// Live records when the header was written
    pub record_count: u32,
    /// First unused byte of the record area when the header was written
    pub active_offset: u32,
    pub tx_state: TxState,
}

impl RegionHeader {
    /// Header stamped on a freshly (re)initialized region
    pub fn fresh() -> Self {
        Self {
            magic: MAGIC_A,
            version: 1,
            record_count: 0,
            active_offset: HEADER_SIZE,
            tx_state: TxState::Idle,
        }
    }

    /// The other accepted magic value
    pub fn alternate_magic(magic: u32) -> u32 {
        if magic == MAGIC_A {
            MAGIC_B
        } else {
            MAGIC_A
        }
    }

    /// Serialize to the on-flash form, CRC included
    pub fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut out = [0u8; HEADER_SIZE as usize];
        {
            let mut buf = &mut out[..];
            buf.put_u32_le(self.magic);
            buf.put_u32_le(self.version);
            buf.put_u32_le(self.record_count);
            buf.put_u32_le(self.active_offset);
            buf.put_u8(self.tx_state as u8);
            buf.put_bytes(0, 3);
        }
        let crc = crc32(&out[..BODY_SIZE]);
        out[BODY_SIZE..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Parse and validate; `None` means the region is not usable as-is
    pub fn decode(raw: &[u8]) -> Option<Self> {
        if raw.len() < HEADER_SIZE as usize {
            return None;
        }

        let mut buf = &raw[..HEADER_SIZE as usize];
        let magic = buf.get_u32_le();
        if magic != MAGIC_A && magic != MAGIC_B {
            return None;
        }
        let version = buf.get_u32_le();
        let record_count = buf.get_u32_le();
        let active_offset = buf.get_u32_le();
        let tx_byte = buf.get_u8();
        buf.advance(3);
        let stored_crc = buf.get_u32_le();

        if crc32(&raw[..BODY_SIZE]) != stored_crc {
            return None;
        }

        Some(Self {
            magic,
            version,
            record_count,
            active_offset,
            tx_state: TxState::from_byte(tx_byte)?,
        })
    }
}
