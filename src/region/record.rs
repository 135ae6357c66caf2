//! Fixed-size records
//!
//! Every record occupies the same stride so the log can be scanned without
//! length framing and any slot can be addressed directly.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crc::crc16;
use crate::error::{Result, StoreError};
use crate::flash::ERASED;

/// Live record
pub const FLAG_VALID: u8 = 1;

/// Superseded or deleted record
pub const FLAG_DELETED: u8 = 2;

/// Flags (1) + Reserved (3) + CRC-16 (2)
const TRAILER_SIZE: usize = 6;

/// A decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
    pub flags: u8,
}

impl Record {
    /// A new live record
    pub fn live(key: &[u8], value: &[u8]) -> Self {
        Self {
            key: Bytes::copy_from_slice(key),
            value: Bytes::copy_from_slice(value),
            flags: FLAG_VALID,
        }
    }

    pub fn is_live(&self) -> bool {
        self.flags == FLAG_VALID
    }
}

/// What a record slot holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSlot {
    /// Never written since the last erase
    Erased,
    /// Written, but the CRC or length fields do not check out
    Corrupt,
    /// CRC-valid and flagged VALID
    Live(Record),
    /// CRC-valid with any other flags value, or a tombstone programmed
    /// over a live record
    Dead(Record),
}

/// Record geometry, fixed at configuration time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    max_key_len: usize,
    max_value_len: usize,
}

impl RecordLayout {
    pub fn new(max_key_len: usize, max_value_len: usize) -> Self {
        Self {
            max_key_len,
            max_value_len,
        }
    }

    pub fn max_key_len(&self) -> usize {
        self.max_key_len
    }

    pub fn max_value_len(&self) -> usize {
        self.max_value_len
    }

    /// Stride of one record in bytes
    pub fn size(&self) -> u32 {
        (1 + self.max_key_len + 1 + self.max_value_len + TRAILER_SIZE) as u32
    }

    /// Reject empty or oversized keys
    pub fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidParameter("key is empty".to_string()));
        }
        if key.len() > self.max_key_len {
            return Err(StoreError::InvalidParameter(format!(
                "key is {} bytes, limit is {}",
                key.len(),
                self.max_key_len
            )));
        }
        Ok(())
    }

    /// Reject oversized values (empty values are allowed)
    pub fn check_value(&self, value: &[u8]) -> Result<()> {
        if value.len() > self.max_value_len {
            return Err(StoreError::InvalidParameter(format!(
                "value is {} bytes, limit is {}",
                value.len(),
                self.max_value_len
            )));
        }
        Ok(())
    }

    /// Serialize a record, computing its CRC-16
    ///
    /// Key and value must already be within limits.
    pub fn encode(&self, record: &Record) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size() as usize);

        buf.put_u8(record.key.len() as u8);
        buf.put_slice(&record.key);
        buf.put_bytes(0, self.max_key_len - record.key.len());

        buf.put_u8(record.value.len() as u8);
        buf.put_slice(&record.value);
        buf.put_bytes(0, self.max_value_len - record.value.len());

        buf.put_u8(record.flags);
        buf.put_bytes(0, 3);

        let crc = crc16(&buf);
        buf.put_u16_le(crc);
        buf
    }

    /// Classify the raw contents of one slot
    pub fn decode(&self, raw: &[u8]) -> RecordSlot {
        let size = self.size() as usize;
        if raw.len() < size {
            return RecordSlot::Corrupt;
        }
        let raw = &raw[..size];

        if raw.iter().all(|&b| b == ERASED) {
            return RecordSlot::Erased;
        }

        let body = &raw[..size - 2];
        let stored_crc = (&raw[size - 2..]).get_u16_le();
        if crc16(body) != stored_crc && !self.is_landed_tombstone(body, stored_crc) {
            return RecordSlot::Corrupt;
        }

        let key_len = body[0] as usize;
        let value_at = 1 + self.max_key_len;
        let value_len = body[value_at] as usize;
        if key_len == 0 || key_len > self.max_key_len || value_len > self.max_value_len {
            return RecordSlot::Corrupt;
        }

        let record = Record {
            key: Bytes::copy_from_slice(&body[1..1 + key_len]),
            value: Bytes::copy_from_slice(&body[value_at + 1..value_at + 1 + value_len]),
            flags: body[value_at + 1 + self.max_value_len],
        };

        if record.is_live() {
            RecordSlot::Live(record)
        } else {
            RecordSlot::Dead(record)
        }
    }

    /// Whether `body` is a live record with a tombstone programmed over it
    ///
    /// Programming DELETED over VALID leaves `VALID & DELETED` in the flags
    /// byte and the AND of both CRCs in the trailer.
    fn is_landed_tombstone(&self, body: &[u8], stored_crc: u16) -> bool {
        let flags_at = 1 + self.max_key_len + 1 + self.max_value_len;
        if body[flags_at] != FLAG_VALID & FLAG_DELETED {
            return false;
        }

        let mut image = body.to_vec();
        image[flags_at] = FLAG_VALID;
        let live_crc = crc16(&image);
        image[flags_at] = FLAG_DELETED;
        let dead_crc = crc16(&image);

        stored_crc == live_crc & dead_crc
    }
}
