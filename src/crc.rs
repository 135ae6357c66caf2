//! Integrity checksums
//!
//! Records carry a CRC-16 and region headers a CRC-32. Both are the
//! MSB-first (non-reflected) variants:
//!
//! - CRC-16: poly 0x1021, init 0xFFFF, no final XOR (CRC-16/IBM-3740)
//! - CRC-32: poly 0x04C11DB7, init 0xFFFFFFFF, final XOR 0xFFFFFFFF (CRC-32/BZIP2)
//!
//! Used only for integrity checks, never for hashing.

use crc::{Crc, CRC_16_IBM_3740, CRC_32_BZIP2};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_BZIP2);

/// CRC-16 over a record body
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// CRC-32 over a region header body
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}
