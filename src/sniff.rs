//! HCA signature check.
//!
//! Encrypted HCA streams set the high bit of every byte in their chunk
//! signatures, so the check masks each byte with `0x7F` before comparing.
//! That lets payloads be classified before any key is applied.

use byteorder::{BigEndian, ByteOrder};

/// `"HCA\0"` read as a big-endian word.
pub const HCA_MAGIC: u32 = 0x4843_4100;
/// Clears the obfuscation bit of each signature byte.
pub const SIGNATURE_MASK: u32 = 0x7F7F_7F7F;

/// `true` when `payload` starts with the (possibly obfuscated) HCA signature.
pub fn is_possible_hca(payload: &[u8]) -> bool {
    if payload.len() < 4 {
        return false;
    }
    BigEndian::read_u32(&payload[..4]) & SIGNATURE_MASK == HCA_MAGIC
}
