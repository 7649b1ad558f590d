//! A resource partition image consists of three parts, each aligned to a [`BLOCK_SIZE`] block:
//!
//! * [Header](header/index.html), filling block 0
//! * [Index Table](entry/index.html), one block per entry, directly after the header
//! * Content, one region per entry, each starting on a block boundary
//!
//! All multi-byte integers are stored little-endian, see [`endian`](endian/index.html).

use bstr::ByteSlice;
use thiserror::Error;

pub mod endian;
pub mod entry;
pub mod header;

/// The unit every structural offset in the image is counted in
pub const BLOCK_SIZE: usize = 512;

/// Number of whole blocks needed to hold `len` bytes
#[inline]
pub fn blocks_needed(len: u64) -> u64 {
    let block_size = BLOCK_SIZE as u64;
    (len + block_size - 1) / block_size
}

/// A structural problem found while decoding a header or an index entry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error(
        "magic mismatch: expected {:?}, got {:?}",
        header::MAGIC.as_bstr(),
        .found.as_bstr()
    )]
    BadMagic { found: [u8; 4] },
    #[error(
        "unsupported image version {partition_version}.{index_table_version} \
         (header size {header_size}, entry size {entry_size}): only version {}.{} is supported",
        header::PARTITION_VERSION,
        header::INDEX_TABLE_VERSION
    )]
    UnsupportedVersion {
        partition_version: u16,
        index_table_version: u16,
        header_size: u8,
        entry_size: u8,
    },
    #[error(
        "entry tag mismatch: expected {:?}, got {:?}",
        entry::TAG.as_bstr(),
        .found.as_bstr()
    )]
    BadTag { found: [u8; 4] },
    #[error("record truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_rounding() {
        assert_eq!(blocks_needed(0), 0);
        assert_eq!(blocks_needed(1), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE as u64 - 1), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE as u64), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE as u64 + 1), 2);
        assert_eq!(blocks_needed(10 * BLOCK_SIZE as u64), 10);
    }
}
