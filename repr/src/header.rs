use bstr::ByteSlice;
use static_assertions::{assert_eq_size, const_assert};
use std::{fmt, mem};
use zerocopy::{AsBytes, FromBytes};

use crate::{endian, FormatError, BLOCK_SIZE};

/// The magic constant which marks a resource partition image
pub const MAGIC: [u8; 4] = *b"RSCE";

/// The supported version of the partition layout
pub const PARTITION_VERSION: u16 = 0;
/// The supported version of the index table layout
pub const INDEX_TABLE_VERSION: u16 = 0;

/// Size of the header, in blocks
pub const HEADER_SIZE: u8 = 1;
/// Size of one index table entry, in blocks
pub const ENTRY_SIZE: u8 = 1;

/// The header stored in block 0 of every image
#[derive(Copy, Clone, PartialEq, Eq, AsBytes, FromBytes)]
#[repr(C)]
pub struct PartitionHeader {
    /// Must match [`MAGIC`](constant.MAGIC.html) (`RSCE`)
    pub magic: [u8; 4],
    /// Must equal [`PARTITION_VERSION`](constant.PARTITION_VERSION.html)
    pub partition_version: u16,
    /// Must equal [`INDEX_TABLE_VERSION`](constant.INDEX_TABLE_VERSION.html)
    pub index_table_version: u16,
    /// Size of this header in blocks. Must equal [`HEADER_SIZE`](constant.HEADER_SIZE.html)
    pub header_size: u8,
    /// Block at which the index table starts. Always written equal to `header_size`
    pub table_offset: u8,
    /// Size of a single index entry in blocks. Must equal [`ENTRY_SIZE`](constant.ENTRY_SIZE.html)
    pub entry_size: u8,
    /// Alignment padding before `entry_count`, always zero
    pub reserved: u8,
    /// The number of entries in the index table
    pub entry_count: u32,
}

assert_eq_size!(PartitionHeader, [u8; 16]);
const_assert!(mem::size_of::<PartitionHeader>() <= BLOCK_SIZE);

impl PartitionHeader {
    /// A header of the supported version describing `entry_count` entries
    pub fn new(entry_count: u32) -> Self {
        Self {
            magic: MAGIC,
            partition_version: PARTITION_VERSION,
            index_table_version: INDEX_TABLE_VERSION,
            header_size: HEADER_SIZE,
            table_offset: HEADER_SIZE,
            entry_size: ENTRY_SIZE,
            reserved: 0,
            entry_count,
        }
    }

    /// Block holding the entry at `index` of the index table
    #[inline]
    pub fn entry_block(&self, index: u32) -> u64 {
        u64::from(self.header_size) + u64::from(index) * u64::from(self.entry_size)
    }

    /// First block after the index table, where the content of the first entry starts
    #[inline]
    pub fn first_content_block(&self) -> u64 {
        self.entry_block(self.entry_count)
    }

    /// Serialize into a full, zero-filled block
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let disk = endian::normalize_header(*self);
        let mut block = [0; BLOCK_SIZE];
        block[..mem::size_of::<Self>()].copy_from_slice(disk.as_bytes());
        block
    }

    /// Parse and validate a header from the start of `block`
    pub fn decode(block: &[u8]) -> Result<Self, FormatError> {
        let size = mem::size_of::<Self>();
        let raw = block.get(..size).ok_or(FormatError::Truncated {
            expected: size,
            actual: block.len(),
        })?;
        let mut disk = Self::new_zeroed();
        disk.as_bytes_mut().copy_from_slice(raw);
        if disk.magic != MAGIC {
            return Err(FormatError::BadMagic { found: disk.magic });
        }

        let header = endian::normalize_header(disk);
        // TODO: accept larger header_size/entry_size values once a newer layout defines them
        if header.partition_version != PARTITION_VERSION
            || header.index_table_version != INDEX_TABLE_VERSION
            || header.header_size != HEADER_SIZE
            || header.entry_size != ENTRY_SIZE
        {
            return Err(FormatError::UnsupportedVersion {
                partition_version: header.partition_version,
                index_table_version: header.index_table_version,
                header_size: header.header_size,
                entry_size: header.entry_size,
            });
        }
        Ok(header)
    }
}

impl fmt::Debug for PartitionHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PartitionHeader")
            .field("magic", &self.magic.as_bstr())
            .field("partition_version", &self.partition_version)
            .field("index_table_version", &self.index_table_version)
            .field("header_size", &self.header_size)
            .field("table_offset", &self.table_offset)
            .field("entry_size", &self.entry_size)
            .field("entry_count", &self.entry_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        assert_eq!(
            &PartitionHeader::new(0x0102_0304).encode()[..16],
            &[
                b'R', b'S', b'C', b'E', 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x00, 0x04,
                0x03, 0x02, 0x01,
            ][..]
        );
    }

    #[test]
    fn encode_zero_fills_block() {
        let block = PartitionHeader::new(5).encode();
        assert_eq!(block.len(), BLOCK_SIZE);
        assert!(block[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn decode_encoded() {
        let header = PartitionHeader::new(42);
        assert_eq!(PartitionHeader::decode(&header.encode()), Ok(header));
    }

    #[test]
    fn block_positions() {
        let header = PartitionHeader::new(3);
        assert_eq!(header.entry_block(0), 1);
        assert_eq!(header.entry_block(2), 3);
        assert_eq!(header.first_content_block(), 4);
        assert_eq!(PartitionHeader::new(0).first_content_block(), 1);
    }

    #[test]
    fn bad_magic() {
        let mut block = PartitionHeader::new(1).encode();
        block[0] = b'X';
        assert_eq!(
            PartitionHeader::decode(&block),
            Err(FormatError::BadMagic { found: *b"XSCE" })
        );
    }

    #[test]
    fn unsupported_header_size() {
        let mut block = PartitionHeader::new(1).encode();
        block[8] = 2;
        assert!(matches!(
            PartitionHeader::decode(&block),
            Err(FormatError::UnsupportedVersion { header_size: 2, .. })
        ));
    }

    #[test]
    fn unsupported_versions() {
        let mut block = PartitionHeader::new(1).encode();
        block[4] = 1;
        assert!(matches!(
            PartitionHeader::decode(&block),
            Err(FormatError::UnsupportedVersion {
                partition_version: 1,
                ..
            })
        ));

        let mut block = PartitionHeader::new(1).encode();
        block[10] = 4;
        assert!(matches!(
            PartitionHeader::decode(&block),
            Err(FormatError::UnsupportedVersion { entry_size: 4, .. })
        ));
    }

    #[test]
    fn truncated() {
        assert_eq!(
            PartitionHeader::decode(b"RSCE"),
            Err(FormatError::Truncated {
                expected: 16,
                actual: 4
            })
        );
    }
}
