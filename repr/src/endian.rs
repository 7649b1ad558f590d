//! Byte order of the on-disk records
//!
//! The image stores every multi-byte integer little-endian, whatever the host is. The functions
//! here swap exactly those fields and leave the byte-array fields alone. On a little-endian host
//! they are the identity, on a big-endian host they swap; either way applying one twice gives
//! back the original value, so the same call prepares a record for writing and interprets a
//! record that was just read.

use crate::entry::IndexEntry;
use crate::header::PartitionHeader;

/// Convert the integer fields of a header between host and on-disk order
#[inline]
pub fn normalize_header(mut header: PartitionHeader) -> PartitionHeader {
    header.partition_version = header.partition_version.to_le();
    header.index_table_version = header.index_table_version.to_le();
    header.entry_count = header.entry_count.to_le();
    header
}

/// Convert the integer fields of an index entry between host and on-disk order
#[inline]
pub fn normalize_entry(mut entry: IndexEntry) -> IndexEntry {
    entry.content_offset = entry.content_offset.to_le();
    entry.content_size = entry.content_size.to_le();
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_involution() {
        let mut header = PartitionHeader::new(0x0102_0304);
        header.partition_version = 0xA1B2;
        header.index_table_version = 0xC3D4;
        assert_eq!(normalize_header(normalize_header(header)), header);
    }

    #[test]
    fn entry_involution() {
        let entry = IndexEntry::new(b"dir/file.bin", 0x1122_3344, 0x5566_7788);
        let twice = normalize_entry(normalize_entry(entry));
        assert_eq!(twice, entry);
        assert_eq!(twice.path(), b"dir/file.bin");
    }

    #[test]
    fn only_integer_fields_change() {
        let entry = IndexEntry::new(b"a.dtb", 7, 9);
        let disk = normalize_entry(entry);
        assert_eq!(disk.tag, entry.tag);
        assert_eq!(disk.path, entry.path);

        let header = PartitionHeader::new(3);
        let disk = normalize_header(header);
        assert_eq!(disk.magic, header.magic);
        assert_eq!(disk.header_size, header.header_size);
        assert_eq!(disk.table_offset, header.table_offset);
        assert_eq!(disk.entry_size, header.entry_size);
    }

    #[test]
    fn on_disk_order_is_little_endian() {
        let entry = normalize_entry(IndexEntry::new(b"x", 0x0000_0102, 0x0304_0506));
        assert_eq!(entry.content_offset.to_ne_bytes(), [0x02, 0x01, 0x00, 0x00]);
        assert_eq!(entry.content_size.to_ne_bytes(), [0x06, 0x05, 0x04, 0x03]);
    }
}
