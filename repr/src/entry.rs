//! Index Table
//!
//! One entry per packed file, stored in pack order directly after the header. Each entry takes
//! a whole block and records where the content of its file lives.

use bstr::ByteSlice;
use static_assertions::{assert_eq_size, const_assert};
use std::{fmt, mem};
use zerocopy::{AsBytes, FromBytes};

use crate::{blocks_needed, endian, FormatError, BLOCK_SIZE};

/// The tag stored at the start of every entry
pub const TAG: [u8; 4] = *b"ENTR";

/// Width of the embedded path field. A path filling the field exactly has no NUL terminator.
pub const PATH_LEN: usize = 256;

/// Path the first device tree of an image is stored under, where the bootloader looks for it
pub const DEVICE_TREE_PATH: &[u8] = b"rk-kernel.dtb";

#[derive(Copy, Clone, PartialEq, Eq, AsBytes, FromBytes)]
#[repr(C)]
pub struct IndexEntry {
    /// Must match [`TAG`](constant.TAG.html) (`ENTR`)
    pub tag: [u8; 4],
    /// Relative destination path, zero padded
    pub path: [u8; PATH_LEN],
    /// Block at which the content starts, counted from the start of the image
    pub content_offset: u32,
    /// Length of the content in bytes
    pub content_size: u32,
}

assert_eq_size!(IndexEntry, [u8; 268]);
const_assert!(mem::size_of::<IndexEntry>() <= BLOCK_SIZE);

impl IndexEntry {
    /// Create an entry for `path`, truncating it to [`PATH_LEN`](constant.PATH_LEN.html) bytes
    pub fn new(path: &[u8], content_offset: u32, content_size: u32) -> Self {
        let mut entry = Self::new_zeroed();
        entry.tag = TAG;
        let len = path.len().min(PATH_LEN);
        entry.path[..len].copy_from_slice(&path[..len]);
        entry.content_offset = content_offset;
        entry.content_size = content_size;
        entry
    }

    /// The stored path, up to the first NUL or the end of the field
    pub fn path(&self) -> &[u8] {
        let len = self.path.find_byte(0).unwrap_or(PATH_LEN);
        &self.path[..len]
    }

    /// Byte offset of the content from the start of the image
    #[inline]
    pub fn byte_offset(&self) -> u64 {
        u64::from(self.content_offset) * BLOCK_SIZE as u64
    }

    /// Blocks the content occupies, including the padding of its last block
    #[inline]
    pub fn content_blocks(&self) -> u64 {
        blocks_needed(self.content_size.into())
    }

    /// Serialize into a full, zero-filled block
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let disk = endian::normalize_entry(*self);
        let mut block = [0; BLOCK_SIZE];
        block[..mem::size_of::<Self>()].copy_from_slice(disk.as_bytes());
        block
    }

    /// Parse an entry from the start of `block`, checking its tag
    pub fn decode(block: &[u8]) -> Result<Self, FormatError> {
        let size = mem::size_of::<Self>();
        let raw = block.get(..size).ok_or(FormatError::Truncated {
            expected: size,
            actual: block.len(),
        })?;
        let mut disk = Self::new_zeroed();
        disk.as_bytes_mut().copy_from_slice(raw);
        if disk.tag != TAG {
            return Err(FormatError::BadTag { found: disk.tag });
        }
        Ok(endian::normalize_entry(disk))
    }
}

impl fmt::Debug for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IndexEntry")
            .field("tag", &self.tag.as_bstr())
            .field("path", &self.path().as_bstr())
            .field("content_offset", &self.content_offset)
            .field("content_size", &self.content_size)
            .finish()
    }
}
