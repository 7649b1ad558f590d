//! Block-addressed access to an image
//!
//! Every operation seeks to an absolute position first, so nothing relies on where the
//! previous call left the handle.

use crate::errors::BlockError;
use repr::BLOCK_SIZE;
use std::io::{self, Read, Seek, SeekFrom, Write};

pub use repr::blocks_needed;

/// Exclusive handle over an image, addressed in blocks for writing and bytes for reading
#[derive(Debug)]
pub struct BlockStore<F> {
    inner: F,
}

impl<F> BlockStore<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &F {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut F {
        &mut self.inner
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: Seek> BlockStore<F> {
    fn seek_to(&mut self, offset: u64) -> Result<(), BlockError> {
        let actual = self.inner.seek(SeekFrom::Start(offset))?;
        if actual != offset {
            return Err(BlockError::SeekMismatch {
                expected: offset,
                actual,
            });
        }
        Ok(())
    }
}

impl<F: Write + Seek> BlockStore<F> {
    /// Write `buf` starting at block `block_offset`
    ///
    /// If `buf` does not end on a block boundary, its last block is padded with zeros, so the
    /// write always covers `blocks_needed(buf.len())` whole blocks.
    pub fn write_blocks(&mut self, block_offset: u64, buf: &[u8]) -> Result<(), BlockError> {
        let offset = block_offset * BLOCK_SIZE as u64;
        self.seek_to(offset)?;

        let (body, tail) = buf.split_at(buf.len() - buf.len() % BLOCK_SIZE);
        write_exact(&mut self.inner, body, offset)?;
        if !tail.is_empty() {
            let mut last = [0; BLOCK_SIZE];
            last[..tail.len()].copy_from_slice(tail);
            write_exact(&mut self.inner, &last, offset + body.len() as u64)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), BlockError> {
        self.inner.flush().map_err(Into::into)
    }
}

impl<F: Read + Seek> BlockStore<F> {
    /// Read exactly `size` bytes starting at `byte_offset`
    pub fn read_block(&mut self, byte_offset: u64, size: usize) -> Result<Vec<u8>, BlockError> {
        self.seek_to(byte_offset)?;
        let mut buf = vec![0; size];
        let read = read_full(&mut self.inner, &mut buf)?;
        if read < size {
            return Err(BlockError::TruncatedRead {
                offset: byte_offset,
                expected: size as u64,
                actual: read as u64,
            });
        }
        Ok(buf)
    }

    /// Copy exactly `len` bytes starting at `byte_offset` into `writer`, one block at a time
    pub fn copy_out<W: Write>(
        &mut self,
        byte_offset: u64,
        len: u64,
        mut writer: W,
    ) -> Result<(), BlockError> {
        self.seek_to(byte_offset)?;
        let mut block = [0; BLOCK_SIZE];
        let mut copied = 0;
        while copied < len {
            let want = (len - copied).min(BLOCK_SIZE as u64) as usize;
            let read = read_full(&mut self.inner, &mut block[..want])?;
            writer.write_all(&block[..read])?;
            copied += read as u64;
            if read < want {
                return Err(BlockError::TruncatedRead {
                    offset: byte_offset,
                    expected: len,
                    actual: copied,
                });
            }
        }
        Ok(())
    }
}

// `write_all` drops how much was written before a zero-length write, which `ShortWrite` reports
fn write_exact<W: Write>(writer: &mut W, buf: &[u8], offset: u64) -> Result<(), BlockError> {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => {
                return Err(BlockError::ShortWrite {
                    offset,
                    written,
                    expected: buf.len(),
                })
            }
            Ok(n) => written += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Read until `buf` is full or the reader is exhausted, returning the bytes read
///
/// Unlike `read_exact`, a short read keeps its byte count for `TruncatedRead`.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match reader.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn partial_block_is_zero_padded() {
        let mut store = BlockStore::new(Cursor::new(vec![0xFF; 4 * BLOCK_SIZE]));
        store.write_blocks(1, &[0xAB; BLOCK_SIZE + 3]).unwrap();

        let image = store.into_inner().into_inner();
        assert_eq!(image.len(), 4 * BLOCK_SIZE);
        assert!(image[..BLOCK_SIZE].iter().all(|&b| b == 0xFF));
        assert!(image[BLOCK_SIZE..2 * BLOCK_SIZE + 3]
            .iter()
            .all(|&b| b == 0xAB));
        assert!(image[2 * BLOCK_SIZE + 3..3 * BLOCK_SIZE]
            .iter()
            .all(|&b| b == 0));
        assert!(image[3 * BLOCK_SIZE..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn write_past_end_extends() {
        let mut store = BlockStore::new(Cursor::new(Vec::new()));
        store.write_blocks(2, b"abc").unwrap();
        let image = store.into_inner().into_inner();
        assert_eq!(image.len(), 3 * BLOCK_SIZE);
        assert_eq!(&image[2 * BLOCK_SIZE..2 * BLOCK_SIZE + 3], b"abc");
    }

    #[test]
    fn empty_write_writes_nothing() {
        let mut store = BlockStore::new(Cursor::new(Vec::new()));
        store.write_blocks(0, &[]).unwrap();
        assert!(store.into_inner().into_inner().is_empty());
    }

    #[test]
    fn short_write() {
        let mut image = [0u8; BLOCK_SIZE];
        let mut store = BlockStore::new(Cursor::new(&mut image[..]));
        assert!(matches!(
            store.write_blocks(0, &[1; BLOCK_SIZE + 1]),
            Err(BlockError::ShortWrite {
                offset,
                written: 0,
                expected,
            }) if offset == BLOCK_SIZE as u64 && expected == BLOCK_SIZE
        ));
    }

    #[test]
    fn read_at_offset() {
        let data: Vec<u8> = (0..=255).collect();
        let mut store = BlockStore::new(Cursor::new(data));
        assert_eq!(store.read_block(10, 4).unwrap(), vec![10, 11, 12, 13]);
        // Position is never carried over between calls
        assert_eq!(store.read_block(0, 2).unwrap(), vec![0, 1]);
    }

    #[test]
    fn truncated_read() {
        let mut store = BlockStore::new(Cursor::new(vec![0; 100]));
        assert!(matches!(
            store.read_block(0, BLOCK_SIZE),
            Err(BlockError::TruncatedRead {
                offset: 0,
                actual: 100,
                ..
            })
        ));
    }

    #[test]
    fn copy_out_exact_length() {
        let mut data = vec![0; 3 * BLOCK_SIZE];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        let mut store = BlockStore::new(Cursor::new(data.clone()));
        let mut out = Vec::new();
        store
            .copy_out(BLOCK_SIZE as u64, BLOCK_SIZE as u64 + 7, &mut out)
            .unwrap();
        assert_eq!(&out[..], &data[BLOCK_SIZE..2 * BLOCK_SIZE + 7]);
    }

    #[test]
    fn copy_out_past_end() {
        let mut store = BlockStore::new(Cursor::new(vec![1; BLOCK_SIZE]));
        let mut out = Vec::new();
        assert!(matches!(
            store.copy_out(0, 2 * BLOCK_SIZE as u64, &mut out),
            Err(BlockError::TruncatedRead { actual, .. }) if actual == BLOCK_SIZE as u64
        ));
    }
}
