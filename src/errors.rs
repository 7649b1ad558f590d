use bstr::BString;
use repr::FormatError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a single block store operation
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("seek to {expected:#x} ended at {actual:#x}")]
    SeekMismatch { expected: u64, actual: u64 },
    #[error("short write at {offset:#x}: wrote {written} of {expected} bytes")]
    ShortWrite {
        offset: u64,
        written: usize,
        expected: usize,
    },
    #[error("truncated read at {offset:#x}: got {actual} of {expected} bytes")]
    TruncatedRead {
        offset: u64,
        expected: u64,
        actual: u64,
    },
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("Failed to pack {}: {source}", path.display())]
    Io { path: PathBuf, source: BlockError },
    #[error("{} is too large for an image entry ({size} bytes)", path.display())]
    FileTooLarge { path: PathBuf, size: u64 },
    #[error("Image content would end past block {blocks}, beyond what an entry can address")]
    ImageTooLarge { blocks: u64 },
}

impl PackError {
    pub(crate) fn io<E: Into<BlockError>>(path: &Path, error: E) -> Self {
        PackError::Io {
            path: path.to_path_buf(),
            source: error.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("Failed to unpack {}: {source}", path.display())]
    Io { path: PathBuf, source: BlockError },
    #[error("Not a supported resource image: {0}")]
    InvalidImage(#[source] FormatError),
    #[error("Index entry {index} is corrupt: {source}")]
    CorruptEntry { index: u32, source: FormatError },
    #[error("Index entry {index} has a path that escapes the output directory: {path:?}")]
    UnsafePath { index: u32, path: BString },
}

impl UnpackError {
    pub(crate) fn io<E: Into<BlockError>>(path: &Path, error: E) -> Self {
        UnpackError::Io {
            path: path.to_path_buf(),
            source: error.into(),
        }
    }
}
