//! Pack and unpack resource partition images
//!
//! A resource image is a flat, block-aligned container: one header block, one index block per
//! packed file, then the content of each file starting on its own block. The on-disk records
//! live in the [`repr`] crate; this crate reads and writes whole images.

pub mod block_store;
pub mod config;
mod errors;
pub mod path;
pub mod read;
pub mod write;

pub use errors::{BlockError, PackError, UnpackError};
pub use repr;

use config::{Config, UnpackMode};
use read::Image;
use repr::entry::IndexEntry;
use slog::{Drain, Logger};
use std::path::Path;
use write::ImageBuilder;

pub(crate) fn default_logger() -> Logger {
    Logger::root(slog_stdlog::StdLog.fuse(), slog::o!())
}

/// Pack `inputs` into a new image at `config.image_path`
pub fn pack<P: AsRef<Path>>(config: &Config, inputs: &[P]) -> Result<Vec<IndexEntry>, PackError> {
    ImageBuilder::from_config(config).pack(&config.image_path, inputs)
}

/// Read the image at `config.image_path` and, unless `config.mode` is
/// [`UnpackMode::PrintOnly`], write its entries below `output_dir`
///
/// The returned index table is the one read from the image, whatever the mode.
pub fn unpack<Q: AsRef<Path>>(config: &Config, output_dir: Q) -> Result<Vec<IndexEntry>, UnpackError> {
    let output_dir = output_dir.as_ref();
    if config.mode == UnpackMode::Extract {
        std::fs::create_dir_all(output_dir).map_err(|e| UnpackError::io(output_dir, e))?;
    }

    let logger = config.logger.clone().unwrap_or_else(default_logger);
    let mut image = Image::open_with_logger(&config.image_path, logger)?;
    match config.mode {
        UnpackMode::Extract => image.extract_all(output_dir)?,
        UnpackMode::PrintOnly => {}
    }
    Ok(image.into_entries())
}
