use crate::block_store::BlockStore;
use crate::config::Config;
use crate::errors::PackError;
use crate::path;
use bstr::{ByteSlice, ByteVec};
use repr::entry::{IndexEntry, DEVICE_TREE_PATH, PATH_LEN};
use repr::header::PartitionHeader;
use slog::Logger;
use std::convert::TryFrom;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Packs files into a new image
///
/// Every pack starts from an empty image: the destination is truncated, the header and index
/// table are written for the whole file list, and the content of each file follows the index
/// table in entry order, each file starting on a fresh block.
#[derive(Debug, Clone, Default)]
pub struct ImageBuilder {
    /// Prefix stripped from the stored path of every input that starts with it
    pub root_path: Option<PathBuf>,

    logger: Option<Logger>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_config(config: &Config) -> Self {
        ImageBuilder {
            root_path: config.root_path.clone(),
            logger: config.logger.clone(),
        }
    }

    pub fn set_root_path<P: Into<PathBuf>>(&mut self, root_path: P) -> &mut Self {
        self.root_path = Some(root_path.into());
        self
    }

    pub fn set_logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = Some(logger);
        self
    }

    /// Pack `inputs` into a new image at `destination`, returning the index table written
    ///
    /// An empty `inputs` is a no-op: the destination is not touched and no entries are returned.
    pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        destination: P,
        inputs: &[Q],
    ) -> Result<Vec<IndexEntry>, PackError> {
        let inputs: Vec<&Path> = inputs.iter().map(AsRef::as_ref).collect();
        self._pack(destination.as_ref(), &inputs)
    }

    fn _pack(&self, destination: &Path, inputs: &[&Path]) -> Result<Vec<IndexEntry>, PackError> {
        let logger = self.logger.clone().unwrap_or_else(crate::default_logger);
        let logger = logger.new(slog::o!("image" => destination.display().to_string()));

        if inputs.is_empty() {
            slog::warn!(logger, "No file to pack");
            return Ok(Vec::new());
        }
        slog::debug!(logger, "Packing files"; "count" => inputs.len());

        let file = File::create(destination).map_err(|e| PackError::io(destination, e))?;
        let mut store = BlockStore::new(file);

        let ordered = order_inputs(destination, inputs, &logger);
        let entry_count = u32::try_from(ordered.len()).map_err(|_| PackError::ImageTooLarge {
            blocks: ordered.len() as u64,
        })?;
        let header = PartitionHeader::new(entry_count);
        slog::debug!(logger, "Writing header"; "entry_count" => entry_count);
        store
            .write_blocks(0, &header.encode())
            .map_err(|e| PackError::io(destination, e))?;

        let root_path = self
            .root_path
            .as_deref()
            .map(|root| Vec::from_path_lossy(root))
            .unwrap_or_default();
        let mut found_device_tree = false;
        let mut next_block = header.first_content_block();
        let mut entries = Vec::with_capacity(ordered.len());

        for (index, &input) in (0..entry_count).zip(&ordered) {
            let contents = fs::read(input).map_err(|e| PackError::io(input, e))?;
            let content_size =
                u32::try_from(contents.len()).map_err(|_| PackError::FileTooLarge {
                    path: input.to_path_buf(),
                    size: contents.len() as u64,
                })?;
            let content_offset = u32::try_from(next_block)
                .map_err(|_| PackError::ImageTooLarge { blocks: next_block })?;

            slog::debug!(logger, "Writing content";
                "path" => %input.display(),
                "content_offset" => content_offset,
                "content_size" => content_size
            );
            store
                .write_blocks(next_block, &contents)
                .map_err(|e| PackError::io(destination, e))?;

            let stored = stored_path(input, &root_path, &mut found_device_tree, &logger);
            let entry = IndexEntry::new(&stored, content_offset, content_size);
            store
                .write_blocks(header.entry_block(index), &entry.encode())
                .map_err(|e| PackError::io(destination, e))?;

            next_block += entry.content_blocks();
            entries.push(entry);
        }

        store.flush().map_err(|e| PackError::io(destination, e))?;
        slog::info!(logger, "Packed image";
            "entries" => entries.len(),
            "blocks" => next_block
        );
        Ok(entries)
    }
}

/// Device trees first, everything else after, each group in the given order. Any input naming
/// the destination itself is dropped.
fn order_inputs<'a>(destination: &Path, inputs: &[&'a Path], logger: &Logger) -> Vec<&'a Path> {
    let image = Vec::from_path_lossy(destination);
    let image = path::strip_current_dir(&image);

    let (device_trees, others): (Vec<&Path>, Vec<&Path>) = inputs
        .iter()
        .copied()
        .filter(|input| {
            let is_image = path::strip_current_dir(&Vec::from_path_lossy(input)) == image;
            if is_image {
                slog::warn!(logger, "Not packing the image into itself"; "path" => %input.display());
            }
            !is_image
        })
        .partition(|input| path::is_device_tree(&Vec::from_path_lossy(input)));

    device_trees.into_iter().chain(others).collect()
}

/// The path recorded for `input`. The first device tree packed is stored under
/// [`DEVICE_TREE_PATH`] instead of its own name.
fn stored_path(
    input: &Path,
    root_path: &[u8],
    found_device_tree: &mut bool,
    logger: &Logger,
) -> Vec<u8> {
    let raw = Vec::from_path_lossy(input);
    if path::is_device_tree(&raw) && !*found_device_tree {
        *found_device_tree = true;
        slog::debug!(logger, "Storing first device tree under the default path";
            "path" => %input.display(),
            "stored" => %DEVICE_TREE_PATH.as_bstr()
        );
        return DEVICE_TREE_PATH.to_vec();
    }

    let stored = path::normalize(&raw, root_path);
    if stored.len() > PATH_LEN {
        slog::warn!(logger, "Path too long for an index entry, truncating";
            "path" => %stored.as_bstr(),
            "max_len" => PATH_LEN
        );
    }
    stored.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discard() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn ordered<'a>(destination: &str, inputs: &[&'a str]) -> Vec<&'a str> {
        let inputs: Vec<&Path> = inputs.iter().map(|input| Path::new(*input)).collect();
        order_inputs(Path::new(destination), &inputs, &discard())
            .into_iter()
            .map(|p| p.to_str().unwrap())
            .collect()
    }

    #[test]
    fn device_trees_first_and_stable() {
        assert_eq!(
            ordered(
                "resource.img",
                &["logo.bmp", "a.dtb", "charge.bmp", "b.dtb", "c.img"]
            ),
            vec!["a.dtb", "b.dtb", "logo.bmp", "charge.bmp", "c.img"]
        );
    }

    #[test]
    fn image_is_excluded() {
        assert_eq!(
            ordered("resource.img", &["a.bmp", "./resource.img", "b.dtb"]),
            vec!["b.dtb", "a.bmp"]
        );
        assert_eq!(
            ordered("./out/resource.img", &["out/resource.img", "x"]),
            vec!["x"]
        );
    }

    #[test]
    fn only_first_device_tree_is_renamed() {
        let mut found = false;
        let logger = discard();
        assert_eq!(
            stored_path(Path::new("dts/a.dtb"), b"", &mut found, &logger),
            DEVICE_TREE_PATH
        );
        assert!(found);
        assert_eq!(
            stored_path(Path::new("./dts/b.dtb"), b"dts", &mut found, &logger),
            b"b.dtb"
        );
        assert_eq!(
            stored_path(Path::new("./dts/logo.bmp"), b"dts", &mut found, &logger),
            b"logo.bmp"
        );
    }
}
