use crate::block_store::BlockStore;
use crate::errors::UnpackError;
use crate::path;
use bstr::{BString, ByteSlice};
use repr::entry::IndexEntry;
use repr::header::PartitionHeader;
use repr::BLOCK_SIZE;
use slog::Logger;
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

/// Name used in errors for images that were not opened from a path
const UNNAMED_IMAGE: &str = "<image>";

/// A validated image: the header and every index entry have been decoded and checked
#[derive(Debug)]
pub struct Image<R> {
    store: BlockStore<R>,
    name: PathBuf,
    header: PartitionHeader,
    entries: Vec<IndexEntry>,
    logger: Logger,
}

impl Image<File> {
    pub fn open<P: AsRef<Path>>(p: P) -> Result<Self, UnpackError> {
        Image::open_with_logger(p, crate::default_logger())
    }

    pub fn open_with_logger<P: AsRef<Path>>(p: P, logger: Logger) -> Result<Self, UnpackError> {
        Self::_open_with_logger(p.as_ref(), logger)
    }

    fn _open_with_logger(path: &Path, logger: Logger) -> Result<Self, UnpackError> {
        let path_str = path.display().to_string();
        let logger = logger.new(slog::o!("image" => path_str));
        let file = File::open(path).map_err(|e| UnpackError::io(path, e))?;
        Self::load(file, path.to_path_buf(), logger)
    }
}

impl<R: Read + Seek> Image<R> {
    pub fn new(reader: R) -> Result<Self, UnpackError> {
        Self::with_logger(reader, crate::default_logger())
    }

    pub fn with_logger(reader: R, logger: Logger) -> Result<Self, UnpackError> {
        Self::load(reader, PathBuf::from(UNNAMED_IMAGE), logger)
    }

    fn load(reader: R, name: PathBuf, logger: Logger) -> Result<Self, UnpackError> {
        let mut store = BlockStore::new(reader);

        let block = store
            .read_block(0, BLOCK_SIZE)
            .map_err(|e| UnpackError::io(&name, e))?;
        let header = PartitionHeader::decode(&block).map_err(UnpackError::InvalidImage)?;
        log_header(&logger, &header);
        if header.table_offset != header.header_size {
            slog::warn!(logger, "Index table offset differs from header size, reading entries after the header";
                "table_offset" => header.table_offset,
                "header_size" => header.header_size
            );
        }

        // entry_count is untrusted, so the table grows only as entries are actually read
        let mut entries = Vec::new();
        for index in 0..header.entry_count {
            let offset = header.entry_block(index) * BLOCK_SIZE as u64;
            let block = store
                .read_block(offset, BLOCK_SIZE)
                .map_err(|e| UnpackError::io(&name, e))?;
            let entry = IndexEntry::decode(&block)
                .map_err(|source| UnpackError::CorruptEntry { index, source })?;
            slog::info!(logger, "Index entry";
                "index" => index,
                "path" => %entry.path().as_bstr(),
                "content_offset" => entry.content_offset,
                "content_size" => entry.content_size
            );
            entries.push(entry);
        }

        Ok(Self {
            store,
            name,
            header,
            entries,
            logger,
        })
    }

    pub fn header(&self) -> &PartitionHeader {
        &self.header
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<IndexEntry> {
        self.entries
    }

    /// Read the whole content of `entry` into memory
    pub fn read_entry(&mut self, entry: &IndexEntry) -> Result<Vec<u8>, UnpackError> {
        let mut contents = Vec::new();
        self.store
            .copy_out(
                entry.byte_offset(),
                entry.content_size.into(),
                &mut contents,
            )
            .map_err(|e| UnpackError::io(&self.name, e))?;
        Ok(contents)
    }

    /// Write every entry below `output_dir`, creating parent directories as needed
    ///
    /// All entry paths are checked before anything is written.
    pub fn extract_all<P: AsRef<Path>>(&mut self, output_dir: P) -> Result<(), UnpackError> {
        self._extract_all(output_dir.as_ref())
    }

    fn _extract_all(&mut self, output_dir: &Path) -> Result<(), UnpackError> {
        let targets = (0..self.header.entry_count)
            .zip(&self.entries)
            .map(|(index, entry)| target_path(output_dir, index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        for (entry, target) in self.entries.iter().zip(&targets) {
            extract_to(&mut self.store, &self.logger, entry, target)?;
        }

        slog::info!(self.logger, "Unpacked image";
            "output_dir" => %output_dir.display(),
            "entries" => self.entries.len()
        );
        Ok(())
    }

}

fn extract_to<R: Read + Seek>(
    store: &mut BlockStore<R>,
    logger: &Logger,
    entry: &IndexEntry,
    target: &Path,
) -> Result<(), UnpackError> {
    slog::debug!(logger, "Extracting entry";
        "path" => %entry.path().as_bstr(),
        "target" => %target.display()
    );
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| UnpackError::io(parent, e))?;
    }

    let file = File::create(target).map_err(|e| UnpackError::io(target, e))?;
    let mut writer = io::BufWriter::new(file);
    store
        .copy_out(entry.byte_offset(), entry.content_size.into(), &mut writer)
        .map_err(|e| UnpackError::io(target, e))?;
    writer.flush().map_err(|e| UnpackError::io(target, e))
}

fn target_path(output_dir: &Path, index: u32, entry: &IndexEntry) -> Result<PathBuf, UnpackError> {
    let relative = entry.path().to_path_lossy();
    if !path::is_safe_relative(&relative) {
        return Err(UnpackError::UnsafePath {
            index,
            path: BString::from(entry.path()),
        });
    }
    Ok(output_dir.join(relative))
}

fn log_header(logger: &Logger, header: &PartitionHeader) {
    slog::info!(logger, "Read header";
        "magic" => %header.magic.as_bstr(),
        "partition_version" => header.partition_version,
        "index_table_version" => header.index_table_version,
        "header_size" => header.header_size,
        "table_offset" => header.table_offset,
        "entry_size" => header.entry_size,
        "entry_count" => header.entry_count
    )
}
