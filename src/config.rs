use slog::Logger;
use std::path::PathBuf;

/// Image read and written when no path is given
pub const DEFAULT_IMAGE_PATH: &str = "resource.img";
/// Directory an image is unpacked into when no directory is given
pub const DEFAULT_UNPACK_DIR: &str = "out";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnpackMode {
    /// Write the content of every entry below the output directory
    Extract,
    /// Validate and report the header and index table, writing nothing
    PrintOnly,
}

impl Default for UnpackMode {
    fn default() -> Self {
        UnpackMode::Extract
    }
}

/// Settings for one pack or unpack call
#[derive(Debug, Clone)]
pub struct Config {
    /// Image to create when packing, or to read when unpacking
    pub image_path: PathBuf,
    /// Prefix stripped from the paths stored for packed files
    pub root_path: Option<PathBuf>,
    pub mode: UnpackMode,
    /// Where progress and the decoded metadata are reported. Defaults to the `log` crate
    pub logger: Option<Logger>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            image_path: PathBuf::from(DEFAULT_IMAGE_PATH),
            root_path: None,
            mode: UnpackMode::default(),
            logger: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Default::default()
    }
}
