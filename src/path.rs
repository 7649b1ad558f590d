//! Rules for the paths recorded in index entries

use std::path::{Component, Path};

/// File name suffix marking a device tree blob
pub const DEVICE_TREE_SUFFIX: &[u8] = b".dtb";

/// Strip one leading `./`
pub fn strip_current_dir(path: &[u8]) -> &[u8] {
    path.strip_prefix(b"./").unwrap_or(path)
}

/// The path stored for an input file: one leading `./` removed, then `root_path` (when non-empty
/// and a prefix) removed together with one following `/`
pub fn normalize<'a>(path: &'a [u8], root_path: &[u8]) -> &'a [u8] {
    let path = strip_current_dir(path);
    if root_path.is_empty() {
        return path;
    }
    match path.strip_prefix(root_path) {
        Some(rest) => rest.strip_prefix(b"/").unwrap_or(rest),
        None => path,
    }
}

pub fn is_device_tree(path: &[u8]) -> bool {
    path.ends_with(DEVICE_TREE_SUFFIX)
}

/// True if `path` names something strictly below whatever directory it is joined to
pub fn is_safe_relative(path: &Path) -> bool {
    let mut named = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            _ => return false,
        }
    }
    named
}
