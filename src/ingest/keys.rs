// src/ingest/keys.rs

use std::fmt;
use std::path::Path;

use crate::traverse::{Matcher, ROOT_DIR_KEY};

/// Logical key of a watched file: `<dir>:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    /// Name of the directory holding the file, or `root`.
    pub dir: String,
    pub name: String,
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dir, self.name)
    }
}

/// Derive the key a changed file is recorded under.
///
/// Files directly in `bucket_root` get the `root` directory name; any other
/// file is keyed by the name of its parent directory. Returns `None` for
/// paths without a usable file name.
pub fn derive_key(bucket_root: &Path, path: &Path, matcher: &Matcher) -> Option<FileKey> {
    let file_name = path.file_name()?.to_str()?;
    let parent = path.parent()?;

    let dir = if parent == bucket_root {
        ROOT_DIR_KEY.to_string()
    } else {
        parent.file_name()?.to_str()?.to_string()
    };

    Some(FileKey {
        dir,
        name: matcher.key_name(file_name).to_string(),
    })
}
