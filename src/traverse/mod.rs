// src/traverse/mod.rs

//! Read-only graph queries over a loaded [`Pipeline`].
//!
//! Nothing here fails: unknown IDs and links whose endpoints do not exist
//! simply contribute nothing to a result. No ordering among sibling links is
//! promised beyond the deterministic key order of the underlying maps.

mod matcher;
pub mod topology;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::pipeline::{Command, Link, Pipeline};

pub use matcher::Matcher;

/// Key prefix for files placed directly in the pipeline's bucket directory.
pub const ROOT_DIR_KEY: &str = "root";

/// An upstream directory a command consumes files from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileSource {
    /// Directory relative to the bucket root; empty for the root itself.
    pub dir: String,
}

impl FileSource {
    /// Prefix of the file keys that live in this directory.
    ///
    /// Keys are `<dir-name>:<file>`, so the trailing separator keeps `in`
    /// from matching keys of a sibling `inbox`.
    pub fn key_prefix(&self) -> String {
        format!("{}:", dir_key(&self.dir))
    }
}

/// A directory/pattern pair that event ingestion monitors.
#[derive(Debug, Clone)]
pub struct WatchItem {
    /// Directory relative to the bucket root; empty for the root itself.
    pub dir: String,
    pub matcher: Matcher,
}

impl WatchItem {
    /// Directory to watch, given the pipeline's bucket directory.
    pub fn watch_dir(&self, bucket_root: &Path) -> PathBuf {
        if self.dir.is_empty() {
            bucket_root.to_path_buf()
        } else {
            bucket_root.join(&self.dir)
        }
    }

    pub fn key_prefix(&self) -> String {
        format!("{}:", dir_key(&self.dir))
    }
}

/// Name used in file keys for a directory relative to the bucket root.
fn dir_key(dir: &str) -> &str {
    if dir.is_empty() {
        return ROOT_DIR_KEY;
    }
    dir.rsplit('/').find(|s| !s.is_empty()).unwrap_or(ROOT_DIR_KEY)
}

impl Pipeline {
    /// Links ending at `cmd`.
    pub fn links_to(&self, cmd: &Command) -> Vec<&Link> {
        self.links.values().filter(|l| l.target == cmd.id).collect()
    }

    /// Links leaving `cmd`.
    pub fn links_from(&self, cmd: &Command) -> Vec<&Link> {
        self.links.values().filter(|l| l.source == cmd.id).collect()
    }

    /// Commands that are never the target of a link.
    pub fn start(&self) -> Vec<&Command> {
        let targets: BTreeSet<&str> = self.links.values().map(|l| l.target.as_str()).collect();
        self.commands
            .values()
            .filter(|c| !targets.contains(c.id.as_str()))
            .collect()
    }

    /// Commands that are never the source of a link.
    pub fn end(&self) -> Vec<&Command> {
        let sources: BTreeSet<&str> = self.links.values().map(|l| l.source.as_str()).collect();
        self.commands
            .values()
            .filter(|c| !sources.contains(c.id.as_str()))
            .collect()
    }

    /// Commands one outgoing link away. Dangling targets are skipped.
    pub fn next(&self, cmd: &Command) -> Vec<&Command> {
        self.links_from(cmd)
            .into_iter()
            .filter_map(|l| self.commands.get(&l.target))
            .collect()
    }

    /// Commands one incoming link away. Dangling sources are skipped.
    pub fn prev(&self, cmd: &Command) -> Vec<&Command> {
        self.links_to(cmd)
            .into_iter()
            .filter_map(|l| self.commands.get(&l.source))
            .collect()
    }

    /// Whether more than one link ends at `cmd`.
    pub fn is_convergence(&self, cmd: &Command) -> bool {
        self.links_to(cmd).len() > 1
    }

    /// The link from `source` to `dest`, if there is one.
    pub fn connection(&self, source: &Command, dest: &Command) -> Option<&Link> {
        self.links
            .values()
            .find(|l| l.source == source.id && l.target == dest.id)
    }

    /// Directory a file link reads from, relative to the bucket root.
    ///
    /// An empty link path means the directory named after the source command.
    /// A directory named like the bucket itself is the bucket root.
    pub fn link_dir(&self, link: &Link) -> Option<String> {
        let path = link.as_path()?;
        let dir = path.path.trim_matches('/');
        let dir = if dir.is_empty() {
            self.commands.get(&link.source)?.name.clone()
        } else {
            dir.to_string()
        };
        if dir == self.bucket_name {
            Some(String::new())
        } else {
            Some(dir)
        }
    }

    /// Upstream directories `cmd` consumes files from, one per distinct
    /// directory of its incoming file links.
    pub fn file_sources(&self, cmd: &Command) -> Vec<FileSource> {
        let dirs: BTreeSet<String> = self
            .links_to(cmd)
            .into_iter()
            .filter_map(|l| self.link_dir(l))
            .collect();
        dirs.into_iter().map(|dir| FileSource { dir }).collect()
    }

    /// One entry per distinct directory/pattern pair among watched links.
    pub fn watch_items(&self) -> Vec<WatchItem> {
        let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
        let mut items = Vec::new();
        for link in self.links.values().filter(|l| l.is_watched()) {
            let (Some(dir), Some(path)) = (self.link_dir(link), link.as_path()) else {
                continue;
            };
            if !seen.insert((dir.clone(), path.pattern.clone())) {
                continue;
            }
            items.push(WatchItem {
                dir,
                matcher: Matcher::compile(&path.pattern),
            });
        }
        items
    }
}
