// src/ingest/mod.rs

//! Event ingestion: turning filesystem events into file status records.
//!
//! - [`watcher`] runs one notify watcher per watched directory/pattern.
//! - [`Ingestor`] filters events, derives file keys and tracks per-file
//!   state in [`tracker`].
//! - [`writer`] delivers the resulting status writes to a [`sink`] through a
//!   bounded pool of senders.

pub mod keys;
pub mod sink;
pub mod tracker;
pub mod watcher;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::traverse::WatchItem;

pub use keys::{FileKey, derive_key};
pub use sink::{BucketRecord, NamespaceSink, StatusSink, StatusWrite};
pub use tracker::{FileState, FileTracker, FsEvent, StatusChange};
pub use watcher::{WatcherHandle, spawn_watchers};
pub use writer::{StatusWriter, WriteOutcome, WriteTicket, WriterOptions, WriterPool};

/// Handles events for the watched directories of one pipeline bucket.
#[derive(Debug)]
pub struct Ingestor {
    bucket: String,
    bucket_root: PathBuf,
    fs: Arc<dyn FileSystem>,
    tracker: FileTracker,
    writer: StatusWriter,
}

impl Ingestor {
    /// `base_dir` holds one directory per bucket; `bucket` names this one.
    pub fn new(
        base_dir: &Path,
        bucket: &str,
        fs: Arc<dyn FileSystem>,
        writer: StatusWriter,
    ) -> Self {
        Self {
            bucket: bucket.to_string(),
            bucket_root: base_dir.join(bucket),
            fs,
            tracker: FileTracker::new(),
            writer,
        }
    }

    pub fn bucket_root(&self) -> &Path {
        &self.bucket_root
    }

    /// Handle one event for `path` seen under `item`'s directory.
    ///
    /// Returns the ticket of the submitted status write, or `None` when the
    /// event changed nothing worth recording.
    pub async fn handle(
        &mut self,
        item: &WatchItem,
        path: &Path,
        event: FsEvent,
    ) -> Result<Option<WriteTicket>> {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        if !item.matcher.is_match(file_name) {
            debug!(path = %path.display(), pattern = item.matcher.pattern(), "ignoring non-matching file");
            return Ok(None);
        }
        if self.fs.is_dir(path) {
            warn!(path = %path.display(), "skipping directory event");
            return Ok(None);
        }
        let Some(key) = derive_key(&self.bucket_root, path, &item.matcher) else {
            warn!(path = %path.display(), "cannot derive a key for path");
            return Ok(None);
        };
        let Some(change) = self.tracker.observe(path, event) else {
            return Ok(None);
        };

        info!(bucket = %self.bucket, %key, ?change, "recording file status");
        let ticket = self
            .writer
            .submit(StatusWrite {
                bucket: self.bucket.clone(),
                key,
                change,
            })
            .await?;
        Ok(Some(ticket))
    }
}
