// src/ingest/tracker.rs

//! Per-file lifecycle tracking.
//!
//! Each path moves `unknown -> opened -> closed`, and to `deleted` from any
//! state. Repeating an event the file has already seen produces nothing, so
//! duplicate notifications never reach the status writer twice.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Filesystem events ingestion reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEvent {
    Opened,
    ClosedWrite,
    Removed,
}

/// Status transition to record for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Opened and still being written.
    Loading,
    Ready,
    Deleted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileState {
    pub opened: bool,
    pub closed: bool,
    pub deleted: bool,
}

impl FileState {
    /// Apply `event`, returning the status to record if anything changed.
    pub fn apply(&mut self, event: FsEvent) -> Option<StatusChange> {
        match event {
            FsEvent::Opened => {
                if self.opened {
                    return None;
                }
                self.opened = true;
                self.deleted = false;
                (!self.closed).then_some(StatusChange::Loading)
            }
            FsEvent::ClosedWrite => {
                if self.closed {
                    return None;
                }
                self.closed = true;
                self.deleted = false;
                Some(StatusChange::Ready)
            }
            FsEvent::Removed => {
                if self.deleted {
                    return None;
                }
                *self = FileState {
                    opened: false,
                    closed: false,
                    deleted: true,
                };
                Some(StatusChange::Deleted)
            }
        }
    }
}

/// Lifecycle state of every path seen so far.
#[derive(Debug, Default)]
pub struct FileTracker {
    files: HashMap<PathBuf, FileState>,
}

impl FileTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, path: &Path, event: FsEvent) -> Option<StatusChange> {
        self.files.entry(path.to_path_buf()).or_default().apply(event)
    }

    pub fn state(&self, path: &Path) -> Option<FileState> {
        self.files.get(path).copied()
    }
}
