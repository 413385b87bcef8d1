// src/store/record.rs

//! Per-file status records kept in the `files` bucket.
//!
//! A record is a flat JSON object. The `status` key holds the ingestion
//! state of the file itself; every other key is a container tag mapped to
//! that command's progress on the file:
//!
//! ```json
//! {"status": "ready", "resize-tiyo:1.0": "queued"}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Ingestion state of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Still being written.
    Loading,
    Ready,
}

/// Progress of one command on one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStatus {
    Ready,
    Queued,
    InProgress,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FileStatus>,

    #[serde(flatten)]
    pub tags: BTreeMap<String, TagStatus>,
}

impl FileRecord {
    pub fn with_status(status: FileStatus) -> Self {
        Self {
            status: Some(status),
            tags: BTreeMap::new(),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn tag(&self, tag: &str) -> Option<TagStatus> {
        self.tags.get(tag).copied()
    }

    /// Whether a command with container tag `tag` may be handed this file.
    ///
    /// The file must not still be loading, and the command must either have
    /// no entry yet or be back at `ready`.
    pub fn is_dispatchable(&self, tag: &str) -> bool {
        if self.status == Some(FileStatus::Loading) {
            return false;
        }
        matches!(self.tag(tag), None | Some(TagStatus::Ready))
    }
}
