// src/dispatch/mod.rs

//! Dispatch engine: moving ready files into the work queue.
//!
//! Queue entries are keyed `"{tag}:{controller}:{dir}:{file}"` where `tag`
//! is the consuming command's `name:version` container tag, and hold the
//! command ID as value.

mod fill;

use std::fmt;
use std::str::FromStr;

use crate::errors::SluiceError;

pub use fill::{FillReport, QueuedEntry, fill};

/// Key of one queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey {
    /// Container name part of the tag.
    pub container: String,
    pub version: String,
    /// Sanitized name of the command's controller.
    pub controller: String,
    /// Directory part of the file key (`root` for the bucket root).
    pub dir: String,
    pub file: String,
}

impl QueueKey {
    /// Key of the file record this entry refers to.
    pub fn file_key(&self) -> String {
        format!("{}:{}", self.dir, self.file)
    }

    /// Container tag (`name:version`) the entry is addressed to.
    pub fn tag(&self) -> String {
        format!("{}:{}", self.container, self.version)
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.container, self.version, self.controller, self.dir, self.file
        )
    }
}

impl FromStr for QueueKey {
    type Err = SluiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(5, ':').collect();
        let [container, version, controller, dir, file] = parts.as_slice() else {
            return Err(SluiceError::MalformedKey(s.to_string()));
        };
        if container.is_empty() || file.is_empty() {
            return Err(SluiceError::MalformedKey(s.to_string()));
        }
        Ok(QueueKey {
            container: container.to_string(),
            version: version.to_string(),
            controller: controller.to_string(),
            dir: dir.to_string(),
            file: file.to_string(),
        })
    }
}
