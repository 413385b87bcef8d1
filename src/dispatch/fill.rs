// src/dispatch/fill.rs

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use crate::dispatch::QueueKey;
use crate::errors::{Result, SluiceError};
use crate::pipeline::{Command, Pipeline};
use crate::store::{BucketPath, FileRecord, Namespace, TagStatus};

/// One entry written by a fill pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEntry {
    pub key: String,
    pub command: String,
}

/// Summary of a fill pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    pub max_items: usize,
    /// Entries already queued before the pass.
    pub existing: usize,
    pub queued: Vec<QueuedEntry>,
}

impl FillReport {
    pub fn total(&self) -> usize {
        self.existing + self.queued.len()
    }
}

/// Top up the queue of `pipeline` to at most `max_items` entries.
///
/// Walks the graph from its roots. For every command with file sources,
/// files whose record shows the command has not yet been handed the file
/// are marked `queued` and get a queue entry, until the budget is spent.
///
/// Callers must not run two fills for the same pipeline concurrently.
pub fn fill(ns: &dyn Namespace, pipeline: &Pipeline, max_items: usize) -> Result<FillReport> {
    let queue = BucketPath::queue(&pipeline.bucket_name);
    let existing = ns.count(&queue)?;
    let mut report = FillReport {
        max_items,
        existing,
        queued: Vec::new(),
    };

    if existing >= max_items {
        debug!(pipeline = %pipeline.name, existing, max_items, "queue already full");
        return Ok(report);
    }

    let mut walk = Walk {
        ns,
        pipeline,
        files: BucketPath::files(&pipeline.bucket_name),
        queue,
        budget: max_items - existing,
        visited: HashSet::new(),
        report: &mut report,
    };
    for root in pipeline.start() {
        if walk.budget == 0 {
            break;
        }
        walk.visit(root)?;
    }

    info!(
        pipeline = %pipeline.name,
        queued = report.queued.len(),
        total = report.total(),
        max_items,
        "fill finished"
    );
    Ok(report)
}

struct Walk<'a, 'r> {
    ns: &'a dyn Namespace,
    pipeline: &'a Pipeline,
    files: BucketPath,
    queue: BucketPath,
    budget: usize,
    visited: HashSet<&'a str>,
    report: &'r mut FillReport,
}

impl<'a> Walk<'a, '_> {
    fn visit(&mut self, command: &'a Command) -> Result<()> {
        if self.budget == 0 || !self.visited.insert(command.id.as_str()) {
            return Ok(());
        }

        self.enqueue_ready(command)?;

        for next in self.pipeline.next(command) {
            if self.budget == 0 {
                break;
            }
            self.visit(next)?;
        }
        Ok(())
    }

    fn enqueue_ready(&mut self, command: &Command) -> Result<()> {
        let sources = self.pipeline.file_sources(command);
        if sources.is_empty() {
            return Ok(());
        }
        // Queue keys carry the controller name workers claim by.
        let Some(controller) = self.pipeline.controller_of(command) else {
            warn!(
                pipeline = %self.pipeline.name,
                command = %command.id,
                "command has file sources but no controller; not queueing"
            );
            return Ok(());
        };
        let tag = command.status_tag.as_str();

        for source in sources {
            let prefix = source.key_prefix();
            for (file_key, value) in self.ns.prefix_scan(&self.files, &prefix, None)? {
                if self.budget == 0 {
                    return Ok(());
                }
                match FileRecord::from_slice(&value) {
                    Ok(record) if record.is_dispatchable(tag) => {}
                    Ok(_) => continue,
                    Err(err) => {
                        warn!(key = %file_key, error = %err, "unreadable file record; skipping");
                        continue;
                    }
                }
                if !self.mark(&file_key, tag, TagStatus::Queued, true)? {
                    continue;
                }

                let queue_key = queue_key(tag, &controller.name, &file_key)?;
                if let Err(err) = self.ns.put(&self.queue, &queue_key, command.id.as_bytes()) {
                    error!(key = %queue_key, error = %err, "failed to write queue entry");
                    self.mark(&file_key, tag, TagStatus::Ready, false)?;
                    return Err(err);
                }

                debug!(key = %queue_key, command = %command.id, "queued");
                self.budget -= 1;
                self.report.queued.push(QueuedEntry {
                    key: queue_key,
                    command: command.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Set `tag` on a file record to `status` in one atomic update.
    ///
    /// With `only_dispatchable`, records that are no longer dispatchable are
    /// left alone. Returns whether the record was changed.
    fn mark(&self, file_key: &str, tag: &str, status: TagStatus, only_dispatchable: bool) -> Result<bool> {
        let mut changed = false;
        self.ns.update(&self.files, file_key, &mut |current: Option<&[u8]>| {
            changed = false;
            let current = current?;
            let Ok(mut record) = FileRecord::from_slice(current) else {
                return Some(current.to_vec());
            };
            if only_dispatchable && !record.is_dispatchable(tag) {
                return Some(current.to_vec());
            }
            record.tags.insert(tag.to_string(), status);
            match record.to_vec() {
                Ok(bytes) => {
                    changed = true;
                    Some(bytes)
                }
                Err(_) => Some(current.to_vec()),
            }
        })?;
        Ok(changed)
    }
}

fn queue_key(tag: &str, controller: &str, file_key: &str) -> Result<String> {
    let (container, version) = tag
        .split_once(':')
        .ok_or_else(|| SluiceError::MalformedKey(tag.to_string()))?;
    let (dir, file) = file_key
        .split_once(':')
        .ok_or_else(|| SluiceError::MalformedKey(file_key.to_string()))?;
    Ok(QueueKey {
        container: container.to_string(),
        version: version.to_string(),
        controller: controller.to_string(),
        dir: dir.to_string(),
        file: file.to_string(),
    }
    .to_string())
}
