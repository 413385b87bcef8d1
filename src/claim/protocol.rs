// src/claim/protocol.rs

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::claim::claim_set::ClaimSet;
use crate::claim::hostname::{claim_groups, strip_pipeline, worker_group};
use crate::claim::requester::RequesterKey;
use crate::dispatch::QueueKey;
use crate::errors::Result;
use crate::pipeline::{Command, Pipeline};
use crate::store::{BucketPath, FileRecord, Namespace, TagStatus};
use crate::traverse::ROOT_DIR_KEY;

/// Work handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub pipeline_folder: String,
    /// Directory under the pipeline folder; empty for the folder itself.
    pub sub_folder: String,
    pub filename: String,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(QueueItem),
    /// Nothing queued for this worker right now.
    NoWorkAvailable,
}

/// Claim one queued item for `requester`.
///
/// The item is removed from the queue and its file is marked `in_progress`
/// for the requester's tag. Concurrent callers sharing `claims` never
/// receive the same item.
pub fn claim(
    ns: &dyn Namespace,
    claims: &ClaimSet,
    pipeline: &Pipeline,
    requester: &RequesterKey,
) -> Result<ClaimOutcome> {
    let queue = BucketPath::queue(&pipeline.bucket_name);
    if worker_group(&requester.hostname, &pipeline.dns_name).is_none() {
        warn!(
            pipeline = %pipeline.name,
            hostname = %requester.hostname,
            group = %strip_pipeline(&requester.hostname, &pipeline.dns_name),
            "cannot recognise worker name; using it as the group"
        );
    }

    let mut entries = Vec::new();
    for candidate in claim_groups(&requester.hostname, &pipeline.dns_name) {
        let prefix = format!("{}:{}:", requester.tag(), candidate);
        debug!(pipeline = %pipeline.name, %prefix, "scanning queue");
        entries = ns.prefix_scan(&queue, &prefix, None)?;
        if !entries.is_empty() {
            break;
        }
    }

    for (key, value) in entries {
        let Some(guard) = claims.try_claim(&key) else {
            continue;
        };
        let queue_key: QueueKey = match key.parse() {
            Ok(k) => k,
            Err(err) => {
                warn!(%key, error = %err, "malformed queue entry");
                continue;
            }
        };
        let command_id = String::from_utf8_lossy(&value);
        let Some(command) = pipeline.get_command(&command_id) else {
            warn!(%key, command = %command_id, "queue entry names an unknown command");
            continue;
        };

        if ns.delete(&queue, &key)?.is_none() {
            debug!(%key, "entry already taken");
            continue;
        }

        mark_in_progress(ns, pipeline, &queue_key, &requester.tag());
        drop(guard);

        info!(pipeline = %pipeline.name, %key, command = %command.id, "claimed");
        let mut command = command.clone();
        command.environment = pipeline.command_environment(&command);
        return Ok(ClaimOutcome::Claimed(QueueItem {
            pipeline_folder: pipeline.bucket_name.clone(),
            sub_folder: sub_folder(&queue_key.dir),
            filename: queue_key.file.clone(),
            command,
        }));
    }

    Ok(ClaimOutcome::NoWorkAvailable)
}

fn mark_in_progress(ns: &dyn Namespace, pipeline: &Pipeline, key: &QueueKey, tag: &str) {
    let files = BucketPath::files(&pipeline.bucket_name);
    let file_key = key.file_key();
    let result = ns.update(&files, &file_key, &mut |current: Option<&[u8]>| {
        let mut record = match current {
            Some(bytes) => FileRecord::from_slice(bytes).unwrap_or_default(),
            None => FileRecord::default(),
        };
        record.tags.insert(tag.to_string(), TagStatus::InProgress);
        match record.to_vec() {
            Ok(bytes) => Some(bytes),
            Err(_) => current.map(<[u8]>::to_vec),
        }
    });
    if let Err(err) = result {
        error!(key = %file_key, %tag, error = %err, "failed to mark file in progress");
    }
}

fn sub_folder(dir: &str) -> String {
    if dir == ROOT_DIR_KEY {
        String::new()
    } else {
        dir.to_string()
    }
}
