// src/ingest/sink.rs

//! Where status writes go.
//!
//! A [`StatusSink`] receives one [`StatusWrite`] at a time. The production
//! sink applies writes straight to the namespace; tests plug in recording
//! or failing sinks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SluiceError};
use crate::ingest::keys::FileKey;
use crate::ingest::tracker::StatusChange;
use crate::store::{BucketPath, FILES_BUCKET, FileRecord, FileStatus, Namespace};

/// A status transition for one file of one pipeline bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWrite {
    /// Pipeline bucket name.
    pub bucket: String,
    pub key: FileKey,
    pub change: StatusChange,
}

/// Body of a bucket write: the file record, base64 encoded JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub bucket: String,
    pub child: String,
    pub key: String,
    pub value: String,
}

impl BucketRecord {
    pub fn decode_value(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.value)
            .map_err(|e| SluiceError::Document(format!("record {}: {e}", self.key)))
    }
}

impl StatusWrite {
    /// Request body for this write, or `None` for a deletion.
    pub fn record(&self) -> Result<Option<BucketRecord>> {
        let status = match self.change {
            StatusChange::Loading => FileStatus::Loading,
            StatusChange::Ready => FileStatus::Ready,
            StatusChange::Deleted => return Ok(None),
        };
        let value = FileRecord::with_status(status).to_vec()?;
        Ok(Some(BucketRecord {
            bucket: FILES_BUCKET.to_string(),
            child: self.bucket.clone(),
            key: self.key.to_string(),
            value: STANDARD.encode(value),
        }))
    }
}

/// Destination for status writes.
pub trait StatusSink: Send + Sync {
    fn send<'a>(
        &'a self,
        write: &'a StatusWrite,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Applies writes to the shared namespace.
#[derive(Debug, Clone)]
pub struct NamespaceSink {
    namespace: Arc<dyn Namespace>,
}

impl NamespaceSink {
    pub fn new(namespace: Arc<dyn Namespace>) -> Self {
        Self { namespace }
    }
}

impl StatusSink for NamespaceSink {
    fn send<'a>(
        &'a self,
        write: &'a StatusWrite,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let namespace = Arc::clone(&self.namespace);
        let path = BucketPath::files(&write.bucket);
        let key = write.key.to_string();

        Box::pin(async move {
            let record = write.record()?;
            tokio::task::spawn_blocking(move || match record {
                Some(record) => namespace.put(&path, &key, &record.decode_value()?),
                None => namespace.delete(&path, &key).map(|_| ()),
            })
            .await
            .map_err(|e| SluiceError::Other(e.into()))?
        })
    }
}
