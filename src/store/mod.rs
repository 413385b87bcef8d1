// src/store/mod.rs

//! The shared key/value namespace.
//!
//! Every component talks to persisted state through the [`Namespace`] trait.
//! Buckets are nested one level deep: a top-level bucket (`files`, `queue`,
//! `pipeline`) optionally holds a per-pipeline child bucket. Each call is a
//! single atomic operation; read-modify-write goes through
//! [`Namespace::update`].
//!
//! Operations are blocking. Async callers run them on the blocking pool (see
//! `crate::service`).

mod memory;
pub mod record;
mod sled_store;

use std::fmt::{self, Debug};

use crate::errors::Result;

pub use memory::MemoryNamespace;
pub use record::{FileRecord, FileStatus, TagStatus};
pub use sled_store::SledNamespace;

pub const FILES_BUCKET: &str = "files";
pub const QUEUE_BUCKET: &str = "queue";
pub const PIPELINE_BUCKET: &str = "pipeline";

/// Location of a bucket: a top-level bucket and an optional child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketPath {
    pub bucket: String,
    pub child: Option<String>,
}

impl BucketPath {
    pub fn new(bucket: impl Into<String>, child: Option<String>) -> Self {
        Self {
            bucket: bucket.into(),
            child,
        }
    }

    /// File status records of one pipeline.
    pub fn files(bucket_name: &str) -> Self {
        Self::new(FILES_BUCKET, Some(bucket_name.to_string()))
    }

    /// Work queue of one pipeline.
    pub fn queue(bucket_name: &str) -> Self {
        Self::new(QUEUE_BUCKET, Some(bucket_name.to_string()))
    }

    /// Stored pipeline documents, keyed by pipeline name.
    pub fn pipelines() -> Self {
        Self::new(PIPELINE_BUCKET, None)
    }

    /// Flat name used by backends without nested buckets.
    pub fn tree_name(&self) -> String {
        match &self.child {
            Some(child) => format!("{}/{}", self.bucket, child),
            None => self.bucket.clone(),
        }
    }
}

impl fmt::Display for BucketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tree_name())
    }
}

/// Transform applied by [`Namespace::update`].
///
/// Receives the current value (if any) and returns the value to store;
/// returning `None` removes the key. Backends may call it more than once
/// when a concurrent writer interferes, so it must not have side effects
/// beyond its own captured state.
pub type UpdateFn<'a> = dyn FnMut(Option<&[u8]>) -> Option<Vec<u8>> + 'a;

/// Nested-bucket key/value store with atomic single-key operations.
pub trait Namespace: Send + Sync + Debug {
    fn get(&self, path: &BucketPath, key: &str) -> Result<Option<Vec<u8>>>;

    fn put(&self, path: &BucketPath, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`, returning the value that was removed.
    fn delete(&self, path: &BucketPath, key: &str) -> Result<Option<Vec<u8>>>;

    /// Entries whose key starts with `prefix`, in key order, at most `limit`
    /// of them.
    fn prefix_scan(
        &self,
        path: &BucketPath,
        prefix: &str,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Vec<u8>)>>;

    /// Number of entries in a bucket. A missing bucket has none.
    fn count(&self, path: &BucketPath) -> Result<usize>;

    /// Atomically replace the value of `key` with `f(current)`, returning
    /// the value now stored.
    fn update(&self, path: &BucketPath, key: &str, f: &mut UpdateFn<'_>)
    -> Result<Option<Vec<u8>>>;
}
