// src/store/sled_store.rs

use std::path::Path;

use tracing::debug;

use super::{BucketPath, Namespace, UpdateFn};
use crate::errors::Result;

/// Persistent namespace backed by a sled database, one tree per bucket.
#[derive(Debug, Clone)]
pub struct SledNamespace {
    db: sled::Db,
}

impl SledNamespace {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        debug!(path = %path.display(), "opened namespace database");
        Ok(Self { db })
    }

    /// A database that is removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn tree(&self, path: &BucketPath) -> Result<sled::Tree> {
        Ok(self.db.open_tree(path.tree_name())?)
    }
}

impl Namespace for SledNamespace {
    fn get(&self, path: &BucketPath, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.tree(path)?.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&self, path: &BucketPath, key: &str, value: &[u8]) -> Result<()> {
        self.tree(path)?.insert(key, value)?;
        Ok(())
    }

    fn delete(&self, path: &BucketPath, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.tree(path)?.remove(key)?.map(|v| v.to_vec()))
    }

    fn prefix_scan(
        &self,
        path: &BucketPath,
        prefix: &str,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let tree = self.tree(path)?;
        let mut out = Vec::new();
        for entry in tree.scan_prefix(prefix) {
            if limit.is_some_and(|l| out.len() >= l) {
                break;
            }
            let (key, value) = entry?;
            out.push((String::from_utf8_lossy(&key).into_owned(), value.to_vec()));
        }
        Ok(out)
    }

    fn count(&self, path: &BucketPath) -> Result<usize> {
        Ok(self.tree(path)?.len())
    }

    fn update(
        &self,
        path: &BucketPath,
        key: &str,
        f: &mut UpdateFn<'_>,
    ) -> Result<Option<Vec<u8>>> {
        let tree = self.tree(path)?;
        let stored = tree.update_and_fetch(key, |current| f(current))?;
        Ok(stored.map(|v| v.to_vec()))
    }
}
