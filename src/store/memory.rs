// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{BucketPath, Namespace, UpdateFn};
use crate::errors::Result;

type Buckets = HashMap<BucketPath, BTreeMap<String, Vec<u8>>>;

/// In-process namespace. Every operation holds a single lock, so each call
/// is trivially atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryNamespace {
    buckets: Arc<Mutex<Buckets>>,
}

impl MemoryNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Namespace for MemoryNamespace {
    fn get(&self, path: &BucketPath, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().get(path).and_then(|b| b.get(key)).cloned())
    }

    fn put(&self, path: &BucketPath, key: &str, value: &[u8]) -> Result<()> {
        self.lock()
            .entry(path.clone())
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, path: &BucketPath, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().get_mut(path).and_then(|b| b.remove(key)))
    }

    fn prefix_scan(
        &self,
        path: &BucketPath,
        prefix: &str,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let buckets = self.lock();
        let Some(bucket) = buckets.get(path) else {
            return Ok(Vec::new());
        };
        Ok(bucket
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .take(limit.unwrap_or(usize::MAX))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn count(&self, path: &BucketPath) -> Result<usize> {
        Ok(self.lock().get(path).map_or(0, BTreeMap::len))
    }

    fn update(
        &self,
        path: &BucketPath,
        key: &str,
        f: &mut UpdateFn<'_>,
    ) -> Result<Option<Vec<u8>>> {
        let mut buckets = self.lock();
        let bucket = buckets.entry(path.clone()).or_default();
        match f(bucket.get(key).map(Vec::as_slice)) {
            Some(next) => {
                bucket.insert(key.to_string(), next.clone());
                Ok(Some(next))
            }
            None => {
                bucket.remove(key);
                Ok(None)
            }
        }
    }
}
