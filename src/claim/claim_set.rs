// src/claim/claim_set.rs

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Queue keys currently being claimed.
///
/// One set must be shared by every claim against the same namespace; clones
/// share the same underlying set.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `key` unless another caller holds it. The reservation lasts
    /// as long as the returned guard.
    pub fn try_claim(&self, key: &str) -> Option<ClaimGuard> {
        let mut keys = self.lock();
        if !keys.insert(key.to_string()) {
            return None;
        }
        Some(ClaimGuard {
            set: self.clone(),
            key: key.to_string(),
        })
    }

    pub fn is_claimed(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive hold on one queue key; released on drop.
#[derive(Debug)]
pub struct ClaimGuard {
    set: ClaimSet,
    key: String,
}

impl ClaimGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}
