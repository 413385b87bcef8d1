use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sluice::errors::{Result, SluiceError};
use sluice::ingest::{StatusSink, StatusWrite};

/// A status sink that:
/// - fails the first `fail_first` attempts with a transient error
/// - records every write it accepted afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    writes: Arc<Mutex<Vec<StatusWrite>>>,
    attempts: Arc<AtomicUsize>,
    fail_first: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(fail_first: usize) -> Self {
        Self {
            fail_first,
            ..Self::default()
        }
    }

    pub fn always_failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    pub fn writes(&self) -> Vec<StatusWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl StatusSink for RecordingSink {
    fn send<'a>(
        &'a self,
        write: &'a StatusWrite,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                return Err(SluiceError::StoreTimeout(0));
            }
            self.writes.lock().unwrap().push(write.clone());
            Ok(())
        })
    }
}
