// src/ingest/writer.rs

//! Bounded pool of status senders.
//!
//! Each sender task drains its own bounded channel, and a write is routed to
//! a sender by hashing its bucket and file key. Writes for one file are
//! therefore applied in submission order, retries included. A full channel
//! makes [`StatusWriter::submit`] wait, which throttles event handling while
//! the sink is slow. Every submitted write gets a [`WriteTicket`] that
//! resolves once the write was delivered or dropped after its retry budget
//! ran out.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::ConfigFile;
use crate::errors::{Result, SluiceError};
use crate::ingest::sink::{StatusSink, StatusWrite};

/// Final result of one status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Delivered { attempts: u32 },
    Dropped { attempts: u32, error: String },
}

impl WriteOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, WriteOutcome::Delivered { .. })
    }
}

/// Resolves to the outcome of a submitted write.
#[derive(Debug)]
pub struct WriteTicket {
    rx: oneshot::Receiver<WriteOutcome>,
}

impl WriteTicket {
    pub async fn outcome(self) -> WriteOutcome {
        self.rx.await.unwrap_or(WriteOutcome::Dropped {
            attempts: 0,
            error: "status writer shut down".to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    pub senders: usize,
    /// Attempts per write, including the first.
    pub retries: u32,
    pub queue_depth: usize,
    /// Delay before the first retry; doubled after each failure.
    pub backoff: Duration,
}

impl WriterOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            senders: cfg.ingest.senders,
            retries: cfg.ingest.retries,
            queue_depth: cfg.ingest.queue_depth,
            backoff: cfg.store.backoff(),
        }
    }
}

struct Job {
    write: StatusWrite,
    reply: oneshot::Sender<WriteOutcome>,
}

/// Cloneable handle for submitting writes.
#[derive(Debug, Clone)]
pub struct StatusWriter {
    senders: Arc<[mpsc::Sender<Job>]>,
}

/// The sender tasks. They stop once every [`StatusWriter`] is dropped and
/// the queue is drained.
#[derive(Debug)]
pub struct WriterPool {
    workers: Vec<JoinHandle<()>>,
}

impl WriterPool {
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(err) = worker.await {
                error!(error = %err, "status sender task failed");
            }
        }
    }
}

impl StatusWriter {
    pub fn spawn(sink: Arc<dyn StatusSink>, opts: WriterOptions) -> (Self, WriterPool) {
        let mut senders = Vec::new();
        let mut workers = Vec::new();

        for id in 0..opts.senders.max(1) {
            let (tx, mut rx) = mpsc::channel::<Job>(opts.queue_depth.max(1));
            let sink = Arc::clone(&sink);
            senders.push(tx);
            workers.push(tokio::spawn(async move {
                while let Some(job) = rx.recv().await {
                    let outcome = deliver(sink.as_ref(), &job.write, opts).await;
                    let _ = job.reply.send(outcome);
                }
                debug!(sender = id, "status sender finished");
            }));
        }

        (
            Self {
                senders: senders.into(),
            },
            WriterPool { workers },
        )
    }

    /// Queue a write, waiting for room if its sender is busy.
    pub async fn submit(&self, write: StatusWrite) -> Result<WriteTicket> {
        let (reply, rx) = oneshot::channel();
        let sender = &self.senders[self.route(&write)];
        sender
            .send(Job { write, reply })
            .await
            .map_err(|_| SluiceError::Other(anyhow!("status writer is closed")))?;
        Ok(WriteTicket { rx })
    }

    /// Index of the sender that owns this write's file.
    fn route(&self, write: &StatusWrite) -> usize {
        let mut hasher = DefaultHasher::new();
        write.bucket.hash(&mut hasher);
        write.key.to_string().hash(&mut hasher);
        (hasher.finish() % self.senders.len() as u64) as usize
    }
}

async fn deliver(sink: &dyn StatusSink, write: &StatusWrite, opts: WriterOptions) -> WriteOutcome {
    let max_attempts = opts.retries.max(1);
    let mut delay = opts.backoff;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match sink.send(write).await {
            Ok(()) => {
                debug!(bucket = %write.bucket, key = %write.key, change = ?write.change, attempt, "status written");
                return WriteOutcome::Delivered { attempts: attempt };
            }
            Err(err) if attempt < max_attempts => {
                warn!(bucket = %write.bucket, key = %write.key, attempt, error = %err, "status write failed; retrying");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
            Err(err) => {
                error!(bucket = %write.bucket, key = %write.key, attempts = attempt, error = %err, "status write dropped");
                return WriteOutcome::Dropped {
                    attempts: attempt,
                    error: err.to_string(),
                };
            }
        }
    }
}
