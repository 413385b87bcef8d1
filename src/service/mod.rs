// src/service/mod.rs

//! Async facade over dispatch and claim.
//!
//! [`QueueService`] owns the process-wide [`ClaimSet`], loads a fresh
//! [`Pipeline`] for every request, runs namespace work on the blocking pool
//! under the configured timeout, and serializes fills per pipeline.

pub mod api;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::claim::{self, ClaimOutcome, ClaimSet, RequesterKey};
use crate::config::ConfigFile;
use crate::dispatch::{self, FillReport};
use crate::errors::{Result, SluiceError};
use crate::pipeline::{DocumentSource, Pipeline};
use crate::store::Namespace;

pub use api::{ApiResponse, FillRequest};

#[derive(Debug)]
pub struct QueueService {
    cfg: ConfigFile,
    namespace: Arc<dyn Namespace>,
    documents: Arc<dyn DocumentSource>,
    claims: ClaimSet,
    fill_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl QueueService {
    pub fn new(
        cfg: ConfigFile,
        namespace: Arc<dyn Namespace>,
        documents: Arc<dyn DocumentSource>,
    ) -> Self {
        Self {
            cfg,
            namespace,
            documents,
            claims: ClaimSet::new(),
            fill_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.cfg
    }

    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    pub fn namespace(&self) -> Arc<dyn Namespace> {
        Arc::clone(&self.namespace)
    }

    /// Build the named pipeline from its stored document.
    pub async fn load_pipeline(&self, name: &str) -> Result<Pipeline> {
        self.with_retries("load pipeline", || {
            let documents = Arc::clone(&self.documents);
            let cfg = self.cfg.clone();
            let name = name.to_string();
            self.blocking(move || Pipeline::load(documents.as_ref(), &name, &cfg))
        })
        .await
    }

    /// Names of every pipeline with a document.
    pub async fn pipelines(&self) -> Result<Vec<String>> {
        let documents = Arc::clone(&self.documents);
        self.blocking(move || documents.names()).await
    }

    /// Run one fill pass for `name`. `max_items` defaults to the configured
    /// budget.
    pub async fn fill(&self, name: &str, max_items: Option<usize>) -> Result<FillReport> {
        let max_items = max_items.unwrap_or(self.cfg.dispatch.max_items);
        let pipeline = Arc::new(self.load_pipeline(name).await?);
        let lock = self.fill_lock(&pipeline.bucket_name);

        self.with_retries("fill", || {
            let lock = Arc::clone(&lock);
            let pipeline = Arc::clone(&pipeline);
            let namespace = Arc::clone(&self.namespace);
            async move {
                // Held until the blocking pass ends, even if the caller
                // stops waiting for it.
                let guard = lock.lock_owned().await;
                self.blocking(move || {
                    let _guard = guard;
                    dispatch::fill(namespace.as_ref(), &pipeline, max_items)
                })
                .await
            }
        })
        .await
    }

    /// Claim one item of `name` for the worker identified by `key`.
    pub async fn claim(&self, name: &str, key: &str) -> Result<ClaimOutcome> {
        let requester: RequesterKey = key.parse()?;
        let pipeline = self.load_pipeline(name).await?;
        let namespace = Arc::clone(&self.namespace);
        let claims = self.claims.clone();
        self.blocking(move || claim::claim(namespace.as_ref(), &claims, &pipeline, &requester))
            .await
    }

    /// Fill trigger: `202` once the pass ran.
    pub async fn fill_request(&self, request: FillRequest) -> ApiResponse {
        match self.fill(&request.pipeline, request.max_items).await {
            Ok(report) => {
                debug!(pipeline = %request.pipeline, queued = report.queued.len(), "fill request done");
                ApiResponse::accepted("OK")
            }
            Err(err) => {
                error!(pipeline = %request.pipeline, error = %err, "fill request failed");
                ApiResponse::error(&err)
            }
        }
    }

    /// Worker poll: `200` with the item, or `202` when there is nothing to do.
    /// An unknown pipeline has nothing to do either.
    pub async fn poll(&self, name: &str, key: &str) -> ApiResponse {
        match self.claim(name, key).await {
            Ok(ClaimOutcome::Claimed(item)) => match serde_json::to_value(&item) {
                Ok(value) => ApiResponse::ok(value),
                Err(err) => ApiResponse::error(&SluiceError::from(err)),
            },
            Ok(ClaimOutcome::NoWorkAvailable) => ApiResponse::accepted(""),
            Err(SluiceError::StoreTimeout(ms)) => {
                warn!(pipeline = %name, %key, timeout_ms = ms, "claim timed out; worker should retry");
                ApiResponse::accepted("")
            }
            Err(SluiceError::PipelineNotFound(_)) => {
                warn!(pipeline = %name, %key, "poll for unknown pipeline; no work");
                ApiResponse::accepted("")
            }
            Err(err) => {
                error!(pipeline = %name, %key, error = %err, "claim failed");
                ApiResponse::error(&err)
            }
        }
    }

    /// Fill `name` every `every` until `shutdown` resolves. Failed passes are
    /// logged and retried on the next tick.
    pub async fn perpetual<S>(&self, name: &str, max_items: Option<usize>, every: Duration, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        info!(pipeline = %name, every_ms = every.as_millis() as u64, "starting perpetual queue");
        let mut ticker = tokio::time::interval(every);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.fill(name, max_items).await {
                        error!(pipeline = %name, error = %err, "perpetual fill failed");
                    }
                }
            }
        }
        info!(pipeline = %name, "perpetual queue stopped");
    }

    fn fill_lock(&self, bucket: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .fill_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(bucket.to_string()).or_default())
    }

    /// Run blocking namespace work under the store timeout.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        match tokio::time::timeout(self.cfg.store.timeout(), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(SluiceError::Other(join.into())),
            Err(_) => Err(SluiceError::StoreTimeout(self.cfg.store.timeout_ms)),
        }
    }

    /// Retry `op` on transient failures with doubling backoff.
    async fn with_retries<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.cfg.store.backoff();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Err(err) if err.is_transient() && attempt <= self.cfg.store.retries => {
                    warn!(operation = what, attempt, error = %err, "transient store failure; retrying");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                other => return other,
            }
        }
    }
}

/// Summary of a fill report for printing.
pub fn report_json(report: &FillReport) -> serde_json::Value {
    json!({
        "maxItems": report.max_items,
        "existing": report.existing,
        "queued": report.queued.iter().map(|e| json!({"key": e.key, "command": e.command})).collect::<Vec<_>>(),
    })
}
