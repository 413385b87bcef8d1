// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [store]
/// path = "/var/lib/sluice/db"
/// timeout_ms = 5000
///
/// [cluster]
/// dns_name = "cluster.example.com"
///
/// [docker]
/// upstream = "docker.io/library"
/// primary = "sluice"
///
/// [ingest]
/// base_dir = "/data/pipelines"
/// senders = 100
///
/// [dispatch]
/// max_items = 10
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub cluster: ClusterSection,

    #[serde(default)]
    pub docker: DockerSection,

    #[serde(default)]
    pub ingest: IngestSection,

    #[serde(default)]
    pub dispatch: DispatchSection,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// or [`ConfigFile::new_unchecked`] for callers that already checked.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub store: StoreSection,
    pub cluster: ClusterSection,
    pub docker: DockerSection,
    pub ingest: IngestSection,
    pub dispatch: DispatchSection,
}

impl ConfigFile {
    pub fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            store: raw.store,
            cluster: raw.cluster,
            docker: raw.docker,
            ingest: raw.ingest,
            dispatch: raw.dispatch,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[store]` section: where the namespace lives and how long to wait on it.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    /// Directory of the sled database.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Upper bound for a single namespace operation.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How many times a transient store failure is retried.
    #[serde(default = "default_store_retries")]
    pub retries: u32,

    /// Base delay between retries; doubled on each attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl StoreSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("sluice.db")
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_store_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    50
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            timeout_ms: default_timeout_ms(),
            retries: default_store_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// `[cluster]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClusterSection {
    /// DNS suffix appended to a pipeline's DNS name to form its FQDN.
    #[serde(default)]
    pub dns_name: String,
}

/// `[docker]` section: prefixes used when computing command images and tags.
#[derive(Debug, Clone, Deserialize)]
pub struct DockerSection {
    #[serde(default)]
    pub upstream: String,

    #[serde(default)]
    pub primary: String,

    #[serde(default)]
    pub registry: String,

    /// Appended to the container name of every built image tag.
    #[serde(default = "default_tag_suffix")]
    pub tag_suffix: String,
}

fn default_tag_suffix() -> String {
    "-tiyo".to_string()
}

impl Default for DockerSection {
    fn default() -> Self {
        Self {
            upstream: String::new(),
            primary: String::new(),
            registry: String::new(),
            tag_suffix: default_tag_suffix(),
        }
    }
}

/// `[ingest]` section: file watching and the outbound status writer pool.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSection {
    /// Directory holding one sub-directory per pipeline bucket.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Number of concurrent status senders.
    #[serde(default = "default_senders")]
    pub senders: usize,

    /// Attempts per status write before it is dropped.
    #[serde(default = "default_ingest_retries")]
    pub retries: u32,

    /// Capacity of the bounded write queue feeding the senders.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_senders() -> usize {
    100
}

fn default_ingest_retries() -> u32 {
    5
}

fn default_queue_depth() -> usize {
    64
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            senders: default_senders(),
            retries: default_ingest_retries(),
            queue_depth: default_queue_depth(),
        }
    }
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSection {
    /// Queue budget used when a fill request does not name one.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_max_items() -> usize {
    10
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
        }
    }
}
