// src/pipeline/document.rs

//! Serialized pipeline documents and where they come from.
//!
//! A document is a JSON object holding a `cells` list. Each cell has an `id`
//! and a `type`; links also carry `source`, `target` and `attributes`, while
//! commands and controllers keep their fields at the top level of the cell.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::{Result, SluiceError};
use crate::fs::FileSystem;
use crate::store::{BucketPath, Namespace};

pub const COMMAND_CELL: &str = "container.Container";
pub const CONTROLLER_CELL: &str = "container.Kubernetes";
pub const LINK_CELL: &str = "link";

/// Top-level document shape.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineDocument {
    pub cells: Vec<Value>,

    #[serde(default)]
    pub environment: Vec<String>,
}

impl PipelineDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| SluiceError::Document(e.to_string()))
    }
}

/// Reference to a link endpoint (`{"id": "..."}`).
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub id: Option<String>,
}

/// One typed cell of a document.
#[derive(Debug, Clone, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub attributes: Map<String, Value>,

    #[serde(default)]
    pub source: Option<Endpoint>,

    #[serde(default)]
    pub target: Option<Endpoint>,

    /// Every other field of the cell.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Cell {
    /// Rebuild a JSON object of the cell's own fields, including `id`, for
    /// typed deserialization into command or controller raw forms.
    pub(crate) fn field_object(&self) -> Value {
        let mut fields = self.fields.clone();
        if let Some(id) = &self.id {
            fields.insert("id".to_string(), Value::String(id.clone()));
        }
        Value::Object(fields)
    }

    pub(crate) fn source_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(|e| e.id.as_deref())
    }

    pub(crate) fn target_id(&self) -> Option<&str> {
        self.target.as_ref().and_then(|e| e.id.as_deref())
    }
}

/// Somewhere pipeline documents can be fetched from by pipeline name.
pub trait DocumentSource: Send + Sync + Debug {
    /// Raw document bytes, or `None` if no such pipeline exists.
    fn fetch(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Names of every pipeline available, sorted.
    fn names(&self) -> Result<Vec<String>>;
}

/// Documents stored in the `pipeline` bucket of the namespace, base64 encoded.
#[derive(Debug, Clone)]
pub struct NamespaceDocuments {
    namespace: Arc<dyn Namespace>,
}

impl NamespaceDocuments {
    pub fn new(namespace: Arc<dyn Namespace>) -> Self {
        Self { namespace }
    }

    /// Store a document under `name`.
    pub fn store(&self, name: &str, document: &[u8]) -> Result<()> {
        PipelineDocument::from_slice(document)?;
        let encoded = STANDARD.encode(document);
        self.namespace
            .put(&BucketPath::pipelines(), name, encoded.as_bytes())
    }
}

impl DocumentSource for NamespaceDocuments {
    fn fetch(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(stored) = self.namespace.get(&BucketPath::pipelines(), name)? else {
            return Ok(None);
        };
        let decoded = STANDARD
            .decode(&stored)
            .map_err(|e| SluiceError::Document(format!("pipeline {name}: {e}")))?;
        Ok(Some(decoded))
    }

    fn names(&self) -> Result<Vec<String>> {
        let entries = self.namespace.prefix_scan(&BucketPath::pipelines(), "", None)?;
        Ok(entries.into_iter().map(|(name, _)| name).collect())
    }
}

/// Documents kept as `<dir>/<name>.json` files.
#[derive(Debug, Clone)]
pub struct DirectoryDocuments {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl DirectoryDocuments {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DocumentSource for DirectoryDocuments {
    fn fetch(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name);
        if !self.fs.is_file(&path) {
            return Ok(None);
        }
        let contents = self.fs.read_to_string(&path)?;
        Ok(Some(contents.into_bytes()))
    }

    fn names(&self) -> Result<Vec<String>> {
        if !self.fs.is_dir(&self.dir) {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = self
            .fs
            .read_dir(&self.dir)?
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == "json") && self.fs.is_file(p))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }
}
