// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SluiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] sled::Error),

    #[error("Store operation timed out after {0} ms")]
    StoreTimeout(u64),

    #[error("Malformed pipeline document: {0}")]
    Document(String),

    #[error("Duplicate element id in pipeline: {0}")]
    DuplicateId(String),

    #[error("Command '{command}' references unknown controller '{controller}'")]
    UnknownController { command: String, controller: String },

    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    #[error("Malformed requester key: {0}")]
    MalformedKey(String),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SluiceError {
    /// Whether retrying the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SluiceError::StoreTimeout(_) => true,
            SluiceError::Io(_) => true,
            SluiceError::Store(err) => matches!(err, sled::Error::Io(_)),
            _ => false,
        }
    }

    /// Response code a transport layer should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            SluiceError::MalformedKey(_)
            | SluiceError::Document(_)
            | SluiceError::DuplicateId(_)
            | SluiceError::UnknownController { .. } => 400,
            _ => 500,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SluiceError>;
