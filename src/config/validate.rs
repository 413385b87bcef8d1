// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SluiceError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SluiceError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_store(cfg)?;
    validate_ingest(cfg)?;
    Ok(())
}

fn validate_store(cfg: &RawConfigFile) -> Result<()> {
    if cfg.store.timeout_ms == 0 {
        return Err(SluiceError::Config(
            "[store].timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_ingest(cfg: &RawConfigFile) -> Result<()> {
    if cfg.ingest.senders == 0 {
        return Err(SluiceError::Config(
            "[ingest].senders must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.ingest.queue_depth == 0 {
        return Err(SluiceError::Config(
            "[ingest].queue_depth must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
