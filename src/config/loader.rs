// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated model.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// the checked form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// A missing file at the default location is not an error: every section has
/// defaults, so the validated default config is returned instead.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw = if !path.exists() && path == default_config_path() {
        tracing::debug!(?path, "no config file found; using defaults");
        RawConfigFile::default()
    } else {
        load_from_path(path)?
    };
    ConfigFile::try_from(raw)
}

/// `Sluice.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Sluice.toml")
}
