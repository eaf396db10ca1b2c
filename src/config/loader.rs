// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SPOOLQ_CONFIG";

/// File name looked up in `$HOME` when `SPOOLQ_CONFIG` is unset.
pub const HOME_CONFIG_FILE: &str = ".spoolq.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] to get
/// a usable [`ConfigFile`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the config path: `SPOOLQ_CONFIG` if set, else `$HOME/.spoolq.toml`.
pub fn config_path_from_env() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(explicit));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(HOME_CONFIG_FILE))
}

/// Load the config at `path` if given and present, otherwise use defaults.
///
/// An explicitly named file (via `SPOOLQ_CONFIG`) that does not exist is an
/// error; a missing `$HOME/.spoolq.toml` is not.
pub fn load_or_default(path: Option<&Path>, explicit: bool) -> Result<ConfigFile> {
    match path {
        Some(p) if explicit || p.is_file() => {
            info!(path = ?p, "loading engine configuration");
            load_and_validate(p)
        }
        _ => {
            debug!("no configuration file found; using built-in defaults");
            Ok(ConfigFile::default())
        }
    }
}
