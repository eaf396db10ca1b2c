// src/config/validate.rs

use crate::config::model::{ConfigFile, DEFAULT_RESOURCE, RawConfigFile, ResourceConfig};
use crate::errors::{Result, SpoolError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SpoolError;

    fn try_from(mut raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        if raw.resource.is_empty() {
            raw.resource
                .insert(DEFAULT_RESOURCE.to_string(), ResourceConfig::default());
        }
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.engine, raw.spool, raw.resource))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_engine(cfg)?;
    validate_spool(cfg)?;
    validate_resources(cfg)?;
    Ok(())
}

fn validate_engine(cfg: &RawConfigFile) -> Result<()> {
    if cfg.engine.poll_interval_ms == 0 {
        return Err(SpoolError::ConfigError(
            "[engine].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.engine.dispatch_interval_ms == 0 {
        return Err(SpoolError::ConfigError(
            "[engine].dispatch_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.engine.job_timeout_secs == Some(0) {
        return Err(SpoolError::ConfigError(
            "[engine].job_timeout_secs must be >= 1 when set (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_spool(cfg: &RawConfigFile) -> Result<()> {
    if let Some(dir) = &cfg.spool.archive_dir {
        if dir.as_os_str().is_empty() {
            return Err(SpoolError::ConfigError(
                "[spool].archive_dir must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_resources(cfg: &RawConfigFile) -> Result<()> {
    for (name, resource) in cfg.resource.iter() {
        if name.trim().is_empty() {
            return Err(SpoolError::ConfigError(
                "resource names must not be empty".to_string(),
            ));
        }
        if resource.scratch_dir.as_os_str().is_empty() {
            return Err(SpoolError::ConfigError(format!(
                "resource '{}' has an empty scratch_dir",
                name
            )));
        }
    }

    if !cfg.resource.values().any(|r| r.enabled) {
        return Err(SpoolError::ConfigError(
            "config must enable at least one [resource.<name>] section".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_config_gets_default_resource() {
        let cfg = parse("").unwrap();
        assert!(cfg.resources().contains_key(DEFAULT_RESOURCE));
        assert_eq!(cfg.engine().poll_interval_ms, 1000);
        assert!(cfg.job_timeout().is_none());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = parse("[engine]\npoll_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, SpoolError::ConfigError(msg) if msg.contains("poll_interval_ms")));
    }

    #[test]
    fn all_resources_disabled_is_rejected() {
        let err = parse("[resource.gpu]\nenabled = false\n").unwrap_err();
        assert!(matches!(err, SpoolError::ConfigError(msg) if msg.contains("at least one")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            parse("[engine]\nthreads = 4\n"),
            Err(SpoolError::TomlError(_))
        ));
    }
}
