// src/config/mod.rs

//! Engine configuration for spoolq.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Locate and load the config file (`loader.rs`).
//! - Check that the configuration is usable before the queue starts (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_path_from_env, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, EngineSection, RawConfigFile, ResourceConfig, SpoolSection};
