//! Configuration management for batchreg
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Environment Variables
//!
//! Any key can be overridden with `BATCHREG__<section>__<key>`:
//! - `BATCHREG__SERVER__BIND_ADDR=127.0.0.1:8080`
//! - `BATCHREG__DISPATCH__ENDPOINT_URL=https://staging.example.com/register`
//! - `BATCHREG__RETRY__DELAY_MS=500`
//!
//! # Configuration File
//!
//! Read from `config/batchreg.toml` unless `BATCHREG_CONFIG` points elsewhere.
//! API credentials are never part of the configuration; they arrive with
//! each upload.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{BatchConfig, Config, DispatchConfig, RetryConfig, ServerConfig};
pub use validation::ValidationError;

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
