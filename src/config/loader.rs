//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Config file (tripweaver.toml, or an explicit path)
//! 3. Environment variables (TRIPWEAVER_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::Path;

use tracing::debug;

use super::types::Config;
use crate::types::{Result, TripError};

/// Default config file consulted when no explicit path is given
const DEFAULT_CONFIG_FILE: &str = "tripweaver.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain:
    /// defaults → tripweaver.toml → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        let file = Path::new(DEFAULT_CONFIG_FILE);
        if file.exists() {
            debug!("Loading config from: {}", file.display());
            figment = figment.merge(Toml::file(file));
        }

        // Double underscore separates nesting levels so snake_case keys
        // survive: TRIPWEAVER_RATE_LIMIT__REQUESTS_PER_MINUTE ->
        // rate_limit.requests_per_minute
        figment = figment.merge(Env::prefixed("TRIPWEAVER_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| TripError::Config(format!("configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only (plus defaults)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| TripError::Config(format!("configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }
}
