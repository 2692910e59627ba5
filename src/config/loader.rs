//! Configuration Loader
//!
//! Environment-aware configuration loading. Merges built-in defaults, an
//! optional TOML file and prefixed environment variables, then validates.

use super::error::{ConfigResult, ConfigurationError};
use super::MigrationConfig;
use crate::constants::env as env_keys;
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config/carrier-migration.toml";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: MigrationConfig,
    environment: String,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let path = env::var(env_keys::CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific file, falling back to defaults when
    /// the file does not exist
    pub fn load_from_path(path: &Path) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_overrides(path, None)
    }

    /// Load configuration with an explicit environment-variable map instead of
    /// the process environment. Useful for tests that must not touch global state.
    pub fn load_with_overrides(
        path: &Path,
        env_overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();

        debug!(
            environment = %environment,
            path = %path.display(),
            "Loading migration configuration"
        );

        let defaults = Config::try_from(&MigrationConfig::default())
            .map_err(|e| ConfigurationError::source_error("defaults", e))?;

        let env_source = Environment::with_prefix(env_keys::CONFIG_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("copy_columns")
            .source(env_overrides);

        let merged = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(env_source)
            .build()
            .map_err(|e| ConfigurationError::source_error(path.display().to_string(), e))?;

        let config: MigrationConfig = merged.try_deserialize()?;
        config.validate()?;

        info!(
            environment = %environment,
            database_url = %Self::mask_database_url(&config.database.url),
            source_table = %config.source.table,
            secondary_table = %config.secondary.table,
            chunk_size = config.job.chunk_size,
            tick_interval_seconds = config.job.tick_interval_seconds,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            config_path: path.to_path_buf(),
        }))
    }

    /// Build a manager around an already-constructed configuration
    pub fn from_config(config: MigrationConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Detect the runtime environment name
    pub fn detect_environment() -> String {
        env::var(env_keys::ENVIRONMENT)
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    /// Mask the password component of a database URL for logging
    pub fn mask_database_url(url: &str) -> String {
        let Some((scheme, rest)) = url.split_once("://") else {
            return url.to_string();
        };
        let Some((credentials, host)) = rest.rsplit_once('@') else {
            return url.to_string();
        };
        match credentials.split_once(':') {
            Some((user, _password)) => format!("{scheme}://{user}:***@{host}"),
            None => url.to_string(),
        }
    }
}
