//! Configuration System
//!
//! Runtime configuration for the modal routing engine. Values are layered as
//! defaults, then an optional TOML file, then `MODAL_ROUTE__*` environment
//! variables, and validated before the controller is built.

use crate::error::ModalError;
use crate::logging::LoggingConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const ENV_PREFIX: &str = "MODAL_ROUTE";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalRouteConfig {
    /// Prefix of the query keys that mark query modals as active
    #[serde(default = "default_query_prefix")]
    pub query_prefix: String,

    /// Path segment under which global modals are mounted
    #[serde(default = "default_global_segment")]
    pub global_segment: String,

    /// Namespace for keys written to session storage
    #[serde(default = "default_storage_namespace")]
    pub storage_namespace: String,

    /// Whether modals without an explicit `direct` flag may be entered by URL
    #[serde(default)]
    pub default_direct: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_query_prefix() -> String {
    "m-".to_string()
}

fn default_global_segment() -> String {
    "_modal".to_string()
}

fn default_storage_namespace() -> String {
    "modal-route".to_string()
}

impl Default for ModalRouteConfig {
    fn default() -> Self {
        Self {
            query_prefix: default_query_prefix(),
            global_segment: default_global_segment(),
            storage_namespace: default_storage_namespace(),
            default_direct: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl ModalRouteConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ModalError> {
        if self.query_prefix.is_empty() {
            return Err(ModalError::ConfigError(
                "query_prefix cannot be empty".to_string(),
            ));
        }
        if self.global_segment.is_empty() || self.global_segment.contains('/') {
            return Err(ModalError::ConfigError(format!(
                "global_segment must be a single non-empty path segment, got '{}'",
                self.global_segment
            )));
        }
        if self.storage_namespace.is_empty() {
            return Err(ModalError::ConfigError(
                "storage_namespace cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Session storage key for a namespaced entry
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}:{}", self.storage_namespace, key)
    }
}

/// Loads [`ModalRouteConfig`] from layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from defaults and environment only
    pub fn load() -> Result<ModalRouteConfig, ModalError> {
        Self::finish(builder_with_defaults()?)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load_from_file(path: &Path) -> Result<ModalRouteConfig, ModalError> {
        let path_str = path.to_str().ok_or_else(|| {
            ModalError::ConfigError(format!("Config path is not valid UTF-8: {:?}", path))
        })?;
        debug!(config_path = %path.display(), "Loading modal route config file");
        let builder = builder_with_defaults()?.add_source(File::with_name(path_str).required(true));
        Self::finish(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<ModalRouteConfig, ModalError> {
        let config: ModalRouteConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("query_prefix", default_query_prefix())?
        .set_default("global_segment", default_global_segment())?
        .set_default("storage_namespace", default_storage_namespace())?
        .set_default("default_direct", false)
}
