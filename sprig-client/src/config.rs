//! Configuration loading for the Sprig client.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use serde::Deserialize;
use sprig_cache::{CacheConfig, MAX_CHILDREN_PAGE_LIMIT};
use sprig_core::ScopeId;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV_VAR: &str = "SPRIG_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Scope active at startup; `None` starts with no scope selected.
    pub scope_id: Option<i64>,
    pub auth: AuthConfig,
    pub request_timeout_ms: u64,
    pub cache: CacheSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub jwt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    pub children_page_limit: u32,
    pub join_timeout_ms: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or SPRIG_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        Self::from_path(&path)
    }

    /// Read, parse and validate one config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if matches!(self.scope_id, Some(id) if id <= 0) {
            return Err(ConfigError::InvalidValue {
                field: "scope_id",
                reason: "must be > 0".to_string(),
            });
        }
        if self.auth.api_key.is_none() && self.auth.jwt.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "auth",
                reason: "api_key or jwt must be provided".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.children_page_limit == 0
            || self.cache.children_page_limit > MAX_CHILDREN_PAGE_LIMIT
        {
            return Err(ConfigError::InvalidValue {
                field: "cache.children_page_limit",
                reason: format!("must be between 1 and {MAX_CHILDREN_PAGE_LIMIT}"),
            });
        }
        if self.cache.join_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "cache.join_timeout_ms",
                reason: "must be > 0 when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn initial_scope(&self) -> Option<ScopeId> {
        self.scope_id.map(ScopeId)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_config(&self) -> CacheConfig {
        let config = CacheConfig::new().with_children_page_limit(self.cache.children_page_limit);
        match self.cache.join_timeout_ms {
            Some(ms) => config.with_join_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
