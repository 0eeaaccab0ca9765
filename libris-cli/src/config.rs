//! Layered settings for the command line.
//!
//! Later sources win: built-in defaults, then `libris.toml` (or the file named by
//! `LIBRIS_CONFIG_FILE`), then `LIBRIS_*` environment variables.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "libris.toml";
const ENV_PREFIX: &str = "LIBRIS_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Where the library API lives. Paths are resolved against this.
    pub api_base_url: String,
    /// Used when `RUST_LOG` is unset.
    pub log_level: String,
    /// How long a notice stays on the board.
    pub notice_ttl_ms: u64,
    /// Page links shown under the book list.
    pub page_window: u32
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            api_base_url: "http://localhost:5000".to_string(),
            log_level: "info".to_string(),
            notice_ttl_ms: 4000,
            page_window: 5
        }
    }
}

impl CliConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("LIBRIS_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let figment = Figment::from(Serialized::defaults(CliConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config_file"]));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: CliConfig = figment
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api_base_url).map_err(|e| ConfigError::Invalid {
            field: "api_base_url",
            reason: e.to_string()
        })?;
        if self.notice_ttl_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "notice_ttl_ms",
                reason: "must be at least 1".to_string()
            });
        }
        if self.page_window == 0 {
            return Err(ConfigError::Invalid {
                field: "page_window",
                reason: "must be at least 1".to_string()
            });
        }
        Ok(())
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }
}
