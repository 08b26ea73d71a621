//! Configuration management for SQLBot
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, SqlbotError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for SQLBot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Chat front end settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Remote service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint is routed under
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds); SQL generation can be slow
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Chat front end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Data source used when a command needs one and none is given
    #[serde(default)]
    pub default_data_source_id: Option<i64>,

    /// Title given to sessions created without one
    #[serde(default)]
    pub default_title: Option<String>,

    /// Print the generated SQL under assistant replies
    #[serde(default = "default_show_sql")]
    pub show_sql: bool,

    /// Maximum number of result rows rendered per reply
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,
}

fn default_show_sql() -> bool {
    true
}

fn default_max_result_rows() -> usize {
    20
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_data_source_id: None,
            default_title: None,
            show_sql: default_show_sql(),
            max_result_rows: default_max_result_rows(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(SqlbotError::Io)?;
        let config = serde_yaml::from_str(&contents).map_err(SqlbotError::Yaml)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("SQLBOT_API_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("SQLBOT_API_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid SQLBOT_API_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(data_source) = std::env::var("SQLBOT_DATA_SOURCE_ID") {
            if let Ok(value) = data_source.parse() {
                self.chat.default_data_source_id = Some(value);
            } else {
                tracing::warn!("Invalid SQLBOT_DATA_SOURCE_ID: {}", data_source);
            }
        }

        if let Ok(title) = std::env::var("SQLBOT_SESSION_TITLE") {
            if !title.trim().is_empty() {
                self.chat.default_title = Some(title);
            }
        }

        if let Ok(rows) = std::env::var("SQLBOT_MAX_RESULT_ROWS") {
            if let Ok(value) = rows.parse() {
                self.chat.max_result_rows = value;
            } else {
                tracing::warn!("Invalid SQLBOT_MAX_RESULT_ROWS: {}", rows);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(api_url) = &cli.api_url {
            tracing::debug!("Using API URL override from CLI: {}", api_url);
            self.api.base_url = api_url.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(SqlbotError::Config("api.base_url cannot be empty".to_string()).into());
        }

        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            SqlbotError::Config(format!(
                "api.base_url is not a valid URL ({}): {}",
                self.api.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SqlbotError::Config(format!(
                "api.base_url must use http or https, got: {}",
                url.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(
                SqlbotError::Config("api.timeout_seconds must be greater than 0".to_string())
                    .into(),
            );
        }

        if self.api.timeout_seconds > 600 {
            return Err(SqlbotError::Config(
                "api.timeout_seconds must be less than or equal to 600".to_string(),
            )
            .into());
        }

        if self.chat.max_result_rows == 0 {
            return Err(SqlbotError::Config(
                "chat.max_result_rows must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
