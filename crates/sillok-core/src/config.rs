//! Sillok configuration module.
//!
//! Provides configuration file support via `sillok.toml`, environment variables,
//! and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Environment variables (`SILLOK_*`)
//! 2. Configuration file (`sillok.toml`)
//! 3. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::constants;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Store configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the on-disk store directory (§6.2).
    pub dir: String,
    /// Default `relax_context` applied when a request omits the field.
    pub relax_context: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: "./store".to_string(),
            relax_context: false,
        }
    }
}

/// Retrieval tuning configuration section.
///
/// Overrides a subset of the compiled-in constants in [`crate::constants`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates requested from each retrieval channel.
    pub top_k_retrieve: usize,
    /// Final number of reranked documents per round.
    pub top_k_final: usize,
    /// Lexical prerank truncation size.
    pub pre_rerank_top_k: usize,
    /// Maximum number of expanded queries per round.
    pub max_query_expansions: usize,
    /// Maximum accumulated context documents across rounds.
    pub max_ctx_docs: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_retrieve: constants::TOP_K_RETRIEVE,
            top_k_final: constants::TOP_K_FINAL,
            pre_rerank_top_k: constants::PRE_RERANK_TOP_K,
            max_query_expansions: constants::MAX_QUERY_EXPANSIONS,
            max_ctx_docs: constants::MAX_CTX_DOCS,
        }
    }
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level sillok configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SillokConfig {
    /// Store configuration.
    pub store: StoreConfig,
    /// Retrieval configuration.
    pub retrieval: RetrievalConfig,
    /// Server configuration.
    pub server: ServerConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl SillokConfig {
    /// Loads configuration from default sources (`sillok.toml` if present, then env).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("sillok.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SILLOK_").split("_").lowercase(false));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "store.dir".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if self.retrieval.top_k_final == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retrieval.top_k_final".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.retrieval.top_k_retrieve < self.retrieval.top_k_final {
            return Err(ConfigError::InvalidValue {
                key: "retrieval.top_k_retrieve".to_string(),
                message: "must be >= retrieval.top_k_final".to_string(),
            });
        }

        if self.retrieval.max_query_expansions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retrieval.max_query_expansions".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.retrieval.max_ctx_docs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retrieval.max_ctx_docs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        Ok(())
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
