//! Configuration management for Things services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`THINGS__` prefix, `__` separator)
//! 2. Config file (things.toml, or any format the `config` crate detects)
//! 3. Defaults

use serde::Deserialize;

use crate::error::{Result, ThingsError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThingsConfig {
    #[serde(default)]
    pub graph: GraphSettings,
}

/// Graph behavior and output settings.
///
/// Loaded from the `[graph]` section or `THINGS__GRAPH__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSettings {
    /// Default serialization depth (0 = identifiers only, 1 = one-level expansion).
    #[serde(default = "default_max_expand_depth")]
    pub max_expand_depth: usize,

    /// Pretty-print JSON output.
    #[serde(default)]
    pub pretty: bool,

    /// Fallback tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_max_expand_depth() -> usize {
    1
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            max_expand_depth: default_max_expand_depth(),
            pretty: false,
            log_filter: default_log_filter(),
        }
    }
}

impl ThingsConfig {
    /// Load configuration using `file_prefix` as the config file name.
    ///
    /// A missing file falls back to defaults; a malformed one is an error.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("THINGS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ThingsError::Config(e.to_string()))?;

        let loaded: ThingsConfig = cfg
            .try_deserialize()
            .map_err(|e| ThingsError::Config(e.to_string()))?;

        tracing::debug!(
            file_prefix,
            max_expand_depth = loaded.graph.max_expand_depth,
            "Configuration loaded"
        );

        Ok(loaded)
    }
}
