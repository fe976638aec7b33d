use anyhow::{Context, Result};
use config::{Config, Environment as EnvSource, File};
use serde::Deserialize;

use crate::services::code_generator::EXPLICIT_CHARS;

/// Service configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    /// Deployment environment name (development, test, production)
    #[serde(default = "default_env")]
    pub env: String,

    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Keyed lock configuration
    #[serde(default)]
    pub lock: LockSettings,

    /// Counter configuration
    #[serde(default)]
    pub counter: CounterSettings,

    /// Code generator configuration
    #[serde(default)]
    pub codes: CodeSettings,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LockSettings {
    /// Bound on lock waits in milliseconds; absent means wait forever
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CounterSettings {
    /// First count handed out
    #[serde(default = "default_first_count")]
    pub first_count: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CodeSettings {
    /// Characters codes are drawn from
    #[serde(default = "default_chars_set")]
    pub chars_set: String,

    /// Generated code length
    #[serde(default = "default_code_length")]
    pub length: usize,
}

// Default value functions
fn default_env() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_first_count() -> u64 {
    1
}

fn default_chars_set() -> String {
    EXPLICIT_CHARS.to_string()
}

fn default_code_length() -> usize {
    6
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            env: default_env(),
            log_level: default_log_level(),
            lock: LockSettings::default(),
            counter: CounterSettings::default(),
            codes: CodeSettings::default(),
        }
    }
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            first_count: default_first_count(),
        }
    }
}

impl Default for CodeSettings {
    fn default() -> Self {
        Self {
            chars_set: default_chars_set(),
            length: default_code_length(),
        }
    }
}

/// Load service configuration from file and environment variables
///
/// Configuration is loaded in the following order (later sources override earlier):
/// 1. Base config file (config_path)
/// 2. Environment-specific config file (config.{env}.toml)
/// 3. Environment variables with SVCKIT_ prefix
pub fn load_config(config_path: &str, env: &str) -> Result<ServicesConfig> {
    let settings = Config::builder()
        // Load base configuration file
        .add_source(File::with_name(config_path).required(false))
        // Load environment-specific configuration
        .add_source(File::with_name(&format!("config.{}", env)).required(false))
        // Load environment variables with SVCKIT_ prefix
        .add_source(
            EnvSource::with_prefix("SVCKIT")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .context("Failed to build configuration")?;

    settings
        .try_deserialize()
        .context("Failed to deserialize configuration")
}
