//! Configuration module for NTPSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ServerAddress;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for NTPSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub controller: ControllerConfig,
    pub logging: LoggingConfig,
}

/// Time retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Time server, `host` or `host:port`.
    pub server: String,
    /// Seconds to wait for the server before reporting a timeout.
    pub timeout_secs: u64,
}

/// Controller behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// What a sync request does while another is in flight: `ignore` or `replace`.
    pub redispatch: String,
    /// Seconds after which a request with no reply is resolved as a failure.
    pub watchdog_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// Handling of a sync request that arrives while one is already active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedispatchPolicy {
    /// Keep the outstanding request and drop the new one.
    #[default]
    Ignore,
    /// Abandon the outstanding request and dispatch a new one.
    Replace,
}

impl FromStr for RedispatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(RedispatchPolicy::Ignore),
            "replace" => Ok(RedispatchPolicy::Replace),
            other => Err(format!(
                "invalid policy '{}'; valid options: {}",
                other,
                VALID_REDISPATCH_POLICIES.join(", ")
            )),
        }
    }
}

impl std::fmt::Display for RedispatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedispatchPolicy::Ignore => write!(f, "ignore"),
            RedispatchPolicy::Replace => write!(f, "replace"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/ntpsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("ntpsync")
            .join("config.yaml")
    }

    /// Parsed time server.
    pub fn server_address(&self) -> Result<ServerAddress, crate::domain::DomainError> {
        ServerAddress::new(self.sync.server.clone())
    }

    /// Server timeout as a [`Duration`].
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.timeout_secs)
    }

    /// Controller watchdog as a [`Duration`].
    pub fn watchdog(&self) -> Duration {
        Duration::from_secs(self.controller.watchdog_secs)
    }

    /// Parsed re-dispatch policy, [`RedispatchPolicy::Ignore`] if invalid.
    pub fn redispatch_policy(&self) -> RedispatchPolicy {
        self.controller.redispatch.parse().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server: "pool.ntp.org".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            redispatch: "ignore".to_string(),
            watchdog_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.timeout_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `controller.redispatch`.
const VALID_REDISPATCH_POLICIES: &[&str] = &["ignore", "replace"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if let Err(e) = self.server_address() {
            errors.push(ValidationError {
                field: "sync.server".into(),
                message: e.to_string(),
            });
        }
        if self.sync.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "sync.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- controller ---
        if let Err(message) = self.controller.redispatch.parse::<RedispatchPolicy>() {
            errors.push(ValidationError {
                field: "controller.redispatch".into(),
                message,
            });
        }
        if self.controller.watchdog_secs <= self.sync.timeout_secs {
            errors.push(ValidationError {
                field: "controller.watchdog_secs".into(),
                message: format!(
                    "watchdog_secs ({}) must exceed sync.timeout_secs ({})",
                    self.controller.watchdog_secs, self.sync.timeout_secs
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust
/// use ntpsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .sync_server("time.example.org")
///     .sync_timeout_secs(5)
///     .logging_level("debug")
///     .build();
/// assert_eq!(config.sync.server, "time.example.org");
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder pre-filled with defaults.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // -- sync --

    pub fn sync_server(mut self, server: impl Into<String>) -> Self {
        self.config.sync.server = server.into();
        self
    }

    pub fn sync_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.sync.timeout_secs = seconds;
        self
    }

    // -- controller --

    pub fn controller_redispatch(mut self, policy: RedispatchPolicy) -> Self {
        self.config.controller.redispatch = policy.to_string();
        self
    }

    pub fn controller_watchdog_secs(mut self, seconds: u64) -> Self {
        self.config.controller.watchdog_secs = seconds;
        self
    }

    // -- logging --

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the [`Config`] without validation.
    pub fn build(self) -> Config {
        self.config
    }

    /// Consume the builder, validate, and return the [`Config`] or errors.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
