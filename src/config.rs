//! Client configuration and validation.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The connection URI was empty or whitespace.
    #[error("connection uri cannot be empty")]
    EmptyUri,
    /// The connection URI used a scheme the driver layer does not speak.
    #[error("unsupported uri scheme '{scheme}'")]
    UnsupportedScheme {
        /// Scheme as written in the URI.
        scheme: String,
    },
    /// A numeric field that must be positive was zero.
    #[error("{field} must be greater than zero")]
    ZeroField {
        /// Name of the offending field.
        field: &'static str,
    },
    /// Retry jitter must stay a fraction of the backoff delay.
    #[error("retry jitter must be within 0.0..=1.0 (got {value})")]
    JitterOutOfRange {
        /// Configured jitter value.
        value: f64,
    },
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The config file was not valid TOML for this schema.
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Retry policy knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first (1 disables retries).
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound on any single backoff delay.
    pub max_delay_ms: u64,
    /// Jitter fraction applied to each delay, in `0.0..=1.0`.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 50,
            max_delay_ms: 2_000,
            jitter: 0.2,
        }
    }
}

/// Circuit breaker knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker open.
    pub failure_threshold: u32,
    /// How long the breaker stays open before probing.
    pub cool_down_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down_ms: 10_000,
        }
    }
}

/// Validated client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connection URI, e.g. `bolt://localhost:7687`.
    pub uri: String,
    /// Database to address, if the server hosts more than one.
    pub database: Option<String>,
    /// Username for basic auth.
    pub username: Option<String>,
    /// Password for basic auth.
    pub password: Option<String>,
    /// Result rows fetched per round trip.
    pub fetch_size: usize,
    /// Connection establishment timeout.
    pub connect_timeout_ms: u64,
    /// Per-attempt statement timeout.
    pub statement_timeout_ms: u64,
    /// Bound on the compiled-statement cache.
    pub plan_cache_size: usize,
    /// Latency samples retained for percentile extraction.
    pub latency_window: usize,
    /// Retry policy.
    pub retry: RetryConfig,
    /// Circuit breaker policy.
    pub breaker: BreakerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_owned(),
            database: None,
            username: None,
            password: None,
            fetch_size: 1_000,
            connect_timeout_ms: 5_000,
            statement_timeout_ms: 30_000,
            plan_cache_size: 256,
            latency_window: 512,
            retry: RetryConfig::default(),
            breaker: BreakerConfig::default(),
        }
    }
}

const SUPPORTED_SCHEMES: &[&str] = &["bolt", "bolt+s", "neo4j", "neo4j+s"];

impl ClientConfig {
    /// Preset tuned for interactive callers: short timeouts, eager retries.
    pub fn interactive() -> Self {
        Self {
            statement_timeout_ms: 5_000,
            retry: RetryConfig {
                max_attempts: 4,
                base_delay_ms: 25,
                max_delay_ms: 500,
                jitter: 0.2,
            },
            ..Self::default()
        }
    }

    /// Preset tuned for batch work: long timeouts, patient backoff.
    pub fn batch() -> Self {
        Self {
            fetch_size: 10_000,
            statement_timeout_ms: 300_000,
            retry: RetryConfig {
                max_attempts: 6,
                base_delay_ms: 500,
                max_delay_ms: 30_000,
                jitter: 0.5,
            },
            ..Self::default()
        }
    }

    /// Loads and validates a TOML config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parses and validates TOML config text.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants the rest of the client relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uri.trim().is_empty() {
            return Err(ConfigError::EmptyUri);
        }
        let scheme = self.uri.split("://").next().unwrap_or("");
        if !SUPPORTED_SCHEMES.contains(&scheme) {
            return Err(ConfigError::UnsupportedScheme {
                scheme: scheme.to_owned(),
            });
        }
        for (value, field) in [
            (self.fetch_size as u64, "fetch_size"),
            (self.connect_timeout_ms, "connect_timeout_ms"),
            (self.statement_timeout_ms, "statement_timeout_ms"),
            (self.plan_cache_size as u64, "plan_cache_size"),
            (self.latency_window as u64, "latency_window"),
            (u64::from(self.retry.max_attempts), "retry.max_attempts"),
            (
                u64::from(self.breaker.failure_threshold),
                "breaker.failure_threshold",
            ),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroField { field });
            }
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(ConfigError::JitterOutOfRange {
                value: self.retry.jitter,
            });
        }
        Ok(())
    }

    /// Per-attempt statement timeout as a [`Duration`].
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    /// Connection establishment timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
