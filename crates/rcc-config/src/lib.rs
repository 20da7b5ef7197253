// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for the remote command client.
//!
//! This crate provides [`ClientConfig`] together with helpers for loading
//! from TOML files, applying `RCC_*` environment overrides, merging overlays,
//! and producing advisory [`ConfigWarning`]s.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// The request timeout is unusually large.
    LargeTimeout {
        /// Timeout value in seconds.
        secs: u64,
    },
    /// The endpoint uses plain HTTP.
    InsecureEndpoint {
        /// The configured endpoint.
        endpoint: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            ConfigWarning::LargeTimeout { secs } => {
                write!(f, "request timeout is unusually large ({secs}s)")
            }
            ConfigWarning::InsecureEndpoint { endpoint } => {
                write!(f, "endpoint '{endpoint}' does not use https")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default header carrying the service-assigned request id.
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// Top-level client configuration.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL that default requests are sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds (1–600).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// `User-Agent` header sent with every default request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Response header read by the built-in JSON error parser.
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,

    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_request_id_header() -> String {
    DEFAULT_REQUEST_ID_HEADER.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
            log_level: Some("info".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum allowed timeout in seconds.
const MAX_TIMEOUT_SECS: u64 = 600;

/// Threshold above which a timeout generates a warning.
const LARGE_TIMEOUT_THRESHOLD: u64 = 120;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`ClientConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`ClientConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => ClientConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`ClientConfig`].
pub fn parse_toml(content: &str) -> Result<ClientConfig, ConfigError> {
    toml::from_str::<ClientConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `RCC_ENDPOINT`
/// - `RCC_LOG_LEVEL`
/// - `RCC_TIMEOUT_SECS` (ignored unless it parses as an integer)
pub fn apply_env_overrides(config: &mut ClientConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides using an arbitrary variable lookup.
pub fn apply_overrides_from(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("RCC_ENDPOINT") {
        config.endpoint = Some(val);
    }
    if let Some(val) = lookup("RCC_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    if let Some(secs) = lookup("RCC_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok()) {
        config.timeout_secs = secs;
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (bad log level, out-of-range timeout, malformed endpoint) are
/// returned as a [`ConfigError::ValidationError`]; soft issues come back as
/// warnings.
pub fn validate_config(config: &ClientConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level {
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(format!("invalid log_level '{level}'"));
        }
    }

    let t = config.timeout_secs;
    if t == 0 || t > MAX_TIMEOUT_SECS {
        errors.push(format!(
            "timeout {t}s out of range (1..{MAX_TIMEOUT_SECS})"
        ));
    } else if t > LARGE_TIMEOUT_THRESHOLD {
        warnings.push(ConfigWarning::LargeTimeout { secs: t });
    }

    if config.request_id_header.trim().is_empty() {
        errors.push("request_id_header must not be empty".into());
    }

    match config.endpoint.as_deref() {
        Some(endpoint) if endpoint.starts_with("https://") => {}
        Some(endpoint) if endpoint.starts_with("http://") => {
            warnings.push(ConfigWarning::InsecureEndpoint {
                endpoint: endpoint.to_string(),
            });
        }
        Some(endpoint) => {
            errors.push(format!(
                "endpoint '{endpoint}' must start with http:// or https://"
            ));
        }
        None => warnings.push(ConfigWarning::MissingOptionalField {
            field: "endpoint".into(),
            hint: "every command needs a prepare listener that supplies its request".into(),
        }),
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations.  Values in `overlay` take precedence over `base`.
///
/// `timeout_secs` and `request_id_header` always carry a value, so the overlay
/// only wins when it differs from the built-in default.
pub fn merge_configs(base: ClientConfig, overlay: ClientConfig) -> ClientConfig {
    ClientConfig {
        endpoint: overlay.endpoint.or(base.endpoint),
        timeout_secs: if overlay.timeout_secs != DEFAULT_TIMEOUT_SECS {
            overlay.timeout_secs
        } else {
            base.timeout_secs
        },
        user_agent: overlay.user_agent.or(base.user_agent),
        request_id_header: if overlay.request_id_header != DEFAULT_REQUEST_ID_HEADER {
            overlay.request_id_header
        } else {
            base.request_id_header
        },
        log_level: overlay.log_level.or(base.log_level),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
