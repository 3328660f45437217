//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{AuthMode, LogFormat, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_config(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document into a configuration, without validation.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// `PORT` binds all interfaces on that port; `PROXY_BIND_ADDRESS` wins over it.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            var: "PORT",
            reason: format!("'{}' is not a port number", port),
        })?;
        config.listener.bind_address = format!("0.0.0.0:{}", port);
    }

    if let Some(address) = lookup("PROXY_BIND_ADDRESS") {
        config.listener.bind_address = address;
    }

    if let Some(token) = lookup("ACCESS_TOKEN") {
        config.auth.access_token = Some(token);
    }

    if let Some(mode) = lookup("PROXY_AUTH_MODE") {
        config.auth.mode = mode
            .parse::<AuthMode>()
            .map_err(|reason| ConfigError::Env {
                var: "PROXY_AUTH_MODE",
                reason,
            })?;
    }

    if let Some(secs) = lookup("PROXY_UPSTREAM_TIMEOUT_SECS") {
        config.upstream.timeout_secs = secs.trim().parse().map_err(|_| ConfigError::Env {
            var: "PROXY_UPSTREAM_TIMEOUT_SECS",
            reason: format!("'{}' is not a number of seconds", secs),
        })?;
    }

    if let Some(secs) = lookup("PROXY_UPSTREAM_READ_TIMEOUT_SECS") {
        config.upstream.read_timeout_secs =
            secs.trim().parse().map_err(|_| ConfigError::Env {
                var: "PROXY_UPSTREAM_READ_TIMEOUT_SECS",
                reason: format!("'{}' is not a number of seconds", secs),
            })?;
    }

    if let Some(level) = lookup("PROXY_LOG_LEVEL") {
        config.observability.log_level = level;
    }

    if let Some(format) = lookup("PROXY_LOG_FORMAT") {
        config.observability.log_format =
            format
                .parse::<LogFormat>()
                .map_err(|reason| ConfigError::Env {
                    var: "PROXY_LOG_FORMAT",
                    reason,
                })?;
    }

    if let Some(enabled) = lookup("PROXY_METRICS_ENABLED") {
        config.observability.metrics_enabled = parse_bool(&enabled).ok_or(ConfigError::Env {
            var: "PROXY_METRICS_ENABLED",
            reason: format!("'{}' is not a boolean", enabled),
        })?;
    }

    if let Some(origins) = lookup("PROXY_CORS_ALLOWED_ORIGINS") {
        config.cors.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }

    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
