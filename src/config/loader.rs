//! Configuration loading from disk and environment.

use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value `{value}` for environment variable {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build the effective configuration: optional TOML file, then `.env` and
/// process environment overrides, then validation.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    dotenvy::dotenv().ok();

    let config = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => GatewayConfig::default(),
    };

    let config = apply_env_overrides(config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the recognized environment variables on top of `config`.
///
/// `lookup` abstracts the environment so overrides can be exercised without
/// mutating process state.
pub fn apply_env_overrides<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let port: u16 = parse_var("PORT", &port)?;
        let mut addr: SocketAddr = config
            .listener
            .bind_address
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0)));
        addr.set_port(port);
        config.listener.bind_address = addr.to_string();
    }
    if let Some(value) = lookup("MAX_UPLOAD_BYTES") {
        config.limits.max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", &value)?;
    }
    if let Some(value) = lookup("RATE_LIMIT_WINDOW_MS") {
        config.rate_limit.window_ms = parse_var("RATE_LIMIT_WINDOW_MS", &value)?;
    }
    if let Some(value) = lookup("RATE_LIMIT_MAX") {
        config.rate_limit.max_attempts = parse_var("RATE_LIMIT_MAX", &value)?;
    }
    if let Some(value) = lookup("ALLOWED_TYPES") {
        config.allowed_types.0 = parse_allowed_types(&value).ok_or(ConfigError::Env {
            var: "ALLOWED_TYPES",
            value,
        })?;
    }
    if let Some(value) = lookup("UPLOAD_DIR") {
        config.storage.upload_dir = PathBuf::from(value);
    }
    if let Some(value) = lookup("TEMP_DIR") {
        config.storage.temp_dir = PathBuf::from(value);
    }
    if let Some(value) = lookup("AUDIT_LOG") {
        config.storage.audit_log = PathBuf::from(value);
    }
    if let Some(value) = lookup("PUBLIC_DIR") {
        config.storage.public_dir = if value.is_empty() { None } else { Some(PathBuf::from(value)) };
    }
    if let Some(value) = lookup("LOG_FORMAT") {
        config.observability.log_format = match value.to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => return Err(ConfigError::Env { var: "LOG_FORMAT", value }),
        };
    }

    Ok(config)
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}

/// Parse `image/jpeg=.jpg,image/png=.png`.
fn parse_allowed_types(value: &str) -> Option<BTreeMap<String, String>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (media_type, extension) = entry.split_once('=')?;
            Some((media_type.trim().to_ascii_lowercase(), extension.trim().to_string()))
        })
        .collect()
}
