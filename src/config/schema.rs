//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the upload gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Size and time limits applied to each request.
    pub limits: LimitsConfig,

    /// Per-client upload quota.
    pub rate_limit: RateLimitConfig,

    /// Staging, permanent storage and audit log locations.
    pub storage: StorageConfig,

    /// Media types that may be promoted, mapped to their canonical extension.
    pub allowed_types: AllowedTypesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Hard cap on the bytes of a single uploaded file.
    pub max_upload_bytes: u64,

    /// Headroom on top of `max_upload_bytes` for multipart framing and other form fields.
    pub multipart_overhead_bytes: u64,

    /// Total time allowed for one request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 2 * 1024 * 1024, // 2MB
            multipart_overhead_bytes: 64 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Length of the sliding window in milliseconds.
    pub window_ms: u64,

    /// Upload attempts admitted per client within one window.
    pub max_attempts: u32,

    /// Take the client identity from `X-Forwarded-For` instead of the peer address.
    /// Only safe behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 15 * 60 * 1000,
            max_attempts: 5,
            trust_forwarded_for: false,
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Permanent storage for promoted files.
    pub upload_dir: PathBuf,

    /// Private staging area. Must live on the same volume as `upload_dir`.
    pub temp_dir: PathBuf,

    /// Append-only audit log.
    pub audit_log: PathBuf,

    /// Directory holding the upload form, served as the router fallback.
    pub public_dir: Option<PathBuf>,

    /// Remove leftover staged files when the process starts.
    pub sweep_temp_on_startup: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            temp_dir: PathBuf::from("temp_uploads"),
            audit_log: PathBuf::from("upload.log"),
            public_dir: Some(PathBuf::from("public")),
            sweep_temp_on_startup: true,
        }
    }
}

/// Media type → extension table, e.g. `"image/jpeg" = ".jpg"`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AllowedTypesConfig(pub BTreeMap<String, String>);

impl Default for AllowedTypesConfig {
    fn default() -> Self {
        Self(BTreeMap::from([
            ("image/jpeg".to_string(), ".jpg".to_string()),
            ("image/png".to_string(), ".png".to_string()),
            ("application/pdf".to_string(), ".pdf".to_string()),
        ]))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human readable or JSON lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
