//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (size cap, window, quota > 0)
//! - Check the allowlist entries are well formed
//! - Keep the staging area apart from every served directory
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("limits.max_upload_bytes must be greater than zero")]
    ZeroUploadLimit,

    #[error("limits.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("rate_limit.window_ms must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.max_attempts must be greater than zero")]
    ZeroQuota,

    #[error("allowed_types must contain at least one entry")]
    EmptyAllowlist,

    #[error("allowed media type `{0}` is not of the form type/subtype")]
    MediaType(String),

    #[error("extension `{extension}` for `{media_type}` must be a dot followed by 1-10 ASCII alphanumerics")]
    Extension {
        media_type: String,
        extension: String,
    },

    #[error("storage.temp_dir must differ from storage.upload_dir")]
    TempIsUploadDir,

    #[error("storage.temp_dir and storage.public_dir must not contain one another")]
    TempOverlapsPublicDir,

    #[error("storage.audit_log must not be inside storage.temp_dir")]
    AuditLogInTempDir,

    #[error("storage.audit_log must not be inside storage.public_dir")]
    AuditLogInPublicDir,
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.limits.max_upload_bytes == 0 {
        errors.push(ValidationError::ZeroUploadLimit);
    }
    if config.limits.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.rate_limit.max_attempts == 0 {
        errors.push(ValidationError::ZeroQuota);
    }

    if config.allowed_types.0.is_empty() {
        errors.push(ValidationError::EmptyAllowlist);
    }
    for (media_type, extension) in &config.allowed_types.0 {
        if !is_media_type(media_type) {
            errors.push(ValidationError::MediaType(media_type.clone()));
        }
        if !is_extension(extension) {
            errors.push(ValidationError::Extension {
                media_type: media_type.clone(),
                extension: extension.clone(),
            });
        }
    }

    let storage = &config.storage;
    let temp_dir = normalize(&storage.temp_dir);
    let audit_log = normalize(&storage.audit_log);
    if temp_dir == normalize(&storage.upload_dir) {
        errors.push(ValidationError::TempIsUploadDir);
    }
    // The startup sweep removes every regular file directly in temp_dir.
    if audit_log.parent() == Some(temp_dir.as_path()) {
        errors.push(ValidationError::AuditLogInTempDir);
    }
    if let Some(public_dir) = storage.public_dir.as_deref().map(normalize) {
        if temp_dir.starts_with(&public_dir) || public_dir.starts_with(&temp_dir) {
            errors.push(ValidationError::TempOverlapsPublicDir);
        }
        if audit_log.starts_with(&public_dir) {
            errors.push(ValidationError::AuditLogInPublicDir);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Lexically resolve `.` and `..` so nested paths compare by component.
/// Symlinks are not followed.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn is_media_type(value: &str) -> bool {
    let token = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '_'))
    };
    match value.split_once('/') {
        Some((kind, subtype)) => token(kind) && token(subtype),
        None => false,
    }
}

/// `.` followed by 1-10 ASCII alphanumerics.
pub(crate) fn is_extension(value: &str) -> bool {
    match value.strip_prefix('.') {
        Some(rest) => (1..=10).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}
