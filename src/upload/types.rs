//! Core upload types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::AllowedTypesConfig;

/// Identity a request is rate limited and audited under (the client IP).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A media type determined from file content, e.g. `image/png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    pub fn new(media_type: impl Into<String>) -> Self {
        Self(media_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The allowlist: media type → canonical extension (with leading dot).
///
/// Built once from configuration and never mutated; only its keys are ever
/// promoted to permanent storage.
#[derive(Debug, Clone)]
pub struct AllowedTypes {
    table: BTreeMap<String, String>,
}

impl AllowedTypes {
    pub fn from_config(config: &AllowedTypesConfig) -> Self {
        Self {
            table: config
                .0
                .iter()
                .map(|(media_type, ext)| (media_type.to_ascii_lowercase(), ext.clone()))
                .collect(),
        }
    }

    /// Canonical extension for `media_type`, or `None` when it is not allowed.
    pub fn extension_for(&self, media_type: &MediaType) -> Option<&str> {
        self.table.get(media_type.as_str()).map(String::as_str)
    }

    pub fn contains(&self, media_type: &MediaType) -> bool {
        self.table.contains_key(media_type.as_str())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// A file promoted into permanent storage.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// System generated name: 32 hex characters plus the canonical extension.
    pub name: String,
    pub path: PathBuf,
    pub media_type: MediaType,
    pub size: u64,
}

/// Terminal classification of an upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Success,
    RejectedSize,
    RejectedType,
    RejectedRateLimit,
    RejectedMalformed,
    ErrorInternal,
}

impl Outcome {
    /// Label used for metrics and structured logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Success => "success",
            Outcome::RejectedSize => "rejected_size",
            Outcome::RejectedType => "rejected_type",
            Outcome::RejectedRateLimit => "rejected_rate_limit",
            Outcome::RejectedMalformed => "rejected_malformed",
            Outcome::ErrorInternal => "error_internal",
        }
    }
}

/// Ephemeral record of one request, filled in as each stage completes.
///
/// Never persisted; its fields end up in a single audit line.
#[derive(Debug, Clone)]
pub struct UploadAttempt {
    pub client: ClientIdentity,
    /// Client-declared filename. Untrusted, only ever logged.
    pub original_name: String,
    pub temp_path: Option<PathBuf>,
    pub size: u64,
    pub media_type: Option<MediaType>,
    pub outcome: Outcome,
    pub stored_name: Option<String>,
}

impl UploadAttempt {
    pub fn new(client: ClientIdentity, original_name: impl Into<String>) -> Self {
        Self {
            client,
            original_name: original_name.into(),
            temp_path: None,
            size: 0,
            media_type: None,
            outcome: Outcome::Pending,
            stored_name: None,
        }
    }
}
