//! Upload error taxonomy.

use thiserror::Error;

use crate::upload::types::Outcome;

/// Every way an upload attempt can fail.
///
/// All variants except `Internal` are expected rejections: they are answered
/// with a specific message. `Internal` is answered generically.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Client exceeded its quota for the current window.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Upload exceeded the size cap.
    #[error("file exceeds {max_bytes} bytes")]
    TooLarge {
        /// The configured cap.
        max_bytes: u64,
    },

    /// No known signature matched the content.
    #[error("unknown or unreadable file format")]
    UnrecognizedFormat,

    /// Signature recognized but the type is not allowlisted.
    #[error("disallowed media type {media_type}")]
    DisallowedType { media_type: String },

    /// The form carried no `uploaded_file` part.
    #[error("no file in request")]
    MissingFile,

    /// The body stream broke off or the multipart framing was invalid.
    #[error("upload interrupted: {0}")]
    Interrupted(String),

    /// Unexpected I/O failure.
    #[error("internal error: {0}")]
    Internal(#[from] std::io::Error),
}

impl UploadError {
    /// Message shown to the client. Never includes internal detail.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::RateLimited => {
                "Too many uploads from this IP, please try again later.".to_string()
            }
            UploadError::TooLarge { max_bytes } => {
                format!("File is too large. Max size is {}", human_size(*max_bytes))
            }
            UploadError::UnrecognizedFormat => "Unsupported or corrupted file".to_string(),
            UploadError::DisallowedType { .. } => "File type not allowed".to_string(),
            UploadError::MissingFile => "No file was uploaded".to_string(),
            UploadError::Interrupted(_) => "Upload was interrupted or malformed".to_string(),
            UploadError::Internal(_) => "Unexpected server error.".to_string(),
        }
    }

    /// Reason written to the audit log.
    pub fn audit_reason(&self) -> String {
        match self {
            UploadError::RateLimited => "Rate limit exceeded".to_string(),
            UploadError::TooLarge { max_bytes } => format!("File exceeds {} bytes", max_bytes),
            UploadError::UnrecognizedFormat => "Unknown or unreadable file format".to_string(),
            UploadError::DisallowedType { media_type } => {
                format!("Disallowed MIME type: {}", media_type)
            }
            UploadError::MissingFile => "No uploaded_file field".to_string(),
            UploadError::Interrupted(_) => "Upload interrupted".to_string(),
            UploadError::Internal(e) => format!("Internal error ({:?})", e.kind()),
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            UploadError::RateLimited => Outcome::RejectedRateLimit,
            UploadError::TooLarge { .. } => Outcome::RejectedSize,
            UploadError::UnrecognizedFormat | UploadError::DisallowedType { .. } => {
                Outcome::RejectedType
            }
            UploadError::MissingFile | UploadError::Interrupted(_) => Outcome::RejectedMalformed,
            UploadError::Internal(_) => Outcome::ErrorInternal,
        }
    }
}

fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    const KIB: u64 = 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_and_disallowed_are_reported_differently() {
        let unknown = UploadError::UnrecognizedFormat;
        let disallowed = UploadError::DisallowedType {
            media_type: "image/gif".into(),
        };

        assert_ne!(unknown.user_message(), disallowed.user_message());
        assert_eq!(unknown.audit_reason(), "Unknown or unreadable file format");
        assert_eq!(disallowed.audit_reason(), "Disallowed MIME type: image/gif");
        assert_eq!(unknown.outcome(), Outcome::RejectedType);
        assert_eq!(disallowed.outcome(), Outcome::RejectedType);
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let err = UploadError::Internal(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/var/lib/uploads: permission denied",
        ));
        assert_eq!(err.user_message(), "Unexpected server error.");
        assert!(!err.audit_reason().contains("/var/lib"));
    }

    #[test]
    fn test_size_message() {
        let err = UploadError::TooLarge {
            max_bytes: 2 * 1024 * 1024,
        };
        assert_eq!(err.user_message(), "File is too large. Max size is 2MB");
        assert_eq!(human_size(1000), "1000 bytes");
        assert_eq!(human_size(4096), "4KB");
    }
}
