//! Redirect responses for the upload form.
//!
//! # Design Decisions
//! - Every outcome is a 303 redirect to `/`; the form page reads the query
//! - Query values are form-urlencoded, never interpolated raw
//! - Internal errors carry only the generic message

use axum::response::Redirect;
use url::form_urlencoded;

use crate::upload::{StoredFile, UploadError};

/// Status query values.
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

fn location(pairs: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("/?{}", query)
}

/// `/?status=success&file=<name>`
pub fn success_location(stored: &StoredFile) -> String {
    location(&[("status", STATUS_SUCCESS), ("file", stored.name.as_str())])
}

/// `/?status=error&message=<reason>`
pub fn error_location(err: &UploadError) -> String {
    location(&[("status", STATUS_ERROR), ("message", err.user_message().as_str())])
}

pub fn upload_redirect(result: &Result<StoredFile, UploadError>) -> Redirect {
    match result {
        Ok(stored) => Redirect::to(&success_location(stored)),
        Err(err) => Redirect::to(&error_location(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::MediaType;
    use std::path::PathBuf;

    #[test]
    fn test_success_location() {
        let stored = StoredFile {
            name: "0123456789abcdef0123456789abcdef.png".into(),
            path: PathBuf::from("uploads/0123456789abcdef0123456789abcdef.png"),
            media_type: MediaType::new("image/png"),
            size: 10,
        };
        assert_eq!(
            success_location(&stored),
            "/?status=success&file=0123456789abcdef0123456789abcdef.png"
        );
    }

    #[test]
    fn test_error_location_is_encoded() {
        assert_eq!(
            error_location(&UploadError::DisallowedType {
                media_type: "image/gif".into()
            }),
            "/?status=error&message=File+type+not+allowed"
        );
        assert_eq!(
            error_location(&UploadError::RateLimited),
            "/?status=error&message=Too+many+uploads+from+this+IP%2C+please+try+again+later."
        );
    }

    #[test]
    fn test_internal_error_location_is_generic() {
        let err = UploadError::Internal(std::io::Error::other("/srv/uploads is read-only"));
        assert_eq!(
            error_location(&err),
            "/?status=error&message=Unexpected+server+error."
        );
    }
}
