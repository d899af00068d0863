//! Promotion of validated files into permanent storage.
//!
//! # Responsibilities
//! - Name the stored file from fresh randomness and the allowlist extension
//! - Move the staged file with a single rename
//!
//! # Design Decisions
//! - The client's name and extension never reach permanent storage
//! - Staging and storage must share a volume so the rename is atomic
//! - A type outside the allowlist is refused here as well as in the pipeline

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;

use crate::upload::error::UploadError;
use crate::upload::naming::random_token;
use crate::upload::staging::StagedFile;
use crate::upload::types::{AllowedTypes, MediaType, StoredFile};

/// Moves staged files into the upload directory.
#[derive(Debug, Clone)]
pub struct Promoter {
    upload_dir: PathBuf,
    allowed: Arc<AllowedTypes>,
}

impl Promoter {
    pub fn new(upload_dir: impl Into<PathBuf>, allowed: Arc<AllowedTypes>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            allowed,
        }
    }

    /// Rename `staged` into permanent storage under a fresh name.
    ///
    /// If the rename fails the staged file is dropped, which removes it.
    pub async fn promote(&self, staged: StagedFile, media_type: &MediaType) -> Result<StoredFile, UploadError> {
        let ext = self
            .allowed
            .extension_for(media_type)
            .ok_or_else(|| UploadError::DisallowedType {
                media_type: media_type.to_string(),
            })?;

        let name = format!("{}{}", random_token(), ext);
        let destination = self.upload_dir.join(&name);

        fs::rename(staged.path(), &destination).await?;
        let size = staged.size();
        staged.disarm();

        tracing::debug!(stored = %name, media_type = %media_type, "Upload promoted");
        Ok(StoredFile {
            name,
            path: destination,
            media_type: media_type.clone(),
            size,
        })
    }

    /// Delete a rejected staged file. Permanent storage is never touched.
    pub async fn discard(&self, staged: StagedFile) {
        let path = staged.disarm();
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::error!(path = %path.display(), error = %e, "Failed to discard staged file");
            }
        }
    }
}
