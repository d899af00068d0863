//! Content sniffing.
//!
//! The media type of an upload comes from its leading bytes only. The
//! client's `Content-Type` and filename are never consulted.

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::upload::error::UploadError;
use crate::upload::staging::StagedFile;
use crate::upload::types::MediaType;

/// Bytes read from the head of a file; enough for every signature `infer` knows.
pub const SNIFF_LEN: u64 = 8192;

/// Determines the true media type of staged files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentValidator;

impl ContentValidator {
    pub fn new() -> Self {
        Self
    }

    /// Sniff the staged file. `Ok(None)` means no known signature matched,
    /// including for empty files.
    pub async fn sniff(&self, staged: &StagedFile) -> Result<Option<MediaType>, UploadError> {
        let file = File::open(staged.path()).await?;
        let mut head = Vec::with_capacity(SNIFF_LEN as usize);
        file.take(SNIFF_LEN).read_to_end(&mut head).await?;

        Ok(Self::sniff_bytes(&head))
    }

    /// Match a buffer against the known signatures.
    pub fn sniff_bytes(head: &[u8]) -> Option<MediaType> {
        infer::get(head).map(|kind| MediaType::new(kind.mime_type()))
    }
}
