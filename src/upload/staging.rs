//! Staging of incoming bytes in the private temp directory.
//!
//! # Responsibilities
//! - Stream the body into a freshly created temp file
//! - Enforce the size cap while bytes arrive, not after
//! - Guarantee no partial file outlives a failed or cancelled upload
//!
//! # Design Decisions
//! - Temp names are random; the client name contributes at most a sanitized extension
//! - `StagedFile` is a drop guard, so cancellation of the request future also cleans up
//! - Files are opened with `create_new`, never truncating an existing file

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::upload::error::UploadError;
use crate::upload::naming::{client_extension, random_token};

/// Failure reported by the body stream feeding the receiver.
#[derive(Debug)]
pub enum StreamError {
    /// An outer body limit was hit before the receiver's own cap.
    LimitExceeded,
    /// Client went away or sent invalid framing.
    Interrupted(String),
}

impl From<axum::extract::multipart::MultipartError> for StreamError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
            StreamError::LimitExceeded
        } else {
            StreamError::Interrupted(err.body_text())
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Interrupted(err.to_string())
    }
}

/// A file in the staging area.
///
/// Owns its path: dropping a `StagedFile` that was neither promoted nor
/// discarded removes the file.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    size: u64,
    armed: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            size: 0,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Release ownership of the path without removing it.
    pub(crate) fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            match std::fs::remove_file(&self.path) {
                Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::error!(path = %self.path.display(), error = %e, "Failed to remove staged file")
                }
            }
        }
    }
}

/// Writes upload bodies into the staging directory.
#[derive(Debug, Clone)]
pub struct StagingReceiver {
    temp_dir: PathBuf,
    max_bytes: u64,
}

impl StagingReceiver {
    pub fn new(temp_dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Stream `body` into a new staged file.
    ///
    /// Fails with `TooLarge` as soon as more than `max_bytes` arrive. On any
    /// error the partial file has been removed by the time this returns.
    pub async fn receive<S>(&self, original_name: &str, body: S) -> Result<StagedFile, UploadError>
    where
        S: Stream<Item = Result<Bytes, StreamError>>,
    {
        let mut name = random_token();
        if let Some(ext) = client_extension(original_name) {
            name.push_str(&ext);
        }
        // Armed before the open: a cancelled open must not leave an unowned file.
        let mut staged = StagedFile::new(self.temp_dir.join(name));

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged.path)
            .await
        {
            Ok(file) => file,
            Err(e) => {
                // Never remove a file this call did not create.
                staged.armed = false;
                return Err(e.into());
            }
        };

        // Close the handle before the guard removes the path on error.
        let written = self.fill(&mut file, body, &mut staged).await;
        drop(file);
        written?;

        tracing::debug!(
            path = %staged.path.display(),
            size = staged.size,
            "Upload staged"
        );
        Ok(staged)
    }

    async fn fill<S>(&self, file: &mut File, body: S, staged: &mut StagedFile) -> Result<(), UploadError>
    where
        S: Stream<Item = Result<Bytes, StreamError>>,
    {
        tokio::pin!(body);
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(StreamError::LimitExceeded) => {
                    return Err(UploadError::TooLarge {
                        max_bytes: self.max_bytes,
                    })
                }
                Err(StreamError::Interrupted(reason)) => {
                    return Err(UploadError::Interrupted(reason));
                }
            };

            staged.size += chunk.len() as u64;
            if staged.size > self.max_bytes {
                return Err(UploadError::TooLarge {
                    max_bytes: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures_util::stream;

    pub(crate) fn chunks(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes, StreamError>> {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))))
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_receive_writes_all_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = StagingReceiver::new(dir.path(), 1024);

        let staged = receiver
            .receive("photo.png", chunks(vec![b"hello ".to_vec(), b"world".to_vec()]))
            .await
            .unwrap();

        assert_eq!(staged.size(), 11);
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"hello world");
        let name = staged.path().file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 32 + ".png".len());
        assert!(name.ends_with(".png"));
        assert!(!name.starts_with("photo"));
    }

    #[tokio::test]
    async fn test_cap_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = StagingReceiver::new(dir.path(), 8);

        let staged = receiver.receive("a.bin", chunks(vec![vec![0; 8]])).await.unwrap();
        assert_eq!(staged.size(), 8);
    }

    #[tokio::test]
    async fn test_too_large_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = StagingReceiver::new(dir.path(), 8);

        let err = receiver
            .receive("big.jpg", chunks(vec![vec![1; 5], vec![2; 5], vec![3; 5]]))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::TooLarge { max_bytes: 8 }));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_interrupted_stream_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = StagingReceiver::new(dir.path(), 1024);
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(StreamError::Interrupted("connection reset".into())),
        ]);

        let err = receiver.receive("a.pdf", body).await.unwrap_err();

        assert!(matches!(err, UploadError::Interrupted(_)));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_outer_limit_maps_to_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = StagingReceiver::new(dir.path(), 1024);
        let body = stream::iter(vec![Err(StreamError::LimitExceeded)]);

        let err = receiver.receive("a.pdf", body).await.unwrap_err();

        assert!(matches!(err, UploadError::TooLarge { max_bytes: 1024 }));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_dropping_staged_file_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = StagingReceiver::new(dir.path(), 1024);

        let staged = receiver.receive("a.txt", chunks(vec![b"x".to_vec()])).await.unwrap();
        assert_eq!(entries(dir.path()), 1);
        drop(staged);
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_client_gone_mid_stream_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = StagingReceiver::new(dir.path(), 1 << 20);
        let body = stream::iter(vec![Ok(Bytes::from_static(b"first chunk"))]).chain(stream::pending());

        let received = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            receiver.receive("slow.png", body),
        )
        .await;

        assert!(received.is_err());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_open_is_internal() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = StagingReceiver::new(dir.path().join("missing"), 1024);

        let err = receiver.receive("a.png", chunks(vec![b"x".to_vec()])).await.unwrap_err();

        assert!(matches!(err, UploadError::Internal(_)));
        assert_eq!(entries(dir.path()), 0);
    }
}
