//! Startup preparation of the storage layout.
//!
//! # Responsibilities
//! - Create the upload and staging directories
//! - Sweep files left in staging by a crash or kill
//! - Warn when promotion cannot be an atomic rename

use std::io;
use std::path::Path;

use tokio::fs;

use crate::config::StorageConfig;

/// Ensure the storage layout exists. Returns the number of stale staged
/// files removed.
pub async fn prepare_storage(storage: &StorageConfig) -> io::Result<usize> {
    fs::create_dir_all(&storage.upload_dir).await?;
    fs::create_dir_all(&storage.temp_dir).await?;

    warn_if_cross_device(&storage.temp_dir, &storage.upload_dir);

    let swept = if storage.sweep_temp_on_startup {
        sweep_temp_dir(&storage.temp_dir).await?
    } else {
        0
    };

    tracing::info!(
        upload_dir = %storage.upload_dir.display(),
        temp_dir = %storage.temp_dir.display(),
        swept,
        "Storage ready"
    );
    Ok(swept)
}

/// Remove every regular file directly inside `temp_dir`.
///
/// Only safe before the server accepts traffic.
pub async fn sweep_temp_dir(temp_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    let mut entries = fs::read_dir(temp_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        match fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %entry.path().display(), error = %e, "Failed to sweep staged file"),
        }
    }
    Ok(removed)
}

#[cfg(unix)]
fn warn_if_cross_device(temp_dir: &Path, upload_dir: &Path) {
    use std::os::unix::fs::MetadataExt;

    if let (Ok(temp), Ok(upload)) = (std::fs::metadata(temp_dir), std::fs::metadata(upload_dir)) {
        if temp.dev() != upload.dev() {
            tracing::warn!(
                temp_dir = %temp_dir.display(),
                upload_dir = %upload_dir.display(),
                "Staging and upload directories are on different devices; promotion will fail"
            );
        }
    }
}

#[cfg(not(unix))]
fn warn_if_cross_device(_temp_dir: &Path, _upload_dir: &Path) {}
