//! Append-only audit log of upload attempts.
//!
//! # Responsibilities
//! - Write one line per terminal upload outcome
//! - Keep concurrent appends from interleaving
//! - Never fail the request because the log could not be written
//!
//! # Design Decisions
//! - A single append-mode handle behind an async mutex; each line is one
//!   `write_all` followed by `flush` while the lock is held
//! - The client filename is escaped, so it cannot forge extra lines
//! - Write failures go to tracing and metrics only

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::observability::metrics;
use crate::upload::types::ClientIdentity;

/// SUCCESS / FAILED marker of an audit line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Success,
    Failed,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "SUCCESS",
            AuditStatus::Failed => "FAILED",
        }
    }
}

/// Everything one audit line carries.
#[derive(Debug, Clone)]
pub struct AuditRecord<'a> {
    pub timestamp: DateTime<Utc>,
    pub client: &'a ClientIdentity,
    pub status: AuditStatus,
    pub original_name: &'a str,
    pub detail: Option<String>,
}

impl AuditRecord<'_> {
    /// `[<rfc3339>] IP: <client> - <STATUS> - File: <name>[ - <detail>]\n`
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "[{}] IP: {} - {} - File: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            escape(self.client.as_str()),
            self.status.as_str(),
            escape(self.original_name),
        );
        if let Some(detail) = &self.detail {
            let _ = write!(line, " - {}", escape(detail));
        }
        line.push('\n');
        line
    }
}

/// Escape control characters so a value always stays on its line.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

/// Shared appender for the audit log file.
#[derive(Debug)]
pub struct AuditLogger {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl AuditLogger {
    /// Create a logger for `path`. The file is opened lazily on first record.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record`. Errors are reported to tracing and swallowed.
    pub async fn record(&self, record: &AuditRecord<'_>) {
        let line = record.to_line();
        if let Err(e) = self.append(line.as_bytes()).await {
            metrics::record_audit_failure();
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                client = %record.client,
                status = record.status.as_str(),
                "Failed to write audit log line"
            );
        }
    }

    async fn append(&self, line: &[u8]) -> std::io::Result<()> {
        let mut guard = self.file.lock().await;
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            *guard = Some(file);
        }

        if let Some(file) = guard.as_mut() {
            let written = match file.write_all(line).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };
            if written.is_err() {
                // Reopen on the next record.
                *guard = None;
            }
            written?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn record<'a>(client: &'a ClientIdentity, name: &'a str, status: AuditStatus, detail: Option<&str>) -> AuditRecord<'a> {
        AuditRecord {
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap(),
            client,
            status,
            original_name: name,
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn test_line_format() {
        let client = ClientIdentity::new("203.0.113.7");
        let line = record(&client, "evil.pdf.exe", AuditStatus::Success, Some("Saved as abc.png")).to_line();
        assert_eq!(
            line,
            "[2026-10-19T08:30:00.000Z] IP: 203.0.113.7 - SUCCESS - File: evil.pdf.exe - Saved as abc.png\n"
        );

        let line = record(&client, "x", AuditStatus::Failed, None).to_line();
        assert_eq!(line, "[2026-10-19T08:30:00.000Z] IP: 203.0.113.7 - FAILED - File: x\n");
    }

    #[test]
    fn test_filename_cannot_inject_lines() {
        let client = ClientIdentity::new("10.0.0.1");
        let line = record(
            &client,
            "a.png\n[2026-01-01T00:00:00.000Z] IP: 1.1.1.1 - SUCCESS",
            AuditStatus::Failed,
            None,
        )
        .to_line();
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.contains("a.png\\n[2026"));
    }

    #[tokio::test]
    async fn test_concurrent_records_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(AuditLogger::new(dir.path().join("upload.log")));

        let mut handles = Vec::new();
        for i in 0..32 {
            let logger = logger.clone();
            handles.push(tokio::spawn(async move {
                let client = ClientIdentity::new(format!("10.0.0.{}", i));
                let name = format!("file-{}-{}.png", i, "x".repeat(512));
                logger
                    .record(&AuditRecord {
                        timestamp: Utc::now(),
                        client: &client,
                        status: AuditStatus::Success,
                        original_name: &name,
                        detail: None,
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 32);
        for line in lines {
            assert!(line.starts_with('['));
            assert!(line.contains(" - SUCCESS - File: file-"));
            assert!(line.ends_with(".png"));
        }
    }

    #[tokio::test]
    async fn test_unwritable_log_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path().join("missing").join("upload.log"));
        let client = ClientIdentity::new("10.0.0.1");

        logger.record(&record(&client, "a.png", AuditStatus::Failed, None)).await;

        assert!(!logger.path().exists());
    }
}
