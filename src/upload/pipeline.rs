//! Upload orchestration.
//!
//! # Data Flow
//! ```text
//! Received
//!     → RateChecked   (RateLimiter::admit; Denied ends here, nothing audited)
//!     → Staged        (StagingReceiver::receive; TooLarge leaves no file)
//!     → Sniffed       (ContentValidator::sniff)
//!     → Decided       (Promoter::promote or Promoter::discard)
//!     → Logged        (AuditLogger::record, exactly once)
//!     → Responded     (caller maps the result to a redirect)
//! ```
//!
//! # Design Decisions
//! - Each step is a fallible async call; the first error ends the attempt
//! - Single shot: nothing is retried, the client resubmits
//! - Unknown content and a recognized but unlisted type are separate
//!   rejections with separate messages

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use futures_util::Stream;

use crate::config::GatewayConfig;
use crate::observability::metrics;
use crate::security::rate_limit::{Admission, RateLimiter};
use crate::upload::audit::{AuditLogger, AuditRecord, AuditStatus};
use crate::upload::error::UploadError;
use crate::upload::promote::Promoter;
use crate::upload::sniff::ContentValidator;
use crate::upload::staging::{StagingReceiver, StreamError};
use crate::upload::types::{AllowedTypes, ClientIdentity, Outcome, StoredFile, UploadAttempt};

/// Composes the upload components.
pub struct UploadPipeline {
    limiter: Arc<dyn RateLimiter>,
    allowed: Arc<AllowedTypes>,
    stager: StagingReceiver,
    validator: ContentValidator,
    promoter: Promoter,
    audit: AuditLogger,
}

impl UploadPipeline {
    pub fn new(
        limiter: Arc<dyn RateLimiter>,
        allowed: Arc<AllowedTypes>,
        stager: StagingReceiver,
        promoter: Promoter,
        audit: AuditLogger,
    ) -> Self {
        Self {
            limiter,
            allowed,
            stager,
            validator: ContentValidator::new(),
            promoter,
            audit,
        }
    }

    /// Wire every component from configuration around the given limiter.
    pub fn from_config(config: &GatewayConfig, limiter: Arc<dyn RateLimiter>) -> Self {
        let allowed = Arc::new(AllowedTypes::from_config(&config.allowed_types));
        Self::new(
            limiter,
            allowed.clone(),
            StagingReceiver::new(&config.storage.temp_dir, config.limits.max_upload_bytes),
            Promoter::new(&config.storage.upload_dir, allowed),
            AuditLogger::new(&config.storage.audit_log),
        )
    }

    pub fn allowed_types(&self) -> &AllowedTypes {
        &self.allowed
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.stager.max_bytes()
    }

    /// Gate an attempt on the client's quota. Denials are not audited.
    pub fn admit(&self, client: &ClientIdentity) -> Result<(), UploadError> {
        match self.limiter.admit(client, Instant::now()) {
            Admission::Allowed => Ok(()),
            Admission::Denied { retry_after } => {
                metrics::record_rate_limited();
                tracing::warn!(
                    client = %client,
                    retry_after_secs = retry_after.as_secs(),
                    "Rate limit exceeded"
                );
                Err(UploadError::RateLimited)
            }
        }
    }

    /// Run an admitted attempt through staging, sniffing and promotion, and
    /// audit its outcome.
    pub async fn process<S>(
        &self,
        client: &ClientIdentity,
        original_name: &str,
        body: S,
    ) -> Result<StoredFile, UploadError>
    where
        S: Stream<Item = Result<Bytes, StreamError>>,
    {
        let started = Instant::now();
        let mut attempt = UploadAttempt::new(client.clone(), original_name);

        let result = self.run(&mut attempt, body).await;
        attempt.outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(e) => e.outcome(),
        };

        self.finish(&attempt, result.as_ref().err(), started).await;
        result
    }

    /// Audit an attempt that failed before its file could be streamed, e.g.
    /// a form without an `uploaded_file` part.
    pub async fn reject(&self, client: &ClientIdentity, original_name: &str, err: UploadError) -> UploadError {
        let mut attempt = UploadAttempt::new(client.clone(), original_name);
        attempt.outcome = err.outcome();
        self.finish(&attempt, Some(&err), Instant::now()).await;
        err
    }

    async fn run<S>(&self, attempt: &mut UploadAttempt, body: S) -> Result<StoredFile, UploadError>
    where
        S: Stream<Item = Result<Bytes, StreamError>>,
    {
        let staged = self.stager.receive(&attempt.original_name, body).await?;
        attempt.temp_path = Some(staged.path().to_path_buf());
        attempt.size = staged.size();

        let Some(media_type) = self.validator.sniff(&staged).await? else {
            self.promoter.discard(staged).await;
            return Err(UploadError::UnrecognizedFormat);
        };
        attempt.media_type = Some(media_type.clone());

        if !self.allowed.contains(&media_type) {
            self.promoter.discard(staged).await;
            return Err(UploadError::DisallowedType {
                media_type: media_type.to_string(),
            });
        }

        let stored = self.promoter.promote(staged, &media_type).await?;
        attempt.stored_name = Some(stored.name.clone());
        Ok(stored)
    }

    async fn finish(&self, attempt: &UploadAttempt, error: Option<&UploadError>, started: Instant) {
        let stored_name = attempt.stored_name.as_deref().unwrap_or_default();
        let (status, detail) = match error {
            None => (AuditStatus::Success, format!("Saved as {}", stored_name)),
            Some(e) => (AuditStatus::Failed, e.audit_reason()),
        };

        self.audit
            .record(&AuditRecord {
                timestamp: Utc::now(),
                client: &attempt.client,
                status,
                original_name: &attempt.original_name,
                detail: Some(detail),
            })
            .await;

        metrics::record_upload(attempt.outcome.as_str(), attempt.size, started);
        let media_type = attempt.media_type.as_ref().map(|m| m.as_str());
        match error {
            None => tracing::info!(
                client = %attempt.client,
                stored = stored_name,
                staged_as = ?attempt.temp_path,
                media_type = ?media_type,
                size = attempt.size,
                "Upload accepted"
            ),
            Some(UploadError::Internal(e)) => tracing::error!(
                client = %attempt.client,
                staged_as = ?attempt.temp_path,
                error = %e,
                "Upload failed with internal error"
            ),
            Some(e) => tracing::info!(
                client = %attempt.client,
                outcome = attempt.outcome.as_str(),
                staged_as = ?attempt.temp_path,
                media_type = ?media_type,
                size = attempt.size,
                reason = %e,
                "Upload rejected"
            ),
        }
    }
}
