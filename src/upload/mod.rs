//! Upload validation subsystem.
//!
//! # Data Flow
//! ```text
//! multipart body stream
//!     → staging.rs (random temp name, size cap, drop-guarded temp file)
//!     → sniff.rs (true media type from magic bytes)
//!     → promote.rs (rename into storage under a fresh name, or discard)
//!     → audit.rs (one line per attempt)
//! pipeline.rs drives the steps in order.
//! ```
//!
//! # Design Decisions
//! - Client-declared name and Content-Type never influence type decisions
//! - Staging and storage are separate directories; nothing staged is served
//! - Stored names come only from randomness and the allowlist

pub mod audit;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod promote;
pub mod sniff;
pub mod staging;
pub mod types;

pub use audit::{AuditLogger, AuditRecord, AuditStatus};
pub use error::UploadError;
pub use pipeline::UploadPipeline;
pub use promote::Promoter;
pub use sniff::ContentValidator;
pub use staging::{StagedFile, StagingReceiver, StreamError};
pub use types::{AllowedTypes, ClientIdentity, MediaType, Outcome, StoredFile, UploadAttempt};
