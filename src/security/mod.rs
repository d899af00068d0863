//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming upload:
//!     → headers.rs (derive client identity)
//!     → rate_limit.rs (check per-client quota)
//!     → Pass to upload pipeline
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input
//! - Limiter state is injected, never a process-wide singleton

pub mod headers;
pub mod rate_limit;

pub use headers::client_identity;
pub use rate_limit::{Admission, RateLimiter, SlidingWindowLimiter, UnlimitedLimiter};
