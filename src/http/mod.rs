//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (request ID, span)
//!     → server.rs (Axum setup, upload handler)
//!     → [security + upload pipeline]
//!     → response.rs (redirect back to the form)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, FILE_FIELD};
