//! Client identity and security response headers.
//!
//! # Responsibilities
//! - Derive the identity a request is rate limited and audited under
//! - Add security response headers
//!
//! # Design Decisions
//! - The peer address is the identity by default
//! - Never trust existing X-Forwarded-For unless configured to (trusted proxy in front)

use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::upload::types::ClientIdentity;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Identity of the client behind a request.
///
/// With `trust_forwarded_for`, the left-most valid `X-Forwarded-For` address
/// wins; otherwise, or when the header is absent or invalid, the peer IP.
pub fn client_identity(peer: SocketAddr, headers: &HeaderMap, trust_forwarded_for: bool) -> ClientIdentity {
    if trust_forwarded_for {
        let forwarded = headers
            .get(&X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ClientIdentity::new(ip.to_string());
        }
    }
    ClientIdentity::new(peer.ip().to_string())
}

/// `X-Content-Type-Options: nosniff` on every response.
pub fn nosniff_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"))
}
