//! Reverse proxying to the backend origin.
//!
//! `/api/*` requests forward as plain HTTP and `/ws/*` requests upgrade and
//! splice to an equivalent backend WebSocket. A failure on either leg is
//! answered on the request that caused it and never affects the listener or
//! other connections.

pub(crate) mod http;
pub(crate) mod ws;

use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};

/// Connect timeout for both backend legs.
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total timeout for a forwarded HTTP request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Request headers that are not forwarded to the backend.
///
/// Hop-by-hop headers belong to the client connection; the backend leg gets
/// its own. Content-Length is recomputed from the buffered body.
const SKIP_REQUEST_HEADERS: &[&str] = &[
    "host",
    "connection",
    "upgrade",
    "keep-alive",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "content-length",
];

/// Response headers the gateway recomputes rather than copies.
const SKIP_RESPONSE_HEADERS: &[&str] = &["connection", "transfer-encoding", "content-length"];

/// Whether a request header stays on the client connection.
pub(crate) fn skip_request_header(name: &str) -> bool {
    SKIP_REQUEST_HEADERS.contains(&name)
}

/// Whether a response header is recomputed by the gateway.
pub(crate) fn skip_response_header(name: &str) -> bool {
    SKIP_RESPONSE_HEADERS.contains(&name)
}

/// Apply the permissive cross-origin header set.
///
/// Overrides any values the backend supplied, so clients observe one CORS
/// policy regardless of what the backend sends.
pub(crate) fn apply_cors(headers: &mut HeaderMap) {
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PATCH,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("*"),
    );
    headers.insert(
        "Access-Control-Expose-Headers",
        HeaderValue::from_static("*"),
    );
}
