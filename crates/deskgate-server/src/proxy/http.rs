//! HTTP forwarding for the API namespace.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::ServerError;
use crate::state::AppState;

use super::{apply_cors, skip_request_header, skip_response_header};

/// Forward an API request to the backend origin.
///
/// Preflight `OPTIONS` requests are answered directly without contacting
/// the backend. Everything else forwards with method, headers, and body
/// preserved; the response streams back with the permissive cross-origin
/// set applied. An unreachable backend answers 502 on this request alone.
pub(crate) async fn forward_api(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
) -> Response {
    if req.method() == Method::OPTIONS {
        return preflight_response();
    }

    match forward(&state, req).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "API forwarding failed");
            let mut response = err.into_response();
            apply_cors(response.headers_mut());
            response
        }
    }
}

/// Forward a single request and stream the backend response.
async fn forward(state: &AppState, req: Request<Body>) -> Result<Response, ServerError> {
    let (parts, body) = req.into_parts();

    let path = state.rewritten_path(parts.uri.path());
    let query = parts
        .uri
        .query()
        .map(|q| format!("?{q}"))
        .unwrap_or_default();
    let target = format!("{}{path}{query}", state.backend_http_origin);
    tracing::debug!(method = %parts.method, target = %target, "Forwarding API request");

    let mut upstream = state.client.request(parts.method, target);
    for (name, value) in &parts.headers {
        if skip_request_header(name.as_str()) {
            continue;
        }
        upstream = upstream.header(name, value.clone());
    }

    let body = axum::body::to_bytes(body, usize::MAX).await?;
    if !body.is_empty() {
        upstream = upstream.body(body);
    }

    let backend_response = upstream.send().await?;

    let mut response = Response::builder().status(backend_response.status());
    for (name, value) in backend_response.headers() {
        if skip_response_header(name.as_str()) {
            continue;
        }
        response = response.header(name, value.clone());
    }

    let mut response = response.body(Body::from_stream(backend_response.bytes_stream()))?;
    apply_cors(response.headers_mut());
    Ok(response)
}

/// Answer a CORS preflight without a backend round trip.
fn preflight_response() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    apply_cors(response.headers_mut());
    response
}
