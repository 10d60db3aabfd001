//! Router construction.
//!
//! Builds the axum router with the proxy namespaces, static serving, and
//! middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{any, get};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::security;
use crate::proxy;
use crate::state::{AppState, RouteKind};
use crate::static_files;

/// Create the application router.
///
/// Proxy namespaces are registered from the state's route table; everything
/// else falls through to static serving with the SPA fallback.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();

    for route in &state.routes {
        let wildcard = format!("{}/{{*rest}}", route.prefix);
        router = match route.kind {
            RouteKind::Http => router
                .route(&route.prefix, any(proxy::http::forward_api))
                .route(&wildcard, any(proxy::http::forward_api)),
            RouteKind::WebSocket => router
                .route(&route.prefix, get(proxy::ws::forward_ws))
                .route(&wildcard, get(proxy::ws::forward_ws)),
        };
    }

    router
        .merge(static_files::static_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(security::content_type_options_layer()),
        )
        .with_state(state)
}
