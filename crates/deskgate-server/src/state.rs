//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;

/// Forwarding protocol for a proxy route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteKind {
    /// Plain HTTP forwarding.
    Http,
    /// WebSocket upgrade splicing.
    WebSocket,
}

/// A path-prefix forwarding rule.
#[derive(Debug, Clone)]
pub(crate) struct ProxyRoute {
    /// Inbound path prefix, e.g. `/api`.
    pub(crate) prefix: String,
    /// Prefix the matched portion is rewritten to on the backend side.
    pub(crate) rewrite_to: String,
    /// How matched requests are forwarded.
    pub(crate) kind: RouteKind,
}

impl ProxyRoute {
    /// Identity route: the prefix is preserved on the backend side.
    pub(crate) fn new(prefix: &str, kind: RouteKind) -> Self {
        Self {
            prefix: prefix.to_owned(),
            rewrite_to: prefix.to_owned(),
            kind,
        }
    }

    /// Whether the rule matches a request path.
    ///
    /// Matches the bare prefix and anything below it, but not unrelated
    /// paths that merely start with the same characters (`/apifoo`).
    pub(crate) fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(&self.prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Rewrite a matched request path for the backend.
    pub(crate) fn rewrite(&self, path: &str) -> String {
        match path.strip_prefix(&self.prefix) {
            Some(rest) => format!("{}{rest}", self.rewrite_to),
            None => path.to_owned(),
        }
    }
}

/// Application state shared across all handlers.
#[derive(Debug)]
pub(crate) struct AppState {
    /// Entry document with the runtime config injected.
    pub(crate) entry_html: String,
    /// Canonicalized directory holding the built SPA assets.
    pub(crate) asset_root: PathBuf,
    /// Entry document file name within the asset root.
    pub(crate) entry_file: String,
    /// Backend origin for HTTP forwarding (`http://` or `https://`).
    pub(crate) backend_http_origin: String,
    /// Backend origin for WebSocket forwarding (`ws://` or `wss://`).
    pub(crate) backend_ws_origin: String,
    /// Registered forwarding rules.
    pub(crate) routes: Vec<ProxyRoute>,
    /// Shared HTTP client for the backend leg.
    pub(crate) client: reqwest::Client,
}

impl AppState {
    /// Find the forwarding rule matching a request path.
    ///
    /// The longest matching prefix wins when rules overlap.
    pub(crate) fn route_for(&self, path: &str) -> Option<&ProxyRoute> {
        self.routes
            .iter()
            .filter(|route| route.matches(path))
            .max_by_key(|route| route.prefix.len())
    }

    /// Backend-side path for a request path.
    ///
    /// Applies the matched rule's rewrite; paths without a matching rule
    /// pass through unchanged.
    pub(crate) fn rewritten_path(&self, path: &str) -> String {
        match self.route_for(path) {
            Some(route) => route.rewrite(path),
            None => path.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn matches_bare_prefix_and_subpaths() {
        let route = ProxyRoute::new("/api", RouteKind::Http);

        assert!(route.matches("/api"));
        assert!(route.matches("/api/tickets/42"));
        assert!(!route.matches("/apifoo"));
        assert!(!route.matches("/assets/api.js"));
    }

    #[test]
    fn identity_rewrite_preserves_the_path() {
        let route = ProxyRoute::new("/api", RouteKind::Http);
        assert_eq!(route.rewrite("/api/tickets/42"), "/api/tickets/42");
    }

    #[test]
    fn rewrite_swaps_the_prefix() {
        let route = ProxyRoute {
            prefix: "/api".to_owned(),
            rewrite_to: "/v2".to_owned(),
            kind: RouteKind::Http,
        };
        assert_eq!(route.rewrite("/api/tickets"), "/v2/tickets");
        assert_eq!(route.rewrite("/api"), "/v2");
    }
}
