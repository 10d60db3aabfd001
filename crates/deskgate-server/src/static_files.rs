//! Static file serving.
//!
//! Serves the built SPA bundle from disk. Anything that is not an asset on
//! disk gets the injected entry document with a 200 status; the SPA's own
//! router owns not-found presentation, so this layer never answers 404.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;

use crate::state::AppState;

/// Create router for static file serving with the SPA fallback.
pub(crate) fn static_router() -> Router<Arc<AppState>> {
    Router::new().fallback(serve_asset)
}

/// Serve a static asset or fall back to the entry document.
async fn serve_asset(State(state): State<Arc<AppState>>, req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');

    // The root and direct entry requests always get the injected document,
    // never the raw template from disk
    if path.is_empty() || path == state.entry_file {
        return entry_response(&state);
    }

    if let Some(file_path) = resolve_asset_path(&state.asset_root, path).await {
        if let Ok(content) = tokio::fs::read(&file_path).await {
            return Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type_for(&file_path))
                .body(Body::from(content))
                .unwrap();
        }
    }

    entry_response(&state)
}

/// Entry document response with the runtime config injected.
///
/// Served uncached so a gateway restart with new URLs reaches clients on
/// their next load.
fn entry_response(state: &AppState) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(state.entry_html.clone()))
        .unwrap()
}

/// Resolve a request path to a file inside the asset root.
///
/// The joined path is canonicalized and must stay under the root; paths
/// that escape it resolve to `None` and take the SPA fallback.
async fn resolve_asset_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let canonical = tokio::fs::canonicalize(root.join(request_path)).await.ok()?;
    canonical.starts_with(root).then_some(canonical)
}

/// Content type for an asset path.
fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn guesses_common_asset_types() {
        assert_eq!(content_type_for(Path::new("app.css")), "text/css");
        assert_eq!(content_type_for(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(
            content_type_for(Path::new("chunk.bin")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn resolves_files_inside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("static")).unwrap();
        std::fs::write(root.join("static/app.js"), "app").unwrap();

        let resolved = resolve_asset_path(&root, "static/app.js").await;
        assert_eq!(resolved, Some(root.join("static/app.js")));
    }

    #[tokio::test]
    async fn rejects_paths_that_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = root_with_sibling(dir.path());

        let resolved = resolve_asset_path(&root, "../sibling.txt").await;
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn missing_files_resolve_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        let resolved = resolve_asset_path(&root, "no-such-file.js").await;
        assert_eq!(resolved, None);
    }

    /// Creates `<dir>/root` plus a sibling file the root must not reach.
    fn root_with_sibling(dir: &Path) -> PathBuf {
        let root = dir.join("root");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(dir.join("sibling.txt"), "secret").unwrap();
        root.canonicalize().unwrap()
    }
}
