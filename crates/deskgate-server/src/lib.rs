//! Edge gateway for the Deskgate single-page application.
//!
//! Serves the built SPA bundle, injects the runtime configuration into the
//! entry document, and reverse-proxies `/api/*` HTTP requests and `/ws/*`
//! WebSocket upgrades to the configured backend origin.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use deskgate_server::{RuntimeConfig, ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "0.0.0.0".to_string(),
//!         port: 3000,
//!         asset_root: PathBuf::from("dist"),
//!         entry_file: "index.html".to_string(),
//!         backend_origin: "http://127.0.0.1:8080".to_string(),
//!         runtime: RuntimeConfig {
//!             api_url: "http://192.168.1.7:3000/api".to_string(),
//!             ws_url: "ws://192.168.1.7:3000/ws".to_string(),
//!         },
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Request Flow
//!
//! ```text
//! Browser ──HTTP──► deskgate-server (axum)
//!                        │
//!                        ├─► /api/*  ──► backend origin (reqwest)
//!                        ├─► /ws/*   ──► backend origin (tokio-tungstenite)
//!                        └─► static assets + injected entry document
//! ```

mod app;
mod error;
mod inject;
mod middleware;
mod proxy;
mod state;
mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

pub use error::ServerError;
pub use inject::{RuntimeConfig, inject_runtime_config};

use state::{AppState, ProxyRoute, RouteKind};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory containing the built SPA assets.
    pub asset_root: PathBuf,
    /// Entry document file name within the asset root.
    pub entry_file: String,
    /// Backend origin proxied requests are forwarded to.
    pub backend_origin: String,
    /// Values injected into the entry document.
    pub runtime: RuntimeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
            asset_root: PathBuf::from("dist"),
            entry_file: "index.html".to_owned(),
            backend_origin: "http://127.0.0.1:8080".to_owned(),
            runtime: RuntimeConfig {
                api_url: "http://localhost:3000/api".to_owned(),
                ws_url: "ws://localhost:3000/ws".to_owned(),
            },
        }
    }
}

/// Create server configuration from Deskgate config.
///
/// # Arguments
///
/// * `config` - Deskgate configuration
/// * `runtime` - Values injected into the entry document
#[must_use]
pub fn server_config_from_config(
    config: &deskgate_config::Config,
    runtime: RuntimeConfig,
) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        asset_root: config.assets_resolved.root.clone(),
        entry_file: config.assets_resolved.entry.clone(),
        backend_origin: config.backend.origin.clone(),
        runtime,
    }
}

/// Run the gateway.
///
/// Validates the asset root and entry document, injects the runtime config,
/// then serves until shutdown.
///
/// # Errors
///
/// Returns an error when startup validation fails (missing asset root,
/// missing entry document, entry document without a head tag) or the
/// listener cannot bind.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(build_state(&config).await?);
    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, backend = %config.backend_origin, "Starting gateway");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Validate startup artifacts and assemble the shared state.
pub(crate) async fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    let asset_root = tokio::fs::canonicalize(&config.asset_root)
        .await
        .map_err(|_| ServerError::AssetRootMissing(config.asset_root.clone()))?;
    if !tokio::fs::metadata(&asset_root).await?.is_dir() {
        return Err(ServerError::AssetRootMissing(config.asset_root.clone()));
    }

    let entry_path = asset_root.join(&config.entry_file);
    let template = tokio::fs::read_to_string(&entry_path)
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ServerError::EntryMissing(entry_path.clone()),
            _ => ServerError::Io(err),
        })?;
    let entry_html = inject::inject_runtime_config(&template, &config.runtime)?;

    let client = reqwest::Client::builder()
        .connect_timeout(proxy::CONNECT_TIMEOUT)
        .timeout(proxy::REQUEST_TIMEOUT)
        .build()?;

    Ok(AppState {
        entry_html,
        asset_root,
        entry_file: config.entry_file.clone(),
        backend_http_origin: config.backend_origin.clone(),
        backend_ws_origin: deskgate_config::websocket_origin(&config.backend_origin),
        routes: vec![
            ProxyRoute::new("/api", RouteKind::Http),
            ProxyRoute::new("/ws", RouteKind::WebSocket),
        ],
        client,
    })
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping gateway...");
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn config_for(dir: &tempfile::TempDir) -> ServerConfig {
        ServerConfig {
            asset_root: dir.path().to_path_buf(),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn build_state_rejects_a_missing_asset_root() {
        let config = ServerConfig {
            asset_root: PathBuf::from("/no/such/dir"),
            ..ServerConfig::default()
        };

        let err = build_state(&config).await.unwrap_err();
        assert!(matches!(err, ServerError::AssetRootMissing(_)));
    }

    #[tokio::test]
    async fn build_state_rejects_a_missing_entry_document() {
        let dir = tempfile::tempdir().unwrap();

        let err = build_state(&config_for(&dir)).await.unwrap_err();
        assert!(matches!(err, ServerError::EntryMissing(_)));
    }

    #[tokio::test]
    async fn build_state_rejects_an_entry_without_a_head_tag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><body></body></html>").unwrap();

        let err = build_state(&config_for(&dir)).await.unwrap_err();
        assert!(matches!(err, ServerError::HeadMarkerMissing));
    }

    #[tokio::test]
    async fn build_state_prepares_the_injected_entry_and_ws_origin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            "<html><head></head><body>App</body></html>",
        )
        .unwrap();

        let config = ServerConfig {
            backend_origin: "https://backend.internal".to_owned(),
            ..config_for(&dir)
        };
        let state = build_state(&config).await.unwrap();

        assert!(state.entry_html.contains("window.apiUrl"));
        assert_eq!(state.backend_ws_origin, "wss://backend.internal");
        assert_eq!(state.routes.len(), 2);
    }
}
