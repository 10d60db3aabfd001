//! `deskgate serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use deskgate_config::{CliSettings, Config, InjectTarget, websocket_origin};
use deskgate_net::{NetworkAddress, resolve_local_address};
use deskgate_server::{RuntimeConfig, run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover deskgate.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long, env = "DESKGATE_PORT")]
    port: Option<u16>,

    /// Directory holding the built SPA assets (overrides config).
    #[arg(short, long)]
    asset_root: Option<PathBuf>,

    /// Backend origin to proxy to (overrides config).
    #[arg(short, long, env = "DESKGATE_BACKEND_ORIGIN")]
    backend_origin: Option<String>,

    /// Where injected URLs point: "gateway" or "backend" (overrides config).
    #[arg(long)]
    inject_target: Option<String>,

    /// Enable verbose output (show request and proxy logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        // Parse the injection target before moving into CliSettings
        let inject_target = self
            .inject_target
            .as_deref()
            .map(str::parse::<InjectTarget>)
            .transpose()?;

        // Build CLI settings from args
        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            asset_root: self.asset_root,
            backend_origin: self.backend_origin,
            inject_target,
        };

        // Load config
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        // The LAN address is resolved once at startup; every client of this
        // process observes the same injected URLs
        let address = resolve_local_address();
        let runtime = runtime_config(&config, &address);

        // Print startup info
        output.highlight(&format!("Deskgate v{version}"));
        output.info(&format!(
            "Listening on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!("Local:   http://localhost:{}", config.server.port));
        if address.is_fallback() {
            output.warning("Network: no LAN address found, other devices cannot connect");
        } else {
            output.info(&format!(
                "Network: {} ({})",
                address.http_origin(config.server.port),
                address.interface
            ));
        }
        output.info(&format!("Backend: {}", config.backend.origin));
        output.info(&format!(
            "Assets:  {}",
            config.assets_resolved.root.display()
        ));
        output.info(&format!("API URL: {}", runtime.api_url));
        output.info(&format!("WS URL:  {}", runtime.ws_url));

        // Build server config and run
        let server_config = server_config_from_config(&config, runtime);
        run_server(server_config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Compute the URLs injected into the entry document.
///
/// With the gateway target, clients talk back to this process at its LAN
/// origin and the gateway forwards for them. With the backend target,
/// clients talk to the backend origin directly.
fn runtime_config(config: &Config, address: &NetworkAddress) -> RuntimeConfig {
    let base = match config.inject.target {
        InjectTarget::Gateway => address.http_origin(config.server.port),
        InjectTarget::Backend => config.backend.origin.clone(),
    };

    RuntimeConfig {
        api_url: format!("{base}/api"),
        ws_url: format!("{}/ws", websocket_origin(&base)),
    }
}
