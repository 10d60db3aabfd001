//! `deskgate address` command implementation.

use std::path::PathBuf;

use clap::Args;
use deskgate_config::{CliSettings, Config};
use deskgate_net::resolve_local_address;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the address command.
#[derive(Args)]
pub(crate) struct AddressArgs {
    /// Path to configuration file (default: auto-discover deskgate.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port used for the printed URLs (overrides config).
    #[arg(short, long)]
    port: Option<u16>,
}

impl AddressArgs {
    /// Execute the address command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            port: self.port,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let address = resolve_local_address();
        if address.is_fallback() {
            output.warning("No LAN-reachable IPv4 address found");
        } else {
            output.info(&format!("Address:   {}", address.address));
            output.info(&format!("Interface: {}", address.interface));
        }

        output.info(&format!(
            "Local:     http://localhost:{}",
            config.server.port
        ));
        if !address.is_fallback() {
            output.info(&format!(
                "Network:   {}",
                address.http_origin(config.server.port)
            ));
        }

        Ok(())
    }
}
