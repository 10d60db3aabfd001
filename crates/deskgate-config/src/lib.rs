//! Configuration management for Deskgate.
//!
//! Parses `deskgate.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `assets.root`
//! - `assets.entry`
//! - `backend.origin`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override asset root directory.
    pub asset_root: Option<PathBuf>,
    /// Override backend origin.
    pub backend_origin: Option<String>,
    /// Override injection target.
    pub inject_target: Option<InjectTarget>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "deskgate.toml";

/// Backend origin used when none is configured.
const DEFAULT_BACKEND_ORIGIN: &str = "http://127.0.0.1:8080";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Asset configuration (paths are relative strings from TOML).
    #[serde(default)]
    assets: AssetsConfigRaw,
    /// Backend origin configuration.
    pub backend: BackendConfig,
    /// Runtime config injection settings.
    pub inject: InjectConfig,

    /// Resolved asset configuration (set after loading).
    #[serde(skip)]
    pub assets_resolved: AssetsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
        }
    }
}

/// Raw asset configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct AssetsConfigRaw {
    root: Option<String>,
    entry: Option<String>,
}

/// Resolved asset configuration with absolute paths.
#[derive(Debug, Default, Clone)]
pub struct AssetsConfig {
    /// Directory containing the built SPA bundle.
    pub root: PathBuf,
    /// Entry document file name within the root.
    pub entry: String,
}

/// Backend origin configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Origin (scheme, host, port) of the upstream API/WebSocket server.
    pub origin: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_BACKEND_ORIGIN.to_owned(),
        }
    }
}

/// Runtime config injection settings.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct InjectConfig {
    /// Which origin the injected URLs point at.
    pub target: InjectTarget,
}

/// Which origin the injected URLs point at.
///
/// `Gateway` advertises the gateway's own LAN address and port, so SPA
/// traffic flows through the proxied `/api` and `/ws` namespaces. `Backend`
/// advertises the configured backend origin directly.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InjectTarget {
    /// Point the SPA at the gateway itself (default).
    #[default]
    Gateway,
    /// Point the SPA straight at the backend origin.
    Backend,
}

impl std::str::FromStr for InjectTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gateway" => Ok(Self::Gateway),
            "backend" => Ok(Self::Backend),
            other => Err(ConfigError::Validation(format!(
                "inject.target must be \"gateway\" or \"backend\", got \"{other}\""
            ))),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`backend.origin`").
        field: String,
        /// Error message (e.g., "${`DESKGATE_BACKEND`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Map an HTTP origin to its WebSocket counterpart.
///
/// `https://` becomes `wss://` and `http://` becomes `ws://`. Anything else
/// passes through unchanged.
#[must_use]
pub fn websocket_origin(origin: &str) -> String {
    if let Some(rest) = origin.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = origin.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        origin.to_owned()
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `deskgate.toml` in current directory and
    /// parents, falling back to defaults when nothing is found.
    ///
    /// CLI settings are applied after loading and path resolution, allowing
    /// CLI arguments to take precedence over config file values. Validation
    /// runs last so it covers CLI-supplied values too.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.normalize();
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(asset_root) = &settings.asset_root {
            self.assets_resolved.root.clone_from(asset_root);
        }
        if let Some(backend_origin) = &settings.backend_origin {
            self.backend.origin.clone_from(backend_origin);
        }
        if let Some(inject_target) = settings.inject_target {
            self.inject.target = inject_target;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            assets: AssetsConfigRaw::default(),
            backend: BackendConfig::default(),
            inject: InjectConfig::default(),
            assets_resolved: AssetsConfig {
                root: base.join("dist"),
                entry: "index.html".to_owned(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Strip trailing slashes from the backend origin so forwarded paths
    /// join cleanly.
    fn normalize(&mut self) {
        let trimmed = self.backend.origin.trim_end_matches('/');
        if trimmed.len() != self.backend.origin.len() {
            self.backend.origin = trimmed.to_owned();
        }
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are properly set and contain valid
    /// values. Called automatically at the end of [`Config::load`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_backend()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 is technically valid (OS assigns a random port), but it's
        // unlikely to be intentional in a config file
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate backend configuration.
    fn validate_backend(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.backend.origin, "backend.origin")?;
        require_http_url(&self.backend.origin, "backend.origin")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.backend.origin = expand::expand_env(&self.backend.origin, "backend.origin")?;

        if let Some(ref root) = self.assets.root {
            self.assets.root = Some(expand::expand_env(root, "assets.root")?);
        }
        if let Some(ref entry) = self.assets.entry {
            self.assets.entry = Some(expand::expand_env(entry, "assets.entry")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.assets_resolved = AssetsConfig {
            root: config_dir.join(self.assets.root.as_deref().unwrap_or("dist")),
            entry: self
                .assets
                .entry
                .clone()
                .unwrap_or_else(|| "index.html".to_owned()),
        };
    }
}
