//! Client configuration at `~/.mockcb/config.toml`.
//!
//! Provides the default server endpoint, context path, and TLS setting.
//! CLI flags always override config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Mock server connection settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Mock server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Context path the server is mounted under (empty = root).
    #[serde(default)]
    pub context_path: String,

    /// Connect over TLS (server certificates are not verified).
    #[serde(default)]
    pub secure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            context_path: String::new(),
            secure: false,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1080
}

impl ServerConfig {
    /// `host:port` endpoint for the callback client.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Default config location (`~/.mockcb/config.toml`).
    pub fn default_path() -> String {
        let home = dirs::home_dir().unwrap_or_default();
        home.join(".mockcb")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }

    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &str) -> Result<Self> {
        let path = Path::new(path);
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

/// Parse a forward target `host[:port]` into the `Host` header value.
pub fn parse_target(target: &str) -> Result<String> {
    let target = target.trim();
    let (host, port) = match target.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (target, None),
    };
    if host.is_empty() {
        anyhow::bail!("empty host in target '{target}'");
    }
    match port {
        Some(port) => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("invalid port in target '{target}'"))?;
            Ok(format!("{host}:{port}"))
        }
        None => Ok(host.to_string()),
    }
}
