//! Configuration module for socksh
//!
//! A single TOML file holds the sections for every mode: `[server]` for the
//! standalone proxy, `[ssh]` for the SSH tunnel and `[client]` for the
//! client helper.

mod client;
mod server;
mod ssh;

pub use client::ClientConfig;
pub use server::{AuthConfig, ServerConfig};
pub use ssh::{SshAuth, SshConfig};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// SOCKS5 server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// SSH tunnel settings
    #[serde(default)]
    pub ssh: Option<SshConfig>,

    /// Client settings
    #[serde(default)]
    pub client: Option<ClientConfig>,
}

impl Config {
    /// Validate every present section
    pub fn validate(&self) -> Result<()> {
        self.server.validate().map_err(|e| anyhow!("[server] {}", e))?;
        if let Some(ssh) = &self.ssh {
            ssh.validate().map_err(|e| anyhow!("[ssh] {}", e))?;
        }
        if let Some(client) = &self.client {
            client.validate().map_err(|e| anyhow!("[client] {}", e))?;
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config.validate()?;
    Ok(config)
}
