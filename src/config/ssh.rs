//! SSH tunnel configuration
//!
//! Where to reach the SSH server, how to log in, and where the embedded
//! SOCKS5 listener goes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default local port of the embedded SOCKS5 server
fn default_port() -> u16 {
    1080
}

/// Default local bind host of the embedded SOCKS5 server
fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

/// Default wait before reconnecting a lost SSH session, in seconds
fn default_reconnect_backoff_secs() -> u64 {
    10
}

/// Default limit on connecting and logging in, in seconds
fn default_connect_timeout_secs() -> u64 {
    15
}

/// Default limit on opening one forwarded channel, in seconds
fn default_dial_timeout_secs() -> u64 {
    5
}

/// How to authenticate against the SSH server
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SshAuth {
    /// Password login
    Password {
        /// The password
        password: String,
    },
    /// Private key read from a file (OpenSSH or PEM format)
    KeyFile {
        /// Path to the key file
        path: PathBuf,
    },
    /// Private key material given inline
    Key {
        /// The key text
        key: String,
    },
}

impl fmt::Debug for SshAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshAuth::Password { .. } => f.write_str("Password(<redacted>)"),
            SshAuth::KeyFile { path } => f.debug_tuple("KeyFile").field(path).finish(),
            SshAuth::Key { .. } => f.write_str("Key(<redacted>)"),
        }
    }
}

/// SSH tunnel configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SshConfig {
    /// SSH server address (e.g., "bastion.example.com:22")
    pub addr: String,

    /// Login user
    pub user: String,

    /// Login method
    pub auth: SshAuth,

    /// Local port of the embedded SOCKS5 server
    #[serde(default = "default_port")]
    pub port: u16,

    /// Local host the embedded SOCKS5 server binds to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Wait before each reconnect attempt, in seconds
    #[serde(default = "default_reconnect_backoff_secs")]
    pub reconnect_backoff_secs: u64,

    /// Limit on connecting and logging in, for the first session and each
    /// reconnect, in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Limit on opening one `direct-tcpip` channel, in seconds
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,

    /// Expected SHA-256 host key fingerprint ("SHA256:..."); any key is
    /// accepted when unset
    #[serde(default)]
    pub host_key_fingerprint: Option<String>,
}

impl SshConfig {
    /// Config with defaults for everything but the server and login
    pub fn new(addr: impl Into<String>, user: impl Into<String>, auth: SshAuth) -> Self {
        SshConfig {
            addr: addr.into(),
            user: user.into(),
            auth,
            port: default_port(),
            bind_host: default_bind_host(),
            reconnect_backoff_secs: default_reconnect_backoff_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            dial_timeout_secs: default_dial_timeout_secs(),
            host_key_fingerprint: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.addr.is_empty() {
            return Err("ssh.addr must not be empty".to_string());
        }
        if self.user.is_empty() {
            return Err("ssh.user must not be empty".to_string());
        }
        if self.connect_timeout_secs == 0 || self.dial_timeout_secs == 0 {
            return Err("ssh timeouts must be greater than 0".to_string());
        }
        Ok(())
    }
}
