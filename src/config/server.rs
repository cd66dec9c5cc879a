//! SOCKS5 server configuration
//!
//! Defines the listener, authenticator list, buffer pool sizing and socket
//! options of the proxy server.

use crate::socks::consts::{MAX_FIELD_LEN, RELAY_BUFFER_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default listen address
fn default_listen_addr() -> String {
    "127.0.0.1:1080".to_string()
}

/// Default relay buffer size in bytes
fn default_buffer_size() -> usize {
    RELAY_BUFFER_SIZE
}

/// Default number of idle buffers kept by the pool
fn default_max_idle_buffers() -> usize {
    64
}

/// Default keepalive of accepted connections in seconds
fn default_keepalive_secs() -> u64 {
    180
}

/// Default connect timeout of the direct dialer in seconds
fn default_connect_timeout_secs() -> u64 {
    5
}

/// Default keepalive of dialed connections in seconds
fn default_dial_keepalive_secs() -> u64 {
    15
}

/// One entry of the ordered authenticator list
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum AuthConfig {
    /// No authentication (method 0x00)
    None,
    /// Username/password (method 0x02)
    Password {
        /// `username -> password`
        #[serde(default)]
        users: HashMap<String, String>,
    },
}

/// SOCKS5 server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:1080")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Authenticators in selection order; empty means no authentication
    #[serde(default)]
    pub auth: Vec<AuthConfig>,

    /// Send the "succeeded" reply before dialing the destination
    #[serde(default)]
    pub reply_before_dial: bool,

    /// Size of each relay buffer in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Maximum number of idle buffers kept for reuse
    #[serde(default = "default_max_idle_buffers")]
    pub max_idle_buffers: usize,

    /// TCP keepalive of accepted client connections in seconds
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    /// Connect timeout of the direct dialer in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// TCP keepalive of directly dialed connections in seconds
    #[serde(default = "default_dial_keepalive_secs")]
    pub dial_keepalive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: default_listen_addr(),
            auth: Vec::new(),
            reply_before_dial: false,
            buffer_size: default_buffer_size(),
            max_idle_buffers: default_max_idle_buffers(),
            keepalive_secs: default_keepalive_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            dial_keepalive_secs: default_dial_keepalive_secs(),
        }
    }
}

impl ServerConfig {
    /// Server accepting only the given users
    pub fn with_users(users: HashMap<String, String>) -> Self {
        ServerConfig {
            auth: vec![AuthConfig::Password { users }],
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_size == 0 {
            return Err("buffer_size must be greater than 0".to_string());
        }
        for auth in &self.auth {
            if let AuthConfig::Password { users } = auth {
                if users.is_empty() {
                    return Err("password authentication configured without users".to_string());
                }
                for (user, pass) in users {
                    if user.len() > MAX_FIELD_LEN || pass.len() > MAX_FIELD_LEN {
                        return Err(format!(
                            "credentials of user '{}' exceed {} bytes",
                            user, MAX_FIELD_LEN
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:1080");
        assert!(config.auth.is_empty());
        assert!(!config.reply_before_dial);
        assert_eq!(config.buffer_size, 32 * 1024);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.dial_keepalive_secs, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_config_validate_empty_users() {
        let config = ServerConfig::with_users(HashMap::new());
        assert!(config.validate().unwrap_err().contains("without users"));
    }

    #[test]
    fn test_server_config_validate_long_credentials() {
        let users = HashMap::from([("u".to_string(), "p".repeat(256))]);
        let config = ServerConfig::with_users(users);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_config_validate_zero_buffer() {
        let config = ServerConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
