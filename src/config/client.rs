//! SOCKS5 client configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default connect timeout towards the proxy in seconds
fn default_connect_timeout_secs() -> u64 {
    5
}

/// SOCKS5 client configuration
#[derive(Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    /// Proxy server address (e.g., "127.0.0.1:1080")
    pub proxy_addr: String,

    /// Username for RFC 1929 authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for RFC 1929 authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Timeout for reaching the proxy, in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl ClientConfig {
    /// Client for a proxy without authentication
    pub fn new(proxy_addr: impl Into<String>) -> Self {
        ClientConfig {
            proxy_addr: proxy_addr.into(),
            username: None,
            password: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    /// Attach credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Both username and password, if configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            (Some(u), None) => Some((u.as_str(), "")),
            _ => None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.proxy_addr.is_empty() {
            return Err("client.proxy_addr must not be empty".to_string());
        }
        if self.password.is_some() && self.username.is_none() {
            return Err("client.password set without client.username".to_string());
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("proxy_addr", &self.proxy_addr)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_credentials() {
        let config = ClientConfig::new("127.0.0.1:1080");
        assert!(config.credentials().is_none());
        assert_eq!(config.connect_timeout_secs, 5);

        let config = config.with_credentials("alice", "secret");
        assert_eq!(config.credentials(), Some(("alice", "secret")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_validate() {
        let mut config = ClientConfig::new("127.0.0.1:1080");
        config.password = Some("pw".to_string());
        assert!(config.validate().is_err());
        assert!(ClientConfig::new("").validate().is_err());
    }

    #[test]
    fn test_client_config_debug_redacts_password() {
        let config = ClientConfig::new("proxy:1080").with_credentials("alice", "secret");
        let debug = format!("{:?}", config);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("secret"));
    }
}
