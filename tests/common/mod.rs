//! Test utilities for socksh integration tests
//!
//! Ephemeral listeners, an echo destination, server builders and raw
//! SOCKS5 message bytes.

#![allow(dead_code)]

#[cfg(feature = "ssh")]
pub mod ssh_server;

use socksh::config::{AuthConfig, ServerConfig};
use socksh::socks::Server;
use socksh::transport::Dialer;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Spawn a TCP echo server and return its address
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    tokio::spawn(async move {
        while let Ok((mut conn, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = conn.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    addr
}

/// An address nothing listens on
pub async fn closed_addr() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr
}

/// Test server configuration builder
#[derive(Default)]
pub struct TestServerBuilder {
    users: Option<HashMap<String, String>>,
    allow_no_auth: bool,
    reply_before_dial: bool,
}

impl TestServerBuilder {
    /// Create a new builder (no authentication)
    pub fn new() -> Self {
        Self::default()
    }

    /// Require username/password for `user`
    pub fn user(mut self, username: &str, password: &str) -> Self {
        self.users
            .get_or_insert_with(HashMap::new)
            .insert(username.to_string(), password.to_string());
        self
    }

    /// Also accept clients without credentials
    pub fn allow_no_auth(mut self) -> Self {
        self.allow_no_auth = true;
        self
    }

    /// Reply before dialing
    pub fn reply_before_dial(mut self) -> Self {
        self.reply_before_dial = true;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ServerConfig {
        let mut auth = Vec::new();
        if let Some(users) = self.users {
            auth.push(AuthConfig::Password { users });
        }
        if self.allow_no_auth {
            auth.push(AuthConfig::None);
        }
        ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            auth,
            reply_before_dial: self.reply_before_dial,
            ..Default::default()
        }
    }

    /// Build and start a server with the direct dialer
    pub async fn start(self) -> (Server, SocketAddr) {
        let config = self.build();
        let mut server = Server::new(&config, Dialer::default());
        let addr = server.start(&config.listen_addr).await.unwrap();
        (server, addr)
    }
}

/// Raw SOCKS5 handshake bytes
pub mod socks5_mock {
    use socksh::socks::consts::*;

    /// Create a no-auth method selection request
    pub fn create_auth_request_no_auth() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    /// Create a username/password sub-negotiation request
    pub fn create_user_pass(username: &str, password: &str) -> Vec<u8> {
        let mut request = vec![SOCKS5_AUTH_VERSION, username.len() as u8];
        request.extend_from_slice(username.as_bytes());
        request.push(password.len() as u8);
        request.extend_from_slice(password.as_bytes());
        request
    }

    /// Create a connect command to IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut cmd = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV4,
        ];
        cmd.extend_from_slice(&ip);
        cmd.extend_from_slice(&port.to_be_bytes());
        cmd
    }
}
