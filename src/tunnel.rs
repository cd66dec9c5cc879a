//! SSH tunnel manager
//!
//! Pairs an [`SshDialer`] with an embedded no-auth SOCKS5 [`Server`], so
//! local applications get a SOCKS5 port whose connections leave from the
//! SSH server.

use crate::config::{ServerConfig, SshConfig};
use crate::error::SockshError;
use crate::socks::Server;
use crate::transport::{Dialer, SshDialer};
use std::net::SocketAddr;
use tracing::info;

/// SOCKS5 server whose outbound connections run over SSH
#[derive(Debug)]
pub struct SshTunnel {
    config: SshConfig,
    dialer: SshDialer,
    server: Server,
}

impl SshTunnel {
    /// Log in to the SSH server
    ///
    /// Errors from the first connection attempt are returned here; later
    /// session losses are handled by reconnecting in the background.
    pub async fn connect(config: SshConfig) -> Result<Self, SockshError> {
        let dialer = SshDialer::connect(config.clone()).await?;
        let server = Server::new(&ServerConfig::default(), Dialer::Ssh(dialer.clone()));
        Ok(SshTunnel {
            config,
            dialer,
            server,
        })
    }

    /// Start the embedded SOCKS5 server on `bind_host:port`
    pub async fn start(&mut self, port: u16) -> Result<SocketAddr, SockshError> {
        let addr = format_listen_addr(&self.config.bind_host, port);
        let local_addr = self.server.start(&addr).await?;
        info!(
            "SSH tunnel via {} serving SOCKS5 on {}",
            self.config.addr, local_addr
        );
        Ok(local_addr)
    }

    /// Whether the SSH session is currently up
    pub async fn is_connected(&self) -> bool {
        self.dialer.is_connected().await
    }

    /// Address of the embedded SOCKS5 server, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    /// Stop the embedded server, stop reconnecting and close the session
    ///
    /// Both steps always run; their errors are reported together.
    pub async fn close(mut self) -> Result<(), SockshError> {
        let mut errors = Vec::new();
        if let Err(e) = self.server.stop().await {
            errors.push(e);
        }
        if let Err(e) = self.dialer.close().await {
            errors.push(e);
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(SockshError::Shutdown(errors)),
        }
    }
}

/// `host:port`, bracketing bare IPv6 hosts
fn format_listen_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
