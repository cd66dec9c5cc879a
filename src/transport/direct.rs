//! Direct TCP dialer
//!
//! Connects from this host with a bounded connect time and keepalive on the
//! resulting socket. Domain names are resolved here.

use super::SocketOpts;
use crate::config::ServerConfig;
use crate::error::SockshError;
use crate::socks::consts::{DIAL_KEEPALIVE, DIAL_TIMEOUT};
use crate::socks::TargetAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Dialer opening plain TCP connections
#[derive(Debug, Clone)]
pub struct DirectDialer {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Connection timeout
    connect_timeout: Duration,
}

impl Default for DirectDialer {
    fn default() -> Self {
        DirectDialer {
            socket_opts: SocketOpts::for_dialed(DIAL_KEEPALIVE),
            connect_timeout: DIAL_TIMEOUT,
        }
    }
}

impl DirectDialer {
    /// Create a dialer from the server's timeout and keepalive settings
    pub fn from_config(config: &ServerConfig) -> Self {
        DirectDialer {
            socket_opts: SocketOpts::for_dialed(Duration::from_secs(config.dial_keepalive_secs)),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    /// Connect to `target`
    pub async fn dial(&self, target: &TargetAddr) -> Result<TcpStream, SockshError> {
        let connect = async {
            match target {
                TargetAddr::Ip(addr) => TcpStream::connect(addr).await,
                TargetAddr::Domain(host, port) => TcpStream::connect((host.as_str(), *port)).await,
            }
        };

        let stream = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| SockshError::Timeout(format!("connect to {}", target)))??;

        self.socket_opts.hint(&stream);

        debug!("TCP connection established to {}", target);

        Ok(stream)
    }
}
