//! Transport module for socksh
//!
//! Outbound connections are opened by a [`Dialer`]: either straight from
//! this host ([`DirectDialer`]) or through a forwarded channel of an SSH
//! session ([`SshDialer`]). Both yield a boxed [`UpstreamStream`] the relay
//! can copy bytes through.

mod direct;
#[cfg(feature = "ssh")]
mod ssh;

pub use direct::DirectDialer;
#[cfg(feature = "ssh")]
pub use ssh::SshDialer;

use crate::error::SockshError;
use crate::socks::TargetAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Socket options for configuring connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// Idle time before keepalives start
    pub keepalive: Option<Duration>,
    /// Interval between keepalives
    pub keepalive_interval: Option<Duration>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts::for_accepted(crate::socks::consts::ACCEPT_KEEPALIVE)
    }
}

impl SocketOpts {
    /// Options for connections accepted from SOCKS clients
    pub fn for_accepted(keepalive: Duration) -> Self {
        SocketOpts {
            nodelay: true,
            keepalive: Some(keepalive),
            keepalive_interval: None,
        }
    }

    /// Options for connections opened towards destinations
    pub fn for_dialed(keepalive: Duration) -> Self {
        SocketOpts {
            nodelay: true,
            keepalive: Some(keepalive),
            keepalive_interval: Some(keepalive),
        }
    }

    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let Some(time) = self.keepalive {
            let socket = socket2::SockRef::from(stream);
            let mut keepalive = socket2::TcpKeepalive::new().with_time(time);
            if let Some(interval) = self.keepalive_interval {
                keepalive = keepalive.with_interval(interval);
            }
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }

    /// Apply options, logging instead of failing
    pub fn hint(&self, stream: &TcpStream) {
        if let Err(e) = self.apply(stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }
    }
}

/// Byte stream to a destination, whatever carries it
pub trait UpstreamStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> UpstreamStream for T {}

/// Strategy for opening outbound connections
#[derive(Debug, Clone)]
pub enum Dialer {
    /// Connect from this host
    Direct(DirectDialer),
    /// Open `direct-tcpip` channels over an SSH session
    #[cfg(feature = "ssh")]
    Ssh(SshDialer),
}

impl Dialer {
    /// Open a connection to `target`
    pub async fn dial(&self, target: &TargetAddr) -> Result<Box<dyn UpstreamStream>, SockshError> {
        match self {
            Dialer::Direct(dialer) => Ok(Box::new(dialer.dial(target).await?)),
            #[cfg(feature = "ssh")]
            Dialer::Ssh(dialer) => Ok(Box::new(dialer.dial(target).await?)),
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Dialer::Direct(_) => "direct",
            #[cfg(feature = "ssh")]
            Dialer::Ssh(_) => "ssh",
        }
    }
}

impl Default for Dialer {
    fn default() -> Self {
        Dialer::Direct(DirectDialer::default())
    }
}

impl From<DirectDialer> for Dialer {
    fn from(dialer: DirectDialer) -> Self {
        Dialer::Direct(dialer)
    }
}

#[cfg(feature = "ssh")]
impl From<SshDialer> for Dialer {
    fn from(dialer: SshDialer) -> Self {
        Dialer::Ssh(dialer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_socket_opts_default() {
        let opts = SocketOpts::default();
        assert!(opts.nodelay);
        assert_eq!(opts.keepalive, Some(Duration::from_secs(180)));
        assert_eq!(opts.keepalive_interval, None);
    }

    #[test]
    fn test_socket_opts_for_dialed() {
        let opts = SocketOpts::for_dialed(Duration::from_secs(15));
        assert_eq!(opts.keepalive, Some(Duration::from_secs(15)));
        assert_eq!(opts.keepalive_interval, Some(Duration::from_secs(15)));
    }

    #[tokio::test]
    async fn test_socket_opts_apply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stream, _) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let stream = stream.unwrap();

        SocketOpts::for_dialed(Duration::from_secs(15))
            .apply(&stream)
            .unwrap();
        assert!(stream.nodelay().unwrap());
        assert!(socket2::SockRef::from(&stream).keepalive().unwrap());
    }

    #[tokio::test]
    async fn test_dialer_direct_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            conn.write_all(b"hi").await.unwrap();
        });

        let dialer = Dialer::default();
        assert_eq!(dialer.kind(), "direct");
        let mut stream = dialer.dial(&TargetAddr::Ip(addr)).await.unwrap();
        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");
    }
}
