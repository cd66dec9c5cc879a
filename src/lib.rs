//! # Socksh - SOCKS5 proxy with direct or SSH-tunneled egress
//!
//! Socksh implements RFC 1928 (SOCKS5) and RFC 1929 (username/password)
//! byte for byte: a server that accepts clients and relays their CONNECT
//! requests, a client that performs the handshake against any SOCKS5
//! proxy, and a tunnel manager that runs the server on top of an SSH
//! session so outbound connections leave from the SSH host.
//!
//! ## Features
//!
//! - **Server**: per-connection state machine with no-auth and
//!   username/password authenticators
//! - **Client**: negotiates, authenticates and returns a plain TCP tunnel
//! - **Relay**: full-duplex copy with pooled buffers and joint shutdown
//! - **Dialers**: direct TCP, or `direct-tcpip` channels over SSH with
//!   automatic reconnect (`ssh` feature)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksh::config::ServerConfig;
//! use socksh::socks::Server;
//! use socksh::transport::Dialer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!     let mut server = Server::new(&config, Dialer::default());
//!     server.start(&config.listen_addr).await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Server -> Session -> Dialer (direct | SSH) -> Target
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod pool;
pub mod socks;
pub mod transport;
#[cfg(feature = "ssh")]
pub mod tunnel;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{Socks5Error, SockshError};
pub use socks::{Client, Server};
#[cfg(feature = "ssh")]
pub use tunnel::SshTunnel;

/// Version of the Socksh library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
