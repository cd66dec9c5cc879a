//! SOCKS5 client
//!
//! Connects to a proxy, negotiates a method, authenticates when asked to
//! and issues a CONNECT. The returned stream is a plain byte tunnel to the
//! destination.

use super::auth::AuthMethod;
use super::consts::{SOCKS5_AUTH_METHOD_NONE, SOCKS5_AUTH_METHOD_PASSWORD};
use super::message::{
    NegotiationReply, NegotiationRequest, Reply, Request, UserPassReply, UserPassRequest,
};
use super::types::TargetAddr;
use crate::config::ClientConfig;
use crate::error::Socks5Error;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// SOCKS5 client bound to one proxy
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
}

impl Client {
    /// Create a client
    pub fn new(config: ClientConfig) -> Self {
        Client { config }
    }

    /// Proxy this client talks to
    pub fn proxy_addr(&self) -> &str {
        &self.config.proxy_addr
    }

    /// Open a tunnel to `target` (`host:port`, IPv6 in brackets)
    pub async fn dial(&self, target: &str) -> Result<TcpStream, Socks5Error> {
        let target = TargetAddr::parse(target)?;
        self.dial_addr(&target).await
    }

    /// Open a tunnel to an already parsed target
    pub async fn dial_addr(&self, target: &TargetAddr) -> Result<TcpStream, Socks5Error> {
        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let connect = TcpStream::connect(self.config.proxy_addr.as_str());
        let mut stream = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| {
                Socks5Error::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect to proxy {} timed out", self.config.proxy_addr),
                ))
            })??;
        stream.set_nodelay(true)?;

        handshake(&mut stream, target, self.config.credentials()).await?;
        debug!("Tunnel to {} open via {}", target, self.config.proxy_addr);
        Ok(stream)
    }
}

/// Run the client side of the handshake on an existing stream
///
/// Offers no-auth only, or no-auth and username/password when credentials
/// are given. Returns the bound address reported by the proxy.
pub async fn handshake<S>(
    stream: &mut S,
    target: &TargetAddr,
    credentials: Option<(&str, &str)>,
) -> Result<TargetAddr, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let methods = match credentials {
        Some(_) => vec![SOCKS5_AUTH_METHOD_NONE, SOCKS5_AUTH_METHOD_PASSWORD],
        None => vec![SOCKS5_AUTH_METHOD_NONE],
    };
    NegotiationRequest::new(methods).write_to(stream).await?;

    let selected = NegotiationReply::decode(stream).await?.method;
    match (AuthMethod::from_byte(selected), credentials) {
        (Some(AuthMethod::None), _) => {}
        (Some(AuthMethod::Password), Some((username, password))) => {
            UserPassRequest::new(username, password)?
                .write_to(stream)
                .await?;
            if !UserPassReply::decode(stream).await?.is_success() {
                return Err(Socks5Error::AuthFailed {
                    username: username.to_string(),
                });
            }
        }
        _ => return Err(Socks5Error::MethodNotSupported(selected)),
    }

    Request::connect(target.clone()).write_to(stream).await?;
    let reply = Reply::decode(stream).await?;
    if !reply.is_success() {
        return Err(Socks5Error::ReplyFail(reply.reply));
    }
    Ok(reply.bind_addr)
}
