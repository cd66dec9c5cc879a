//! Per-connection SOCKS5 state machine
//!
//! A [`Session`] owns one accepted client stream and walks it through
//! `Accepted -> NegotiateMethods -> Authenticated -> RequestParsed ->
//! Relaying -> Closed`. Every step must succeed before the next begins;
//! any failure moves straight to `Closed` and drops the stream.

use super::auth::{select_method, AuthMethod, Authenticator};
use super::consts::SOCKS5_REPLY_COMMAND_NOT_SUPPORTED;
use super::message::{
    NegotiationReply, NegotiationRequest, Reply, Request, UserPassReply, UserPassRequest,
};
use super::relay::{relay, RelayStats};
use super::types::{SocksCommand, TargetAddr};
use crate::error::{Socks5Error, Socks5ReplyCode, SockshError};
use crate::pool::BufferPool;
use crate::transport::Dialer;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

/// Where a session is in the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection accepted, nothing read yet
    Accepted,
    /// Method negotiation finished, authentication pending
    NegotiateMethods,
    /// Client authenticated (or no authentication required)
    Authenticated,
    /// CONNECT request decoded, destination known
    RequestParsed,
    /// Bytes are being relayed
    Relaying,
    /// Connection closed
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Accepted => "accepted",
            SessionState::NegotiateMethods => "negotiate-methods",
            SessionState::Authenticated => "authenticated",
            SessionState::RequestParsed => "request-parsed",
            SessionState::Relaying => "relaying",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// State shared by all sessions of one server
#[derive(Debug)]
pub struct SessionContext {
    /// Authenticators in selection order
    pub authenticators: Vec<Authenticator>,
    /// How destinations are reached
    pub dialer: Dialer,
    /// Relay buffers
    pub pool: BufferPool,
    /// Send "succeeded" before dialing instead of after
    pub reply_before_dial: bool,
}

impl SessionContext {
    /// Context with no authentication, optimistic replies off
    pub fn new(dialer: Dialer, pool: BufferPool) -> Self {
        SessionContext {
            authenticators: Vec::new(),
            dialer,
            pool,
            reply_before_dial: false,
        }
    }

    /// Set the authenticators
    pub fn with_authenticators(mut self, authenticators: Vec<Authenticator>) -> Self {
        self.authenticators = authenticators;
        self
    }
}

/// One client connection being served
pub struct Session<S> {
    stream: S,
    context: Arc<SessionContext>,
    peer: String,
    state: SessionState,
    method: Option<(Option<usize>, AuthMethod)>,
    target: Option<TargetAddr>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an accepted stream
    pub fn new(stream: S, context: Arc<SessionContext>, peer: impl fmt::Display) -> Self {
        Session {
            stream,
            context,
            peer: peer.to_string(),
            state: SessionState::Accepted,
            method: None,
            target: None,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Negotiated method, once negotiation finished
    pub fn method(&self) -> Option<AuthMethod> {
        self.method.map(|(_, method)| method)
    }

    /// Requested destination, once the request was parsed
    pub fn target(&self) -> Option<&TargetAddr> {
        self.target.as_ref()
    }

    /// Drive the session to completion
    ///
    /// The state is `Closed` afterwards whether or not an error occurred.
    pub async fn run(mut self) -> Result<RelayStats, SockshError> {
        let result = self.drive().await;
        self.state = SessionState::Closed;
        match &result {
            Ok(_) => debug!(peer = %self.peer, "Session closed"),
            Err(e) => debug!(peer = %self.peer, "Session closed: {}", e),
        }
        result
    }

    async fn drive(&mut self) -> Result<RelayStats, SockshError> {
        self.negotiate().await?;
        self.authenticate().await?;
        self.read_request().await?;
        self.connect_and_relay().await
    }

    fn fail<T>(&mut self, err: impl Into<SockshError>) -> Result<T, SockshError> {
        self.state = SessionState::Closed;
        Err(err.into())
    }

    /// Read the client's method offer and answer it
    pub async fn negotiate(&mut self) -> Result<AuthMethod, SockshError> {
        let request = match NegotiationRequest::decode(&mut self.stream).await {
            Ok(request) => request,
            Err(e) => return self.fail(e),
        };
        debug!(peer = %self.peer, methods = ?request.methods, "Method negotiation");

        let Some(selected) = select_method(&self.context.authenticators, &request) else {
            warn!(
                peer = %self.peer,
                offered = ?request.methods,
                "No acceptable authentication method"
            );
            // Best effort, the connection closes either way
            let _ = NegotiationReply::not_acceptable()
                .write_to(&mut self.stream)
                .await;
            return self.fail(Socks5Error::NoAcceptableMethod);
        };

        if let Err(e) = NegotiationReply::new(selected.1.to_byte())
            .write_to(&mut self.stream)
            .await
        {
            return self.fail(e);
        }

        self.method = Some(selected);
        self.state = SessionState::NegotiateMethods;
        Ok(selected.1)
    }

    /// Run the sub-negotiation required by the negotiated method
    pub async fn authenticate(&mut self) -> Result<(), SockshError> {
        let Some((index, method)) = self.method else {
            return self.fail(Socks5Error::NoAcceptableMethod);
        };

        if method == AuthMethod::Password {
            let request = match UserPassRequest::decode(&mut self.stream).await {
                Ok(request) => request,
                Err(e) => return self.fail(e),
            };

            let authenticator = index.and_then(|i| self.context.authenticators.get(i));
            let verdict = match authenticator {
                Some(auth) => auth.authenticate(&request.username, &request.password),
                None => Err(Socks5Error::AuthFailed {
                    username: request.username.clone(),
                }),
            };

            if let Err(e) = verdict {
                warn!(peer = %self.peer, username = %request.username, "Authentication failed");
                let _ = UserPassReply::failure().write_to(&mut self.stream).await;
                return self.fail(e);
            }

            if let Err(e) = UserPassReply::success().write_to(&mut self.stream).await {
                return self.fail(e);
            }
            debug!(peer = %self.peer, username = %request.username, "Authenticated");
        }

        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// Read the request; only CONNECT goes further
    pub async fn read_request(&mut self) -> Result<TargetAddr, SockshError> {
        let request = match Request::decode(&mut self.stream).await {
            Ok(request) => request,
            Err(e) => return self.fail(e),
        };

        if request.command != SocksCommand::Connect {
            debug!(peer = %self.peer, command = %request.command, "Unsupported command");
            let _ = Reply::new(SOCKS5_REPLY_COMMAND_NOT_SUPPORTED)
                .write_to(&mut self.stream)
                .await;
            return self.fail(Socks5Error::CommandNotSupported(request.command.to_byte()));
        }

        debug!(peer = %self.peer, target = %request.addr, "CONNECT request");
        self.target = Some(request.addr.clone());
        self.state = SessionState::RequestParsed;
        Ok(request.addr)
    }

    /// Dial the destination, reply, and relay until either side closes
    ///
    /// By default the reply follows the dial and carries a failure code
    /// when the dial fails; with `reply_before_dial` the client is told
    /// "succeeded" first and a failed dial just closes the connection.
    pub async fn connect_and_relay(&mut self) -> Result<RelayStats, SockshError> {
        let Some(target) = self.target.clone() else {
            return self.fail(Socks5Error::InvalidAddress("no request parsed".to_string()));
        };
        let context = self.context.clone();

        if context.reply_before_dial {
            if let Err(e) = Reply::succeeded().write_to(&mut self.stream).await {
                return self.fail(e);
            }
        }

        let upstream = match context.dialer.dial(&target).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(peer = %self.peer, %target, "Dial failed: {}", e);
                if !context.reply_before_dial {
                    let code = Socks5ReplyCode::from(&e);
                    let _ = Reply::new(code.into()).write_to(&mut self.stream).await;
                }
                return self.fail(e);
            }
        };

        if !context.reply_before_dial {
            if let Err(e) = Reply::succeeded().write_to(&mut self.stream).await {
                return self.fail(e);
            }
        }

        self.state = SessionState::Relaying;
        debug!(peer = %self.peer, %target, dialer = context.dialer.kind(), "Relaying");

        let stats = relay(&mut self.stream, upstream, &context.pool).await;
        self.state = SessionState::Closed;
        Ok(stats)
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.peer)
            .field("state", &self.state)
            .field("target", &self.target)
            .finish()
    }
}
