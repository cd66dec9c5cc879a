//! SOCKS5 module for socksh
//!
//! Wire codec, authenticators, the per-connection server state machine,
//! the listener that spawns it, the relay engine and the client side of
//! the handshake.

pub mod auth;
mod client;
pub mod consts;
mod message;
mod relay;
mod server;
mod session;
mod types;

pub use auth::{select_method, AuthMethod, Authenticator, UserPassAuth};
pub use client::{handshake, Client};
pub use message::{
    NegotiationReply, NegotiationRequest, Reply, Request, UserPassReply, UserPassRequest,
};
pub use relay::{pipe, relay, RelayStats};
pub use server::Server;
pub use session::{Session, SessionContext, SessionState};
pub use types::{SocksCommand, TargetAddr};
