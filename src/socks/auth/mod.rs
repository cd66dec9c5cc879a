//! SOCKS5 authentication module
//!
//! Authenticators validate credentials and report the method code they
//! satisfy. The server keeps an ordered list of them and uses
//! [`select_method`] to answer the client's method negotiation.

mod password;

pub use password::UserPassAuth;

use super::consts::*;
use super::message::NegotiationRequest;
use crate::config::AuthConfig;
use crate::error::Socks5Error;

/// Authentication method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication required
    None,
    /// Username/password authentication
    Password,
}

impl AuthMethod {
    /// Convert to SOCKS5 method byte
    pub fn to_byte(self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::Password => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }

    /// Parse from SOCKS5 method byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_AUTH_METHOD_NONE => Some(AuthMethod::None),
            SOCKS5_AUTH_METHOD_PASSWORD => Some(AuthMethod::Password),
            _ => None,
        }
    }
}

/// A configured way for clients to authenticate
#[derive(Debug, Clone)]
pub enum Authenticator {
    /// Accept everyone
    NoAuth,
    /// RFC 1929 username/password against a fixed user table
    UserPass(UserPassAuth),
}

impl Authenticator {
    /// Method this authenticator satisfies
    pub fn method(&self) -> AuthMethod {
        match self {
            Authenticator::NoAuth => AuthMethod::None,
            Authenticator::UserPass(_) => AuthMethod::Password,
        }
    }

    /// Check a username/password pair
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), Socks5Error> {
        match self {
            Authenticator::NoAuth => Ok(()),
            Authenticator::UserPass(auth) => auth.authenticate(username, password),
        }
    }
}

impl From<&AuthConfig> for Authenticator {
    fn from(config: &AuthConfig) -> Self {
        match config {
            AuthConfig::None => Authenticator::NoAuth,
            AuthConfig::Password { users } => {
                Authenticator::UserPass(UserPassAuth::new(users.clone()))
            }
        }
    }
}

/// Pick the method to answer a client's negotiation with
///
/// No-auth wins as soon as any configured authenticator provides it,
/// otherwise the first username/password authenticator is used. Either way
/// the client must have offered the method. An empty list behaves like a
/// single no-auth authenticator. Returns the index of the chosen
/// authenticator (`None` index for the implicit no-auth) and its method.
pub fn select_method(
    authenticators: &[Authenticator],
    request: &NegotiationRequest,
) -> Option<(Option<usize>, AuthMethod)> {
    let client_offers = |method: AuthMethod| request.offers(method.to_byte());

    if authenticators.is_empty() {
        return client_offers(AuthMethod::None).then_some((None, AuthMethod::None));
    }

    if let Some(index) = authenticators
        .iter()
        .position(|a| a.method() == AuthMethod::None)
    {
        if client_offers(AuthMethod::None) {
            return Some((Some(index), AuthMethod::None));
        }
    }

    authenticators
        .iter()
        .position(|a| a.method() == AuthMethod::Password)
        .filter(|_| client_offers(AuthMethod::Password))
        .map(|index| (Some(index), AuthMethod::Password))
}
