//! Username/password authenticator
//!
//! Backs RFC 1929 sub-negotiation with a fixed user table.

use crate::error::Socks5Error;
use std::collections::HashMap;
use std::fmt;

/// Username/password table
#[derive(Clone, Default)]
pub struct UserPassAuth {
    users: HashMap<String, String>,
}

impl UserPassAuth {
    /// Create an authenticator from `username -> password`
    pub fn new(users: HashMap<String, String>) -> Self {
        UserPassAuth { users }
    }

    /// Succeeds only on an exact username and password match.
    ///
    /// The error carries the username, never the attempted password.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), Socks5Error> {
        match self.users.get(username) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(Socks5Error::AuthFailed {
                username: username.to_string(),
            }),
        }
    }
}

impl fmt::Debug for UserPassAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.users.keys().collect();
        names.sort();
        f.debug_struct("UserPassAuth").field("users", &names).finish()
    }
}
