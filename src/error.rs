//! Error types for Socksh
//!
//! This module defines all custom error types used throughout the application.

use std::io;
use thiserror::Error;

/// Main error type for Socksh operations
#[derive(Error, Debug)]
pub enum SockshError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// SOCKS5 protocol error
    #[error("SOCKS5 error: {0}")]
    Socks5(#[from] Socks5Error),

    /// SSH transport error
    #[cfg(feature = "ssh")]
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// SSH login failed or the key could not be loaded
    #[error("SSH authentication failed: {0}")]
    SshAuth(String),

    /// No live SSH session to open a channel on
    #[error("SSH session unavailable")]
    SshUnavailable,

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Several steps of a shutdown failed
    #[error("Shutdown failed: {}", join_errors(.0))]
    Shutdown(Vec<SockshError>),
}

fn join_errors(errors: &[SockshError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// SOCKS5 specific errors
///
/// Decoding failures each map to their own variant so callers can tell a
/// truncated stream from a malformed message.
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Unsupported username/password sub-negotiation version
    #[error("Unsupported sub-negotiation version: {0}")]
    UnsupportedSubnegotiationVersion(u8),

    /// Method list with NMETHODS = 0
    #[error("method len is 0")]
    NoMethods,

    /// Command not supported
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Reserved byte was not zero
    #[error("request rsv invalid: {0}")]
    ReservedInvalid(u8),

    /// Address type not one of IPv4, domain name, IPv6
    #[error("request ATYP invalid: {0}")]
    AddressTypeInvalid(u8),

    /// The stream ended in the middle of a message
    #[error("Truncated message: {0}")]
    Truncated(#[source] io::Error),

    /// No acceptable authentication method
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// The server selected a method we did not offer or cannot perform
    #[error("method not support: {0:#04x}")]
    MethodNotSupported(u8),

    /// Authentication failed
    #[error("Authentication failed for user: {username}")]
    AuthFailed {
        /// Username that was rejected
        username: String,
    },

    /// The server answered a request with a non-success reply code
    #[error("reply fail: {0}")]
    ReplyFail(u8),

    /// Invalid address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid domain name
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    /// A length-prefixed field exceeds 255 bytes
    #[error("Field too long: {0} ({1} bytes)")]
    FieldTooLong(&'static str, usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for Socks5Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Socks5Error::Truncated(err)
        } else {
            Socks5Error::Io(err)
        }
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Socks5ReplyCode {
    type Error = Socks5Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Socks5ReplyCode::Succeeded),
            0x01 => Ok(Socks5ReplyCode::GeneralFailure),
            0x02 => Ok(Socks5ReplyCode::ConnectionNotAllowed),
            0x03 => Ok(Socks5ReplyCode::NetworkUnreachable),
            0x04 => Ok(Socks5ReplyCode::HostUnreachable),
            0x05 => Ok(Socks5ReplyCode::ConnectionRefused),
            0x06 => Ok(Socks5ReplyCode::TtlExpired),
            0x07 => Ok(Socks5ReplyCode::CommandNotSupported),
            0x08 => Ok(Socks5ReplyCode::AddressTypeNotSupported),
            other => Err(Socks5Error::ReplyFail(other)),
        }
    }
}

impl From<&io::Error> for Socks5ReplyCode {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Socks5ReplyCode::ConnectionRefused,
            io::ErrorKind::TimedOut => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::AddrNotAvailable => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::PermissionDenied => Socks5ReplyCode::ConnectionNotAllowed,
            _ => Socks5ReplyCode::GeneralFailure,
        }
    }
}

impl From<&SockshError> for Socks5ReplyCode {
    /// Pick the reply code reported to a client whose outbound dial failed
    fn from(err: &SockshError) -> Self {
        match err {
            SockshError::Io(e) => Socks5ReplyCode::from(e),
            SockshError::Timeout(_) => Socks5ReplyCode::HostUnreachable,
            SockshError::Socks5(Socks5Error::AddressTypeInvalid(_)) => {
                Socks5ReplyCode::AddressTypeNotSupported
            }
            SockshError::SshUnavailable => Socks5ReplyCode::NetworkUnreachable,
            #[cfg(feature = "ssh")]
            SockshError::Ssh(russh::Error::ChannelOpenFailure(reason)) => match reason {
                russh::ChannelOpenFailure::ConnectFailed => Socks5ReplyCode::ConnectionRefused,
                russh::ChannelOpenFailure::AdministrativelyProhibited => {
                    Socks5ReplyCode::ConnectionNotAllowed
                }
                _ => Socks5ReplyCode::GeneralFailure,
            },
            _ => Socks5ReplyCode::GeneralFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socks5_reply_code_from_u8_valid() {
        for code in 0x00..=0x08u8 {
            let reply = Socks5ReplyCode::try_from(code).unwrap();
            assert_eq!(u8::from(reply), code);
        }
    }

    #[test]
    fn test_socks5_reply_code_from_u8_invalid() {
        assert!(matches!(
            Socks5ReplyCode::try_from(0x09),
            Err(Socks5Error::ReplyFail(0x09))
        ));
        assert!(Socks5ReplyCode::try_from(0xFF).is_err());
    }

    #[test]
    fn test_socks5_reply_code_from_io_error() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            Socks5ReplyCode::from(&err),
            Socks5ReplyCode::ConnectionRefused
        );

        let err = io::Error::new(io::ErrorKind::TimedOut, "timeout");
        assert_eq!(
            Socks5ReplyCode::from(&err),
            Socks5ReplyCode::HostUnreachable
        );

        let err = io::Error::new(io::ErrorKind::Other, "other");
        assert_eq!(Socks5ReplyCode::from(&err), Socks5ReplyCode::GeneralFailure);
    }

    #[test]
    fn test_socks5_reply_code_from_dial_error() {
        let err = SockshError::Timeout("dial".to_string());
        assert_eq!(
            Socks5ReplyCode::from(&err),
            Socks5ReplyCode::HostUnreachable
        );

        let err = SockshError::SshUnavailable;
        assert_eq!(
            Socks5ReplyCode::from(&err),
            Socks5ReplyCode::NetworkUnreachable
        );

        let err = SockshError::Config("bad".to_string());
        assert_eq!(Socks5ReplyCode::from(&err), Socks5ReplyCode::GeneralFailure);
    }

    #[cfg(feature = "ssh")]
    #[test]
    fn test_socks5_reply_code_from_channel_open_failure() {
        let err = SockshError::Ssh(russh::Error::ChannelOpenFailure(
            russh::ChannelOpenFailure::ConnectFailed,
        ));
        assert_eq!(
            Socks5ReplyCode::from(&err),
            Socks5ReplyCode::ConnectionRefused
        );

        let err = SockshError::Ssh(russh::Error::ChannelOpenFailure(
            russh::ChannelOpenFailure::AdministrativelyProhibited,
        ));
        assert_eq!(
            Socks5ReplyCode::from(&err),
            Socks5ReplyCode::ConnectionNotAllowed
        );

        let err = SockshError::Ssh(russh::Error::ChannelOpenFailure(
            russh::ChannelOpenFailure::ResourceShortage,
        ));
        assert_eq!(Socks5ReplyCode::from(&err), Socks5ReplyCode::GeneralFailure);
    }

    #[test]
    fn test_shutdown_error_lists_causes() {
        let err = SockshError::Shutdown(vec![
            SockshError::SshUnavailable,
            SockshError::Timeout("stop".to_string()),
        ]);
        assert_eq!(
            err.to_string(),
            "Shutdown failed: SSH session unavailable; Timeout: stop"
        );
    }

    #[test]
    fn test_io_error_eof_is_truncated() {
        let err: Socks5Error = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(err, Socks5Error::Truncated(_)));

        let err: Socks5Error = io::Error::from(io::ErrorKind::BrokenPipe).into();
        assert!(matches!(err, Socks5Error::Io(_)));
    }

    #[test]
    fn test_auth_failed_hides_password() {
        let err = Socks5Error::AuthFailed {
            username: "alice".to_string(),
        };
        assert_eq!(err.to_string(), "Authentication failed for user: alice");
    }

    #[test]
    fn test_socks5_error_display() {
        assert_eq!(
            Socks5Error::AddressTypeInvalid(5).to_string(),
            "request ATYP invalid: 5"
        );
        assert_eq!(Socks5Error::ReplyFail(1).to_string(), "reply fail: 1");
        assert_eq!(
            Socks5Error::MethodNotSupported(0xFF).to_string(),
            "method not support: 0xff"
        );
        assert_eq!(Socks5Error::NoMethods.to_string(), "method len is 0");
    }

    #[test]
    fn test_socksh_error_from_socks5() {
        let err: SockshError = Socks5Error::NoAcceptableMethod.into();
        assert!(matches!(err, SockshError::Socks5(_)));
    }
}
