//! SOCKS5 type definitions
//!
//! Defines the core types used in SOCKS5 protocol handling.

use super::consts::*;
use crate::error::Socks5Error;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncReadExt};

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for incoming connection (not executed)
    Bind,
    /// UDP ASSOCIATE - establish UDP relay (not executed)
    UdpAssociate,
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => Some(SocksCommand::Connect),
            SOCKS5_CMD_TCP_BIND => Some(SocksCommand::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Some(SocksCommand::UdpAssociate),
            _ => None,
        }
    }

    /// Convert SocksCommand to byte
    pub fn to_byte(self) -> u8 {
        match self {
            SocksCommand::Connect => SOCKS5_CMD_TCP_CONNECT,
            SocksCommand::Bind => SOCKS5_CMD_TCP_BIND,
            SocksCommand::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
        }
    }
}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksCommand::Connect => write!(f, "CONNECT"),
            SocksCommand::Bind => write!(f, "BIND"),
            SocksCommand::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// Destination (or bound) address of a SOCKS5 request or reply
///
/// Can be an IP address (v4 or v6) or a domain name. Domain names are
/// never resolved locally; the dialer decides where resolution happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    ///
    /// The name must be 1 to 255 bytes long.
    pub fn domain(domain: impl Into<String>, port: u16) -> Result<Self, Socks5Error> {
        let domain = domain.into();
        if domain.is_empty() {
            return Err(Socks5Error::InvalidDomain(domain));
        }
        if domain.len() > MAX_FIELD_LEN {
            return Err(Socks5Error::FieldTooLong("domain", domain.len()));
        }
        Ok(TargetAddr::Domain(domain, port))
    }

    /// The all-zero IPv4 address used as BND.ADDR in replies
    pub fn unspecified() -> Self {
        TargetAddr::ipv4(Ipv4Addr::UNSPECIFIED, 0)
    }

    /// Parse a `host:port` string, auto-detecting IPv4, IPv6 and domain names
    ///
    /// IPv6 literals must be bracketed (`[::1]:443`).
    pub fn parse(addr: &str) -> Result<Self, Socks5Error> {
        if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
            return Ok(TargetAddr::Ip(socket_addr));
        }

        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| Socks5Error::InvalidAddress(addr.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| Socks5Error::InvalidAddress(addr.to_string()))?;

        // A bare IPv6 literal without brackets is ambiguous
        if host.contains(':') || host.starts_with('[') {
            return Err(Socks5Error::InvalidAddress(addr.to_string()));
        }

        TargetAddr::domain(host, port)
    }

    /// Get the host part (IP literal or domain name)
    pub fn host(&self) -> String {
        match self {
            TargetAddr::Ip(addr) => addr.ip().to_string(),
            TargetAddr::Domain(domain, _) => domain.clone(),
        }
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }

    /// Get the address type byte for SOCKS5 protocol
    pub fn addr_type(&self) -> u8 {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => SOCKS5_ADDR_TYPE_IPV4,
            TargetAddr::Ip(SocketAddr::V6(_)) => SOCKS5_ADDR_TYPE_IPV6,
            TargetAddr::Domain(_, _) => SOCKS5_ADDR_TYPE_DOMAIN,
        }
    }

    /// Append ATYP, address and port to `buf`
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Socks5Error> {
        buf.put_u8(self.addr_type());
        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => {
                buf.put_slice(&addr.ip().octets());
            }
            TargetAddr::Ip(SocketAddr::V6(addr)) => {
                buf.put_slice(&addr.ip().octets());
            }
            TargetAddr::Domain(domain, _) => {
                if domain.is_empty() {
                    return Err(Socks5Error::InvalidDomain(domain.clone()));
                }
                if domain.len() > MAX_FIELD_LEN {
                    return Err(Socks5Error::FieldTooLong("domain", domain.len()));
                }
                buf.put_u8(domain.len() as u8);
                buf.put_slice(domain.as_bytes());
            }
        }
        buf.put_u16(self.port());
        Ok(())
    }

    /// Read the address and port that follow an already consumed ATYP byte
    pub async fn decode<R>(reader: &mut R, addr_type: u8) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        let addr = match addr_type {
            SOCKS5_ADDR_TYPE_IPV4 => {
                let mut octets = [0u8; 4];
                reader.read_exact(&mut octets).await?;
                let port = reader.read_u16().await?;
                TargetAddr::ipv4(Ipv4Addr::from(octets), port)
            }
            SOCKS5_ADDR_TYPE_DOMAIN => {
                let len = reader.read_u8().await? as usize;
                let mut domain = vec![0u8; len];
                reader.read_exact(&mut domain).await?;
                let port = reader.read_u16().await?;
                let domain = String::from_utf8(domain).map_err(|e| {
                    Socks5Error::InvalidDomain(String::from_utf8_lossy(e.as_bytes()).into_owned())
                })?;
                TargetAddr::domain(domain, port)?
            }
            SOCKS5_ADDR_TYPE_IPV6 => {
                let mut octets = [0u8; 16];
                reader.read_exact(&mut octets).await?;
                let port = reader.read_u16().await?;
                TargetAddr::ipv6(Ipv6Addr::from(octets), port)
            }
            other => return Err(Socks5Error::AddressTypeInvalid(other)),
        };
        Ok(addr)
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl FromStr for TargetAddr {
    type Err = Socks5Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetAddr::parse(s)
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}
