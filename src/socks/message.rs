//! SOCKS5 wire messages
//!
//! Every message exchanged during a SOCKS5 handshake, with a pure `encode`
//! producing the exact bytes to send and an async `decode` that reads one
//! message from a stream and fails fast on the first malformed field.
//!
//! ```text
//! NegotiationRequest   VER | NMETHODS | METHODS
//! NegotiationReply     VER | METHOD
//! UserPassRequest      VER(1) | ULEN | UNAME | PLEN | PASSWD
//! UserPassReply        VER(1) | STATUS
//! Request              VER | CMD | RSV | ATYP | DST.ADDR | DST.PORT
//! Reply                VER | REP | RSV | ATYP | BND.ADDR | BND.PORT
//! ```

use super::consts::*;
use super::types::{SocksCommand, TargetAddr};
use crate::error::Socks5Error;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Write an encoded message and flush it
async fn send<W>(writer: &mut W, bytes: &[u8]) -> Result<(), Socks5Error>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_version<R>(reader: &mut R) -> Result<u8, Socks5Error>
where
    R: AsyncRead + Unpin,
{
    let version = reader.read_u8().await?;
    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }
    Ok(version)
}

/// Method selection message sent by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationRequest {
    /// Offered authentication methods, in client preference order
    pub methods: Vec<u8>,
}

impl NegotiationRequest {
    /// Create a request offering the given methods
    pub fn new(methods: Vec<u8>) -> Self {
        NegotiationRequest { methods }
    }

    /// Whether the client offered `method`
    pub fn offers(&self, method: u8) -> bool {
        self.methods.contains(&method)
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<Bytes, Socks5Error> {
        if self.methods.is_empty() {
            return Err(Socks5Error::NoMethods);
        }
        if self.methods.len() > MAX_FIELD_LEN {
            return Err(Socks5Error::FieldTooLong("methods", self.methods.len()));
        }
        let mut buf = BytesMut::with_capacity(2 + self.methods.len());
        buf.put_u8(SOCKS5_VERSION);
        buf.put_u8(self.methods.len() as u8);
        buf.put_slice(&self.methods);
        Ok(buf.freeze())
    }

    /// Read one request from the stream
    pub async fn decode<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        read_version(reader).await?;
        let count = reader.read_u8().await?;
        if count == 0 {
            return Err(Socks5Error::NoMethods);
        }
        let mut methods = vec![0u8; count as usize];
        reader.read_exact(&mut methods).await?;
        Ok(NegotiationRequest { methods })
    }

    /// Encode and send
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        send(writer, &self.encode()?).await
    }
}

/// Method selected by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationReply {
    /// Selected method, or [`SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE`]
    pub method: u8,
}

impl NegotiationReply {
    /// Create a reply selecting `method`
    pub fn new(method: u8) -> Self {
        NegotiationReply { method }
    }

    /// The "no acceptable methods" reply
    pub fn not_acceptable() -> Self {
        NegotiationReply::new(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE)
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&[SOCKS5_VERSION, self.method])
    }

    /// Read one reply from the stream
    pub async fn decode<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        read_version(reader).await?;
        let method = reader.read_u8().await?;
        Ok(NegotiationReply { method })
    }

    /// Encode and send
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        send(writer, &self.encode()).await
    }
}

/// RFC 1929 username/password request
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassRequest {
    /// Username (at most 255 bytes)
    pub username: String,
    /// Password (at most 255 bytes)
    pub password: String,
}

impl std::fmt::Debug for UserPassRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPassRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl UserPassRequest {
    /// Create a request, rejecting fields longer than 255 bytes
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, Socks5Error> {
        let request = UserPassRequest {
            username: username.into(),
            password: password.into(),
        };
        request.check_lengths()?;
        Ok(request)
    }

    fn check_lengths(&self) -> Result<(), Socks5Error> {
        if self.username.len() > MAX_FIELD_LEN {
            return Err(Socks5Error::FieldTooLong("username", self.username.len()));
        }
        if self.password.len() > MAX_FIELD_LEN {
            return Err(Socks5Error::FieldTooLong("password", self.password.len()));
        }
        Ok(())
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<Bytes, Socks5Error> {
        self.check_lengths()?;
        let mut buf = BytesMut::with_capacity(3 + self.username.len() + self.password.len());
        buf.put_u8(SOCKS5_AUTH_VERSION);
        buf.put_u8(self.username.len() as u8);
        buf.put_slice(self.username.as_bytes());
        buf.put_u8(self.password.len() as u8);
        buf.put_slice(self.password.as_bytes());
        Ok(buf.freeze())
    }

    /// Read one request from the stream
    pub async fn decode<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        let version = reader.read_u8().await?;
        if version != SOCKS5_AUTH_VERSION {
            return Err(Socks5Error::UnsupportedSubnegotiationVersion(version));
        }
        let username = read_short_string(reader).await?;
        let password = read_short_string(reader).await?;
        Ok(UserPassRequest { username, password })
    }

    /// Encode and send
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        send(writer, &self.encode()?).await
    }
}

/// Read a one-byte length followed by that many bytes.
///
/// Credentials are compared byte-for-byte, so invalid UTF-8 is kept lossily
/// and will simply never match a configured user.
async fn read_short_string<R>(reader: &mut R) -> Result<String, Socks5Error>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u8().await? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

/// RFC 1929 status reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserPassReply {
    /// 0 on success, anything else is failure
    pub status: u8,
}

impl UserPassReply {
    /// Successful authentication
    pub fn success() -> Self {
        UserPassReply {
            status: SOCKS5_AUTH_STATUS_SUCCESS,
        }
    }

    /// Rejected authentication
    pub fn failure() -> Self {
        UserPassReply {
            status: SOCKS5_AUTH_STATUS_FAILURE,
        }
    }

    /// Whether the status reports success
    pub fn is_success(&self) -> bool {
        self.status == SOCKS5_AUTH_STATUS_SUCCESS
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&[SOCKS5_AUTH_VERSION, self.status])
    }

    /// Read one reply from the stream
    pub async fn decode<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        let version = reader.read_u8().await?;
        if version != SOCKS5_AUTH_VERSION {
            return Err(Socks5Error::UnsupportedSubnegotiationVersion(version));
        }
        let status = reader.read_u8().await?;
        Ok(UserPassReply { status })
    }

    /// Encode and send
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        send(writer, &self.encode()).await
    }
}

/// Client request (CONNECT, BIND or UDP ASSOCIATE)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Requested command
    pub command: SocksCommand,
    /// Destination address
    pub addr: TargetAddr,
}

impl Request {
    /// Create a CONNECT request to `addr`
    pub fn connect(addr: TargetAddr) -> Self {
        Request {
            command: SocksCommand::Connect,
            addr,
        }
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<Bytes, Socks5Error> {
        let mut buf = BytesMut::with_capacity(22);
        buf.put_u8(SOCKS5_VERSION);
        buf.put_u8(self.command.to_byte());
        buf.put_u8(SOCKS5_RESERVED);
        self.addr.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Read one request from the stream
    pub async fn decode<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        read_version(reader).await?;
        let cmd = reader.read_u8().await?;
        let command = SocksCommand::from_byte(cmd).ok_or(Socks5Error::CommandNotSupported(cmd))?;
        let reserved = reader.read_u8().await?;
        if reserved != SOCKS5_RESERVED {
            return Err(Socks5Error::ReservedInvalid(reserved));
        }
        let addr_type = reader.read_u8().await?;
        let addr = TargetAddr::decode(reader, addr_type).await?;
        Ok(Request { command, addr })
    }

    /// Encode and send
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        send(writer, &self.encode()?).await
    }
}

/// Server reply to a [`Request`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code, see [`crate::error::Socks5ReplyCode`]
    pub reply: u8,
    /// Bound address
    pub bind_addr: TargetAddr,
}

impl Reply {
    /// A reply with the given code and a zero-filled IPv4 bound address
    pub fn new(reply: u8) -> Self {
        Reply {
            reply,
            bind_addr: TargetAddr::unspecified(),
        }
    }

    /// The "succeeded" reply sent once the upstream connection exists
    pub fn succeeded() -> Self {
        Reply::new(SOCKS5_REPLY_SUCCEEDED)
    }

    /// Whether the reply code is "succeeded"
    pub fn is_success(&self) -> bool {
        self.reply == SOCKS5_REPLY_SUCCEEDED
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<Bytes, Socks5Error> {
        let mut buf = BytesMut::with_capacity(22);
        buf.put_u8(SOCKS5_VERSION);
        buf.put_u8(self.reply);
        buf.put_u8(SOCKS5_RESERVED);
        self.bind_addr.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Read one reply from the stream
    pub async fn decode<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        read_version(reader).await?;
        let reply = reader.read_u8().await?;
        let reserved = reader.read_u8().await?;
        if reserved != SOCKS5_RESERVED {
            return Err(Socks5Error::ReservedInvalid(reserved));
        }
        let addr_type = reader.read_u8().await?;
        let bind_addr = TargetAddr::decode(reader, addr_type).await?;
        Ok(Reply { reply, bind_addr })
    }

    /// Encode and send
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        send(writer, &self.encode()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_negotiation_request_round_trip() {
        let cases: Vec<Vec<u8>> = vec![
            vec![0x05, 0x01, 0x00],
            vec![0x05, 0x02, 0x00, 0x02],
            vec![0x05, 0x03, 0x02, 0x01, 0x00],
            vec![0x05, 0x02, 0x80, 0xFE],
        ];
        for bytes in cases {
            let mut cursor = Cursor::new(bytes.clone());
            let request = NegotiationRequest::decode(&mut cursor).await.unwrap();
            assert_eq!(request.encode().unwrap().as_ref(), bytes.as_slice());
        }
    }

    #[tokio::test]
    async fn test_negotiation_request_full_method_list() {
        let mut bytes = vec![0x05, 0xFF];
        bytes.extend((0..=0xFEu8).collect::<Vec<_>>());
        let mut cursor = Cursor::new(bytes.clone());
        let request = NegotiationRequest::decode(&mut cursor).await.unwrap();
        assert_eq!(request.methods.len(), 255);
        assert_eq!(request.encode().unwrap().as_ref(), bytes.as_slice());
    }

    #[tokio::test]
    async fn test_negotiation_request_rejects_bad_input() {
        let mut cursor = Cursor::new(vec![0x04, 0x01, 0x00]);
        assert!(matches!(
            NegotiationRequest::decode(&mut cursor).await,
            Err(Socks5Error::UnsupportedVersion(4))
        ));

        let mut cursor = Cursor::new(vec![0x05, 0x00]);
        assert!(matches!(
            NegotiationRequest::decode(&mut cursor).await,
            Err(Socks5Error::NoMethods)
        ));

        let mut cursor = Cursor::new(vec![0x05, 0x03, 0x00]);
        assert!(matches!(
            NegotiationRequest::decode(&mut cursor).await,
            Err(Socks5Error::Truncated(_))
        ));

        assert!(NegotiationRequest::new(vec![]).encode().is_err());
    }

    #[tokio::test]
    async fn test_negotiation_reply() {
        let reply = NegotiationReply::new(SOCKS5_AUTH_METHOD_PASSWORD);
        assert_eq!(reply.encode().as_ref(), &[0x05, 0x02]);
        assert_eq!(NegotiationReply::not_acceptable().encode().as_ref(), &[0x05, 0xFF]);

        let mut cursor = Cursor::new(vec![0x05, 0x00]);
        let decoded = NegotiationReply::decode(&mut cursor).await.unwrap();
        assert_eq!(decoded.method, SOCKS5_AUTH_METHOD_NONE);
    }

    #[tokio::test]
    async fn test_user_pass_request() {
        let request = UserPassRequest::new("admin", "secret123").unwrap();
        let bytes = request.encode().unwrap();

        assert_eq!(bytes[0], SOCKS5_AUTH_VERSION);
        assert_eq!(bytes[1], 5);
        assert_eq!(&bytes[2..7], b"admin");
        assert_eq!(bytes[7], 9);
        assert_eq!(&bytes[8..17], b"secret123");

        let mut cursor = Cursor::new(bytes.to_vec());
        let decoded = UserPassRequest::decode(&mut cursor).await.unwrap();
        assert_eq!(decoded, request);
    }

    #[tokio::test]
    async fn test_user_pass_request_limits() {
        assert!(matches!(
            UserPassRequest::new("u".repeat(256), "p"),
            Err(Socks5Error::FieldTooLong("username", 256))
        ));
        assert!(UserPassRequest::new("u", "p".repeat(256)).is_err());

        let mut cursor = Cursor::new(vec![0x05, 0x01, b'u', 0x01, b'p']);
        assert!(matches!(
            UserPassRequest::decode(&mut cursor).await,
            Err(Socks5Error::UnsupportedSubnegotiationVersion(5))
        ));
    }

    #[test]
    fn test_user_pass_request_debug_redacts_password() {
        let request = UserPassRequest::new("alice", "hunter2").unwrap();
        let debug = format!("{:?}", request);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_user_pass_reply() {
        assert_eq!(UserPassReply::success().encode().as_ref(), &[0x01, 0x00]);
        assert_eq!(UserPassReply::failure().encode().as_ref(), &[0x01, 0x01]);

        let mut cursor = Cursor::new(vec![0x01, 0x01]);
        let reply = UserPassReply::decode(&mut cursor).await.unwrap();
        assert!(!reply.is_success());
    }

    #[tokio::test]
    async fn test_request_decode_domain() {
        let mut bytes = vec![0x05, 0x01, 0x00, 0x03, 11];
        bytes.extend_from_slice(b"example.com");
        bytes.extend_from_slice(&443u16.to_be_bytes());

        let mut cursor = Cursor::new(bytes.clone());
        let request = Request::decode(&mut cursor).await.unwrap();
        assert_eq!(request.command, SocksCommand::Connect);
        assert_eq!(request.addr.to_string(), "example.com:443");
        assert_eq!(request.encode().unwrap().as_ref(), bytes.as_slice());
    }

    #[tokio::test]
    async fn test_request_decode_bind_and_udp() {
        for cmd in [SOCKS5_CMD_TCP_BIND, SOCKS5_CMD_UDP_ASSOCIATE] {
            let mut cursor = Cursor::new(vec![0x05, cmd, 0x00, 0x01, 0, 0, 0, 0, 0, 0]);
            let request = Request::decode(&mut cursor).await.unwrap();
            assert_eq!(request.command.to_byte(), cmd);
        }
    }

    #[tokio::test]
    async fn test_request_decode_errors() {
        let mut cursor = Cursor::new(vec![0x05, 0x09, 0x00, 0x01, 127, 0, 0, 1, 0, 80]);
        assert!(matches!(
            Request::decode(&mut cursor).await,
            Err(Socks5Error::CommandNotSupported(0x09))
        ));

        let mut cursor = Cursor::new(vec![0x05, 0x01, 0x01, 0x01, 127, 0, 0, 1, 0, 80]);
        assert!(matches!(
            Request::decode(&mut cursor).await,
            Err(Socks5Error::ReservedInvalid(0x01))
        ));

        let mut cursor = Cursor::new(vec![0x05, 0x01, 0x00, 0x05, 127, 0, 0, 1, 0, 80]);
        let err = Request::decode(&mut cursor).await.unwrap_err();
        assert!(err.to_string().contains("ATYP invalid"));

        let mut cursor = Cursor::new(vec![0x04, 0x01, 0x00, 0x01, 127, 0, 0, 1, 0, 80]);
        assert!(matches!(
            Request::decode(&mut cursor).await,
            Err(Socks5Error::UnsupportedVersion(4))
        ));
    }

    #[test]
    fn test_reply_succeeded_bytes() {
        let bytes = Reply::succeeded().encode().unwrap();
        assert_eq!(bytes.as_ref(), &[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_reply_decode_failure_code() {
        let bytes = Reply::new(0x05).encode().unwrap();
        let mut cursor = Cursor::new(bytes.to_vec());
        let reply = Reply::decode(&mut cursor).await.unwrap();
        assert_eq!(reply.reply, 0x05);
        assert!(!reply.is_success());
        assert_eq!(reply.bind_addr, TargetAddr::unspecified());
    }
}
