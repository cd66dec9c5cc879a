//! In-process SSH server for tunnel tests
//!
//! Accepts one user by password or public key and serves `direct-tcpip`
//! channels by connecting to the requested destination. Destinations that
//! refuse are rejected; [`STALL_HOST`] is never answered.

use russh::keys::ssh_key::private::Ed25519Keypair;
use russh::keys::ssh_key::LineEnding;
use russh::keys::{HashAlg, PrivateKey, PublicKey};
use russh::server::{Auth, Handler, Msg, Session};
use russh::{Channel, MethodKind, MethodSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const USER: &str = "tester";
pub const PASSWORD: &str = "hunter2";
/// Channel opens to this host get no answer
pub const STALL_HOST: &str = "stall.invalid";

/// Generate an Ed25519 key
pub fn generate_key() -> PrivateKey {
    let keypair = Ed25519Keypair::random(&mut rand::rngs::OsRng);
    PrivateKey::from(keypair)
}

/// OpenSSH text of a private key
pub fn to_openssh(key: &PrivateKey) -> String {
    key.to_openssh(LineEnding::LF).unwrap().to_string()
}

struct TestHandler {
    authorized_key: PublicKey,
}

impl Handler for TestHandler {
    type Error = russh::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        if user == USER && password == PASSWORD {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::reject())
        }
    }

    async fn auth_publickey_offered(
        &mut self,
        user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        self.auth_publickey(user, public_key).await
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        if user == USER && *public_key == self.authorized_key {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::reject())
        }
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if host_to_connect == STALL_HOST {
            tokio::time::sleep(Duration::from_secs(60)).await;
            return Ok(false);
        }

        let target = format!("{}:{}", host_to_connect, port_to_connect);
        let Ok(mut upstream) = TcpStream::connect(target).await else {
            return Ok(false);
        };
        tokio::spawn(async move {
            let mut stream = channel.into_stream();
            let _ = tokio::io::copy_bidirectional(&mut stream, &mut upstream).await;
        });
        Ok(true)
    }
}

/// Running test SSH server
pub struct TestSshServer {
    pub addr: SocketAddr,
    /// SHA-256 fingerprint of the host key
    pub fingerprint: String,
    /// Key accepted for `USER`
    pub client_key: PrivateKey,
    sessions: Arc<Mutex<Vec<JoinHandle<()>>>>,
    accept_task: JoinHandle<()>,
}

impl TestSshServer {
    /// Start accepting on an ephemeral port
    pub async fn start() -> Self {
        let host_key = generate_key();
        let fingerprint = host_key
            .public_key()
            .fingerprint(HashAlg::Sha256)
            .to_string();
        let client_key = generate_key();
        let authorized_key = client_key.public_key().clone();

        let mut methods = MethodSet::empty();
        methods.push(MethodKind::Password);
        methods.push(MethodKind::PublicKey);
        let config = Arc::new(russh::server::Config {
            methods,
            auth_rejection_time: Duration::from_millis(10),
            auth_rejection_time_initial: Some(Duration::from_secs(0)),
            keys: vec![host_key],
            ..Default::default()
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sessions: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::new(Mutex::new(Vec::new()));

        let accept_sessions = sessions.clone();
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = TestHandler {
                    authorized_key: authorized_key.clone(),
                };
                let config = config.clone();
                // The session talks to a pipe; aborting the pump drops the socket
                let (pipe, session_side) = tokio::io::duplex(64 * 1024);
                tokio::spawn(async move {
                    if let Ok(session) =
                        russh::server::run_stream(config, session_side, handler).await
                    {
                        let _ = session.await;
                    }
                });
                let pump = tokio::spawn(async move {
                    let mut stream = stream;
                    let mut pipe = pipe;
                    let _ = tokio::io::copy_bidirectional(&mut stream, &mut pipe).await;
                });
                accept_sessions.lock().unwrap().push(pump);
            }
        });

        TestSshServer {
            addr,
            fingerprint,
            client_key,
            sessions,
            accept_task,
        }
    }

    /// Drop every open session, keeping the listener
    pub fn kill_sessions(&self) {
        for task in self.sessions.lock().unwrap().iter() {
            task.abort();
        }
    }

    /// Number of sessions accepted so far, including killed ones
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

impl Drop for TestSshServer {
    fn drop(&mut self) {
        self.accept_task.abort();
        self.kill_sessions();
    }
}
