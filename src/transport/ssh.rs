//! SSH dialer
//!
//! Holds one authenticated SSH session and opens a `direct-tcpip` channel
//! per outbound connection, so destinations are reached (and domain names
//! resolved) from the SSH server's side.
//!
//! A background task watches the session. When it drops, the handle is
//! cleared, dials fail fast with [`SockshError::SshUnavailable`], and the
//! task reconnects after the configured backoff until it succeeds or the
//! dialer is closed.

use crate::config::{SshAuth, SshConfig};
use crate::error::SockshError;
use crate::socks::TargetAddr;
use russh::client::{self, Handle, Msg};
use russh::keys::{HashAlg, PrivateKeyWithHashAlg, PublicKey};
use russh::ChannelStream;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Originator reported in every `direct-tcpip` request
const ORIGINATOR_ADDR: &str = "127.0.0.1";
const ORIGINATOR_PORT: u32 = 0;

/// russh client handler for one session
///
/// Dropped together with the session task, which closes `_session_lost`
/// and wakes the reconnect loop.
struct ClientHandler {
    expected_fingerprint: Option<String>,
    _session_lost: oneshot::Sender<()>,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, key: &PublicKey) -> Result<bool, Self::Error> {
        let fingerprint = key.fingerprint(HashAlg::Sha256).to_string();
        match &self.expected_fingerprint {
            Some(expected) if *expected != fingerprint => {
                error!(%fingerprint, %expected, "SSH host key mismatch");
                Ok(false)
            }
            Some(_) => Ok(true),
            None => {
                debug!(%fingerprint, "Accepting SSH host key");
                Ok(true)
            }
        }
    }
}

struct Session {
    config: SshConfig,
    handle: RwLock<Option<Arc<Handle<ClientHandler>>>>,
    shutdown_tx: broadcast::Sender<bool>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
}

/// Dialer tunnelling connections through an SSH session
///
/// Cloning is cheap and yields a handle to the same session.
#[derive(Clone)]
pub struct SshDialer {
    session: Arc<Session>,
}

impl SshDialer {
    /// Connect and authenticate to the SSH server, then start watching
    /// the session
    ///
    /// Fails if the first connection or login fails; later losses are
    /// handled by reconnecting.
    pub async fn connect(config: SshConfig) -> Result<Self, SockshError> {
        let (handle, session_lost) = establish(&config).await?;
        info!(addr = %config.addr, user = %config.user, "SSH session established");

        let (shutdown_tx, _) = broadcast::channel(1);
        let session = Arc::new(Session {
            config,
            handle: RwLock::new(Some(Arc::new(handle))),
            shutdown_tx,
            reconnect_task: Mutex::new(None),
        });

        let task = tokio::spawn(run_reconnect_loop(
            session.clone(),
            session_lost,
            session.shutdown_tx.subscribe(),
        ));
        *session.reconnect_task.lock().await = Some(task);

        Ok(SshDialer { session })
    }

    /// Whether a live session is currently held
    pub async fn is_connected(&self) -> bool {
        match self.session.handle.read().await.as_ref() {
            Some(handle) => !handle.is_closed(),
            None => false,
        }
    }

    /// Open a `direct-tcpip` channel to `target`
    pub async fn dial(&self, target: &TargetAddr) -> Result<ChannelStream<Msg>, SockshError> {
        let handle = self
            .session
            .handle
            .read()
            .await
            .clone()
            .filter(|handle| !handle.is_closed())
            .ok_or(SockshError::SshUnavailable)?;

        let timeout = Duration::from_secs(self.session.config.dial_timeout_secs);
        let open = handle.channel_open_direct_tcpip(
            target.host(),
            u32::from(target.port()),
            ORIGINATOR_ADDR,
            ORIGINATOR_PORT,
        );
        let channel = tokio::time::timeout(timeout, open)
            .await
            .map_err(|_| SockshError::Timeout(format!("SSH channel to {}", target)))??;
        debug!("SSH channel opened to {}", target);

        Ok(channel.into_stream())
    }

    /// Stop reconnecting and disconnect the session
    pub async fn close(&self) -> Result<(), SockshError> {
        let _ = self.session.shutdown_tx.send(true);
        if let Some(task) = self.session.reconnect_task.lock().await.take() {
            let _ = task.await;
        }

        let handle = self.session.handle.write().await.take();
        match handle {
            Some(handle) if !handle.is_closed() => {
                handle
                    .disconnect(russh::Disconnect::ByApplication, "", "English")
                    .await?;
                info!(addr = %self.session.config.addr, "SSH session closed");
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Debug for SshDialer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshDialer")
            .field("addr", &self.session.config.addr)
            .field("user", &self.session.config.user)
            .finish()
    }
}

/// Connect and log in once, bounded by `connect_timeout_secs`
async fn establish(
    config: &SshConfig,
) -> Result<(Handle<ClientHandler>, oneshot::Receiver<()>), SockshError> {
    let timeout = Duration::from_secs(config.connect_timeout_secs);
    tokio::time::timeout(timeout, establish_session(config))
        .await
        .map_err(|_| SockshError::Timeout(format!("SSH login to {}", config.addr)))?
}

async fn establish_session(
    config: &SshConfig,
) -> Result<(Handle<ClientHandler>, oneshot::Receiver<()>), SockshError> {
    let (lost_tx, lost_rx) = oneshot::channel();
    let handler = ClientHandler {
        expected_fingerprint: config.host_key_fingerprint.clone(),
        _session_lost: lost_tx,
    };

    let russh_config = Arc::new(client::Config {
        inactivity_timeout: None,
        keepalive_interval: Some(Duration::from_secs(30)),
        ..Default::default()
    });

    let mut handle = client::connect(russh_config, config.addr.as_str(), handler).await?;
    authenticate(&mut handle, config).await?;

    Ok((handle, lost_rx))
}

async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    config: &SshConfig,
) -> Result<(), SockshError> {
    let result = match &config.auth {
        SshAuth::Password { password } => {
            handle
                .authenticate_password(config.user.as_str(), password.as_str())
                .await?
        }
        SshAuth::KeyFile { path } => {
            let key = russh::keys::load_secret_key(path, None).map_err(|e| {
                SockshError::SshAuth(format!("failed to load key {:?}: {}", path, e))
            })?;
            authenticate_key(handle, &config.user, key).await?
        }
        SshAuth::Key { key } => {
            let key = russh::keys::decode_secret_key(key, None)
                .map_err(|e| SockshError::SshAuth(format!("failed to parse key: {}", e)))?;
            authenticate_key(handle, &config.user, key).await?
        }
    };

    if !result.success() {
        return Err(SockshError::SshAuth(format!(
            "server rejected user '{}'",
            config.user
        )));
    }
    Ok(())
}

async fn authenticate_key(
    handle: &mut Handle<ClientHandler>,
    user: &str,
    key: russh::keys::PrivateKey,
) -> Result<client::AuthResult, SockshError> {
    let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
    let key = PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg);
    Ok(handle.authenticate_publickey(user, key).await?)
}

async fn run_reconnect_loop(
    session: Arc<Session>,
    mut session_lost: oneshot::Receiver<()>,
    mut shutdown_rx: broadcast::Receiver<bool>,
) {
    let backoff = Duration::from_secs(session.config.reconnect_backoff_secs);

    loop {
        tokio::select! {
            _ = &mut session_lost => {}
            _ = shutdown_rx.recv() => return,
        }

        warn!(addr = %session.config.addr, "SSH session lost");
        session.handle.write().await.take();

        loop {
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = shutdown_rx.recv() => return,
            }

            info!(addr = %session.config.addr, "Reconnecting SSH session");
            let attempt = tokio::select! {
                attempt = establish(&session.config) => attempt,
                _ = shutdown_rx.recv() => return,
            };
            match attempt {
                Ok((handle, lost)) => {
                    *session.handle.write().await = Some(Arc::new(handle));
                    session_lost = lost;
                    info!(addr = %session.config.addr, "SSH session re-established");
                    break;
                }
                Err(e) => {
                    error!(addr = %session.config.addr, "SSH reconnect failed: {}", e);
                }
            }
        }
    }
}
