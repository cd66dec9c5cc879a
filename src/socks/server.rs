//! SOCKS5 server
//!
//! Binds a listener, accepts connections and runs one [`Session`] task per
//! client. Stopping the server ends the accept loop only; sessions already
//! running finish on their own.

use super::auth::Authenticator;
use super::session::{Session, SessionContext};
use crate::config::ServerConfig;
use crate::error::SockshError;
use crate::pool::BufferPool;
use crate::transport::{Dialer, SocketOpts};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Pause after a failed accept before trying again
const ACCEPT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// SOCKS5 server
#[derive(Debug)]
pub struct Server {
    context: Arc<SessionContext>,
    accept_opts: SocketOpts,
    running: Option<Running>,
}

#[derive(Debug)]
struct Running {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl Server {
    /// Create a server from its configuration and a dialer
    pub fn new(config: &ServerConfig, dialer: Dialer) -> Self {
        let authenticators = config.auth.iter().map(Authenticator::from).collect();
        let mut context = SessionContext::new(
            dialer,
            BufferPool::new(config.buffer_size, config.max_idle_buffers),
        )
        .with_authenticators(authenticators);
        context.reply_before_dial = config.reply_before_dial;

        Server {
            context: Arc::new(context),
            accept_opts: SocketOpts::for_accepted(Duration::from_secs(config.keepalive_secs)),
            running: None,
        }
    }

    /// Bind `addr` and start accepting in the background
    ///
    /// Returns the bound address, useful when `addr` asks for port 0.
    pub async fn start(&mut self, addr: &str) -> Result<SocketAddr, SockshError> {
        if let Some(running) = &self.running {
            return Err(SockshError::Config(format!(
                "server already listening on {}",
                running.local_addr
            )));
        }

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(
            "SOCKS5 server listening on {} ({} dialer)",
            local_addr,
            self.context.dialer.kind()
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            self.context.clone(),
            self.accept_opts.clone(),
            shutdown_rx,
        ));

        self.running = Some(Running {
            local_addr,
            shutdown_tx,
            accept_task,
        });
        Ok(local_addr)
    }

    /// Stop accepting connections
    ///
    /// Sessions already running are left to finish. Stopping a server that
    /// is not running does nothing.
    pub async fn stop(&mut self) -> Result<(), SockshError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        let _ = running.shutdown_tx.send(true);
        running
            .accept_task
            .await
            .map_err(|e| SockshError::Io(std::io::Error::other(e)))?;
        info!("SOCKS5 server on {} stopped", running.local_addr);
        Ok(())
    }

    /// Address the server listens on, while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Whether the accept loop is running
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Relay buffer pool shared by all sessions
    pub fn pool(&self) -> &BufferPool {
        &self.context.pool
    }
}

async fn accept_loop(
    listener: TcpListener,
    context: Arc<SessionContext>,
    accept_opts: SocketOpts,
    mut shutdown_rx: broadcast::Receiver<bool>,
) {
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = shutdown_rx.recv() => {
                debug!("Accept loop received shutdown signal");
                break;
            }
        };

        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                error!("Accept failed: {}", e);
                if pause_or_shutdown(ACCEPT_RETRY_DELAY, &mut shutdown_rx).await {
                    break;
                }
                continue;
            }
        };

        accept_opts.hint(&stream);
        debug!("Accepted connection from {}", peer);

        let session = Session::new(stream, context.clone(), peer);
        tokio::spawn(async move {
            // Outcome is logged by the session itself
            let _ = session.run().await;
        });
    }
}

/// Sleep for `delay`; true if shutdown was signalled first
async fn pause_or_shutdown(
    delay: Duration,
    shutdown_rx: &mut broadcast::Receiver<bool>,
) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown_rx.recv() => true,
    }
}
