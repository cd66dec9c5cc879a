//! Full-duplex relay between a client and its upstream connection
//!
//! Two copy loops run concurrently, one per direction, each with its own
//! buffer borrowed from the shared [`BufferPool`]. Whichever loop ends
//! first (EOF or I/O error) raises a stop signal that unblocks the other,
//! so both buffers go back to the pool and both connections are dropped.
//! Nothing is retried.
//!
//! [`pipe`] is the half-close aware variant for local byte pipes, where one
//! side finishing its input must not cut off the response.

use crate::pool::BufferPool;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::debug;

/// Bytes moved in each direction by one relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from the client to the upstream
    pub client_to_upstream: u64,
    /// Bytes copied from the upstream to the client
    pub upstream_to_client: u64,
}

/// Relay bytes between `client` and `upstream` until either side ends
///
/// Returns once both directions have stopped. I/O errors end the relay
/// but are only logged.
pub async fn relay<A, B>(client: A, upstream: B, pool: &BufferPool) -> RelayStats
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = tokio::io::split(upstream);
    let (stop_tx, stop_rx) = watch::channel(false);

    let (up, down) = tokio::join!(
        copy_until_stopped(client_read, upstream_write, pool, &stop_tx, stop_rx.clone()),
        copy_until_stopped(upstream_read, client_write, pool, &stop_tx, stop_rx),
    );

    let stats = RelayStats {
        client_to_upstream: finish("client->upstream", up),
        upstream_to_client: finish("upstream->client", down),
    };
    debug!(
        up = stats.client_to_upstream,
        down = stats.upstream_to_client,
        "Relay finished"
    );
    stats
}

/// Copy between `local` and `tunnel` until both directions have ended
///
/// EOF on one side only shuts down the write half of the other, so data
/// still coming back after the local input ended is delivered.
pub async fn pipe<A, B>(mut local: A, mut tunnel: B) -> io::Result<RelayStats>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (sent, received) = tokio::io::copy_bidirectional(&mut local, &mut tunnel).await?;
    Ok(RelayStats {
        client_to_upstream: sent,
        upstream_to_client: received,
    })
}

fn finish(direction: &str, result: (u64, io::Result<()>)) -> u64 {
    let (copied, outcome) = result;
    if let Err(e) = outcome {
        debug!("{} error after {} bytes: {}", direction, copied, e);
    }
    copied
}

/// One direction of the relay
///
/// Always raises the stop signal on exit, whatever ended the loop.
async fn copy_until_stopped<R, W>(
    mut reader: R,
    mut writer: W,
    pool: &BufferPool,
    stop_tx: &watch::Sender<bool>,
    mut stop_rx: watch::Receiver<bool>,
) -> (u64, io::Result<()>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = pool.acquire();
    let mut copied = 0u64;

    let outcome: io::Result<()> = async {
        loop {
            let n = tokio::select! {
                read = reader.read(&mut buf[..]) => read?,
                _ = stop_rx.changed() => return Ok::<(), io::Error>(()),
            };
            if n == 0 {
                return Ok(());
            }
            tokio::select! {
                written = writer.write_all(&buf[..n]) => written?,
                _ = stop_rx.changed() => return Ok(()),
            }
            copied += n as u64;
        }
    }
    .await;

    let _ = stop_tx.send(true);
    let _ = writer.shutdown().await;
    (copied, outcome)
}
