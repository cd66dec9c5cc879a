//! Reusable relay buffers
//!
//! A [`BufferPool`] hands out fixed-size byte buffers wrapped in a
//! [`PooledBuffer`] guard. Dropping the guard puts the buffer back on the
//! idle list, so steady-state relaying does not allocate. Buffers are
//! handed out exclusively; two guards never alias the same memory.

use super::stats::{PoolStats, PoolStatsSnapshot};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

struct Inner {
    buffer_size: usize,
    max_idle: usize,
    idle: Mutex<Vec<Vec<u8>>>,
    stats: PoolStats,
}

impl Inner {
    fn idle(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        // A panic while holding the lock cannot leave the list inconsistent
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Pool of equally sized byte buffers
///
/// Cloning is cheap and yields a handle to the same pool.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

impl BufferPool {
    /// Create a pool of `buffer_size` byte buffers keeping at most
    /// `max_idle` of them for reuse
    pub fn new(buffer_size: usize, max_idle: usize) -> Self {
        BufferPool {
            inner: Arc::new(Inner {
                buffer_size,
                max_idle,
                idle: Mutex::new(Vec::new()),
                stats: PoolStats::new(),
            }),
        }
    }

    /// Take a buffer, reusing an idle one when available
    pub fn acquire(&self) -> PooledBuffer {
        let reused = {
            let mut idle = self.inner.idle();
            let buf = idle.pop();
            self.inner.stats.set_idle_count(idle.len());
            buf
        };

        let buf = match reused {
            Some(buf) => buf,
            None => {
                self.inner.stats.record_created();
                trace!(size = self.inner.buffer_size, "Allocating relay buffer");
                vec![0u8; self.inner.buffer_size]
            }
        };
        self.inner.stats.record_acquired();

        PooledBuffer {
            buf: Some(buf),
            pool: self.inner.clone(),
        }
    }

    /// Size of every buffer handed out
    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new(crate::socks::consts::RELAY_BUFFER_SIZE, 64)
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("buffer_size", &self.inner.buffer_size)
            .field("max_idle", &self.inner.max_idle)
            .field("stats", &self.inner.stats.snapshot())
            .finish()
    }
}

/// RAII guard that returns the buffer to its pool on drop
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: Arc<Inner>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buf.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let Some(buf) = self.buf.take() else {
            return;
        };
        self.pool.stats.record_released();

        let mut idle = self.pool.idle();
        if idle.len() < self.pool.max_idle {
            idle.push(buf);
        } else {
            self.pool.stats.record_discarded();
        }
        self.pool.stats.set_idle_count(idle.len());
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer").field("len", &self.len()).finish()
    }
}
