//! Buffer pool module for socksh
//!
//! Relay loops borrow their copy buffers from a shared [`BufferPool`]
//! instead of allocating one per connection.

mod buffer;
mod stats;

pub use buffer::{BufferPool, PooledBuffer};
pub use stats::{PoolStats, PoolStatsSnapshot};
