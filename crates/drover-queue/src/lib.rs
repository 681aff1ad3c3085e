//! Client layer for the shared append-only work log.
//!
//! The log itself (storage, replication, claim liveness) is a broker
//! concern; this crate only exposes the consumer-group operations the
//! runner needs, in two flavors:
//! - [`RedisLog`] — Redis Streams consumer groups, the production broker;
//! - [`MemoryLog`] — an in-process log with the same claim/ack/delete
//!   semantics, used as the broker stand-in for tests and demos.
//!
//! Transient connectivity failures never escape this crate when the client
//! is wrapped in [`Retrying`]: operations are re-issued with clamped
//! exponential backoff.
mod error;
pub use error::{QueueError, QueueResult};

mod queue;
pub use queue::WorkQueue;

mod retry;
pub use retry::{RetryPolicy, Retrying};

mod memory;
pub use memory::{MemoryHub, MemoryLog};

mod stream;
pub use stream::{RedisLog, RedisLogConfig};
