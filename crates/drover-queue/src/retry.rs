use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use drover_model::{Message, MessageId};

use crate::{QueueError, QueueResult, WorkQueue};

/// Exponential backoff schedule for transient broker failures.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Multiplier applied between consecutive delays.
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            first: Duration::from_millis(200),
            max: Duration::from_secs(5),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Compute the delay following `prev` (or the initial delay).
    pub fn next(&self, prev: Option<Duration>) -> Duration {
        match prev {
            None => self.first,
            Some(d) => {
                let next = (d.as_secs_f64() * self.factor).min(self.max.as_secs_f64());
                Duration::from_secs_f64(next)
            }
        }
    }
}

/// Wrapper that re-issues transient-failed operations forever.
///
/// Non-transient errors pass through untouched. Every retry is logged at
/// warn level with the operation name and the scheduled delay; a broker
/// that stays down therefore shows up as a steady warn stream rather than
/// a crashed runner.
pub struct Retrying<Q> {
    inner: Q,
    policy: RetryPolicy,
}

impl<Q> Retrying<Q> {
    /// Wrap a client with the given retry policy.
    pub fn new(inner: Q, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Access the wrapped client.
    pub fn inner(&self) -> &Q {
        &self.inner
    }

    async fn backoff(&self, op: &'static str, err: &QueueError, prev: Option<Duration>) -> Duration {
        let delay = self.policy.next(prev);
        warn!(op, error = %err, delay_ms = delay.as_millis() as u64, "broker operation failed; retrying");
        tokio::time::sleep(delay).await;
        delay
    }
}

#[async_trait]
impl<Q: WorkQueue> WorkQueue for Retrying<Q> {
    async fn ensure_group(&self) -> QueueResult<()> {
        let mut prev = None;
        loop {
            match self.inner.ensure_group().await {
                Err(e) if e.is_transient() => prev = Some(self.backoff("ensure_group", &e, prev).await),
                other => return other,
            }
        }
    }

    async fn read_next(&self, blocking: bool) -> QueueResult<Option<Message>> {
        let mut prev = None;
        loop {
            match self.inner.read_next(blocking).await {
                Err(e) if e.is_transient() => prev = Some(self.backoff("read_next", &e, prev).await),
                other => return other,
            }
        }
    }

    async fn acknowledge(&self, id: &MessageId) -> QueueResult<()> {
        let mut prev = None;
        loop {
            match self.inner.acknowledge(id).await {
                Err(e) if e.is_transient() => prev = Some(self.backoff("acknowledge", &e, prev).await),
                other => return other,
            }
        }
    }

    async fn remove(&self, id: &MessageId) -> QueueResult<()> {
        let mut prev = None;
        loop {
            match self.inner.remove(id).await {
                Err(e) if e.is_transient() => prev = Some(self.backoff("remove", &e, prev).await),
                other => return other,
            }
        }
    }
}
