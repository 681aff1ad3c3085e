use async_trait::async_trait;

use drover_model::{Message, MessageId};

use crate::QueueResult;

/// Consumer-group view of the shared work log.
///
/// A client is bound to one (stream, group, consumer) triple at
/// construction time. Entries are delivered to at most one group member at
/// a time; that mutual exclusion is the broker's guarantee and is not
/// re-implemented here.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Idempotently create the consumer group, reading from the start of
    /// the log. A group that already exists is left untouched.
    async fn ensure_group(&self) -> QueueResult<()>;

    /// Read the next entry not yet claimed within the group, implicitly
    /// claiming it for this consumer. Entries abandoned by dead consumers
    /// become claimable again per the broker's own liveness policy and are
    /// preferred over new ones.
    ///
    /// With `blocking`, the call parks until an entry arrives or the
    /// client's block interval elapses; `None` means "nothing yet" and the
    /// caller simply re-issues the read.
    async fn read_next(&self, blocking: bool) -> QueueResult<Option<Message>>;

    /// Mark the entry processed for this group; it will not be redelivered
    /// to any group member.
    async fn acknowledge(&self, id: &MessageId) -> QueueResult<()>;

    /// Permanently delete the entry from the log. Removing an id that no
    /// longer exists is not an error.
    async fn remove(&self, id: &MessageId) -> QueueResult<()>;
}
