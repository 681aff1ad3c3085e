use drover_model::MessageId;
use drover_queue::{QueueResult, WorkQueue};

/// Retire a processed entry: acknowledge, then delete.
///
/// Both operations are idempotent at the broker, so a crash between them
/// leaves at worst an acknowledged entry that the next removal attempt
/// cleans up.
pub async fn retire_entry<Q: WorkQueue + ?Sized>(queue: &Q, id: &MessageId) -> QueueResult<()> {
    queue.acknowledge(id).await?;
    queue.remove(id).await
}
