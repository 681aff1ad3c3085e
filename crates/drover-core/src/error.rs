use thiserror::Error;

use drover_queue::QueueError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid runner configuration: {0}")]
    Config(String),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}
