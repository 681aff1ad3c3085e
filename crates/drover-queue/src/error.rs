use thiserror::Error;

/// Errors produced by work-log clients.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Connectivity hiccup; safe to retry with backoff.
    #[error("transient broker error: {0}")]
    Transient(String),

    /// The broker answered, but not in the shape we expect.
    #[error("broker protocol error: {0}")]
    Protocol(String),

    /// Client-side configuration problem; retrying cannot help.
    #[error("invalid queue configuration: {0}")]
    Config(String),
}

impl QueueError {
    /// Whether the operation should be re-issued with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, QueueError::Transient(_))
    }

    /// Returns a short stable label (snake_case) for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Transient(_) => "broker_transient",
            QueueError::Protocol(_) => "broker_protocol",
            QueueError::Config(_) => "queue_config",
        }
    }
}

pub type QueueResult<T> = Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::QueueError;

    #[test]
    fn only_transient_is_retryable() {
        assert!(QueueError::Transient("reset".into()).is_transient());
        assert!(!QueueError::Protocol("bad reply".into()).is_transient());
        assert!(!QueueError::Config("empty stream".into()).is_transient());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(QueueError::Transient("x".into()).as_label(), "broker_transient");
        assert_eq!(QueueError::Protocol("x".into()).as_label(), "broker_protocol");
        assert_eq!(QueueError::Config("x".into()).as_label(), "queue_config");
    }
}
