use std::sync::Arc;

/// How a worker process terminated, for metrics classification.
///
/// Only the exit code's success bit is interpreted; there is no richer
/// result channel between workers and the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Worker exited with code 0.
    Succeeded,
    /// Worker exited non-zero or was terminated by a signal.
    Failed,
}

impl JobOutcome {
    /// Classify an exit's success bit.
    #[inline]
    pub fn from_exit(success: bool) -> Self {
        if success {
            JobOutcome::Succeeded
        } else {
            JobOutcome::Failed
        }
    }

    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed => "failed",
        }
    }
}

/// Backend metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record a worker launch.
    fn record_job_started(&self);

    /// Record a worker completion with outcome and wall-clock duration.
    fn record_job_completed(&self, outcome: JobOutcome, duration_ms: u64);

    /// Record one fault-signature occurrence.
    ///
    /// Labels are bounded: `origin` is one of the fixed check sites and
    /// `kind` is a stable error label.
    fn record_fault(&self, origin: &str, kind: &str);
}

/// Shared handle to a metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
