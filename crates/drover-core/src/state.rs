use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::info;

/// Lifecycle phase of a runner instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    /// Accepting and dispatching new messages.
    Listening,
    /// No new reads; waiting for in-flight workers to finish.
    Draining,
    /// Terminal.
    Stopped,
}

impl RunnerPhase {
    /// Returns the phase as a static string for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunnerPhase::Listening => "listening",
            RunnerPhase::Draining => "draining",
            RunnerPhase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunnerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Shared runner lifecycle state.
///
/// Constructed once per runner and passed by reference to both execution
/// contexts (dispatch path and monitor loop). The stop token is the single
/// interruption point for the blocking read: a producer `Shutdown`, an OS
/// signal and a fault-threshold breach all cancel it.
pub struct RunnerState {
    group: String,
    consumer: String,
    stop: CancellationToken,
    fatal: AtomicBool,
    phase: Mutex<RunnerPhase>,
}

impl RunnerState {
    /// Create state for a fresh runner in [`RunnerPhase::Listening`].
    pub fn new(group: impl Into<String>, consumer: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            consumer: consumer.into(),
            stop: CancellationToken::new(),
            fatal: AtomicBool::new(false),
            phase: Mutex::new(RunnerPhase::Listening),
        }
    }

    /// Consumer group this runner reads within.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// This instance's consumer name.
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// Request a clean drain: stop accepting work, let workers finish.
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Request a drain due to a systemic failure; the eventual exit code
    /// will be non-zero.
    pub fn fatal_stop(&self) {
        self.fatal.store(true, Ordering::SeqCst);
        self.stop.cancel();
    }

    /// Whether a stop (clean or fatal) has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Resolves once a stop has been requested; used to interrupt
    /// blocking reads and capacity waits.
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.stop.cancelled()
    }

    /// Whether the runner is stopping because of a systemic failure.
    pub fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::SeqCst)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RunnerPhase {
        *self.phase.lock().expect("phase lock poisoned")
    }

    /// Advance the lifecycle phase.
    pub fn set_phase(&self, next: RunnerPhase) {
        let mut phase = self.phase.lock().expect("phase lock poisoned");
        if *phase != next {
            info!(group = %self.group, consumer = %self.consumer, from = %phase, to = %next, "phase change");
            *phase = next;
        }
    }
}
