//! Background completion monitor.
//!
//! Polls every live worker at a fixed interval (a non-blocking
//! `try_wait`, since uniform exit notification is not available
//! cross-platform) and retires each finished worker's origin entry.
//! Retirement happens regardless of exit code: dispatch is the
//! exactly-once unit here, and a failed domain computation is reported
//! through logs and metrics, never redelivered by this loop.
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use drover_queue::WorkQueue;

use crate::faults::{FaultSignature, FaultTracker, ORIGIN_RETIRE};
use crate::metrics::{JobOutcome, MetricsHandle};
use crate::retire::retire_entry;
use crate::state::RunnerState;
use crate::supervisor::{FinishedJob, JobSupervisor};

/// Poll-and-retire loop; runs on its own task until cancelled.
pub struct MonitorLoop {
    supervisor: Arc<JobSupervisor>,
    queue: Arc<dyn WorkQueue>,
    faults: Arc<FaultTracker>,
    state: Arc<RunnerState>,
    metrics: MetricsHandle,
    poll_interval: Duration,
}

impl MonitorLoop {
    /// Assemble a monitor over the shared runner pieces.
    pub fn new(
        supervisor: Arc<JobSupervisor>,
        queue: Arc<dyn WorkQueue>,
        faults: Arc<FaultTracker>,
        state: Arc<RunnerState>,
        metrics: MetricsHandle,
        poll_interval: Duration,
    ) -> Self {
        Self {
            supervisor,
            queue,
            faults,
            state,
            metrics,
            poll_interval,
        }
    }

    /// Run until `cancel` fires.
    ///
    /// Cancellation is only observed between ticks, so a retirement in
    /// progress always completes before the loop exits.
    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    for job in self.supervisor.reap_finished().await {
                        self.retire(job).await;
                    }
                }
            }
        }
    }

    async fn retire(&self, job: FinishedJob) {
        let runtime_ms = job.runtime.as_millis() as u64;
        match job.status.code() {
            Some(0) => info!(
                message_id = %job.message_id,
                channel = %job.channel,
                runtime_ms,
                "worker finished"
            ),
            Some(code) => warn!(
                message_id = %job.message_id,
                channel = %job.channel,
                runtime_ms,
                code,
                "worker exited non-zero"
            ),
            None => warn!(
                message_id = %job.message_id,
                channel = %job.channel,
                runtime_ms,
                "worker terminated by signal"
            ),
        }
        self.metrics
            .record_job_completed(JobOutcome::from_exit(job.status.success()), runtime_ms);

        if let Err(e) = retire_entry(self.queue.as_ref(), &job.message_id).await {
            error!(message_id = %job.message_id, error = %e, "failed to retire entry");
            self.metrics.record_fault(ORIGIN_RETIRE, e.as_label());
            if self
                .faults
                .record(FaultSignature::new(ORIGIN_RETIRE, e.as_label()))
            {
                error!(origin = ORIGIN_RETIRE, kind = e.as_label(), "fault threshold exceeded; aborting");
                self.state.fatal_stop();
            }
        }
    }
}
