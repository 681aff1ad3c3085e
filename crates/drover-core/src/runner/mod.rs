//! The runner lifecycle: `Listening → Draining → Stopped`.
//!
//! One `RunnerCore` owns one consumer identity within the shared group.
//! Any number of instances may run against the same log; the broker's
//! claim semantics keep each entry with exactly one of them at a time.
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use drover_exec::WorkerLauncher;
use drover_model::{IgnoreReason, Intent, JobParams, Message, MessageId, interpret};
use drover_queue::WorkQueue;

use crate::config::RunnerConfig;
use crate::error::CoreError;
use crate::faults::{FaultSignature, FaultTracker, ORIGIN_INTERPRET, ORIGIN_LAUNCH, ORIGIN_READ, ORIGIN_RETIRE};
use crate::metrics::MetricsHandle;
use crate::monitor::MonitorLoop;
use crate::retire::retire_entry;
use crate::state::{RunnerPhase, RunnerState};
use crate::supervisor::{JobSupervisor, LaunchError};

/// Terminal result of a runner's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOutcome {
    /// `true` when the runner drained because a fault threshold was
    /// exceeded; the process should exit non-zero.
    pub fatal: bool,
}

/// Orchestrates queue client, interpreter, fault tracker, supervisor and
/// monitor into one stop/drain lifecycle.
pub struct RunnerCore {
    queue: Arc<dyn WorkQueue>,
    supervisor: Arc<JobSupervisor>,
    faults: Arc<FaultTracker>,
    state: Arc<RunnerState>,
    metrics: MetricsHandle,
    config: RunnerConfig,
}

impl RunnerCore {
    /// Assemble a runner from its collaborators.
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        launcher: WorkerLauncher,
        config: RunnerConfig,
        metrics: MetricsHandle,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            queue,
            supervisor: Arc::new(JobSupervisor::new(launcher, config.capacity)),
            faults: Arc::new(FaultTracker::new(
                config.fault_threshold,
                config.fault_window,
            )),
            state: Arc::new(RunnerState::new(
                config.group.clone(),
                config.consumer.clone(),
            )),
            metrics,
            config,
        })
    }

    /// Shared lifecycle state, e.g. for wiring OS signals to
    /// [`RunnerState::request_stop`].
    pub fn state(&self) -> Arc<RunnerState> {
        Arc::clone(&self.state)
    }

    /// The worker registry; exposed for observation.
    pub fn supervisor(&self) -> Arc<JobSupervisor> {
        Arc::clone(&self.supervisor)
    }

    /// Drive the full lifecycle to completion.
    ///
    /// Listens until a stop is requested (producer `Shutdown`, external
    /// [`RunnerState::request_stop`], or fault threshold breach), then
    /// drains: no new reads, in-flight workers run to completion and are
    /// never preempted.
    pub async fn run(&self) -> Result<RunnerOutcome, CoreError> {
        self.queue.ensure_group().await?;

        let monitor_token = CancellationToken::new();
        let monitor = MonitorLoop::new(
            Arc::clone(&self.supervisor),
            Arc::clone(&self.queue),
            Arc::clone(&self.faults),
            Arc::clone(&self.state),
            Arc::clone(&self.metrics),
            self.config.poll_interval,
        );
        let monitor_handle = tokio::spawn(monitor.run(monitor_token.clone()));

        info!(
            group = %self.state.group(),
            consumer = %self.state.consumer(),
            capacity = self.supervisor.capacity(),
            "runner listening"
        );
        self.listen().await;

        self.state.set_phase(RunnerPhase::Draining);
        let pending = self.supervisor.running().await;
        info!(
            running = pending,
            fatal = self.state.is_fatal(),
            "draining; waiting for in-flight workers"
        );
        self.supervisor.wait_idle().await;

        monitor_token.cancel();
        let _ = monitor_handle.await;

        self.state.set_phase(RunnerPhase::Stopped);
        let outcome = RunnerOutcome {
            fatal: self.state.is_fatal(),
        };
        info!(fatal = outcome.fatal, "runner stopped");
        Ok(outcome)
    }

    async fn listen(&self) {
        while !self.state.stop_requested() {
            let msg = tokio::select! {
                _ = self.state.stopped() => break,
                res = self.queue.read_next(true) => match res {
                    Ok(Some(msg)) => msg,
                    Ok(None) => continue,
                    Err(e) => {
                        error!(error = %e, "failed to read from work log");
                        self.fault(ORIGIN_READ, e.as_label());
                        continue;
                    }
                },
            };
            self.dispatch(msg).await;
        }
    }

    async fn dispatch(&self, msg: Message) {
        match interpret(&msg) {
            Intent::Launch { channel, params } => {
                self.dispatch_launch(msg.id().clone(), channel, params).await;
            }
            Intent::Shutdown => {
                info!(message_id = %msg.id(), "shutdown requested by producer");
                self.retire(msg.id()).await;
                self.state.request_stop();
            }
            Intent::Ignore { reason } => {
                self.dispatch_ignore(msg.id(), reason).await;
            }
        }
    }

    async fn dispatch_launch(&self, id: MessageId, channel: String, params: JobParams) {
        loop {
            match self.supervisor.try_launch(id.clone(), &channel, &params).await {
                Ok(()) => {
                    self.metrics.record_job_started();
                    return;
                }
                Err(LaunchError::CapacityExceeded { capacity }) => {
                    // Back-pressure: the entry stays claimed but
                    // unacknowledged while reads are paused.
                    debug!(
                        message_id = %id,
                        capacity,
                        "at capacity; holding message until a slot frees"
                    );
                    tokio::select! {
                        _ = self.supervisor.wait_capacity() => continue,
                        _ = self.state.stopped() => return,
                    }
                }
                Err(LaunchError::Spawn(e)) => {
                    error!(
                        message_id = %id,
                        channel = %channel,
                        error = %e,
                        "failed to spawn worker"
                    );
                    self.fault(ORIGIN_LAUNCH, e.as_label());
                    // The message itself was well-formed; dispatch was
                    // attempted, so the entry is still retired.
                    self.retire(&id).await;
                    return;
                }
            }
        }
    }

    async fn dispatch_ignore(&self, id: &MessageId, reason: IgnoreReason) {
        if reason.is_malformed() {
            warn!(message_id = %id, reason = ?reason, "ignoring malformed message");
            self.fault(ORIGIN_INTERPRET, reason.as_label());
        } else {
            debug!(message_id = %id, reason = ?reason, "ignoring message");
        }
        self.retire(id).await;
    }

    async fn retire(&self, id: &MessageId) {
        if let Err(e) = retire_entry(self.queue.as_ref(), id).await {
            error!(message_id = %id, error = %e, "failed to retire entry");
            self.fault(ORIGIN_RETIRE, e.as_label());
        }
    }

    fn fault(&self, origin: &'static str, kind: &'static str) {
        self.metrics.record_fault(origin, kind);
        if self.faults.record(FaultSignature::new(origin, kind)) {
            error!(origin, kind, "fault threshold exceeded; aborting");
            self.state.fatal_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use drover_exec::{WorkerCommand, WorkerLauncher};
    use drover_model::Fields;
    use drover_queue::{MemoryHub, MemoryLog};

    use super::RunnerCore;
    use crate::config::RunnerConfig;
    use crate::metrics::noop_metrics;
    use crate::state::RunnerPhase;

    const GROUP: &str = "runners";

    fn sh_launcher(script: &str) -> WorkerLauncher {
        WorkerLauncher::new(WorkerCommand::new("/bin/sh").with_args(["-c", script, "--"]))
            .expect("valid command")
    }

    fn runner(hub: &Arc<MemoryHub>, launcher: WorkerLauncher, cfg: RunnerConfig) -> Arc<RunnerCore> {
        let queue = Arc::new(MemoryLog::new(hub.clone(), GROUP, cfg.consumer.clone()));
        Arc::new(RunnerCore::new(queue, launcher, cfg, noop_metrics()).expect("valid config"))
    }

    fn fast_config(consumer: &str) -> RunnerConfig {
        RunnerConfig::new(GROUP, consumer).with_poll_interval(Duration::from_millis(20))
    }

    fn launch(hub: &Arc<MemoryHub>, channel: &str) -> drover_model::MessageId {
        let fields: Fields = [
            ("action", "launch"),
            ("parameters", &format!(r#"{{"channel":"{channel}"}}"#) as &str),
        ]
        .into_iter()
        .collect();
        hub.publish(fields)
    }

    fn close(hub: &Arc<MemoryHub>) -> drover_model::MessageId {
        hub.publish([("action", "close")].into_iter().collect())
    }

    #[tokio::test]
    async fn launch_then_close_drains_and_exits_clean() {
        let hub = MemoryHub::new();
        let core = runner(
            &hub,
            sh_launcher("sleep 0.2; exit 0"),
            fast_config("runner-1").with_capacity(1),
        );

        launch(&hub, "eval-1");
        close(&hub);

        let started = Instant::now();
        let outcome = tokio::time::timeout(Duration::from_secs(5), core.run())
            .await
            .expect("runner should stop")
            .unwrap();

        assert!(!outcome.fatal);
        assert!(
            started.elapsed() >= Duration::from_millis(200),
            "drain must wait for the in-flight worker"
        );
        assert!(hub.is_empty(), "both entries retired");
        assert_eq!(core.state().phase(), RunnerPhase::Stopped);
    }

    #[tokio::test]
    async fn second_launch_waits_for_capacity() {
        let hub = MemoryHub::new();
        let core = runner(
            &hub,
            sh_launcher("sleep 0.4; exit 0"),
            fast_config("runner-1").with_capacity(1),
        );

        launch(&hub, "eval-1");
        let second = launch(&hub, "eval-2");

        let handle = {
            let core = core.clone();
            tokio::spawn(async move { core.run().await })
        };

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(hub.contains(&second), "second entry must not be retired yet");
        assert_eq!(
            hub.claim_holder(GROUP, &second).as_deref(),
            Some("runner-1"),
            "second entry is held unacknowledged while at capacity"
        );
        assert_eq!(core.supervisor().running().await, 1, "no second worker yet");

        close(&hub);
        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("runner should stop")
            .unwrap()
            .unwrap();

        assert!(!outcome.fatal);
        assert!(hub.is_empty(), "all entries retired after both workers ran");
    }

    #[tokio::test]
    async fn nonzero_exit_still_retires_the_entry() {
        let hub = MemoryHub::new();
        let core = runner(
            &hub,
            sh_launcher("exit 3"),
            fast_config("runner-1").with_capacity(1),
        );

        launch(&hub, "eval-1");
        close(&hub);

        let outcome = tokio::time::timeout(Duration::from_secs(5), core.run())
            .await
            .expect("runner should stop")
            .unwrap();

        assert!(!outcome.fatal, "a failed job is not a systemic failure");
        assert!(hub.is_empty(), "retirement ignores the exit code");
    }

    #[tokio::test]
    async fn repeated_malformed_messages_abort_fatally() {
        let hub = MemoryHub::new();
        let core = runner(
            &hub,
            sh_launcher("exit 0"),
            fast_config("runner-1").with_fault_threshold(3),
        );

        for _ in 0..3 {
            hub.publish([("action", "launch")].into_iter().collect());
        }

        let outcome = tokio::time::timeout(Duration::from_secs(5), core.run())
            .await
            .expect("fault threshold should stop the runner")
            .unwrap();

        assert!(outcome.fatal);
        assert!(hub.is_empty(), "malformed entries are still retired");
    }

    #[tokio::test]
    async fn spawn_failure_retires_message_without_fatal() {
        let hub = MemoryHub::new();
        let launcher = WorkerLauncher::new(WorkerCommand::new("/nonexistent/drover-worker"))
            .expect("template is syntactically fine");
        let core = runner(&hub, launcher, fast_config("runner-1").with_fault_threshold(10));

        let id = launch(&hub, "eval-1");
        close(&hub);

        let outcome = tokio::time::timeout(Duration::from_secs(5), core.run())
            .await
            .expect("runner should stop")
            .unwrap();

        assert!(!outcome.fatal);
        assert!(!hub.contains(&id), "well-formed message retired despite spawn failure");
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn external_stop_request_drains() {
        let hub = MemoryHub::new();
        let core = runner(
            &hub,
            sh_launcher("sleep 0.3; exit 0"),
            fast_config("runner-1").with_capacity(2),
        );

        launch(&hub, "eval-1");

        let handle = {
            let core = core.clone();
            tokio::spawn(async move { core.run().await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        core.state().request_stop();

        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("runner should stop")
            .unwrap()
            .unwrap();

        assert!(!outcome.fatal);
        assert!(hub.is_empty(), "in-flight worker finished and was retired");
    }

    #[tokio::test]
    async fn two_instances_share_one_log_safely() {
        let hub = MemoryHub::new();
        let a = runner(
            &hub,
            sh_launcher("sleep 0.1; exit 0"),
            fast_config("runner-a").with_capacity(1),
        );
        let b = runner(
            &hub,
            sh_launcher("sleep 0.1; exit 0"),
            fast_config("runner-b").with_capacity(1),
        );

        for i in 0..3 {
            launch(&hub, &format!("eval-{i}"));
        }
        // One close per instance; each is claimed by exactly one consumer.
        close(&hub);
        close(&hub);

        let ha = {
            let a = a.clone();
            tokio::spawn(async move { a.run().await })
        };
        let hb = {
            let b = b.clone();
            tokio::spawn(async move { b.run().await })
        };

        let (ra, rb) = tokio::time::timeout(Duration::from_secs(10), async {
            (ha.await.unwrap(), hb.await.unwrap())
        })
        .await
        .expect("both runners should stop");

        assert!(!ra.unwrap().fatal);
        assert!(!rb.unwrap().fatal);
        assert!(hub.is_empty(), "every entry retired exactly once");
    }

    #[tokio::test]
    async fn unknown_actions_are_ignored_without_fatal() {
        let hub = MemoryHub::new();
        let core = runner(
            &hub,
            sh_launcher("exit 0"),
            fast_config("runner-1").with_fault_threshold(2),
        );

        for _ in 0..4 {
            hub.publish([("action", "reboot")].into_iter().collect());
        }
        close(&hub);

        let outcome = tokio::time::timeout(Duration::from_secs(5), core.run())
            .await
            .expect("runner should stop")
            .unwrap();

        assert!(!outcome.fatal, "benign ignores never count as faults");
        assert!(hub.is_empty());
    }
}
