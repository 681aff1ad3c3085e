//! Capacity-capped worker registry.
//!
//! The supervisor binds every spawned worker process to the log entry that
//! caused it. Insertion (dispatch path) and removal (monitor loop) run on
//! different execution contexts, so the registry lives behind a mutex and
//! occupancy changes are broadcast over a watch channel for the
//! back-pressure and drain waits.
use std::collections::HashMap;
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use drover_exec::{ExecError, WorkerLauncher, WorkerProcess};
use drover_model::{JobParams, MessageId};

/// Why a launch did not happen.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// All worker slots are busy; the triggering message must not be
    /// consumed yet.
    #[error("all {capacity} worker slots are busy")]
    CapacityExceeded { capacity: usize },

    /// The worker process could not be started. The message itself was
    /// well-formed, so the caller still retires it.
    #[error(transparent)]
    Spawn(#[from] ExecError),
}

struct JobRecord {
    channel: String,
    process: WorkerProcess,
    started_at: Instant,
}

/// A worker that has exited and left the registry.
#[derive(Debug)]
pub struct FinishedJob {
    /// Log entry that caused the launch; retired by the monitor loop.
    pub message_id: MessageId,
    /// Routing key the worker was launched for.
    pub channel: String,
    /// Raw exit status; only its success bit is interpreted.
    pub status: ExitStatus,
    /// Wall-clock time between spawn and observed exit.
    pub runtime: Duration,
}

/// Spawns workers and tracks the live ones, bounded by a capacity cap.
pub struct JobSupervisor {
    capacity: usize,
    launcher: WorkerLauncher,
    running: Mutex<HashMap<MessageId, JobRecord>>,
    occupancy: watch::Sender<usize>,
}

impl JobSupervisor {
    /// Create a supervisor enforcing `capacity` concurrent workers.
    ///
    /// `capacity >= 1` is enforced by [`crate::RunnerConfig::validate`].
    pub fn new(launcher: WorkerLauncher, capacity: usize) -> Self {
        let (occupancy, _) = watch::channel(0);
        Self {
            capacity,
            launcher,
            running: Mutex::new(HashMap::new()),
            occupancy,
        }
    }

    /// The configured concurrency cap.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live workers.
    pub async fn running(&self) -> usize {
        self.running.lock().await.len()
    }

    /// Spawn a worker for `message_id` unless the cap is reached.
    ///
    /// The capacity check, the spawn (a fast fork/exec step) and the
    /// registration happen under one lock acquisition, so the number of
    /// registered workers can never exceed the cap.
    pub async fn try_launch(
        &self,
        message_id: MessageId,
        channel: &str,
        params: &JobParams,
    ) -> Result<(), LaunchError> {
        let mut running = self.running.lock().await;
        if running.len() >= self.capacity {
            return Err(LaunchError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let process = self.launcher.spawn(channel, params)?;
        debug!(
            message_id = %message_id,
            channel = %channel,
            pid = process.pid(),
            running = running.len() + 1,
            "worker spawned"
        );

        running.insert(
            message_id,
            JobRecord {
                channel: channel.to_string(),
                process,
                started_at: Instant::now(),
            },
        );
        self.occupancy.send_replace(running.len());
        Ok(())
    }

    /// Poll every live worker once and remove those that exited.
    ///
    /// A failed poll leaves the record in place to be retried on the next
    /// tick. Each removal frees one capacity unit and wakes waiters.
    pub async fn reap_finished(&self) -> Vec<FinishedJob> {
        let mut running = self.running.lock().await;

        let mut exited = Vec::new();
        for (id, record) in running.iter_mut() {
            match record.process.try_wait() {
                Ok(Some(status)) => exited.push((id.clone(), status)),
                Ok(None) => {}
                Err(e) => {
                    warn!(message_id = %id, error = %e, "failed to poll worker; will retry");
                }
            }
        }

        let mut finished = Vec::with_capacity(exited.len());
        for (id, status) in exited {
            if let Some(record) = running.remove(&id) {
                finished.push(FinishedJob {
                    message_id: id,
                    channel: record.channel,
                    status,
                    runtime: record.started_at.elapsed(),
                });
            }
        }
        if !finished.is_empty() {
            self.occupancy.send_replace(running.len());
        }
        finished
    }

    /// Park until at least one worker slot is free.
    pub async fn wait_capacity(&self) {
        let mut rx = self.occupancy.subscribe();
        let capacity = self.capacity;
        let _ = rx.wait_for(|n| *n < capacity).await;
    }

    /// Park until no workers are running.
    pub async fn wait_idle(&self) {
        let mut rx = self.occupancy.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}
