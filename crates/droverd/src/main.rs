use std::sync::Arc;

use tracing::info;

use drover_core::RunnerCore;
use drover_exec::WorkerLauncher;
use drover_observe::init_logger;
use drover_prometheus::PrometheusMetrics;
use drover_queue::{RedisLog, RetryPolicy, Retrying};

mod settings;
mod signals;

use settings::RunnerSettings;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) settings + logger
    let settings = RunnerSettings::from_env()?;
    init_logger(&settings.logger)?;
    info!(
        stream = %settings.stream,
        group = %settings.group,
        consumer = %settings.consumer,
        capacity = settings.capacity,
        "droverd starting"
    );

    // 2) broker client with transparent transient-error retries
    let log = RedisLog::connect(settings.redis_config()).await?;
    let queue = Arc::new(Retrying::new(log, RetryPolicy::default()));

    // 3) worker launcher + metrics
    let launcher = WorkerLauncher::new(settings.worker_command()?)?;
    let metrics = Arc::new(PrometheusMetrics::new()?);

    // 4) runner core
    let runner = RunnerCore::new(queue, launcher, settings.runner_config(), metrics)?;

    // 5) OS signals request the same drain a producer `close` does
    let state = runner.state();
    tokio::spawn(async move {
        if signals::wait_for_shutdown_signal().await.is_ok() {
            info!("shutdown signal received; draining");
        }
        state.request_stop();
    });

    // 6) run to completion; a fault-threshold abort exits non-zero
    let outcome = runner.run().await?;
    if outcome.fatal {
        anyhow::bail!("runner aborted after repeated faults");
    }
    Ok(())
}
