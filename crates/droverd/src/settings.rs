//! Environment-sourced daemon settings.
//!
//! Every knob has a default suitable for a local broker; deployments
//! override via `DROVER_*` variables. Durations are given in
//! milliseconds.
use std::time::Duration;

use anyhow::{Context, bail};
use uuid::Uuid;

use drover_core::RunnerConfig;
use drover_exec::WorkerCommand;
use drover_observe::LoggerConfig;
use drover_queue::RedisLogConfig;

/// Everything droverd needs to assemble a runner.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// `DROVER_BROKER_URL` — broker address.
    pub broker_url: String,
    /// `DROVER_STREAM` — stream key holding the work log.
    pub stream: String,
    /// `DROVER_GROUP` — consumer group shared by all instances.
    pub group: String,
    /// `DROVER_CONSUMER` — this instance's consumer name; defaults to a
    /// fresh `drover-<uuid>` so parallel instances never collide.
    pub consumer: String,
    /// `DROVER_CAPACITY` — max concurrent workers.
    pub capacity: usize,
    /// `DROVER_FAULT_THRESHOLD` — identical faults per window to abort.
    pub fault_threshold: u32,
    /// `DROVER_FAULT_WINDOW_MS` — fault window length.
    pub fault_window: Duration,
    /// `DROVER_POLL_INTERVAL_MS` — worker completion poll interval.
    pub poll_interval: Duration,
    /// `DROVER_BLOCK_MS` — upper bound for one blocking read.
    pub block: Duration,
    /// `DROVER_CLAIM_IDLE_MS` — idle time before another consumer's
    /// claim counts as abandoned.
    pub claim_min_idle: Duration,
    /// `DROVER_WORKER_CMD` — worker command line, whitespace-split into
    /// program and fixed arguments.
    pub worker_cmd: String,
    /// `DROVER_LOG_FORMAT` / `DROVER_LOG_LEVEL`.
    pub logger: LoggerConfig,
}

impl RunnerSettings {
    /// Load settings from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut logger = LoggerConfig::default();
        if let Some(format) = lookup("DROVER_LOG_FORMAT") {
            logger.format = format
                .parse()
                .with_context(|| format!("DROVER_LOG_FORMAT={format}"))?;
        }
        if let Some(level) = lookup("DROVER_LOG_LEVEL") {
            logger.level = level
                .parse()
                .with_context(|| format!("DROVER_LOG_LEVEL={level}"))?;
        }

        Ok(Self {
            broker_url: lookup("DROVER_BROKER_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379/0".to_string()),
            stream: lookup("DROVER_STREAM").unwrap_or_else(|| "drover:work".to_string()),
            group: lookup("DROVER_GROUP").unwrap_or_else(|| "drover-runners".to_string()),
            consumer: lookup("DROVER_CONSUMER")
                .unwrap_or_else(|| format!("drover-{}", Uuid::new_v4())),
            capacity: parse(&lookup, "DROVER_CAPACITY", 4)?,
            fault_threshold: parse(&lookup, "DROVER_FAULT_THRESHOLD", 5)?,
            fault_window: parse_ms(&lookup, "DROVER_FAULT_WINDOW_MS", 60_000)?,
            poll_interval: parse_ms(&lookup, "DROVER_POLL_INTERVAL_MS", 250)?,
            block: parse_ms(&lookup, "DROVER_BLOCK_MS", 1_000)?,
            claim_min_idle: parse_ms(&lookup, "DROVER_CLAIM_IDLE_MS", 30_000)?,
            worker_cmd: lookup("DROVER_WORKER_CMD").unwrap_or_else(|| "drover-worker".to_string()),
            logger,
        })
    }

    /// Runner configuration slice of these settings.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig::new(self.group.clone(), self.consumer.clone())
            .with_capacity(self.capacity)
            .with_fault_threshold(self.fault_threshold)
            .with_fault_window(self.fault_window)
            .with_poll_interval(self.poll_interval)
    }

    /// Broker client configuration slice of these settings.
    pub fn redis_config(&self) -> RedisLogConfig {
        RedisLogConfig {
            url: self.broker_url.clone(),
            stream: self.stream.clone(),
            group: self.group.clone(),
            consumer: self.consumer.clone(),
            block: self.block,
            claim_min_idle: self.claim_min_idle,
        }
    }

    /// Worker launch template: first word is the program, the rest are
    /// fixed arguments.
    pub fn worker_command(&self) -> anyhow::Result<WorkerCommand> {
        let mut words = self.worker_cmd.split_whitespace();
        let Some(program) = words.next() else {
            bail!("DROVER_WORKER_CMD must name a worker executable");
        };
        Ok(WorkerCommand::new(program).with_args(words))
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key}={raw}")),
        None => Ok(default),
    }
}

fn parse_ms(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default_ms: u64,
) -> anyhow::Result<Duration> {
    Ok(Duration::from_millis(parse(lookup, key, default_ms)?))
}
