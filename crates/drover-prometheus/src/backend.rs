use std::sync::Arc;

use prometheus::{Counter, CounterVec, Histogram, HistogramOpts, Opts, Registry, proto::MetricFamily};

use drover_core::{JobOutcome, MetricsBackend};

/// Prometheus metrics backend for drover.
///
/// Implements [`MetricsBackend`] and exposes metrics that can be scraped
/// via an HTTP endpoint owned by the embedding application.
///
/// ## Label cardinality
/// All labels are bounded (low cardinality):
/// - `outcome`: "succeeded", "failed"
/// - `origin`: the fixed fault check sites ("interpret", "launch", ...)
/// - `kind`: stable error labels ("malformed_message", "spawn_failed", ...)
#[derive(Clone)]
pub struct PrometheusMetrics {
    jobs_started: Counter,
    jobs_completed: CounterVec,
    job_duration: Histogram,
    faults: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a new prometheus metrics backend with a custom registry.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let jobs_started = Counter::with_opts(Opts::new(
            "drover_jobs_started_total",
            "Total number of workers launched",
        ))?;
        registry.register(Box::new(jobs_started.clone()))?;

        let jobs_completed = CounterVec::new(
            Opts::new(
                "drover_jobs_completed_total",
                "Total number of workers that exited",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(jobs_completed.clone()))?;

        let job_duration = Histogram::with_opts(
            HistogramOpts::new(
                "drover_job_duration_seconds",
                "Worker execution duration in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0, 1800.0, 3600.0]),
        )?;
        registry.register(Box::new(job_duration.clone()))?;

        let faults = CounterVec::new(
            Opts::new("drover_faults_total", "Total fault-signature occurrences"),
            &["origin", "kind"],
        )?;
        registry.register(Box::new(faults.clone()))?;

        Ok(Self {
            jobs_started,
            jobs_completed,
            job_duration,
            faults,
            registry,
        })
    }

    /// Create a new prometheus metrics backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metrics for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Get a reference to the underlying prometheus registry.
    ///
    /// Useful for registering custom metrics alongside drover's.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_job_started(&self) {
        self.jobs_started.inc();
    }

    fn record_job_completed(&self, outcome: JobOutcome, duration_ms: u64) {
        self.jobs_completed
            .with_label_values(&[outcome.as_label()])
            .inc();
        self.job_duration.observe(duration_ms as f64 / 1000.0);
    }

    fn record_fault(&self, origin: &str, kind: &str) {
        self.faults.with_label_values(&[origin, kind]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_create_prometheus_metrics() {
        let _metrics = PrometheusMetrics::new().expect("failed to create metrics");
    }

    #[test]
    fn started_counter_increments() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_job_started();
        metrics.record_job_started();

        assert_eq!(metrics.jobs_started.get() as u64, 2);
    }

    #[test]
    fn completed_counter_tracks_outcomes() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_job_completed(JobOutcome::Succeeded, 1_500);
        metrics.record_job_completed(JobOutcome::Failed, 200);
        metrics.record_job_completed(JobOutcome::Failed, 300);

        let ok = metrics.jobs_completed.with_label_values(&["succeeded"]);
        let bad = metrics.jobs_completed.with_label_values(&["failed"]);
        assert_eq!(ok.get() as u64, 1);
        assert_eq!(bad.get() as u64, 2);
        assert_eq!(metrics.job_duration.get_sample_count(), 3);
    }

    #[test]
    fn fault_counter_is_keyed_by_signature() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_fault("interpret", "malformed_message");
        metrics.record_fault("interpret", "malformed_message");
        metrics.record_fault("launch", "spawn_failed");

        let malformed = metrics
            .faults
            .with_label_values(&["interpret", "malformed_message"]);
        let spawn = metrics.faults.with_label_values(&["launch", "spawn_failed"]);
        assert_eq!(malformed.get() as u64, 2);
        assert_eq!(spawn.get() as u64, 1);
    }

    #[test]
    fn gather_exposes_all_families() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_job_started();

        let names: Vec<_> = metrics.gather().iter().map(|f| f.name().to_string()).collect();
        assert!(names.contains(&"drover_jobs_started_total".to_string()));
    }
}
