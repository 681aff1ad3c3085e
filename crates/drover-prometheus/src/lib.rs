//! Prometheus metrics backend for the drover runner.
//!
//! This crate provides a [`PrometheusMetrics`] implementation of
//! [`drover_core::MetricsBackend`] that exposes metrics in Prometheus
//! format.
//!
//! ## Metrics
//! - `drover_jobs_started_total` - Counter
//! - `drover_jobs_completed_total{outcome}` - Counter
//! - `drover_job_duration_seconds` - Histogram
//! - `drover_faults_total{origin, kind}` - Counter
//!
//! ## HTTP Server
//! This crate does NOT provide an HTTP server for a `/metrics` endpoint.
//! Call [`PrometheusMetrics::gather`] from whatever exposition mechanism
//! the embedding application already has.
mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
