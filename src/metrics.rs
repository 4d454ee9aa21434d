//! Prometheus metrics for the track pipeline.

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::time::Duration;

use crate::pipeline::TrackState;

/// Metric name prefix for all pipeline metrics
const PREFIX: &str = "track_pipeline";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref TRACK_TRANSITIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_track_transitions_total"), "Track state transitions"),
        &["state"]
    ).expect("Failed to create track_transitions_total metric");

    pub static ref STAGE_QUEUE_TASKS: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_stage_queue_tasks"), "Tasks per stage queue"),
        &["stage", "status"]
    ).expect("Failed to create stage_queue_tasks metric");

    pub static ref RATE_LIMIT_WAIT_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_rate_limit_wait_seconds"),
            "Time downloads spent waiting for a rate limiter slot"
        )
        .buckets(vec![0.1, 1.0, 5.0, 10.0, 20.0, 30.0, 60.0]),
    ).expect("Failed to create rate_limit_wait_seconds metric");
}

/// Initialize the metrics registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(TRACK_TRANSITIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STAGE_QUEUE_TASKS.clone()));
    let _ = REGISTRY.register(Box::new(RATE_LIMIT_WAIT_SECONDS.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record a track state transition
pub fn record_transition(state: TrackState) {
    TRACK_TRANSITIONS_TOTAL
        .with_label_values(&[state.as_str()])
        .inc();
}

/// Update pending/running gauges for a stage queue
pub fn set_stage_depth(stage: &str, pending: usize, running: usize) {
    STAGE_QUEUE_TASKS
        .with_label_values(&[stage, "pending"])
        .set(pending as f64);
    STAGE_QUEUE_TASKS
        .with_label_values(&[stage, "running"])
        .set(running as f64);
}

/// Record time spent waiting for the download rate limiter
pub fn record_rate_limit_wait(wait: Duration) {
    RATE_LIMIT_WAIT_SECONDS.observe(wait.as_secs_f64());
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
