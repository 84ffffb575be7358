//! Prometheus metrics for a packaging run.
//!
//! The run is a batch job, so nothing is scraped: the counters are rendered
//! in text exposition format at the end of the run and can be dropped into a
//! node_exporter textfile directory.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::path::Path;

use crate::fsutil::write_atomic;

/// Registry holding every metric of this crate.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

// =============================================================================
// Assets
// =============================================================================

/// Assets finished by result.
pub static ASSETS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hlspack_assets_total", "Assets finished by result"),
        &["result"], // "done", "failed", "skipped"
    )
    .unwrap()
});

/// Attempts by result.
pub static ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hlspack_attempts_total", "Packaging attempts by result"),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

/// Failed attempts by the stage that failed.
pub static ATTEMPT_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "hlspack_attempt_failures_total",
            "Failed attempts by failing stage",
        ),
        &["stage"],
    )
    .unwrap()
});

/// Time spent in each stage of an attempt.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "hlspack_stage_duration_seconds",
            "Duration of each pipeline stage",
        )
        .buckets(vec![0.05, 0.25, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0]),
        &["stage"], // "probe", "cover", "package", "metadata", "relocate"
    )
    .unwrap()
});

// =============================================================================
// Bookkeeping
// =============================================================================

/// State documents quarantined because they could not be parsed.
pub static STATE_RECOVERIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "hlspack_state_recoveries_total",
        "Corrupt state documents moved aside",
    )
    .unwrap()
});

/// Entries pruned from the failed list after a successful rerun.
pub static FAILED_LIST_PRUNED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "hlspack_failed_list_pruned_total",
        "Failed-list entries removed after succeeding on rerun",
    )
    .unwrap()
});

/// Get all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ASSETS_TOTAL.clone()),
        Box::new(ATTEMPTS_TOTAL.clone()),
        Box::new(ATTEMPT_FAILURES.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(STATE_RECOVERIES.clone()),
        Box::new(FAILED_LIST_PRUNED.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Writes the current metrics to `path`, replacing it atomically.
pub fn write_textfile(path: &Path) -> std::io::Result<()> {
    let text = encode_metrics().map_err(std::io::Error::other)?;
    write_atomic(path, text.as_bytes())
}
