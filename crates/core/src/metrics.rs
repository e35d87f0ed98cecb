//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Automation worker (jobs, link polling, challenge solving, callbacks sent)
//! - Callback gateway (callbacks received, status polls, account writes)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Automation Worker
// =============================================================================

/// Jobs finished by action and outcome.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gatelink_jobs_total", "Total automation jobs finished"),
        &["action", "outcome"], // outcome: "linked", "code_emitted", "managed", "synced", "failed"
    )
    .unwrap()
});

/// Job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("gatelink_job_duration_seconds", "Duration of automation jobs")
            .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 90.0, 120.0, 180.0]),
        &["action"],
    )
    .unwrap()
});

/// Worker state entries, by state.
pub static WORKER_STATES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gatelink_worker_states_total", "Worker state entries"),
        &["state"],
    )
    .unwrap()
});

/// Device-list refreshes needed before a link was seen (or the cap was hit).
pub static LINK_POLL_ATTEMPTS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "gatelink_link_poll_attempts",
            "Device list refreshes per link wait",
        )
        .buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 45.0]),
    )
    .unwrap()
});

/// Login challenges that could not be solved.
pub static CHALLENGE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "gatelink_challenge_failures_total",
        "Login challenges that could not be parsed or answered",
    )
    .unwrap()
});

/// Callbacks sent by the worker, by type and result.
pub static CALLBACKS_DELIVERED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gatelink_callbacks_delivered_total", "Callbacks sent by workers"),
        &["type", "result"], // result: "ok", "failed"
    )
    .unwrap()
});

// =============================================================================
// Callback Gateway
// =============================================================================

/// Callbacks received by type and result.
pub static CALLBACKS_RECEIVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gatelink_callbacks_received_total", "Callbacks received by the gateway"),
        &["type", "result"], // result: "accepted", "substituted", "rejected"
    )
    .unwrap()
});

/// Status polls by result.
pub static STATUS_POLLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gatelink_status_polls_total", "Status polls served"),
        &["result"], // "delivered", "pending", "invalid", "error"
    )
    .unwrap()
});

/// Account store writes by kind and result.
pub static ACCOUNT_WRITES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gatelink_account_writes_total", "Account store writes"),
        &["kind", "result"], // kind: "create", "sync"; result: "ok", "failed"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Worker
        Box::new(JOBS_TOTAL.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(WORKER_STATES.clone()),
        Box::new(LINK_POLL_ATTEMPTS.clone()),
        Box::new(CHALLENGE_FAILURES.clone()),
        Box::new(CALLBACKS_DELIVERED.clone()),
        // Gateway
        Box::new(CALLBACKS_RECEIVED.clone()),
        Box::new(STATUS_POLLS.clone()),
        Box::new(ACCOUNT_WRITES.clone()),
    ]
}
