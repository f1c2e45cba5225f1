// Prometheus metrics definitions for the bot FSM backend.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::engine::config::BOT_ID_PREFIX;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Bots currently held by the registry.
    pub static ref BOTS_ACTIVE: IntGauge =
        IntGauge::new("botfsm_bots_active", "Bots currently registered").unwrap();

    /// Live WebSocket event feed connections.
    pub static ref CONNECTED_WEBSOCKETS: IntGauge =
        IntGauge::new("botfsm_connected_websockets", "Live WebSocket connections").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    pub static ref BOTS_CREATED_TOTAL: IntCounter =
        IntCounter::new("botfsm_bots_created_total", "Total bots created").unwrap();

    pub static ref BOTS_REMOVED_TOTAL: IntCounter =
        IntCounter::new("botfsm_bots_removed_total", "Total bots removed").unwrap();

    /// Actual state changes, by source and target state.
    pub static ref BOT_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("botfsm_bot_transitions_total", "Total bot state transitions"),
        &["from", "to"],
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("botfsm_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    /// Total WebSocket messages sent to clients.
    pub static ref WEBSOCKET_MESSAGES_SENT_TOTAL: IntCounter = IntCounter::new(
        "botfsm_websocket_messages_sent_total",
        "Total WebSocket messages sent",
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "botfsm_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0]),
        &["endpoint"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BOTS_ACTIVE.clone()),
        Box::new(CONNECTED_WEBSOCKETS.clone()),
        Box::new(BOTS_CREATED_TOTAL.clone()),
        Box::new(BOTS_REMOVED_TOTAL.clone()),
        Box::new(BOT_TRANSITIONS_TOTAL.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(WEBSOCKET_MESSAGES_SENT_TOTAL.clone()),
        Box::new(API_REQUEST_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            if !matches!(e, prometheus::Error::AlreadyReg) {
                tracing::warn!("Failed to register metric: {e}");
            }
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Normalize a URL path for metric labels: replace bot identifiers with `:id`
/// to prevent cardinality explosion.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let is_bot_id = segment
                .strip_prefix(BOT_ID_PREFIX)
                .is_some_and(|n| !n.is_empty());
            if is_bot_id || segment.parse::<i64>().is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
