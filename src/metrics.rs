//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("comrade_dm_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "comrade_dm_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Messaging Metrics
    pub static ref MESSAGES_SENT_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("comrade_dm_messages_sent_total", "Total number of messages sent"),
        &["message_type"]
    ).expect("metric can be created");
    pub static ref CONVERSATIONS_CREATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("comrade_dm_conversations_created_total", "Total number of conversations created"),
        &["as_request"]
    ).expect("metric can be created");
    pub static ref MESSAGE_REQUESTS_RESOLVED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("comrade_dm_message_requests_resolved_total", "Message requests accepted or declined"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref POLICY_DENIALS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("comrade_dm_policy_denials_total", "Conversation opens denied by messaging policy"),
        &["policy"]
    ).expect("metric can be created");

    // Application Metrics
    pub static ref ACCOUNTS_TOTAL: IntGauge = IntGauge::new(
        "comrade_dm_accounts_total",
        "Total number of registered accounts"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("comrade_dm_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(MESSAGES_SENT_TOTAL.clone()))
        .expect("MESSAGES_SENT_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CONVERSATIONS_CREATED_TOTAL.clone()))
        .expect("CONVERSATIONS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MESSAGE_REQUESTS_RESOLVED_TOTAL.clone()))
        .expect("MESSAGE_REQUESTS_RESOLVED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(POLICY_DENIALS_TOTAL.clone()))
        .expect("POLICY_DENIALS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ACCOUNTS_TOTAL.clone()))
        .expect("ACCOUNTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
