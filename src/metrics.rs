//! Prometheus metrics for API traffic, polling and rule writes

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub api_requests_total: IntCounterVec,
    pub api_request_duration_seconds: Histogram,
    pub api_requests_in_flight: IntGauge,
    pub poll_cycles_total: IntCounter,
    pub poll_failures_total: IntCounter,
    pub stale_poll_responses_total: IntCounter,
    pub rule_writes_total: IntCounter,
    pub rule_write_failures_total: IntCounter,
    pub optimistic_rollbacks_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let api_requests_total = IntCounterVec::new(
            Opts::new("api_requests_total", "REST requests issued, by method"),
            &["method"],
        )?;
        let api_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "api_request_duration_seconds",
            "REST request latency",
        ))?;
        let api_requests_in_flight =
            IntGauge::new("api_requests_in_flight", "REST requests awaiting a response")?;
        let poll_cycles_total = IntCounter::new("poll_cycles_total", "Signal poll cycles issued")?;
        let poll_failures_total =
            IntCounter::new("poll_failures_total", "Signal poll cycles that failed")?;
        let stale_poll_responses_total = IntCounter::new(
            "stale_poll_responses_total",
            "Poll responses dropped because a newer one was already applied",
        )?;
        let rule_writes_total = IntCounter::new("rule_writes_total", "Rule writes sent")?;
        let rule_write_failures_total =
            IntCounter::new("rule_write_failures_total", "Rule writes rejected or failed")?;
        let optimistic_rollbacks_total = IntCounter::new(
            "optimistic_rollbacks_total",
            "Optimistic local changes reverted after a failed write",
        )?;

        registry.register(Box::new(api_requests_total.clone()))?;
        registry.register(Box::new(api_request_duration_seconds.clone()))?;
        registry.register(Box::new(api_requests_in_flight.clone()))?;
        registry.register(Box::new(poll_cycles_total.clone()))?;
        registry.register(Box::new(poll_failures_total.clone()))?;
        registry.register(Box::new(stale_poll_responses_total.clone()))?;
        registry.register(Box::new(rule_writes_total.clone()))?;
        registry.register(Box::new(rule_write_failures_total.clone()))?;
        registry.register(Box::new(optimistic_rollbacks_total.clone()))?;

        Ok(Self {
            registry,
            api_requests_total,
            api_request_duration_seconds,
            api_requests_in_flight,
            poll_cycles_total,
            poll_failures_total,
            stale_poll_responses_total,
            rule_writes_total,
            rule_write_failures_total,
            optimistic_rollbacks_total,
        })
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
