//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http2bus_exchanges_total` (counter): exchanges by route, outcome
//! - `http2bus_exchange_duration_seconds` (histogram): time from publish to response
//! - `http2bus_replies_received` (histogram): replies collected per exchange
//! - `http2bus_config_reloads_total` (counter): hot reloads by result
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a
//!   recorder is installed
//! - Labels for route and outcome only; correlation ids stay in logs

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record the end of one exchange.
pub fn record_exchange(route: &str, outcome: &'static str, replies: usize, start: Instant) {
    counter!(
        "http2bus_exchanges_total",
        "route" => route.to_owned(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("http2bus_exchange_duration_seconds", "route" => route.to_owned())
        .record(start.elapsed().as_secs_f64());
    histogram!("http2bus_replies_received").record(replies as f64);
}

/// Record a configuration reload attempt.
pub fn record_config_reload(success: bool) {
    let result = if success { "ok" } else { "rejected" };
    counter!("http2bus_config_reloads_total", "result" => result).increment(1);
}
