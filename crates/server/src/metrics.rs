use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::errors::PermissionDenied;
use crate::routes::auth::ServerState;

/// Request counters and latency histogram on a registry owned by the app.
pub struct Metrics {
    registry: Registry,
    pub requests_total: IntCounterVec,
    pub request_duration: HistogramVec,
    pub permission_denied_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests handled"),
            &["method", "status"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "Request duration in seconds")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["method"],
        )?;
        let permission_denied_total =
            IntCounter::new("permission_denied_total", "Requests rejected by the permission policy")?;
        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(permission_denied_total.clone()))?;
        Ok(Self { registry, requests_total, request_duration, permission_denied_total })
    }

    pub fn encode(&self) -> (StatusCode, String) {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
        }
        (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
    }
}

pub async fn track_metrics(State(state): State<ServerState>, req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_owned();
    let started = Instant::now();
    let resp = next.run(req).await;
    let m = &state.metrics;
    m.request_duration.with_label_values(&[&method]).observe(started.elapsed().as_secs_f64());
    m.requests_total.with_label_values(&[&method, resp.status().as_str()]).inc();
    if resp.extensions().get::<PermissionDenied>().is_some() {
        m.permission_denied_total.inc();
    }
    resp
}

pub async fn metrics_handler(State(state): State<ServerState>) -> impl IntoResponse {
    state.metrics.encode()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let m = Metrics::new().unwrap();
        m.requests_total.with_label_values(&["GET", "200"]).inc();
        m.permission_denied_total.inc();
        let (status, body) = m.encode();
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("http_requests_total{method=\"GET\",status=\"200\"} 1"));
        assert!(body.contains("permission_denied_total 1"));
    }
}
