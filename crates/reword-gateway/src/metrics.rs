//! Prometheus metrics for the HTTP surface and the moderation chain.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use reword_foundation::ChainError;
use reword_kernel::ModeratedResponse;
use std::time::Duration;

const KNOWN_ROUTES: &[&str] = &[
    "/api/v1/moderate",
    "/api/v1/moderate/batch",
    "/health",
    "/metrics",
];

/// Collapse a request path onto a fixed label set so unknown paths cannot
/// grow the series count.
pub fn route_label(path: &str) -> &'static str {
    KNOWN_ROUTES
        .iter()
        .copied()
        .find(|route| *route == path)
        .unwrap_or("other")
}

pub struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
    http_latency: HistogramVec,
    comments: IntCounterVec,
    rate_limited: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("reword_http_requests_total", "HTTP requests by route and status"),
            &["method", "route", "status"],
        )?;
        let http_latency = HistogramVec::new(
            HistogramOpts::new(
                "reword_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["method", "route"],
        )?;
        let comments = IntCounterVec::new(
            Opts::new("reword_comments_total", "Comments processed by outcome"),
            &["outcome"],
        )?;
        let rate_limited = IntCounter::new(
            "reword_rate_limited_total",
            "Requests rejected by the per-client rate limiter",
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_latency.clone()))?;
        registry.register(Box::new(comments.clone()))?;
        registry.register(Box::new(rate_limited.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_latency,
            comments,
            rate_limited,
        })
    }

    pub fn observe_request(&self, method: &str, route: &str, status: u16, latency: Duration) {
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[method, route, status.as_str()])
            .inc();
        self.http_latency
            .with_label_values(&[method, route])
            .observe(latency.as_secs_f64());
    }

    /// Count a finished comment as `passed`, `rewritten` or `failed`.
    pub fn record_comment(&self, outcome: Result<&ModeratedResponse, &ChainError>) {
        let label = match outcome {
            Ok(response) if response.was_modified => "rewritten",
            Ok(_) => "passed",
            Err(_) => "failed",
        };
        self.comments.with_label_values(&[label]).inc();
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.inc();
    }

    /// Text exposition of every registered metric, with its content type.
    pub fn render(&self) -> prometheus::Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_paths_share_a_label() {
        assert_eq!(route_label("/api/v1/moderate"), "/api/v1/moderate");
        assert_eq!(route_label("/api/v1/moderate/../x"), "other");
        assert_eq!(route_label("/favicon.ico"), "other");
    }

    #[test]
    fn render_includes_recorded_series() {
        let metrics = Metrics::new().unwrap();
        metrics.observe_request("POST", "/api/v1/moderate", 200, Duration::from_millis(120));
        metrics.record_rate_limited();

        let (content_type, body) = metrics.render().unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert!(text.contains("reword_http_requests_total"));
        assert!(text.contains("route=\"/api/v1/moderate\""));
        assert!(text.contains("reword_rate_limited_total 1"));
    }
}
