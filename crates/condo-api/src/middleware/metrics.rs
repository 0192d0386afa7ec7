//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Ledger metrics (logins, movements written, delinquency
//! lights) are recorded by the handlers that cause them.
//!
//! The `path` label is the matched route template, so the series count is
//! bounded by the route table whatever clients send.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts,
    Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    // -- HTTP middleware metrics --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,
    // -- Ledger metrics --
    logins_total: IntCounterVec,
    movements_recorded_total: IntCounterVec,
    houses_by_light: GaugeVec,
    jwt_secret_ephemeral: Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("condo_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "condo_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["method", "path"],
        )
        .expect("metric can be created");
        let http_errors_total = IntCounterVec::new(
            Opts::new("condo_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");
        let logins_total = IntCounterVec::new(
            Opts::new("condo_logins_total", "Login attempts by outcome"),
            &["outcome"],
        )
        .expect("metric can be created");
        let movements_recorded_total = IntCounterVec::new(
            Opts::new("condo_movements_recorded_total", "Movements appended by kind"),
            &["kind"],
        )
        .expect("metric can be created");
        let houses_by_light = GaugeVec::new(
            Opts::new(
                "condo_houses_by_light",
                "Houses per traffic light at the last delinquency refresh",
            ),
            &["light"],
        )
        .expect("metric can be created");
        let jwt_secret_ephemeral = Gauge::new(
            "condo_jwt_secret_ephemeral",
            "Whether the token signing secret is ephemeral (1=ephemeral, 0=configured)",
        )
        .expect("metric can be created");

        let collectors: Vec<Box<dyn Collector>> = vec![
            Box::new(http_requests_total.clone()),
            Box::new(http_request_duration_seconds.clone()),
            Box::new(http_errors_total.clone()),
            Box::new(logins_total.clone()),
            Box::new(movements_recorded_total.clone()),
            Box::new(houses_by_light.clone()),
            Box::new(jwt_secret_ephemeral.clone()),
        ];
        for collector in collectors {
            registry
                .register(collector)
                .expect("metric can be registered");
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                logins_total,
                movements_recorded_total,
                houses_by_light,
                jwt_secret_ephemeral,
            }),
        }
    }

    fn sum(vec: &IntCounterVec) -> u64 {
        vec.collect()
            .iter()
            .flat_map(|mf| mf.get_metric())
            .map(|m| m.get_counter().get_value() as u64)
            .sum()
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        Self::sum(&self.inner.http_requests_total)
    }

    /// Total error count across all labels.
    pub fn errors(&self) -> u64 {
        Self::sum(&self.inner.http_errors_total)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Count a login attempt (`success`, `invalid_credentials`, ...).
    pub fn record_login(&self, outcome: &str) {
        self.inner.logins_total.with_label_values(&[outcome]).inc();
    }

    /// Count `count` movements of `kind` appended to the ledger.
    pub fn record_movements(&self, kind: &str, count: u64) {
        self.inner
            .movements_recorded_total
            .with_label_values(&[kind])
            .inc_by(count);
    }

    /// Replace the per-light house counts with `counts`.
    pub fn set_houses_by_light<'a>(&self, counts: impl IntoIterator<Item = (&'a str, usize)>) {
        self.inner.houses_by_light.reset();
        for (light, n) in counts {
            self.inner
                .houses_by_light
                .with_label_values(&[light])
                .set(n as f64);
        }
    }

    pub fn set_jwt_secret_ephemeral(&self, ephemeral: bool) {
        self.inner
            .jwt_secret_ephemeral
            .set(if ephemeral { 1.0 } else { 0.0 });
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Route template the request matched (`/admin/estado-cuenta/:id_casa`),
/// or `unmatched`. Label values never come from the raw URI.
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned())
}

fn method_label(method: &Method) -> &'static str {
    const KNOWN: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];
    KNOWN
        .into_iter()
        .find(|m| *m == method.as_str())
        .unwrap_or("OTHER")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = method_label(request.method());
    let route = route_label(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(method, &route, response.status().as_u16(), duration);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn request_and_error_counts_independent() {
        let m = ApiMetrics::new();
        for _ in 0..5 {
            m.record_request("GET", "/ok", 200, 0.01);
        }
        m.record_request("GET", "/fail", 502, 0.1);
        m.record_request("POST", "/login", 401, 0.05);
        assert_eq!(m.requests(), 7);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn clone_shares_underlying_counters() {
        let m = ApiMetrics::new();
        let clone = m.clone();
        m.record_request("GET", "/test", 200, 0.01);
        assert_eq!(clone.requests(), 1);
    }

    #[test]
    fn ledger_metrics_are_exported() {
        let m = ApiMetrics::new();
        m.record_login("success");
        m.record_movements("ALICUOTA", 12);
        m.set_houses_by_light([("VERDE", 10), ("ROJO", 2)]);
        m.set_jwt_secret_ephemeral(true);
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("condo_logins_total{outcome=\"success\"} 1"));
        assert!(output.contains("condo_movements_recorded_total{kind=\"ALICUOTA\"} 12"));
        assert!(output.contains("condo_houses_by_light{light=\"ROJO\"} 2"));
        assert!(output.contains("condo_jwt_secret_ephemeral 1"));
    }

    #[test]
    fn lights_are_replaced_not_accumulated() {
        let m = ApiMetrics::new();
        m.set_houses_by_light([("ROJO", 2)]);
        m.set_houses_by_light([("VERDE", 3)]);
        let output = m.gather_and_encode().unwrap();
        assert!(!output.contains("light=\"ROJO\""));
    }

    #[test]
    fn unrouted_request_is_labelled_unmatched() {
        let request = Request::builder()
            .uri("/admin/estado-cuenta/anything")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(route_label(&request), "unmatched");
    }

    #[test]
    fn extension_methods_share_one_label() {
        assert_eq!(method_label(&Method::GET), "GET");
        let custom = Method::from_bytes(b"BREW").unwrap();
        assert_eq!(method_label(&custom), "OTHER");
    }
}
