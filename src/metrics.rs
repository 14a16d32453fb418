//! Prometheus counters exported at `/metrics`.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::state::AppState;

#[derive(Clone)]
pub struct AppMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    orders_created: IntCounter,
    http_requests: IntCounterVec,
    http_latency: HistogramVec,
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let orders_created =
            IntCounter::new("orders_created_total", "Orders created (replays excluded)")?;
        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests by route and status"),
            &["method", "path", "status"],
        )?;
        let http_latency = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency"),
            &["method", "path"],
        )?;
        registry.register(Box::new(orders_created.clone()))?;
        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_latency.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                orders_created,
                http_requests,
                http_latency,
            }),
        })
    }

    pub fn order_created(&self) {
        self.inner.orders_created.inc();
    }

    pub fn orders_created(&self) -> u64 {
        self.inner.orders_created.get()
    }

    fn observe(&self, method: &str, path: &str, status: u16, seconds: f64) {
        let status = status.to_string();
        self.inner
            .http_requests
            .with_label_values(&[method, path, status.as_str()])
            .inc();
        self.inner
            .http_latency
            .with_label_values(&[method, path])
            .observe(seconds);
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.inner.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Records request count and latency labelled by the matched route template.
pub async fn track_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    state.metrics.observe(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_counter_is_rendered() {
        let metrics = AppMetrics::new().expect("metrics");
        metrics.order_created();
        metrics.order_created();
        let text = metrics.render().expect("render");
        assert!(text.contains("orders_created_total 2"));
        assert_eq!(metrics.orders_created(), 2);
    }
}
