//! Prometheus metrics middleware.
//!
//! Provides HTTP request/response metrics, bulk operation counters and the
//! Prometheus export endpoint.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::{OperationStatus, OperationType};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Instant;

/// Middleware to record HTTP request metrics.
///
/// Records the following metrics:
/// - `http_requests_total`: Counter with labels (method, path, status)
/// - `http_request_duration_seconds`: Histogram with labels (method, path)
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    let method_str = method_to_str(&method);

    counter!(
        "http_requests_total",
        "method" => method_str,
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method_str,
        "path" => path
    )
    .record(duration);

    response
}

/// Convert HTTP method to string for metric labels.
fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

/// Record an accepted (stored) bulk operation.
pub fn record_operation_submitted(operation_type: OperationType, targets: usize) {
    counter!(
        "bulk_operations_submitted_total",
        "operation_type" => operation_type.as_str()
    )
    .increment(1);
    counter!(
        "bulk_operation_targets_total",
        "operation_type" => operation_type.as_str()
    )
    .increment(targets as u64);
}

/// Record an operation reaching a terminal status.
pub fn record_operation_finished(
    operation_type: OperationType,
    status: OperationStatus,
    duration_secs: Option<f64>,
) {
    counter!(
        "bulk_operations_finished_total",
        "operation_type" => operation_type.as_str(),
        "status" => status.as_str()
    )
    .increment(1);

    if let Some(duration) = duration_secs {
        histogram!(
            "bulk_operation_duration_seconds",
            "operation_type" => operation_type.as_str()
        )
        .record(duration);
    }
}

/// Publish the number of stored operations per status.
///
/// Every status is set, so a status that drops to zero does not keep its
/// last non-zero value.
pub fn record_operations_by_status(by_status: &BTreeMap<String, usize>) {
    for status in OperationStatus::ALL {
        let count = by_status.get(status.as_str()).copied().unwrap_or(0);
        gauge!("bulk_operations_by_status", "status" => status.as_str()).set(count as f64);
    }
}

/// Handler for /metrics endpoint that returns Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        let output = handle.render();
        (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            output,
        )
    } else {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        )
    }
}

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once during application startup before any metrics are
/// recorded. A second call is a no-op.
pub fn init_metrics() -> Result<(), BuildError> {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::warn!("Prometheus recorder already installed");
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0])?
        .set_buckets_for_metric(
            Matcher::Full("bulk_operation_duration_seconds".to_string()),
            &[0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0],
        )?
        .install_recorder()?;

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already initialized");
    }
    Ok(())
}
