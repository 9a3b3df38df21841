//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup, request builders and HTTP request helpers.

use api::{create_router, AppState, InMemorySinks};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use shared::otlp::proto::collector::metrics::v1::ExportMetricsServiceRequest;
use shared::otlp::proto::common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue};
use shared::otlp::proto::metrics::v1::{
    metric::Data, number_data_point, summary_data_point::ValueAtQuantile, Gauge, Histogram,
    HistogramDataPoint, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics, Sum, Summary,
    SummaryDataPoint,
};
use shared::otlp::proto::resource::v1::Resource;

/// Creates a test router with fresh in-memory sinks.
///
/// # Returns
///
/// A tuple containing the configured router, the app state and the sink handles.
pub fn test_app() -> (Router, AppState, InMemorySinks) {
    let (state, sinks) = AppState::with_in_memory_exporter();
    let router = create_router(state.clone());
    (router, state, sinks)
}

/// Builds a string attribute.
pub fn string_attr(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(any_value::Value::StringValue(value.to_string())),
        }),
        ..Default::default()
    }
}

/// Builds a gauge with one double point per value, all at `time_ms`.
pub fn gauge(name: &str, time_ms: u64, values: &[f64]) -> Metric {
    Metric {
        name: name.to_string(),
        description: format!("{name} gauge"),
        data: Some(Data::Gauge(Gauge {
            data_points: values
                .iter()
                .map(|v| NumberDataPoint {
                    attributes: vec![string_attr("host", "h1")],
                    time_unix_nano: time_ms * 1_000_000,
                    value: Some(number_data_point::Value::AsDouble(*v)),
                    ..Default::default()
                })
                .collect(),
        })),
        ..Default::default()
    }
}

/// Builds a cumulative counter with one integer point.
pub fn counter(name: &str, value: i64) -> Metric {
    Metric {
        name: name.to_string(),
        data: Some(Data::Sum(Sum {
            data_points: vec![NumberDataPoint {
                value: Some(number_data_point::Value::AsInt(value)),
                ..Default::default()
            }],
            is_monotonic: true,
            ..Default::default()
        })),
        ..Default::default()
    }
}

/// Builds a histogram with one point.
pub fn histogram(name: &str) -> Metric {
    Metric {
        name: name.to_string(),
        data: Some(Data::Histogram(Histogram {
            data_points: vec![HistogramDataPoint {
                start_time_unix_nano: 0,
                time_unix_nano: 1_000_000_000,
                count: 3,
                sum: Some(6.0),
                bucket_counts: vec![1, 2],
                explicit_bounds: vec![5.0],
                ..Default::default()
            }],
            ..Default::default()
        })),
        ..Default::default()
    }
}

/// Builds a summary with one point of two quantiles.
pub fn summary(name: &str) -> Metric {
    Metric {
        name: name.to_string(),
        data: Some(Data::Summary(Summary {
            data_points: vec![SummaryDataPoint {
                quantile_values: vec![
                    ValueAtQuantile {
                        quantile: 0.5,
                        value: 10.0,
                    },
                    ValueAtQuantile {
                        quantile: 0.99,
                        value: 42.0,
                    },
                ],
                ..Default::default()
            }],
        })),
        ..Default::default()
    }
}

/// Wraps metrics into a request from one service.
pub fn request_for(
    service: &str,
    scope_attributes: Vec<KeyValue>,
    metrics: Vec<Metric>,
) -> ExportMetricsServiceRequest {
    ExportMetricsServiceRequest {
        resource_metrics: vec![ResourceMetrics {
            resource: Some(Resource {
                attributes: vec![
                    string_attr("service.name", service),
                    string_attr("service.instance.id", &format!("{service}-0")),
                ],
                ..Default::default()
            }),
            scope_metrics: vec![ScopeMetrics {
                scope: Some(InstrumentationScope {
                    name: "integration".to_string(),
                    attributes: scope_attributes,
                    ..Default::default()
                }),
                metrics,
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Helper to make a POST request with a raw body and content type.
pub async fn post_bytes(
    app: Router,
    uri: &str,
    content_type: &str,
    body: Vec<u8>,
) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap(),
    )
    .await
}

/// Helper to POST an export request as OTLP JSON.
pub async fn post_json(
    app: Router,
    request: &ExportMetricsServiceRequest,
) -> (StatusCode, Value) {
    let body = serde_json::to_vec(request).unwrap();
    post_bytes(app, "/v1/metrics", "application/json", body).await
}

/// Helper to POST an export request as OTLP protobuf.
pub async fn post_protobuf(
    app: Router,
    request: &ExportMetricsServiceRequest,
) -> (StatusCode, Value) {
    use prost::Message;

    post_bytes(
        app,
        "/v1/metrics",
        "application/x-protobuf",
        request.encode_to_vec(),
    )
    .await
}

/// Helper to make a GET request.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}
