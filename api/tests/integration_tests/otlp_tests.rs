//! Integration tests for the OTLP/HTTP metrics endpoint.
//!
//! Tests cover:
//! - JSON and protobuf request decoding
//! - Row flattening across every metric shape
//! - Per-resource metadata and catalog registration
//! - Partial success for metrics that cannot be described
//! - Error responses for bad payloads and failing sinks

use api::{create_router, AppState, MetricsExporter};
use axum::http::StatusCode;
use shared::models::{MetricRecord, SeriesType};
use shared::otlp::proto::metrics::v1::Metric;
use shared::storage::{RecordSink, SinkError};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::common::{
    counter, gauge, histogram, post_bytes, post_json, post_protobuf, request_for, string_attr,
    summary, test_app,
};

#[tokio::test]
async fn test_json_export_flattens_every_shape() {
    let (app, _state, sinks) = test_app();
    let request = request_for(
        "checkout",
        vec![],
        vec![
            gauge("cpu", 1_000, &[0.5, 0.7]),
            counter("requests", 12),
            histogram("latency"),
            summary("rpc.duration"),
        ],
    );

    let (status, response) = post_json(app, &request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(response.get("partial_success").is_none());

    let records = sinks.records.records().unwrap();
    let types: Vec<SeriesType> = records.iter().map(|r| r.type_name).collect();
    assert_eq!(
        types,
        vec![
            SeriesType::Number,
            SeriesType::Number,
            SeriesType::Number,
            SeriesType::Histogram,
            SeriesType::Summary,
        ]
    );
    assert_eq!(records[0].dimensions["host"], "h1");
    assert_eq!(records[0].end_timestamp_ms, 1_000);
    assert_eq!(records[2].series("value"), Some(&[12.0][..]));
    assert_eq!(records[3].series("bounds"), Some(&[5.0][..]));
    assert_eq!(records[3].series("counts"), Some(&[1.0, 2.0][..]));
    assert_eq!(records[4].series("quantiles"), Some(&[0.5, 0.99][..]));
    assert_eq!(records[4].series("values"), Some(&[10.0, 42.0][..]));
}

#[tokio::test]
async fn test_protobuf_export_registers_catalog_entities() {
    let (app, _state, sinks) = test_app();
    let request = request_for("checkout", vec![], vec![gauge("cpu", 2_000, &[1.0])]);

    let (status, _response) = post_protobuf(app, &request).await;
    assert_eq!(status, StatusCode::OK);

    assert!(sinks.catalog.type_registered().unwrap());
    let bulks = sinks.catalog.bulks().unwrap();
    assert_eq!(bulks.len(), 1);

    let attributes = &bulks[0].entities[0].attributes;
    assert_eq!(attributes.qualified_name, "checkout-cpu");
    assert_eq!(attributes.description, "cpu gauge");
    assert_eq!(attributes.service_name, "checkout");
    assert_eq!(attributes.service_guid, "checkout-0");
    assert_eq!(attributes.last_published_time, 2_000);
    assert_eq!(attributes.sli_name, "default");
    assert_eq!(attributes.sli_version, "default");
    assert!(!attributes.is_sli);
    assert!(attributes.destinations.contains_key("memory"));
    assert_eq!(attributes.dimensions["host"], "STRING");
}

#[tokio::test]
async fn test_metadata_written_once_per_request() {
    let (app, _state, sinks) = test_app();
    let request = request_for(
        "checkout",
        vec![],
        vec![gauge("cpu", 1_000, &[1.0]), counter("requests", 1)],
    );

    post_json(app, &request).await;

    let writes = sinks.metadata.writes().unwrap();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].len(), 1);

    let resource = &writes[0][0];
    assert_eq!(resource.resources["service.name"], "checkout");
    let names: Vec<&str> = resource.metadata.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["cpu", "requests"]);
}

#[tokio::test]
async fn test_repeated_metric_is_described_once() {
    let (app, _state, sinks) = test_app();
    let mut later = gauge("cpu", 3_000, &[2.0]);
    later.description = "ignored".to_string();
    let request = request_for("checkout", vec![], vec![gauge("cpu", 1_000, &[1.0]), later]);

    post_json(app, &request).await;

    assert_eq!(sinks.records.count().unwrap(), 2);
    let descriptors = &sinks.metadata.writes().unwrap()[0][0].metadata;
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].description, "cpu gauge");
    assert_eq!(descriptors[0].last_publish_time_ms, 3_000);
}

#[tokio::test]
async fn test_sli_scope_flags_reach_catalog() {
    let (app, _state, sinks) = test_app();
    let request = request_for(
        "checkout",
        vec![
            string_attr("sli.enabled", "true"),
            string_attr("sli.detail.objective", "99.9"),
        ],
        vec![counter("requests", 1)],
    );

    post_json(app, &request).await;

    let attributes = &sinks.catalog.bulks().unwrap()[0].entities[0].attributes;
    assert!(attributes.is_sli);
    assert_eq!(attributes.sli_details["objective"], "99.9");
}

#[tokio::test]
async fn test_unsupported_shape_is_reported_as_partial_success() {
    let (app, _state, sinks) = test_app();
    let orphan = Metric {
        name: "orphan".to_string(),
        ..Default::default()
    };
    let request = request_for("checkout", vec![], vec![orphan, counter("requests", 1)]);

    let (status, response) = post_json(app, &request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["partial_success"]["rejected_count"], 0);
    assert!(response["partial_success"]["error_message"]
        .as_str()
        .unwrap()
        .contains("orphan"));
    assert_eq!(sinks.records.count().unwrap(), 1);
    assert_eq!(sinks.catalog.bulks().unwrap()[0].entities.len(), 1);
}

#[tokio::test]
async fn test_invalid_json_returns_400() {
    let (app, _state, sinks) = test_app();

    let (status, response) =
        post_bytes(app, "/v1/metrics", "application/json", b"{not json".to_vec()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], 400);
    assert!(response["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to decode JSON"));
    assert_eq!(sinks.records.count().unwrap(), 0);
}

struct RejectingSink;

impl RecordSink for RejectingSink {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    fn properties(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn write_records(&self, _records: &[MetricRecord]) -> Result<(), SinkError> {
        Err(SinkError::StorageError("table missing".to_string()))
    }
}

#[tokio::test]
async fn test_sink_failure_returns_500() {
    let exporter = MetricsExporter::new().with_record_sink(Arc::new(RejectingSink));
    let app = create_router(AppState::new(Arc::new(exporter)));
    let request = request_for("checkout", vec![], vec![counter("requests", 1)]);

    let (status, response) = post_json(app, &request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response["code"], 500);
    assert!(response["message"].as_str().unwrap().contains("table missing"));
}

#[tokio::test]
async fn test_type_is_registered_before_every_bulk() {
    let (app, _state, sinks) = test_app();
    let request = request_for("checkout", vec![], vec![counter("requests", 1)]);

    post_json(app.clone(), &request).await;
    post_json(app, &request).await;

    assert!(sinks.catalog.type_registered().unwrap());
    assert_eq!(sinks.catalog.bulks().unwrap().len(), 2);
}
