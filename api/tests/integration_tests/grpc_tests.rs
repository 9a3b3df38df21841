//! Integration tests for the OTLP gRPC metrics service.
//!
//! These tests call the service directly and verify it shares the export
//! pipeline with the HTTP endpoint.

use super::common::{counter, gauge, request_for, test_app};
use shared::otlp::proto::collector::metrics::v1::metrics_service_server::MetricsService;
use shared::otlp::proto::metrics::v1::Metric;

#[tokio::test]
async fn test_grpc_metrics_service_integration() {
    let (_router, state, sinks) = test_app();
    let service = api::grpc::MetricsServiceImpl::new(state);

    let request = tonic::Request::new(request_for(
        "grpc-service",
        vec![],
        vec![gauge("cpu", 1_000, &[1.0, 2.0]), counter("requests", 3)],
    ));

    let response = service.export(request).await.unwrap().into_inner();

    assert!(response.partial_success.is_none());
    assert_eq!(sinks.records.count().unwrap(), 3);
    let bulks = sinks.catalog.bulks().unwrap();
    assert_eq!(bulks[0].entities.len(), 2);
    assert_eq!(
        bulks[0].entities[0].attributes.qualified_name,
        "grpc-service-cpu"
    );
}

#[tokio::test]
async fn test_grpc_reports_unsupported_shapes() {
    let (_router, state, _sinks) = test_app();
    let service = api::grpc::MetricsServiceImpl::new(state);
    let orphan = Metric {
        name: "orphan".to_string(),
        ..Default::default()
    };

    let response = service
        .export(tonic::Request::new(request_for("svc", vec![], vec![orphan])))
        .await
        .unwrap()
        .into_inner();

    let partial = response.partial_success.unwrap();
    assert_eq!(partial.rejected_data_points, 0);
    assert!(partial.error_message.contains("orphan"));
}
