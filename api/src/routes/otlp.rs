//! OTLP HTTP receiver endpoint.
//!
//! Implements the OpenTelemetry Protocol HTTP endpoint for metrics.
//! Supports both protobuf (`application/x-protobuf`) and JSON (`application/json`) content types.
//!
//! # Endpoints
//!
//! - `POST /v1/metrics` - Export OTLP metrics

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use prost::Message;
use serde::{Deserialize, Serialize};
use shared::otlp::proto::collector::metrics::v1::ExportMetricsServiceRequest;

/// Content type for protobuf requests.
const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";

/// Response for OTLP export requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportResponse {
    /// Set when part of the request could not be exported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_success: Option<PartialSuccess>,
}

/// Partial success information.
#[derive(Debug, Serialize, Deserialize)]
pub struct PartialSuccess {
    /// Number of rejected data points.
    pub rejected_count: i64,
    /// Error message if anything was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Error response for OTLP endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct OtlpError {
    /// Error code.
    pub code: u32,
    /// Error message.
    pub message: String,
}

type OtlpRejection = (StatusCode, Json<OtlpError>);

/// Creates the OTLP routes with application state.
pub fn otlp_routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/metrics", post(export_metrics))
        .with_state(state)
}

fn is_protobuf(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(CONTENT_TYPE_PROTOBUF))
}

fn rejection(status: StatusCode, message: String) -> OtlpRejection {
    (
        status,
        Json(OtlpError {
            code: u32::from(status.as_u16()),
            message,
        }),
    )
}

fn decode_request(headers: &HeaderMap, body: Bytes) -> Result<ExportMetricsServiceRequest, OtlpRejection> {
    if is_protobuf(headers) {
        ExportMetricsServiceRequest::decode(body).map_err(|e| {
            tracing::error!(error = %e, "Failed to decode protobuf metrics request");
            rejection(
                StatusCode::BAD_REQUEST,
                format!("Failed to decode protobuf: {e}"),
            )
        })
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to decode JSON metrics request");
            rejection(
                StatusCode::BAD_REQUEST,
                format!("Failed to decode JSON: {e}"),
            )
        })
    }
}

/// Handler for OTLP metrics export.
///
/// Accepts `ExportMetricsServiceRequest` in protobuf or JSON format.
async fn export_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ExportResponse>), OtlpRejection> {
    let request = decode_request(&headers, body)?;

    let summary = state.exporter().export(&request).map_err(|e| {
        tracing::error!(error = %e, "Failed to export metrics");
        rejection(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let response = ExportResponse {
        partial_success: summary.unsupported_message().map(|message| PartialSuccess {
            rejected_count: 0,
            error_message: Some(message),
        }),
    };

    Ok((StatusCode::OK, Json(response)))
}
