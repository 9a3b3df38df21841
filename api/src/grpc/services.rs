//! gRPC service implementation for the OTLP metrics collector.

use crate::state::AppState;
use shared::otlp::proto::collector::metrics::v1::{
    metrics_service_server::{MetricsService, MetricsServiceServer},
    ExportMetricsPartialSuccess, ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use tonic::{Request, Response, Status};

/// Implementation of the OTLP `MetricsService` gRPC service.
#[derive(Clone)]
pub struct MetricsServiceImpl {
    state: AppState,
}

impl MetricsServiceImpl {
    /// Creates a new `MetricsServiceImpl` with the given application state.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Wraps the service for a tonic server.
    #[must_use]
    pub fn into_server(self) -> MetricsServiceServer<Self> {
        MetricsServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl MetricsService for MetricsServiceImpl {
    async fn export(
        &self,
        request: Request<ExportMetricsServiceRequest>,
    ) -> Result<Response<ExportMetricsServiceResponse>, Status> {
        let request = request.into_inner();

        let summary = self.state.exporter().export(&request).map_err(|e| {
            tracing::error!(error = %e, "Failed to export metrics over gRPC");
            Status::internal(e.to_string())
        })?;

        let partial_success =
            summary
                .unsupported_message()
                .map(|error_message| ExportMetricsPartialSuccess {
                    rejected_data_points: 0,
                    error_message,
                });

        Ok(Response::new(ExportMetricsServiceResponse { partial_success }))
    }
}
