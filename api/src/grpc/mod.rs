//! OTLP gRPC receiver service.
//!
//! Implements the OpenTelemetry Protocol `MetricsService`, so standard
//! OpenTelemetry SDK exporters can push metrics over gRPC.

mod services;

pub use services::MetricsServiceImpl;
