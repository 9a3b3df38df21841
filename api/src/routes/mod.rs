//! API route definitions.
//!
//! This module organizes all HTTP routes for the Meterline API server.

mod health;
mod otlp;

pub use health::health_routes;
pub use otlp::{otlp_routes, ExportResponse, OtlpError, PartialSuccess};
