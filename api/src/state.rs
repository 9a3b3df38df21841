//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use crate::exporter::{InMemorySinks, MetricsExporter};
use std::sync::Arc;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    exporter: Arc<MetricsExporter>,
}

impl AppState {
    /// Creates a new application state around an exporter.
    #[must_use]
    pub fn new(exporter: Arc<MetricsExporter>) -> Self {
        Self { exporter }
    }

    /// Creates a new application state with in-memory sinks.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_in_memory_exporter() -> (Self, InMemorySinks) {
        let (exporter, sinks) = MetricsExporter::in_memory();
        (Self::new(Arc::new(exporter)), sinks)
    }

    /// Returns a reference to the exporter.
    #[must_use]
    pub fn exporter(&self) -> &MetricsExporter {
        self.exporter.as_ref()
    }
}
