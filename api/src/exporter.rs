//! Export pipeline shared by the HTTP and gRPC receivers.
//!
//! One export call runs two paths over the same request:
//! - the storage path flattens every data point into rows and hands them to
//!   each configured [`RecordSink`]
//! - the catalog path extracts deduplicated descriptors per resource, writes
//!   them to the [`MetadataSink`] and registers them with the catalog

use anyhow::{Context, Result};
use shared::catalog::{
    build_catalog_entities, CatalogClient, CatalogError, HttpCatalogClient, InMemoryCatalogClient,
};
use shared::config::ExportSettings;
use shared::models::{CatalogEntityBulk, Destinations, ResourceMetadata};
use shared::otlp::attributes::resource_attributes;
use shared::otlp::extract::extract_descriptors;
use shared::otlp::flatten::flatten_request;
use shared::otlp::proto::collector::metrics::v1::ExportMetricsServiceRequest;
use shared::storage::{
    ClickHouseRecordSink, InMemoryMetadataSink, InMemoryRecordSink, JsonLinesMetadataSink,
    JsonLinesRecordSink, MetadataSink, ParquetFileSink, RecordSink, SinkError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort an export call.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A row or metadata sink failed.
    #[error("Sink write failed: {0}")]
    Sink(#[from] SinkError),

    /// The catalog could not be reached or rejected a request.
    #[error("Catalog registration failed: {0}")]
    Catalog(#[from] CatalogError),
}

/// Outcome of one successful export call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Rows handed to every record sink.
    pub records: usize,
    /// Descriptors extracted across all resources.
    pub descriptors: usize,
    /// Names of metrics whose shape could not be described.
    pub unsupported: Vec<String>,
}

impl ExportSummary {
    /// Describes the metrics whose shape was skipped, if any.
    ///
    /// Such metrics carry no data points and contribute no rows, so nothing
    /// counts as rejected.
    #[must_use]
    pub fn unsupported_message(&self) -> Option<String> {
        if self.unsupported.is_empty() {
            None
        } else {
            Some(format!(
                "metrics with unsupported shape were not described: {}",
                self.unsupported.join(", ")
            ))
        }
    }
}

/// Handles to the in-memory sinks of an exporter built by
/// [`MetricsExporter::in_memory`].
#[derive(Clone)]
pub struct InMemorySinks {
    /// Row sink.
    pub records: Arc<InMemoryRecordSink>,
    /// Metadata sink.
    pub metadata: Arc<InMemoryMetadataSink>,
    /// Catalog client.
    pub catalog: Arc<InMemoryCatalogClient>,
}

/// Runs the storage and catalog paths for OTLP export requests.
pub struct MetricsExporter {
    record_sinks: Vec<Arc<dyn RecordSink>>,
    metadata_sink: Option<Arc<dyn MetadataSink>>,
    catalog: Option<Arc<dyn CatalogClient>>,
    type_registered: AtomicBool,
}

impl MetricsExporter {
    /// Creates an exporter without any sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            record_sinks: Vec::new(),
            metadata_sink: None,
            catalog: None,
            type_registered: AtomicBool::new(false),
        }
    }

    /// Adds a row sink.
    #[must_use]
    pub fn with_record_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.record_sinks.push(sink);
        self
    }

    /// Sets the metadata sink.
    #[must_use]
    pub fn with_metadata_sink(mut self, sink: Arc<dyn MetadataSink>) -> Self {
        self.metadata_sink = Some(sink);
        self
    }

    /// Sets the catalog client.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogClient>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Builds an exporter from validated settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or a file sink cannot be
    /// opened.
    pub fn from_settings(settings: &ExportSettings) -> Result<Self> {
        settings
            .validate_settings()
            .context("Invalid export settings")?;

        let mut exporter = Self::new();

        if let Some(dir) = &settings.parquet_dir {
            let sink = ParquetFileSink::new(dir, settings.parquet.clone())
                .with_context(|| format!("Failed to prepare {}", dir.display()))?;
            exporter = exporter.with_record_sink(Arc::new(sink));
        }
        if let Some(path) = &settings.records_jsonl {
            let sink = JsonLinesRecordSink::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            exporter = exporter.with_record_sink(Arc::new(sink));
        }
        if let Some(clickhouse) = &settings.clickhouse {
            exporter = exporter.with_record_sink(Arc::new(ClickHouseRecordSink::new(clickhouse)));
        }
        if let Some(path) = &settings.metadata_jsonl {
            let sink = JsonLinesMetadataSink::create(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            exporter = exporter.with_metadata_sink(Arc::new(sink));
        }
        if let Some(catalog) = &settings.catalog {
            exporter = exporter.with_catalog(Arc::new(HttpCatalogClient::from_settings(catalog)));
        }

        tracing::info!(
            record_sinks = exporter.record_sinks.len(),
            metadata = exporter.metadata_sink.is_some(),
            catalog = exporter.catalog.is_some(),
            "Metrics exporter configured"
        );

        Ok(exporter)
    }

    /// Creates an exporter backed by in-memory sinks.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn in_memory() -> (Self, InMemorySinks) {
        let sinks = InMemorySinks {
            records: InMemoryRecordSink::new_shared(),
            metadata: InMemoryMetadataSink::new_shared(),
            catalog: InMemoryCatalogClient::new_shared(),
        };

        let exporter = Self::new()
            .with_record_sink(Arc::clone(&sinks.records) as Arc<dyn RecordSink>)
            .with_metadata_sink(Arc::clone(&sinks.metadata) as Arc<dyn MetadataSink>)
            .with_catalog(Arc::clone(&sinks.catalog) as Arc<dyn CatalogClient>);

        (exporter, sinks)
    }

    /// Destinations the rows are exported to, keyed by sink name.
    #[must_use]
    pub fn destinations(&self) -> Destinations {
        self.record_sinks
            .iter()
            .map(|sink| (sink.name().to_string(), sink.properties()))
            .collect()
    }

    /// Exports one request through both paths.
    ///
    /// Rows are written before any metadata, and the first failing sink or
    /// catalog call aborts the export.
    ///
    /// # Errors
    ///
    /// Returns an error if a sink write or a catalog request fails.
    pub fn export(&self, request: &ExportMetricsServiceRequest) -> Result<ExportSummary, ExportError> {
        let records = flatten_request(request);
        for sink in &self.record_sinks {
            sink.write_records(&records)?;
        }

        let destinations = self.destinations();
        let mut summary = ExportSummary {
            records: records.len(),
            ..ExportSummary::default()
        };

        let metadata: Vec<ResourceMetadata> = request
            .resource_metrics
            .iter()
            .map(|resource_metrics| {
                let extraction = extract_descriptors(&resource_metrics.scope_metrics);
                summary.descriptors += extraction.descriptors.len();
                summary.unsupported.extend(
                    extraction
                        .unsupported
                        .into_iter()
                        .map(|unsupported| unsupported.metric_name),
                );

                ResourceMetadata {
                    metadata: extraction.descriptors,
                    resources: resource_attributes(resource_metrics.resource.as_ref()),
                    destinations: destinations.clone(),
                }
            })
            .collect();

        if let Some(sink) = &self.metadata_sink {
            if !metadata.is_empty() {
                sink.write_metadata(&metadata)?;
            }
        }

        if let Some(catalog) = &self.catalog {
            self.register(catalog.as_ref(), &metadata)?;
        }

        tracing::debug!(
            records = summary.records,
            descriptors = summary.descriptors,
            unsupported = summary.unsupported.len(),
            "Exported OTLP metrics"
        );

        Ok(summary)
    }

    fn register(
        &self,
        catalog: &dyn CatalogClient,
        metadata: &[ResourceMetadata],
    ) -> Result<(), CatalogError> {
        let entities: Vec<_> = metadata
            .iter()
            .flat_map(|resource| {
                build_catalog_entities(&resource.metadata, &resource.resources, &resource.destinations)
            })
            .collect();
        if entities.is_empty() {
            return Ok(());
        }

        if !self.type_registered.load(Ordering::Acquire) {
            catalog.ensure_metadata_type()?;
            self.type_registered.store(true, Ordering::Release);
        }

        catalog.create_entities(&CatalogEntityBulk::new(entities))
    }
}

impl Default for MetricsExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::MetricRecord;
    use shared::otlp::proto::common::v1::{any_value, AnyValue, KeyValue};
    use shared::otlp::proto::metrics::v1::{
        metric::Data, number_data_point, Gauge, Metric, NumberDataPoint, ResourceMetrics,
        ScopeMetrics,
    };
    use shared::otlp::proto::resource::v1::Resource;
    use std::collections::BTreeMap;

    fn gauge(name: &str, values: &[f64]) -> Metric {
        Metric {
            name: name.to_string(),
            description: format!("{name} description"),
            data: Some(Data::Gauge(Gauge {
                data_points: values
                    .iter()
                    .map(|v| NumberDataPoint {
                        value: Some(number_data_point::Value::AsDouble(*v)),
                        time_unix_nano: 2_000_000_000,
                        ..Default::default()
                    })
                    .collect(),
            })),
            ..Default::default()
        }
    }

    fn request(service: &str, metrics: Vec<Metric>) -> ExportMetricsServiceRequest {
        ExportMetricsServiceRequest {
            resource_metrics: vec![ResourceMetrics {
                resource: Some(Resource {
                    attributes: vec![KeyValue {
                        key: "service.name".to_string(),
                        value: Some(AnyValue {
                            value: Some(any_value::Value::StringValue(service.to_string())),
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                scope_metrics: vec![ScopeMetrics {
                    metrics,
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn properties(&self) -> BTreeMap<String, String> {
            BTreeMap::new()
        }

        fn write_records(&self, _records: &[MetricRecord]) -> Result<(), SinkError> {
            Err(SinkError::StorageError("disk full".to_string()))
        }
    }

    #[test]
    fn test_export_runs_both_paths() {
        let (exporter, sinks) = MetricsExporter::in_memory();

        let summary = exporter
            .export(&request("svc", vec![gauge("cpu", &[1.0, 2.0]), gauge("mem", &[3.0])]))
            .unwrap();

        assert_eq!(summary.records, 3);
        assert_eq!(summary.descriptors, 2);
        assert!(summary.unsupported.is_empty());
        assert_eq!(sinks.records.count().unwrap(), 3);

        let writes = sinks.metadata.writes().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0][0].resources["service.name"], "svc");
        assert!(writes[0][0].destinations.contains_key("memory"));

        let bulks = sinks.catalog.bulks().unwrap();
        assert_eq!(bulks.len(), 1);
        assert_eq!(bulks[0].entities[0].attributes.qualified_name, "svc-cpu");
        assert!(sinks.catalog.type_registered().unwrap());
    }

    #[test]
    fn test_unsupported_metric_is_reported() {
        let (exporter, sinks) = MetricsExporter::in_memory();
        let orphan = Metric {
            name: "orphan".to_string(),
            ..Default::default()
        };

        let summary = exporter
            .export(&request("svc", vec![orphan, gauge("cpu", &[1.0])]))
            .unwrap();

        assert_eq!(summary.records, 1);
        assert_eq!(summary.unsupported, vec!["orphan".to_string()]);
        assert!(summary.unsupported_message().unwrap().ends_with("orphan"));
        assert_eq!(sinks.catalog.bulks().unwrap()[0].entities.len(), 1);
    }

    #[test]
    fn test_empty_request_skips_catalog() {
        let (exporter, sinks) = MetricsExporter::in_memory();

        let summary = exporter
            .export(&ExportMetricsServiceRequest::default())
            .unwrap();

        assert_eq!(summary, ExportSummary::default());
        assert!(summary.unsupported_message().is_none());
        assert!(sinks.metadata.writes().unwrap().is_empty());
        assert!(sinks.catalog.bulks().unwrap().is_empty());
        assert!(!sinks.catalog.type_registered().unwrap());
    }

    #[test]
    fn test_sink_failure_aborts_before_metadata() {
        let metadata = InMemoryMetadataSink::new_shared();
        let exporter = MetricsExporter::new()
            .with_record_sink(Arc::new(FailingSink))
            .with_metadata_sink(Arc::clone(&metadata) as Arc<dyn MetadataSink>);

        let result = exporter.export(&request("svc", vec![gauge("cpu", &[1.0])]));

        assert!(matches!(result, Err(ExportError::Sink(_))));
        assert!(metadata.writes().unwrap().is_empty());
    }

    #[test]
    fn test_destinations_from_record_sinks() {
        let exporter = MetricsExporter::new()
            .with_record_sink(InMemoryRecordSink::new_shared() as Arc<dyn RecordSink>)
            .with_record_sink(Arc::new(FailingSink));

        let destinations = exporter.destinations();

        assert_eq!(
            destinations.keys().collect::<Vec<_>>(),
            vec!["failing", "memory"]
        );
    }

    #[test]
    fn test_from_settings_builds_file_sinks() {
        let dir = std::env::temp_dir().join(format!("meterline-exporter-{}", std::process::id()));
        let settings = ExportSettings {
            parquet_dir: Some(dir.join("parquet")),
            records_jsonl: Some(dir.join("records.jsonl")),
            metadata_jsonl: Some(dir.join("metadata.jsonl")),
            ..ExportSettings::default()
        };

        let exporter = MetricsExporter::from_settings(&settings).unwrap();
        exporter
            .export(&request("svc", vec![gauge("cpu", &[1.0])]))
            .unwrap();

        let destinations = exporter.destinations();
        assert!(destinations.contains_key("parquet"));
        assert!(destinations.contains_key("jsonl"));
        let rows = std::fs::read_to_string(dir.join("records.jsonl")).unwrap();
        assert_eq!(rows.lines().count(), 1);
        let metadata = std::fs::read_to_string(dir.join("metadata.jsonl")).unwrap();
        assert!(metadata.contains("\"cpu\""));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_settings_requires_row_sink() {
        assert!(MetricsExporter::from_settings(&ExportSettings::default()).is_err());
    }
}
