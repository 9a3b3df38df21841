//! Columnar batch building for metric records.

use crate::models::MetricRecord;
use crate::schema::{ensure_finite, metric_record_schema};
use arrow::array::{
    ArrayRef, Float64Builder, ListBuilder, MapBuilder, StringBuilder, TimestampMillisecondBuilder,
};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while encoding rows.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch was already finished; no further rows may be added.
    #[error("Batch already finalized")]
    Finalized,

    /// A previous row failed to encode and the batch was discarded.
    #[error("Batch aborted after an encoding failure")]
    Aborted,

    /// A row could not be encoded.
    #[error("Serialization failure: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchState {
    Open,
    Finished,
    Aborted,
}

/// Accumulates metric records into the six Arrow columns of
/// [`metric_record_schema`].
///
/// A builder produces a single batch. Once [`finish`](Self::finish) has
/// returned, further calls fail with [`BatchError::Finalized`]. If any row
/// fails to encode the whole in-flight batch is dropped and the builder stays
/// unusable.
///
/// # Example
///
/// ```
/// use shared::models::{MetricRecord, SeriesType};
/// use shared::schema::MetricRecordBatchBuilder;
///
/// let mut builder = MetricRecordBatchBuilder::new();
/// builder
///     .append(&[MetricRecord::new("cpu", SeriesType::Number).with_series("value", vec![1.0])])
///     .unwrap();
///
/// let batch = builder.finish().unwrap();
/// assert_eq!(batch.num_rows(), 1);
/// assert!(builder.finish().is_err());
/// ```
pub struct MetricRecordBatchBuilder {
    start: TimestampMillisecondBuilder,
    end: TimestampMillisecondBuilder,
    name: StringBuilder,
    dimensions: MapBuilder<StringBuilder, StringBuilder>,
    type_name: StringBuilder,
    series: MapBuilder<StringBuilder, ListBuilder<Float64Builder>>,
    rows: usize,
    state: BatchState,
}

impl Default for MetricRecordBatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricRecordBatchBuilder {
    /// Creates an empty, open builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: TimestampMillisecondBuilder::new(),
            end: TimestampMillisecondBuilder::new(),
            name: StringBuilder::new(),
            dimensions: MapBuilder::new(None, StringBuilder::new(), StringBuilder::new()),
            type_name: StringBuilder::new(),
            series: MapBuilder::new(
                None,
                StringBuilder::new(),
                ListBuilder::new(Float64Builder::new()),
            ),
            rows: 0,
            state: BatchState::Open,
        }
    }

    /// Number of rows appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Returns true if no rows have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    fn ensure_open(&self) -> Result<(), BatchError> {
        match self.state {
            BatchState::Open => Ok(()),
            BatchState::Finished => Err(BatchError::Finalized),
            BatchState::Aborted => Err(BatchError::Aborted),
        }
    }

    /// Appends rows to the batch.
    ///
    /// Map entries are written in key order so identical records always
    /// encode to identical columns.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Finalized` after [`finish`](Self::finish), or
    /// `BatchError::Serialization` if a row cannot be encoded, in which case
    /// the batch is aborted.
    pub fn append(&mut self, records: &[MetricRecord]) -> Result<(), BatchError> {
        self.ensure_open()?;

        for record in records {
            if let Err(e) = self.append_row(record) {
                tracing::error!(metric = %record.metric_name, error = %e, "Aborting record batch");
                self.state = BatchState::Aborted;
                return Err(e);
            }
        }

        Ok(())
    }

    fn append_row(&mut self, record: &MetricRecord) -> Result<(), BatchError> {
        ensure_finite(record)?;

        self.start.append_value(record.start_timestamp_ms);
        self.end.append_value(record.end_timestamp_ms);
        self.name.append_value(&record.metric_name);
        self.type_name.append_value(record.type_name.as_str());

        let mut dimensions: Vec<_> = record.dimensions.iter().collect();
        dimensions.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (key, value) in dimensions {
            self.dimensions.keys().append_value(key);
            self.dimensions.values().append_value(value);
        }
        self.dimensions
            .append(true)
            .map_err(|e| BatchError::Serialization(e.to_string()))?;

        let mut series: Vec<_> = record.time_series_values.iter().collect();
        series.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (component, values) in series {
            self.series.keys().append_value(component);
            let list = self.series.values();
            list.values().append_slice(values);
            list.append(true);
        }
        self.series
            .append(true)
            .map_err(|e| BatchError::Serialization(e.to_string()))?;

        self.rows += 1;
        Ok(())
    }

    /// Finalizes the builder into a `RecordBatch`.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Finalized` if called twice, `BatchError::Aborted`
    /// after a failed append, or `BatchError::Serialization` if the columns do
    /// not match the schema.
    pub fn finish(&mut self) -> Result<RecordBatch, BatchError> {
        self.ensure_open()?;
        self.state = BatchState::Finished;

        let columns: Vec<ArrayRef> = vec![
            Arc::new(self.start.finish()),
            Arc::new(self.end.finish()),
            Arc::new(self.name.finish()),
            Arc::new(self.dimensions.finish()),
            Arc::new(self.type_name.finish()),
            Arc::new(self.series.finish()),
        ];

        RecordBatch::try_new(metric_record_schema(), columns)
            .map_err(|e| BatchError::Serialization(e.to_string()))
    }
}

/// Encodes a slice of records into a single batch.
///
/// # Errors
///
/// Returns `BatchError::Serialization` if any row fails to encode; no partial
/// batch is produced.
pub fn records_to_batch(records: &[MetricRecord]) -> Result<RecordBatch, BatchError> {
    let mut builder = MetricRecordBatchBuilder::new();
    builder.append(records)?;
    builder.finish()
}
