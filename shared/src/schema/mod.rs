//! Canonical row schema for flattened metrics.
//!
//! Rows leave the system in one of two forms: a self-describing JSON line
//! ([`serialize_row`]) or a columnar Arrow batch built by
//! [`batch::MetricRecordBatchBuilder`]. Both carry exactly the six columns
//! defined here.

pub mod batch;

pub use batch::{records_to_batch, BatchError, MetricRecordBatchBuilder};

use crate::models::MetricRecord;
use arrow::datatypes::{DataType, Field, Fields, Schema, SchemaRef, TimeUnit};
use std::sync::Arc;

/// Column holding the start of the observation window.
pub const COL_START_TIMESTAMP: &str = "startTimestampMs";
/// Column holding the end of the observation window.
pub const COL_END_TIMESTAMP: &str = "endTimestampMs";
/// Column holding the metric name.
pub const COL_METRIC_NAME: &str = "metricName";
/// Column holding the stringified dimensions.
pub const COL_DIMENSIONS: &str = "dimensions";
/// Column holding the series type name.
pub const COL_TYPE_NAME: &str = "typeName";
/// Column holding the named value lists.
pub const COL_TIME_SERIES_VALUES: &str = "timeSeriesValues";

/// Field names used inside map columns.
pub(crate) const MAP_ENTRIES: &str = "entries";
pub(crate) const MAP_KEYS: &str = "keys";
pub(crate) const MAP_VALUES: &str = "values";

fn map_type(value_type: DataType) -> DataType {
    let entries = Fields::from(vec![
        Field::new(MAP_KEYS, DataType::Utf8, false),
        Field::new(MAP_VALUES, value_type, true),
    ]);
    DataType::Map(
        Arc::new(Field::new(MAP_ENTRIES, DataType::Struct(entries), false)),
        false,
    )
}

/// Arrow schema of a metric record batch.
///
/// Timestamps are epoch milliseconds without a timezone. Map keys are written
/// in sorted order, though the map type itself is declared unsorted.
#[must_use]
pub fn metric_record_schema() -> SchemaRef {
    let timestamp = DataType::Timestamp(TimeUnit::Millisecond, None);
    let float_list = DataType::List(Arc::new(Field::new_list_field(DataType::Float64, true)));

    Arc::new(Schema::new(vec![
        Field::new(COL_START_TIMESTAMP, timestamp.clone(), false),
        Field::new(COL_END_TIMESTAMP, timestamp, false),
        Field::new(COL_METRIC_NAME, DataType::Utf8, false),
        Field::new(COL_DIMENSIONS, map_type(DataType::Utf8), false),
        Field::new(COL_TYPE_NAME, DataType::Utf8, false),
        Field::new(COL_TIME_SERIES_VALUES, map_type(float_list), false),
    ]))
}

/// Rejects rows whose series hold NaN or infinite values.
///
/// JSON has no encoding for them, so both row forms refuse them alike.
pub(crate) fn ensure_finite(record: &MetricRecord) -> Result<(), BatchError> {
    let invalid = record
        .time_series_values
        .iter()
        .find(|(_, values)| values.iter().any(|v| !v.is_finite()));

    match invalid {
        Some((component, _)) => Err(BatchError::Serialization(format!(
            "non-finite value in series '{component}' of metric '{}'",
            record.metric_name
        ))),
        None => Ok(()),
    }
}

/// Serializes one row as JSON with its field names preserved.
///
/// # Errors
///
/// Returns `BatchError::Serialization` if the row cannot be encoded,
/// including when a series holds NaN or an infinite value.
pub fn serialize_row(record: &MetricRecord) -> Result<Vec<u8>, BatchError> {
    ensure_finite(record)?;
    serde_json::to_vec(record).map_err(|e| BatchError::Serialization(e.to_string()))
}
