//! Flattened metric row model.
//!
//! Defines `MetricRecord`, the uniform row every OTLP data point is flattened
//! into before it is handed to a columnar or line-oriented sink.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Series component holding the scalar of a number data point.
pub const SERIES_VALUE: &str = "value";
/// Series component holding histogram bucket bounds.
pub const SERIES_BOUNDS: &str = "bounds";
/// Series component holding histogram bucket counts.
pub const SERIES_COUNTS: &str = "counts";
/// Series component holding the aggregate count of an exponential histogram.
pub const SERIES_COUNT: &str = "count";
/// Series component holding the aggregate sum of an exponential histogram.
pub const SERIES_SUM: &str = "sum";
/// Series component holding summary quantiles.
pub const SERIES_QUANTILES: &str = "quantiles";
/// Series component holding summary values, index-aligned with the quantiles.
pub const SERIES_VALUES: &str = "values";

/// The shape a record was flattened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesType {
    /// Gauge or sum data point.
    Number,
    /// Explicit-bucket histogram data point.
    Histogram,
    /// Exponential histogram data point (count and sum only).
    ExponentialHistogram,
    /// Summary data point.
    Summary,
}

impl SeriesType {
    /// Returns the canonical name stored in the `typeName` column.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Histogram => "histogram",
            Self::ExponentialHistogram => "exponential_histogram",
            Self::Summary => "summary",
        }
    }
}

impl std::fmt::Display for SeriesType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flattened row, produced for exactly one input data point.
///
/// # Example
///
/// ```
/// use shared::models::{MetricRecord, SeriesType};
///
/// let record = MetricRecord::new("http.requests", SeriesType::Number)
///     .with_timestamps(0, 1_000)
///     .with_dimension("method", "GET")
///     .with_series("value", vec![12.0]);
///
/// assert_eq!(record.type_name.as_str(), "number");
/// assert_eq!(record.series("value"), Some(&[12.0][..]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    /// Start of the observation window, epoch milliseconds.
    pub start_timestamp_ms: i64,

    /// End of the observation window, epoch milliseconds.
    pub end_timestamp_ms: i64,

    /// Name of the owning metric, copied verbatim.
    pub metric_name: String,

    /// Shape the record was produced from.
    pub type_name: SeriesType,

    /// Data point attributes with stringified values.
    #[serde(default)]
    pub dimensions: HashMap<String, String>,

    /// Shape-dependent series components.
    #[serde(default)]
    pub time_series_values: HashMap<String, Vec<f64>>,
}

impl MetricRecord {
    /// Creates an empty record with zero timestamps.
    #[must_use]
    pub fn new(metric_name: impl Into<String>, type_name: SeriesType) -> Self {
        Self {
            start_timestamp_ms: 0,
            end_timestamp_ms: 0,
            metric_name: metric_name.into(),
            type_name,
            dimensions: HashMap::new(),
            time_series_values: HashMap::new(),
        }
    }

    /// Sets the start and end timestamps in epoch milliseconds.
    #[must_use]
    pub fn with_timestamps(mut self, start_ms: i64, end_ms: i64) -> Self {
        self.start_timestamp_ms = start_ms;
        self.end_timestamp_ms = end_ms;
        self
    }

    /// Replaces the dimensions map.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: HashMap<String, String>) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Adds a single dimension.
    #[must_use]
    pub fn with_dimension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }

    /// Adds a series component.
    #[must_use]
    pub fn with_series(mut self, component: impl Into<String>, values: Vec<f64>) -> Self {
        self.time_series_values.insert(component.into(), values);
        self
    }

    /// Returns the values of a series component, if present.
    #[must_use]
    pub fn series(&self, component: &str) -> Option<&[f64]> {
        self.time_series_values.get(component).map(Vec::as_slice)
    }
}
