//! Flattening of OTLP metrics into uniform rows.
//!
//! Every data point of a supported shape becomes exactly one `MetricRecord`.
//! Metrics without data (the unset shape) are skipped without a record or an
//! error. The conversion never validates the payload: bucket bounds and counts
//! are carried through as given.

use crate::models::record::{
    SERIES_BOUNDS, SERIES_COUNT, SERIES_COUNTS, SERIES_QUANTILES, SERIES_SUM, SERIES_VALUE,
    SERIES_VALUES,
};
use crate::models::{MetricRecord, SeriesType};
use crate::otlp::attributes::attributes_to_dimensions;
use crate::otlp::nanos_to_millis;
use crate::otlp::proto;
use crate::otlp::proto::common::v1::KeyValue;
use crate::otlp::proto::metrics::v1::{
    metric::Data, number_data_point, ExponentialHistogramDataPoint, HistogramDataPoint, Metric,
    NumberDataPoint, ResourceMetrics, ScopeMetrics, SummaryDataPoint,
};

/// Builds the shared part of a record from a data point's timing and attributes.
fn base_record(
    name: &str,
    type_name: SeriesType,
    start_time_unix_nano: u64,
    time_unix_nano: u64,
    attributes: &[KeyValue],
) -> MetricRecord {
    MetricRecord::new(name, type_name)
        .with_timestamps(
            nanos_to_millis(start_time_unix_nano),
            nanos_to_millis(time_unix_nano),
        )
        .with_dimensions(attributes_to_dimensions(attributes))
}

/// Integer points are promoted to `f64`; an unset value reads as zero.
#[allow(clippy::cast_precision_loss)]
fn number_value(data_point: &NumberDataPoint) -> f64 {
    match data_point.value {
        Some(number_data_point::Value::AsInt(i)) => i as f64,
        Some(number_data_point::Value::AsDouble(d)) => d,
        None => 0.0,
    }
}

fn flatten_number_points(name: &str, data_points: &[NumberDataPoint], out: &mut Vec<MetricRecord>) {
    out.extend(data_points.iter().map(|dp| {
        base_record(
            name,
            SeriesType::Number,
            dp.start_time_unix_nano,
            dp.time_unix_nano,
            &dp.attributes,
        )
        .with_series(SERIES_VALUE, vec![number_value(dp)])
    }));
}

#[allow(clippy::cast_precision_loss)]
fn flatten_histogram_points(
    name: &str,
    data_points: &[HistogramDataPoint],
    out: &mut Vec<MetricRecord>,
) {
    out.extend(data_points.iter().map(|dp| {
        // Counts above 2^53 lose precision.
        let counts: Vec<f64> = dp.bucket_counts.iter().map(|c| *c as f64).collect();

        base_record(
            name,
            SeriesType::Histogram,
            dp.start_time_unix_nano,
            dp.time_unix_nano,
            &dp.attributes,
        )
        .with_series(SERIES_BOUNDS, dp.explicit_bounds.clone())
        .with_series(SERIES_COUNTS, counts)
    }));
}

/// Only the aggregate count and sum survive; scale, offsets and buckets are dropped.
#[allow(clippy::cast_precision_loss)]
fn flatten_exponential_histogram_points(
    name: &str,
    data_points: &[ExponentialHistogramDataPoint],
    out: &mut Vec<MetricRecord>,
) {
    out.extend(data_points.iter().map(|dp| {
        base_record(
            name,
            SeriesType::ExponentialHistogram,
            dp.start_time_unix_nano,
            dp.time_unix_nano,
            &dp.attributes,
        )
        .with_series(SERIES_COUNT, vec![dp.count as f64])
        .with_series(SERIES_SUM, vec![dp.sum.unwrap_or(0.0)])
    }));
}

fn flatten_summary_points(name: &str, data_points: &[SummaryDataPoint], out: &mut Vec<MetricRecord>) {
    out.extend(data_points.iter().map(|dp| {
        let (quantiles, values): (Vec<f64>, Vec<f64>) = dp
            .quantile_values
            .iter()
            .map(|q| (q.quantile, q.value))
            .unzip();

        base_record(
            name,
            SeriesType::Summary,
            dp.start_time_unix_nano,
            dp.time_unix_nano,
            &dp.attributes,
        )
        .with_series(SERIES_QUANTILES, quantiles)
        .with_series(SERIES_VALUES, values)
    }));
}

/// Flattens one metric into `out`, dispatching on its shape.
fn flatten_metric(metric: &Metric, out: &mut Vec<MetricRecord>) {
    let name = metric.name.as_str();

    match &metric.data {
        Some(Data::Gauge(gauge)) => flatten_number_points(name, &gauge.data_points, out),
        Some(Data::Sum(sum)) => flatten_number_points(name, &sum.data_points, out),
        Some(Data::Histogram(histogram)) => {
            flatten_histogram_points(name, &histogram.data_points, out);
        }
        Some(Data::ExponentialHistogram(histogram)) => {
            flatten_exponential_histogram_points(name, &histogram.data_points, out);
        }
        Some(Data::Summary(summary)) => flatten_summary_points(name, &summary.data_points, out),
        None => {}
    }
}

/// Converts metrics into one `MetricRecord` per data point, in input order.
///
/// # Example
///
/// ```
/// use shared::otlp::flatten::flatten_metrics;
/// use shared::otlp::proto::metrics::v1::{
///     metric::Data, number_data_point::Value, Gauge, Metric, NumberDataPoint,
/// };
///
/// let metric = Metric {
///     name: "queue.depth".to_string(),
///     data: Some(Data::Gauge(Gauge {
///         data_points: vec![NumberDataPoint {
///             time_unix_nano: 2_000_000_000,
///             value: Some(Value::AsInt(7)),
///             ..Default::default()
///         }],
///     })),
///     ..Default::default()
/// };
///
/// let records = flatten_metrics(&[metric]);
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].end_timestamp_ms, 2_000);
/// assert_eq!(records[0].series("value"), Some(&[7.0][..]));
/// ```
#[must_use]
pub fn flatten_metrics(metrics: &[Metric]) -> Vec<MetricRecord> {
    let mut records = Vec::new();
    for metric in metrics {
        flatten_metric(metric, &mut records);
    }
    records
}

/// Flattens every metric of every scope, scopes in order.
#[must_use]
pub fn flatten_scope_metrics(scope_metrics: &[ScopeMetrics]) -> Vec<MetricRecord> {
    let mut records = Vec::new();
    for scope in scope_metrics {
        for metric in &scope.metrics {
            flatten_metric(metric, &mut records);
        }
    }
    records
}

/// Flattens every metric of every resource, resources in order.
#[must_use]
pub fn flatten_resource_metrics(resource_metrics: &[ResourceMetrics]) -> Vec<MetricRecord> {
    resource_metrics
        .iter()
        .flat_map(|rm| flatten_scope_metrics(&rm.scope_metrics))
        .collect()
}

/// Flattens a whole OTLP export request.
#[must_use]
pub fn flatten_request(
    request: &proto::collector::metrics::v1::ExportMetricsServiceRequest,
) -> Vec<MetricRecord> {
    flatten_resource_metrics(&request.resource_metrics)
}


#[cfg(test)]
#[path = "flatten_test.rs"]
mod flatten_test;
