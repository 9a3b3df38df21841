//! Descriptor extraction from OTLP scope metrics.
//!
//! Extraction walks one resource's scopes and produces one `MetricDescriptor`
//! per first-seen metric name. Unlike flattening, a metric without data is not
//! silently dropped: it is reported back as a [`ShapeUnsupported`] outcome.

use crate::models::MetricDescriptor;
use crate::otlp::attributes::{value_to_string, value_type_name};
use crate::otlp::nanos_to_millis;
use crate::otlp::proto::common::v1::{any_value::Value, InstrumentationScope, KeyValue};
use crate::otlp::proto::metrics::v1::{metric::Data, Metric, ScopeMetrics};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Scope attribute marking the scope as an SLI source.
pub const SLI_ENABLED_ATTRIBUTE: &str = "sli.enabled";

/// Prefix of scope attributes carried into `sliDetail`, stripped of the prefix.
pub const SLI_DETAIL_PREFIX: &str = "sli.detail.";

/// A metric for which no descriptor was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Metric '{metric_name}' has no supported data shape")]
pub struct ShapeUnsupported {
    /// Name of the skipped metric.
    pub metric_name: String,
}

/// Result of extracting descriptors from one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorExtraction {
    /// Descriptors in first-seen order.
    pub descriptors: Vec<MetricDescriptor>,

    /// Metrics skipped because their shape is unset, in traversal order.
    pub unsupported: Vec<ShapeUnsupported>,
}

impl DescriptorExtraction {
    /// Returns true if nothing was produced or skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty() && self.unsupported.is_empty()
    }
}

/// SLI flags shared by every metric of one scope.
#[derive(Debug, Default)]
struct ScopeSli {
    is_sli: Option<bool>,
    detail: Option<HashMap<String, String>>,
}

impl ScopeSli {
    fn from_scope(scope: Option<&InstrumentationScope>) -> Self {
        let Some(scope) = scope else {
            return Self::default();
        };

        let mut sli = Self::default();
        let mut detail = HashMap::new();
        for attribute in &scope.attributes {
            if attribute.key == SLI_ENABLED_ATTRIBUTE {
                sli.is_sli = Some(is_truthy(attribute));
            } else if let Some(key) = attribute.key.strip_prefix(SLI_DETAIL_PREFIX) {
                detail.insert(key.to_string(), value_to_string(attribute.value.as_ref()));
            }
        }
        if !detail.is_empty() {
            sli.detail = Some(detail);
        }
        sli
    }
}

fn is_truthy(attribute: &KeyValue) -> bool {
    match attribute.value.as_ref().and_then(|v| v.value.as_ref()) {
        Some(Value::BoolValue(b)) => *b,
        Some(Value::StringValue(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Folds one data point's end time and attribute types into a descriptor.
fn observe_point(descriptor: &mut MetricDescriptor, time_unix_nano: u64, attributes: &[KeyValue]) {
    descriptor.last_publish_time_ms = descriptor
        .last_publish_time_ms
        .max(nanos_to_millis(time_unix_nano));

    for attribute in attributes {
        descriptor.dimension_types.insert(
            attribute.key.clone(),
            value_type_name(attribute.value.as_ref()).to_string(),
        );
    }
}

/// Builds the descriptor of a single metric, or `None` for an unset shape.
fn describe_metric(metric: &Metric) -> Option<MetricDescriptor> {
    let mut descriptor = MetricDescriptor::new(&metric.name, &metric.description);

    match metric.data.as_ref()? {
        Data::Gauge(gauge) => {
            for dp in &gauge.data_points {
                observe_point(&mut descriptor, dp.time_unix_nano, &dp.attributes);
            }
        }
        Data::Sum(sum) => {
            for dp in &sum.data_points {
                observe_point(&mut descriptor, dp.time_unix_nano, &dp.attributes);
            }
        }
        Data::Histogram(histogram) => {
            for dp in &histogram.data_points {
                observe_point(&mut descriptor, dp.time_unix_nano, &dp.attributes);
            }
        }
        Data::ExponentialHistogram(histogram) => {
            for dp in &histogram.data_points {
                observe_point(&mut descriptor, dp.time_unix_nano, &dp.attributes);
            }
        }
        Data::Summary(summary) => {
            for dp in &summary.data_points {
                observe_point(&mut descriptor, dp.time_unix_nano, &dp.attributes);
            }
        }
    }

    Some(descriptor)
}

/// Extracts deduplicated descriptors from the scopes of one resource.
///
/// Scopes are visited in order and metrics within a scope in order. Only the
/// first occurrence of a name contributes; later occurrences are dropped with
/// their data points. A metric with an unset shape yields a
/// [`ShapeUnsupported`] entry and does not claim its name.
///
/// # Example
///
/// ```
/// use shared::otlp::extract::extract_descriptors;
/// use shared::otlp::proto::metrics::v1::{metric::Data, Gauge, Metric, ScopeMetrics};
///
/// let scope = ScopeMetrics {
///     metrics: vec![
///         Metric {
///             name: "up".to_string(),
///             data: Some(Data::Gauge(Gauge::default())),
///             ..Default::default()
///         },
///         Metric {
///             name: "broken".to_string(),
///             ..Default::default()
///         },
///     ],
///     ..Default::default()
/// };
///
/// let extraction = extract_descriptors(&[scope]);
/// assert_eq!(extraction.descriptors.len(), 1);
/// assert_eq!(extraction.unsupported[0].metric_name, "broken");
/// ```
#[must_use]
pub fn extract_descriptors(scope_metrics: &[ScopeMetrics]) -> DescriptorExtraction {
    let mut extraction = DescriptorExtraction::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for scope in scope_metrics {
        let sli = ScopeSli::from_scope(scope.scope.as_ref());

        for metric in &scope.metrics {
            if seen.contains(metric.name.as_str()) {
                continue;
            }

            match describe_metric(metric) {
                Some(mut descriptor) => {
                    descriptor.is_sli = sli.is_sli;
                    descriptor.sli_detail.clone_from(&sli.detail);
                    seen.insert(metric.name.as_str());
                    extraction.descriptors.push(descriptor);
                }
                None => {
                    tracing::warn!(metric = %metric.name, "Skipping metric with unsupported shape");
                    extraction.unsupported.push(ShapeUnsupported {
                        metric_name: metric.name.clone(),
                    });
                }
            }
        }
    }

    extraction
}
