//! Metric descriptor model.
//!
//! A `MetricDescriptor` is the deduplicated, per-metric-name metadata record
//! produced by descriptor extraction.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Resource attributes with stringified values, keyed by attribute name.
pub type ResourceAttributes = HashMap<String, String>;

/// Export destinations: destination name to its properties.
pub type Destinations = BTreeMap<String, BTreeMap<String, String>>;

/// Metadata describing one metric name within a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    /// Metric name (deduplication key).
    pub name: String,

    /// Description from the first occurrence of the metric.
    #[serde(default)]
    pub description: String,

    /// Latest end timestamp seen across the metric's data points, epoch milliseconds.
    pub last_publish_time_ms: i64,

    /// Attribute key to the type name of the value last observed for it.
    #[serde(default)]
    pub dimension_types: HashMap<String, String>,

    /// Whether the owning scope is a service-level-indicator source.
    #[serde(rename = "isSLI", default, skip_serializing_if = "Option::is_none")]
    pub is_sli: Option<bool>,

    /// Scope-level SLI details shared by every metric in the scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sli_detail: Option<HashMap<String, String>>,
}

impl MetricDescriptor {
    /// Creates a descriptor with no data point contribution yet.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            last_publish_time_ms: 0,
            dimension_types: HashMap::new(),
            is_sli: None,
            sli_detail: None,
        }
    }

    /// Returns the recorded type name for a dimension key.
    #[must_use]
    pub fn dimension_type(&self, key: &str) -> Option<&str> {
        self.dimension_types.get(key).map(String::as_str)
    }
}

/// Descriptors of one resource, as persisted by the metadata sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    /// Deduplicated descriptors in first-seen order.
    pub metadata: Vec<MetricDescriptor>,

    /// Attributes of the originating resource.
    pub resources: ResourceAttributes,

    /// Destinations the resource's rows were exported to.
    #[serde(default)]
    pub destinations: Destinations,
}
