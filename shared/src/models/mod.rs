//! Data models for the Meterline export path.
//!
//! This module contains the flattened row, the metric descriptor, and the
//! catalog entity shapes produced from OTLP metrics.

pub mod catalog;
pub mod descriptor;
pub mod record;

pub use catalog::{CatalogAttributes, CatalogEntity, CatalogEntityBulk};
pub use descriptor::{Destinations, MetricDescriptor, ResourceAttributes, ResourceMetadata};
pub use record::{MetricRecord, SeriesType};
