//! Meterline Shared Library
//!
//! This crate turns OTLP metrics into two export forms: uniform rows for
//! columnar storage, and deduplicated per-metric descriptors for a
//! data-governance catalog.
//!
//! # Modules
//!
//! - [`otlp`] - Row flattening and descriptor extraction from OTLP metrics
//! - [`schema`] - Canonical row schema, JSON rows and Arrow batches
//! - [`catalog`] - Catalog entity mapping and catalog clients
//! - [`storage`] - Row and metadata sinks
//! - [`config`] - Export settings
//! - [`models`] - Row, descriptor and catalog entity types
//!
//! # Example
//!
//! ```
//! use shared::otlp::flatten::flatten_metrics;
//! use shared::otlp::proto::metrics::v1::{
//!     metric::Data, summary_data_point::ValueAtQuantile, Metric, Summary, SummaryDataPoint,
//! };
//!
//! let metric = Metric {
//!     name: "rpc.duration".to_string(),
//!     data: Some(Data::Summary(Summary {
//!         data_points: vec![SummaryDataPoint {
//!             quantile_values: vec![ValueAtQuantile { quantile: 0.5, value: 12.0 }],
//!             ..Default::default()
//!         }],
//!     })),
//!     ..Default::default()
//! };
//!
//! let records = flatten_metrics(&[metric]);
//! assert_eq!(records[0].type_name.as_str(), "summary");
//! assert_eq!(records[0].series("quantiles"), Some(&[0.5][..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod config;
pub mod models;
pub mod otlp;
pub mod schema;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
