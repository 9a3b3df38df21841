//! OpenTelemetry Protocol (OTLP) support.
//!
//! This module turns OTLP metric messages into Meterline rows and descriptors.
//!
//! - [`flatten`] - one `MetricRecord` per data point, for storage export
//! - [`extract`] - deduplicated `MetricDescriptor`s, for catalog export
//! - [`attributes`] - attribute stringification and type naming shared by both

pub mod attributes;
pub mod extract;
pub mod flatten;

/// Generated OTLP protobuf types.
///
/// Re-exported so callers build and decode requests against the same types
/// the flattener and extractor accept.
pub use opentelemetry_proto::tonic as proto;

/// Converts OTLP nanoseconds since epoch to whole milliseconds, truncating.
#[must_use]
pub fn nanos_to_millis(nanos: u64) -> i64 {
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanos_to_millis_truncates() {
        assert_eq!(nanos_to_millis(0), 0);
        assert_eq!(nanos_to_millis(1_999_999), 1);
        assert_eq!(nanos_to_millis(1_000_000_000), 1_000);
        assert_eq!(nanos_to_millis(1_700_000_000_123_456_789), 1_700_000_000_123);
    }
}
