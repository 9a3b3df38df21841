//! Sinks for flattened rows and resource metadata.
//!
//! Every sink serializes its own writes: concurrent export calls into the
//! same destination take turns, one write-and-flush at a time.

pub mod metadata_sink;
pub mod record_sink;

pub use metadata_sink::{InMemoryMetadataSink, JsonLinesMetadataSink, MetadataSink};
pub use record_sink::{
    write_parquet, ClickHouseRecordSink, InMemoryRecordSink, JsonLinesRecordSink,
    ParquetFileSink, RecordSink, CREATE_METRIC_RECORDS_TABLE, METRIC_RECORDS_TABLE,
};

use crate::schema::BatchError;
use thiserror::Error;

/// Errors that can occur while writing to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Failed to acquire lock
    #[error("Failed to acquire lock on sink")]
    LockError,

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rows could not be encoded; nothing was written.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// The Parquet writer failed.
    #[error("Parquet error: {0}")]
    Parquet(String),

    /// Metadata could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    StorageError(String),
}
