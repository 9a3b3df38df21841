//! Record sink trait and implementations.
//!
//! This module provides the `RecordSink` trait for persisting flattened
//! `MetricRecord` rows, with Parquet, JSON lines, `ClickHouse` and in-memory
//! implementations.

use super::SinkError;
use crate::config::{ClickHouseSettings, ParquetSettings};
use crate::models::MetricRecord;
use crate::schema::{records_to_batch, serialize_row};
use parquet::arrow::ArrowWriter;
use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// Name of the `ClickHouse` table receiving rows.
pub const METRIC_RECORDS_TABLE: &str = "metric_records";

/// DDL for [`METRIC_RECORDS_TABLE`].
pub const CREATE_METRIC_RECORDS_TABLE: &str = "CREATE TABLE IF NOT EXISTS metric_records (
    start_timestamp_ms DateTime64(3),
    end_timestamp_ms DateTime64(3),
    metric_name LowCardinality(String),
    dimensions Map(String, String),
    type_name LowCardinality(String),
    time_series_values Map(String, Array(Float64))
) ENGINE = MergeTree()
ORDER BY (metric_name, end_timestamp_ms)";

/// Trait for row sinks.
///
/// Implementations must be thread-safe (Send + Sync) and must not interleave
/// two concurrent writes.
pub trait RecordSink: Send + Sync {
    /// Short destination name, e.g. `parquet`.
    fn name(&self) -> &'static str;

    /// Properties describing where rows go, reported to the catalog.
    fn properties(&self) -> BTreeMap<String, String>;

    /// Writes a batch of rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be encoded or written. A failed
    /// batch is not partially persisted.
    fn write_records(&self, records: &[MetricRecord]) -> Result<(), SinkError>;
}

/// Encodes rows into a single Parquet file written to `writer`.
///
/// # Errors
///
/// Returns an error if the rows cannot be encoded or the writer fails.
pub fn write_parquet<W>(
    writer: W,
    records: &[MetricRecord],
    settings: &ParquetSettings,
) -> Result<(), SinkError>
where
    W: Write + Send,
{
    let batch = records_to_batch(records)?;

    let mut writer =
        ArrowWriter::try_new(writer, batch.schema(), Some(settings.writer_properties()))
            .map_err(|e| SinkError::Parquet(e.to_string()))?;
    writer
        .write(&batch)
        .map_err(|e| SinkError::Parquet(e.to_string()))?;
    writer
        .close()
        .map_err(|e| SinkError::Parquet(e.to_string()))?;

    Ok(())
}

/// In-memory record sink for development and testing.
#[derive(Debug, Default)]
pub struct InMemoryRecordSink {
    records: Arc<RwLock<Vec<MetricRecord>>>,
}

impl InMemoryRecordSink {
    /// Creates a new empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new sink wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns a copy of every row written so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn records(&self) -> Result<Vec<MetricRecord>, SinkError> {
        let records = self.records.read().map_err(|_| SinkError::LockError)?;
        Ok(records.clone())
    }

    /// Returns the number of rows written so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn count(&self) -> Result<usize, SinkError> {
        let records = self.records.read().map_err(|_| SinkError::LockError)?;
        Ok(records.len())
    }
}

impl RecordSink for InMemoryRecordSink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn properties(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn write_records(&self, new_records: &[MetricRecord]) -> Result<(), SinkError> {
        let mut records = self.records.write().map_err(|_| SinkError::LockError)?;
        records.extend_from_slice(new_records);
        Ok(())
    }
}

/// Writes one Parquet file per non-empty export into a directory.
///
/// Files are named `metrics-<UTC timestamp>-<sequence>.parquet`; the
/// sequence keeps names unique within one process.
#[derive(Debug)]
pub struct ParquetFileSink {
    directory: PathBuf,
    settings: ParquetSettings,
    sequence: Mutex<u64>,
}

impl ParquetFileSink {
    /// Creates the sink, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>, settings: ParquetSettings) -> Result<Self, SinkError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;

        Ok(Self {
            directory,
            settings,
            sequence: Mutex::new(0),
        })
    }

    /// Output directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_path(&self, sequence: u64) -> PathBuf {
        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        self.directory
            .join(format!("metrics-{timestamp}-{sequence:06}.parquet"))
    }
}

impl RecordSink for ParquetFileSink {
    fn name(&self) -> &'static str {
        "parquet"
    }

    fn properties(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "directory".to_string(),
                self.directory.display().to_string(),
            ),
            (
                "compression".to_string(),
                format!("{:?}", self.settings.compression).to_lowercase(),
            ),
        ])
    }

    fn write_records(&self, records: &[MetricRecord]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut sequence = self.sequence.lock().map_err(|_| SinkError::LockError)?;
        let path = self.file_path(*sequence);
        *sequence += 1;

        let file = File::create(&path)?;
        if let Err(e) = write_parquet(file, records, &self.settings) {
            tracing::error!(path = %path.display(), error = %e, "Discarding partial Parquet file");
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        tracing::debug!(path = %path.display(), rows = records.len(), "Wrote Parquet file");
        Ok(())
    }
}

/// Appends one JSON line per row to a file.
#[derive(Debug)]
pub struct JsonLinesRecordSink {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl JsonLinesRecordSink {
    /// Opens the file for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl RecordSink for JsonLinesRecordSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn properties(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("path".to_string(), self.path.display().to_string())])
    }

    fn write_records(&self, records: &[MetricRecord]) -> Result<(), SinkError> {
        let mut buffer = Vec::new();
        for record in records {
            buffer.extend(serialize_row(record)?);
            buffer.push(b'\n');
        }

        let mut file = self.file.lock().map_err(|_| SinkError::LockError)?;
        file.write_all(&buffer)?;
        file.flush()?;
        Ok(())
    }
}

/// `ClickHouse`-backed record sink.
///
/// Rows are inserted into [`METRIC_RECORDS_TABLE`] with one insert per
/// export call. Clones share the write lock, so inserts into the table run
/// one at a time.
#[derive(Clone)]
pub struct ClickHouseRecordSink {
    client: Arc<clickhouse::Client>,
    url: String,
    database: String,
    write_lock: Arc<Mutex<()>>,
}

impl ClickHouseRecordSink {
    /// Creates a sink for the given settings.
    #[must_use]
    pub fn new(settings: &ClickHouseSettings) -> Self {
        Self {
            client: Arc::new(settings.client()),
            url: settings.url.clone(),
            database: settings.database.clone(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Helper to execute async operations synchronously.
    fn block_on<F, T>(future: F) -> Result<T, SinkError>
    where
        F: std::future::Future<Output = Result<T, clickhouse::error::Error>>,
    {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(future)
                .map_err(|e| SinkError::StorageError(e.to_string()))
        })
    }
}

impl RecordSink for ClickHouseRecordSink {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn properties(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("url".to_string(), self.url.clone()),
            ("database".to_string(), self.database.clone()),
            ("table".to_string(), METRIC_RECORDS_TABLE.to_string()),
        ])
    }

    fn write_records(&self, records: &[MetricRecord]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().map_err(|_| SinkError::LockError)?;
        let client = Arc::clone(&self.client);
        let records = records.to_vec();
        Self::block_on(async move {
            #[derive(clickhouse::Row, serde::Serialize)]
            struct MetricRecordRow {
                start_timestamp_ms: i64,
                end_timestamp_ms: i64,
                metric_name: String,
                dimensions: HashMap<String, String>,
                type_name: String,
                time_series_values: HashMap<String, Vec<f64>>,
            }

            let mut inserter = client
                .insert::<MetricRecordRow>(METRIC_RECORDS_TABLE)
                .await?;

            for record in records {
                let row = MetricRecordRow {
                    start_timestamp_ms: record.start_timestamp_ms,
                    end_timestamp_ms: record.end_timestamp_ms,
                    metric_name: record.metric_name,
                    dimensions: record.dimensions,
                    type_name: record.type_name.to_string(),
                    time_series_values: record.time_series_values,
                };
                inserter.write(&row).await?;
            }

            inserter.end().await?;
            Ok(())
        })
    }
}
