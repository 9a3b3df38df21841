//! Metadata sink trait and implementations.
//!
//! A metadata sink persists the per-resource descriptors of one export call
//! as a single unit.

use super::SinkError;
use crate::models::ResourceMetadata;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// Trait for metadata sinks.
pub trait MetadataSink: Send + Sync {
    /// Writes the metadata of every resource in one export call.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be serialized or written.
    fn write_metadata(&self, metadata: &[ResourceMetadata]) -> Result<(), SinkError>;
}

/// Writes one JSON array per export call, one line each.
///
/// The file is truncated when the sink is opened.
#[derive(Debug)]
pub struct JsonLinesMetadataSink {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl JsonLinesMetadataSink {
    /// Creates or truncates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataSink for JsonLinesMetadataSink {
    fn write_metadata(&self, metadata: &[ResourceMetadata]) -> Result<(), SinkError> {
        let mut line =
            serde_json::to_vec(metadata).map_err(|e| SinkError::Serialization(e.to_string()))?;
        line.push(b'\n');

        let mut file = self.file.lock().map_err(|_| SinkError::LockError)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

/// In-memory metadata sink for development and testing.
///
/// Each call is kept as one entry, mirroring one line of the file sink.
#[derive(Debug, Default)]
pub struct InMemoryMetadataSink {
    writes: Arc<RwLock<Vec<Vec<ResourceMetadata>>>>,
}

impl InMemoryMetadataSink {
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

    /// Returns every write received so far, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn writes(&self) -> Result<Vec<Vec<ResourceMetadata>>, SinkError> {
        let writes = self.writes.read().map_err(|_| SinkError::LockError)?;
        Ok(writes.clone())
    }
}

impl MetadataSink for InMemoryMetadataSink {
    fn write_metadata(&self, metadata: &[ResourceMetadata]) -> Result<(), SinkError> {
        let mut writes = self.writes.write().map_err(|_| SinkError::LockError)?;
        writes.push(metadata.to_vec());
        Ok(())
    }
}
