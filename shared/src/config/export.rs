//! Export configuration.
//!
//! Settings for the row sinks, the metadata sink and the catalog client,
//! loaded from `METERLINE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Directory used for Parquet output when no row sink is configured.
pub const DEFAULT_PARQUET_DIR: &str = "data/parquet";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed.
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },

    /// No sink is configured to receive flattened rows.
    #[error("At least one row sink must be enabled")]
    NoRowSink,

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Compression codec for Parquet output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    /// No compression.
    Uncompressed,
    /// Snappy compression.
    #[default]
    Snappy,
    /// Gzip at the default level.
    Gzip,
    /// LZ4 compression.
    Lz4,
    /// Zstandard at the default level.
    Zstd,
}

impl ParquetCompression {
    /// Returns the Parquet codec for this setting.
    #[must_use]
    pub fn codec(self) -> parquet::basic::Compression {
        use parquet::basic::Compression;

        match self {
            Self::Uncompressed => Compression::UNCOMPRESSED,
            Self::Snappy => Compression::SNAPPY,
            Self::Gzip => Compression::GZIP(parquet::basic::GzipLevel::default()),
            Self::Lz4 => Compression::LZ4,
            Self::Zstd => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
        }
    }
}

impl FromStr for ParquetCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Self::Uncompressed),
            "snappy" => Ok(Self::Snappy),
            "gzip" => Ok(Self::Gzip),
            "lz4" => Ok(Self::Lz4),
            "zstd" => Ok(Self::Zstd),
            other => Err(format!("unknown compression codec: {other}")),
        }
    }
}

/// Parquet writer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ParquetSettings {
    /// Compression codec.
    pub compression: ParquetCompression,

    /// Maximum number of rows per row group.
    #[validate(range(min = 1, message = "Row group size must be positive"))]
    pub max_row_group_size: usize,

    /// Data page size limit in bytes.
    #[validate(range(min = 1, message = "Data page size must be positive"))]
    pub data_page_size: usize,
}

impl Default for ParquetSettings {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::Snappy,
            max_row_group_size: 128 * 1024 * 1024,
            data_page_size: 8 * 1024,
        }
    }
}

impl ParquetSettings {
    /// Builds the writer properties for these settings.
    #[must_use]
    pub fn writer_properties(&self) -> parquet::file::properties::WriterProperties {
        parquet::file::properties::WriterProperties::builder()
            .set_compression(self.compression.codec())
            .set_max_row_group_size(self.max_row_group_size)
            .set_data_page_size_limit(self.data_page_size)
            .build()
    }
}

/// `ClickHouse` connection settings for the row table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ClickHouseSettings {
    /// Database URL (e.g., <http://localhost:8123>)
    #[validate(length(min = 1, message = "ClickHouse URL cannot be empty"))]
    pub url: String,
    /// Database name to use
    pub database: String,
    /// Username for authentication
    pub user: String,
    /// Password for authentication
    pub password: String,
}

impl ClickHouseSettings {
    /// Creates a `ClickHouse` client for these settings.
    #[must_use]
    pub fn client(&self) -> clickhouse::Client {
        clickhouse::Client::default()
            .with_url(&self.url)
            .with_database(&self.database)
            .with_user(&self.user)
            .with_password(&self.password)
    }
}

/// Catalog connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CatalogSettings {
    /// Catalog base URL.
    #[validate(length(min = 1, message = "Catalog endpoint cannot be empty"))]
    pub endpoint: String,

    /// Catalog account name.
    #[validate(length(min = 1, message = "Catalog account name cannot be empty"))]
    pub account_name: String,

    /// Bearer token sent with catalog requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Complete export configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ExportSettings {
    /// Directory receiving one Parquet file per export.
    pub parquet_dir: Option<PathBuf>,

    /// File receiving one JSON line per row.
    pub records_jsonl: Option<PathBuf>,

    /// File receiving one JSON line of resource metadata per export.
    pub metadata_jsonl: Option<PathBuf>,

    /// `ClickHouse` row table.
    #[validate(nested)]
    pub clickhouse: Option<ClickHouseSettings>,

    /// Parquet writer settings.
    #[validate(nested)]
    pub parquet: ParquetSettings,

    /// Catalog registration.
    #[validate(nested)]
    pub catalog: Option<CatalogSettings>,
}

impl ExportSettings {
    /// Loads settings from environment variables.
    ///
    /// - `METERLINE_PARQUET_DIR`: Parquet output directory
    /// - `METERLINE_PARQUET_COMPRESSION`: `snappy` (default), `gzip`, `lz4`, `zstd` or `none`
    /// - `METERLINE_PARQUET_ROW_GROUP_SIZE`: rows per row group
    /// - `METERLINE_PARQUET_PAGE_SIZE`: data page size in bytes
    /// - `METERLINE_RECORDS_JSONL`: row JSON lines file
    /// - `METERLINE_METADATA_JSONL`: metadata JSON lines file
    /// - `METERLINE_DB_URL`, `METERLINE_DB_NAME`, `METERLINE_DB_USER`,
    ///   `METERLINE_DB_PASSWORD`: `ClickHouse` row table, enabled by the URL
    /// - `METERLINE_CATALOG_ENDPOINT`, `METERLINE_CATALOG_ACCOUNT`,
    ///   `METERLINE_CATALOG_TOKEN`: catalog registration, enabled by the endpoint
    ///
    /// When no row sink variable is set, Parquet output goes to
    /// [`DEFAULT_PARQUET_DIR`].
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or codec variable cannot be parsed, or
    /// if the resulting settings fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ParquetSettings::default();
        let parquet = ParquetSettings {
            compression: parse_var(&lookup, "METERLINE_PARQUET_COMPRESSION")?
                .unwrap_or(defaults.compression),
            max_row_group_size: parse_var(&lookup, "METERLINE_PARQUET_ROW_GROUP_SIZE")?
                .unwrap_or(defaults.max_row_group_size),
            data_page_size: parse_var(&lookup, "METERLINE_PARQUET_PAGE_SIZE")?
                .unwrap_or(defaults.data_page_size),
        };

        let clickhouse = lookup("METERLINE_DB_URL").map(|url| ClickHouseSettings {
            url,
            database: lookup("METERLINE_DB_NAME").unwrap_or_else(|| "meterline".to_string()),
            user: lookup("METERLINE_DB_USER").unwrap_or_else(|| "default".to_string()),
            password: lookup("METERLINE_DB_PASSWORD").unwrap_or_default(),
        });

        let catalog = lookup("METERLINE_CATALOG_ENDPOINT").map(|endpoint| CatalogSettings {
            endpoint,
            account_name: lookup("METERLINE_CATALOG_ACCOUNT").unwrap_or_default(),
            token: lookup("METERLINE_CATALOG_TOKEN"),
        });

        let mut settings = Self {
            parquet_dir: lookup("METERLINE_PARQUET_DIR").map(PathBuf::from),
            records_jsonl: lookup("METERLINE_RECORDS_JSONL").map(PathBuf::from),
            metadata_jsonl: lookup("METERLINE_METADATA_JSONL").map(PathBuf::from),
            clickhouse,
            parquet,
            catalog,
        };
        if !settings.has_row_sink() {
            settings.parquet_dir = Some(PathBuf::from(DEFAULT_PARQUET_DIR));
        }

        settings.validate_settings()?;
        Ok(settings)
    }

    /// Returns true if any sink for flattened rows is configured.
    #[must_use]
    pub fn has_row_sink(&self) -> bool {
        self.parquet_dir.is_some() || self.records_jsonl.is_some() || self.clickhouse.is_some()
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if no row sink is configured or a field is invalid.
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        if !self.has_row_sink() {
            return Err(ConfigError::NoRowSink);
        }
        self.validate()?;
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|value| {
            value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}
