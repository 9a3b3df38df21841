//! Configuration module for Meterline.
//!
//! This module contains the export settings shared by the server and the CLI.

pub mod export;

pub use export::{
    CatalogSettings, ClickHouseSettings, ConfigError, ExportSettings, ParquetCompression,
    ParquetSettings,
};
