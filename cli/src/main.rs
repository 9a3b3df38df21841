//! Meterline CLI
//!
//! Converts OTLP metric export files offline, without a running server.
//!
//! # Usage
//!
//! ```bash
//! meterline flatten export.json
//! meterline parquet export.pb --out metrics.parquet
//! meterline describe export.json
//! meterline typedef
//! ```
//!
//! Files ending in `.pb` are read as protobuf `ExportMetricsServiceRequest`
//! messages, anything else as OTLP JSON.

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prost::Message;
use serde::Serialize;
use shared::catalog::build_catalog_entities;
use shared::catalog::typedef::metadata_type_definition;
use shared::config::{ParquetCompression, ParquetSettings};
use shared::models::{CatalogEntityBulk, Destinations, ResourceMetadata};
use shared::otlp::attributes::resource_attributes;
use shared::otlp::extract::extract_descriptors;
use shared::otlp::flatten::flatten_request;
use shared::otlp::proto::collector::metrics::v1::ExportMetricsServiceRequest;
use shared::schema::serialize_row;
use shared::storage::write_parquet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Meterline CLI - offline OTLP metrics conversion
#[derive(Parser)]
#[command(name = "meterline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one JSON row per data point
    Flatten {
        /// OTLP export file (`.pb` for protobuf, otherwise JSON)
        file: PathBuf,
    },
    /// Write every data point into a Parquet file
    Parquet {
        /// OTLP export file (`.pb` for protobuf, otherwise JSON)
        file: PathBuf,

        /// Output Parquet file
        #[arg(short, long)]
        out: PathBuf,

        /// Compression codec
        #[arg(
            long,
            env = "METERLINE_PARQUET_COMPRESSION",
            default_value = "snappy"
        )]
        compression: ParquetCompression,
    },
    /// Print per-resource descriptors and the catalog entities built from them
    Describe {
        /// OTLP export file (`.pb` for protobuf, otherwise JSON)
        file: PathBuf,
    },
    /// Print the catalog type definition for metric entities
    Typedef,
}

/// Output of the `describe` command.
#[derive(Serialize)]
struct Description {
    resources: Vec<ResourceMetadata>,
    bulk: CatalogEntityBulk,
    unsupported: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Flatten { file } => flatten(&read_request(&file)?, &mut out),
        Commands::Parquet {
            file,
            out: path,
            compression,
        } => {
            let settings = ParquetSettings {
                compression,
                ..ParquetSettings::default()
            };
            let rows = parquet(&read_request(&file)?, &path, &settings)?;
            writeln!(out, "Wrote {rows} rows to {}", path.display())?;
            Ok(())
        }
        Commands::Describe { file } => describe(&read_request(&file)?, &mut out),
        Commands::Typedef => {
            serde_json::to_writer_pretty(&mut out, &metadata_type_definition())?;
            writeln!(out)?;
            Ok(())
        }
    }
}

/// Reads an export request, choosing the decoder by file extension.
fn read_request(path: &Path) -> Result<ExportMetricsServiceRequest> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let request = if path.extension().is_some_and(|ext| ext == "pb") {
        ExportMetricsServiceRequest::decode(bytes.as_slice())
            .with_context(|| format!("Failed to decode protobuf from {}", path.display()))?
    } else {
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to decode OTLP JSON from {}", path.display()))?
    };

    tracing::debug!(
        path = %path.display(),
        resources = request.resource_metrics.len(),
        "Read export request"
    );
    Ok(request)
}

fn flatten<W: Write>(request: &ExportMetricsServiceRequest, out: &mut W) -> Result<()> {
    for record in flatten_request(request) {
        out.write_all(&serialize_row(&record)?)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn parquet(
    request: &ExportMetricsServiceRequest,
    path: &Path,
    settings: &ParquetSettings,
) -> Result<usize> {
    let records = flatten_request(request);
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_parquet(BufWriter::new(file), &records, settings)?;
    Ok(records.len())
}

fn describe<W: Write>(request: &ExportMetricsServiceRequest, out: &mut W) -> Result<()> {
    let mut unsupported = Vec::new();
    let resources: Vec<ResourceMetadata> = request
        .resource_metrics
        .iter()
        .map(|resource_metrics| {
            let extraction = extract_descriptors(&resource_metrics.scope_metrics);
            unsupported.extend(extraction.unsupported.into_iter().map(|u| u.metric_name));
            ResourceMetadata {
                metadata: extraction.descriptors,
                resources: resource_attributes(resource_metrics.resource.as_ref()),
                destinations: Destinations::new(),
            }
        })
        .collect();

    let entities = resources
        .iter()
        .flat_map(|r| build_catalog_entities(&r.metadata, &r.resources, &r.destinations))
        .collect();

    let description = Description {
        resources,
        bulk: CatalogEntityBulk::new(entities),
        unsupported,
    };
    serde_json::to_writer_pretty(&mut *out, &description)?;
    writeln!(out)?;
    Ok(())
}
