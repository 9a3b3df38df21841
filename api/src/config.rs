//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use shared::config::export::DEFAULT_PARQUET_DIR;
use shared::config::ExportSettings;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `METERLINE_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `METERLINE_PORT`: The OTLP/HTTP port (default: 4318)
/// - `METERLINE_GRPC_PORT`: The OTLP/gRPC port (default: 4317)
///
/// Export settings are read by [`ExportSettings::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The OTLP/HTTP port.
    pub port: u16,
    /// The OTLP/gRPC port.
    pub grpc_port: u16,
    /// Sink and catalog settings.
    pub export: ExportSettings,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `METERLINE_PORT` or `METERLINE_GRPC_PORT` is set but is not a valid port number
    /// - the export settings are invalid
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("METERLINE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("METERLINE_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("Invalid METERLINE_PORT")?
            .unwrap_or(4318);

        let grpc_port = std::env::var("METERLINE_GRPC_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("Invalid METERLINE_GRPC_PORT")?
            .unwrap_or(4317);

        let export = ExportSettings::from_env().context("Invalid export settings")?;

        Ok(Self {
            host,
            port,
            grpc_port,
            export,
        })
    }

    /// Returns the socket address for the HTTP listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Self::parse_addr(&self.host, self.port)
    }

    /// Returns the socket address for the gRPC listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn grpc_socket_addr(&self) -> Result<SocketAddr> {
        Self::parse_addr(&self.host, self.grpc_port)
    }

    fn parse_addr(host: &str, port: u16) -> Result<SocketAddr> {
        format!("{host}:{port}")
            .parse()
            .with_context(|| format!("Invalid socket address {host}:{port}"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4318,
            grpc_port: 4317,
            export: ExportSettings {
                parquet_dir: Some(PathBuf::from(DEFAULT_PARQUET_DIR)),
                ..ExportSettings::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 4318);
        assert_eq!(config.grpc_port, 4317);
        assert!(config.export.validate_settings().is_ok());
    }

    #[test]
    fn test_config_socket_addrs() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            grpc_port: 3001,
            ..Config::default()
        };

        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
        assert_eq!(
            config.grpc_socket_addr().unwrap().to_string(),
            "127.0.0.1:3001"
        );
    }

    #[test]
    fn test_invalid_host_is_an_error() {
        let config = Config {
            host: "not a host".to_string(),
            ..Config::default()
        };

        assert!(config.socket_addr().is_err());
    }
}
