//! Database connection module for `ClickHouse`.
//!
//! Prepares the row table used by the `ClickHouse` record sink.

use anyhow::{Context, Result};
use clickhouse::Client;
use shared::config::ClickHouseSettings;
use shared::storage::{CREATE_METRIC_RECORDS_TABLE, METRIC_RECORDS_TABLE};
use std::sync::Arc;

/// Database client wrapper.
#[derive(Clone)]
pub struct Database {
    client: Arc<Client>,
}

impl Database {
    /// Create a new database client from settings.
    ///
    /// # Examples
    ///
    /// ```
    /// # use api::db::Database;
    /// # use shared::config::ClickHouseSettings;
    /// let settings = ClickHouseSettings {
    ///     url: "http://localhost:8123".to_string(),
    ///     database: "meterline".to_string(),
    ///     user: "default".to_string(),
    ///     password: String::new(),
    /// };
    /// let db = Database::new(&settings);
    /// ```
    #[must_use]
    pub fn new(settings: &ClickHouseSettings) -> Self {
        Self {
            client: Arc::new(settings.client()),
        }
    }

    /// Get a reference to the underlying `ClickHouse` client.
    #[must_use]
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    /// Test database connectivity by executing a simple query.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached or the query fails.
    pub async fn ping(&self) -> Result<()> {
        self.client
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .context("Failed to ping database")?;
        Ok(())
    }

    /// Creates the row table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.client
            .query(CREATE_METRIC_RECORDS_TABLE)
            .execute()
            .await
            .with_context(|| format!("Failed to create table {METRIC_RECORDS_TABLE}"))?;

        tracing::info!(table = METRIC_RECORDS_TABLE, "Row table ready");
        Ok(())
    }
}
