//! Catalog client trait and implementations.
//!
//! This module provides the `CatalogClient` trait for registering metric
//! metadata with a data-governance catalog, an `HttpCatalogClient` speaking
//! the Atlas v2 REST API, and an `InMemoryCatalogClient` for tests.

use crate::catalog::typedef::metadata_type_definition;
use crate::config::CatalogSettings;
use crate::models::catalog::ENTITY_TYPE_NAME;
use crate::models::CatalogEntityBulk;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Path prefix for looking up a type definition by name.
pub const TYPEDEF_BY_NAME_PATH: &str = "/api/atlas/v2/types/typedef/name/";

/// Path for registering type definitions.
pub const TYPEDEFS_PATH: &str = "/api/atlas/v2/types/typedefs/";

/// Path for bulk entity registration.
pub const ENTITY_BULK_PATH: &str = "/api/atlas/v2/entity/bulk/";

/// Errors that can occur while talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to acquire lock
    #[error("Failed to acquire lock on catalog client")]
    LockError,

    /// The request could not be sent or its response not read.
    #[error("Catalog request failed: {0}")]
    Request(String),

    /// The catalog answered with a non-success status.
    #[error("Catalog rejected request with status {status}")]
    Rejected {
        /// HTTP status code returned by the catalog.
        status: u16,
    },
}

/// Trait for catalog clients.
///
/// Implementations must be thread-safe (Send + Sync) to be shared across
/// export calls.
pub trait CatalogClient: Send + Sync {
    /// Registers the `metadata` entity type unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the registration fails.
    fn ensure_metadata_type(&self) -> Result<(), CatalogError>;

    /// Registers a bulk of entities.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be reached or rejects the bulk.
    fn create_entities(&self, bulk: &CatalogEntityBulk) -> Result<(), CatalogError>;
}

/// Catalog client over HTTP with an optional bearer token.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    endpoint: String,
    account: String,
    token: Option<String>,
}

impl HttpCatalogClient {
    /// Creates a client for the given catalog endpoint, e.g. `https://account.purview.azure.com`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            account: String::new(),
            token: None,
        }
    }

    /// Sets the catalog account the client registers into.
    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Sets the bearer token sent with every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Creates a client from catalog settings.
    #[must_use]
    pub fn from_settings(settings: &CatalogSettings) -> Self {
        let client = Self::new(&settings.endpoint).with_account(&settings.account_name);
        match &settings.token {
            Some(token) => client.with_token(token),
            None => client,
        }
    }

    /// Catalog account name, empty when unset.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Returns the configured endpoint without a trailing slash.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Helper to execute async operations synchronously.
    fn block_on<F, T>(future: F) -> Result<T, CatalogError>
    where
        F: std::future::Future<Output = Result<T, reqwest::Error>>,
    {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(future)
                .map_err(|e| CatalogError::Request(e.to_string()))
        })
    }
}

impl CatalogClient for HttpCatalogClient {
    fn ensure_metadata_type(&self) -> Result<(), CatalogError> {
        let lookup = self.authorize(
            self.client
                .get(self.url(&format!("{TYPEDEF_BY_NAME_PATH}{ENTITY_TYPE_NAME}"))),
        );
        let status = Self::block_on(async move { lookup.send().await.map(|r| r.status()) })?;
        if status.is_success() {
            tracing::debug!(account = %self.account, "Catalog metadata type already registered");
            return Ok(());
        }

        let register = self.authorize(
            self.client
                .post(self.url(TYPEDEFS_PATH))
                .json(&metadata_type_definition()),
        );
        let status = Self::block_on(async move { register.send().await.map(|r| r.status()) })?;
        if !status.is_success() {
            tracing::warn!(
                account = %self.account,
                status = status.as_u16(),
                "Catalog rejected metadata type"
            );
            return Err(CatalogError::Rejected {
                status: status.as_u16(),
            });
        }

        tracing::info!(account = %self.account, "Registered catalog metadata type");
        Ok(())
    }

    fn create_entities(&self, bulk: &CatalogEntityBulk) -> Result<(), CatalogError> {
        if bulk.is_empty() {
            return Ok(());
        }

        let request = self.authorize(self.client.post(self.url(ENTITY_BULK_PATH)).json(bulk));
        let status = Self::block_on(async move { request.send().await.map(|r| r.status()) })?;
        if !status.is_success() {
            tracing::warn!(
                account = %self.account,
                status = status.as_u16(),
                entities = bulk.entities.len(),
                "Catalog rejected entity bulk"
            );
            return Err(CatalogError::Rejected {
                status: status.as_u16(),
            });
        }

        tracing::debug!(
            account = %self.account,
            entities = bulk.entities.len(),
            "Registered catalog entities"
        );
        Ok(())
    }
}

/// In-memory catalog client that records what it receives.
#[derive(Debug, Default)]
pub struct InMemoryCatalogClient {
    bulks: Arc<RwLock<Vec<CatalogEntityBulk>>>,
    type_registered: Arc<RwLock<bool>>,
}

impl InMemoryCatalogClient {
    /// Creates a new empty client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new client wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns every bulk received so far, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn bulks(&self) -> Result<Vec<CatalogEntityBulk>, CatalogError> {
        let bulks = self.bulks.read().map_err(|_| CatalogError::LockError)?;
        Ok(bulks.clone())
    }

    /// Returns whether the metadata type has been registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn type_registered(&self) -> Result<bool, CatalogError> {
        let registered = self
            .type_registered
            .read()
            .map_err(|_| CatalogError::LockError)?;
        Ok(*registered)
    }
}

impl CatalogClient for InMemoryCatalogClient {
    fn ensure_metadata_type(&self) -> Result<(), CatalogError> {
        let mut registered = self
            .type_registered
            .write()
            .map_err(|_| CatalogError::LockError)?;
        *registered = true;
        Ok(())
    }

    fn create_entities(&self, bulk: &CatalogEntityBulk) -> Result<(), CatalogError> {
        if bulk.is_empty() {
            return Ok(());
        }
        let mut bulks = self.bulks.write().map_err(|_| CatalogError::LockError)?;
        bulks.push(bulk.clone());
        Ok(())
    }
}
