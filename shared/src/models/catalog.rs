//! Catalog entity model.
//!
//! Records submitted to the data-governance catalog, one entity per
//! metric descriptor.

use super::descriptor::Destinations;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status assigned to every registered entity.
pub const ENTITY_STATUS_ACTIVE: &str = "ACTIVE";

/// Catalog type name of metric metadata entities.
pub const ENTITY_TYPE_NAME: &str = "metadata";

/// Substituted when a descriptor carries no SLI name or version.
pub const DEFAULT_SLI_VALUE: &str = "default";

/// Attributes of a catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogAttributes {
    /// `<service.name>-<metric name>`.
    pub qualified_name: String,
    /// Metric name.
    pub name: String,
    /// Metric description.
    pub description: String,
    /// Owning principal, always zero.
    pub principal_id: i64,
    /// Latest publish time, epoch milliseconds.
    pub last_published_time: i64,
    /// Dimension key to dimension value type name.
    pub dimensions: HashMap<String, String>,
    /// Where the metric's rows are exported to.
    pub destinations: Destinations,
    /// Object type, always empty.
    pub object_type: String,
    /// `service.name` resource attribute.
    pub service_name: String,
    /// `service.instance.id` resource attribute.
    #[serde(rename = "serviceGUID")]
    pub service_guid: String,
    /// SLI name, `"default"` when unknown.
    pub sli_name: String,
    /// SLI version, `"default"` when unknown.
    pub sli_version: String,
    /// Whether the metric comes from an SLI scope.
    #[serde(rename = "isSLI")]
    pub is_sli: bool,
    /// Scope-level SLI details.
    #[serde(default)]
    pub sli_details: HashMap<String, String>,
}

/// An entity ready for registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    /// Glossary meanings, always empty.
    pub meanings: Vec<String>,
    /// Entity status, always `ACTIVE`.
    pub status: String,
    /// Entity version, always zero.
    pub version: i64,
    /// Catalog type name, always `metadata`.
    pub type_name: String,
    /// Entity attributes.
    pub attributes: CatalogAttributes,
}

/// Request body of a bulk entity registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntityBulk {
    /// Referred entities, always empty.
    pub referred_entities: HashMap<String, serde_json::Value>,
    /// Entities to register.
    pub entities: Vec<CatalogEntity>,
}

impl CatalogEntityBulk {
    /// Wraps entities into a bulk request.
    #[must_use]
    pub fn new(entities: Vec<CatalogEntity>) -> Self {
        Self {
            referred_entities: HashMap::new(),
            entities,
        }
    }

    /// Returns true if the bulk carries no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
