//! Catalog type definition for metric metadata entities.

use crate::models::catalog::ENTITY_TYPE_NAME;
use serde::{Deserialize, Serialize};

/// Request body of a type definition registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinitions {
    /// Entity type definitions.
    pub entity_defs: Vec<EntityDef>,
}

/// Definition of one entity type.
///
/// Fields mirror the catalog's typedef wire format.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDef {
    pub category: String,
    pub version: i64,
    pub name: String,
    pub description: String,
    pub type_version: String,
    pub attribute_defs: Vec<AttributeDef>,
    pub super_types: Vec<String>,
    pub sub_types: Vec<String>,
    pub relationship_attribute_defs: Vec<serde_json::Value>,
}

/// Definition of one entity attribute.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDef {
    pub name: String,
    pub type_name: String,
    pub is_optional: bool,
    pub cardinality: String,
    pub values_min_count: u32,
    pub values_max_count: u32,
    pub is_unique: bool,
    pub is_indexable: bool,
    pub include_in_notification: bool,
}

impl AttributeDef {
    fn single(name: &str, type_name: &str, is_optional: bool) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            is_optional,
            cardinality: "SINGLE".to_string(),
            values_min_count: u32::from(!is_optional),
            values_max_count: 1,
            is_unique: false,
            is_indexable: true,
            include_in_notification: false,
        }
    }

    fn optional(name: &str, type_name: &str) -> Self {
        Self::single(name, type_name, true)
    }

    fn required(name: &str, type_name: &str) -> Self {
        Self::single(name, type_name, false)
    }
}

/// Type definition of the `metadata` entity, a `DataSet` subtype.
#[must_use]
pub fn metadata_type_definition() -> TypeDefinitions {
    TypeDefinitions {
        entity_defs: vec![EntityDef {
            category: "ENTITY".to_string(),
            version: 2,
            name: ENTITY_TYPE_NAME.to_string(),
            description: "Metadata for opentelemetry data".to_string(),
            type_version: "2.0.0".to_string(),
            attribute_defs: vec![
                AttributeDef::optional("destinations", "map<string,map<string,string>>"),
                AttributeDef::optional("dimensions", "map<string,string>"),
                AttributeDef::required("sliName", "string"),
                AttributeDef::required("lastPublishedTime", "date"),
                AttributeDef::required("serviceName", "string"),
                AttributeDef::required("sliVersion", "string"),
                AttributeDef::required("serviceGUID", "string"),
                AttributeDef::required("isSLI", "boolean"),
                AttributeDef::optional("sliDetails", "map<string,string>"),
            ],
            super_types: vec!["DataSet".to_string()],
            sub_types: Vec::new(),
            relationship_attribute_defs: Vec::new(),
        }],
    }
}
