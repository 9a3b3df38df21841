//! Catalog export of metric descriptors.
//!
//! Descriptors are mapped into catalog entities by a pure function
//! ([`build_entity`]) and registered through a [`CatalogClient`]. The entity
//! type itself is declared by [`typedef::metadata_type_definition`].

pub mod client;
pub mod typedef;

pub use client::{CatalogClient, CatalogError, HttpCatalogClient, InMemoryCatalogClient};

use crate::models::catalog::{DEFAULT_SLI_VALUE, ENTITY_STATUS_ACTIVE, ENTITY_TYPE_NAME};
use crate::models::{
    CatalogAttributes, CatalogEntity, Destinations, MetricDescriptor, ResourceAttributes,
};
use crate::otlp::attributes::{SERVICE_INSTANCE_ID, SERVICE_NAME};

/// Dimension key carrying the SLI name.
pub const SLI_NAME_DIMENSION: &str = "sliName";

/// Dimension key carrying the SLI version.
pub const SLI_VERSION_DIMENSION: &str = "sliVersion";

fn dimension_or_default(descriptor: &MetricDescriptor, key: &str) -> String {
    descriptor
        .dimension_type(key)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_SLI_VALUE)
        .to_string()
}

fn resource_value(resources: &ResourceAttributes, key: &str) -> String {
    resources.get(key).cloned().unwrap_or_default()
}

/// Maps one descriptor into a catalog entity.
///
/// `qualifiedName` is `<service.name>-<metric name>`, with an empty service
/// name when the resource has none. No collision detection is done across
/// resources.
///
/// # Example
///
/// ```
/// use shared::catalog::build_entity;
/// use shared::models::{Destinations, MetricDescriptor, ResourceAttributes};
///
/// let resources = ResourceAttributes::from([("service.name".to_string(), "svc".to_string())]);
/// let entity = build_entity(
///     &MetricDescriptor::new("reqs", "Requests"),
///     &resources,
///     &Destinations::new(),
/// );
///
/// assert_eq!(entity.attributes.qualified_name, "svc-reqs");
/// assert_eq!(entity.attributes.sli_name, "default");
/// ```
#[must_use]
pub fn build_entity(
    descriptor: &MetricDescriptor,
    resources: &ResourceAttributes,
    destinations: &Destinations,
) -> CatalogEntity {
    let service_name = resource_value(resources, SERVICE_NAME);

    CatalogEntity {
        meanings: Vec::new(),
        status: ENTITY_STATUS_ACTIVE.to_string(),
        version: 0,
        type_name: ENTITY_TYPE_NAME.to_string(),
        attributes: CatalogAttributes {
            qualified_name: format!("{service_name}-{}", descriptor.name),
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            principal_id: 0,
            last_published_time: descriptor.last_publish_time_ms,
            dimensions: descriptor.dimension_types.clone(),
            destinations: destinations.clone(),
            object_type: String::new(),
            service_name,
            service_guid: resource_value(resources, SERVICE_INSTANCE_ID),
            sli_name: dimension_or_default(descriptor, SLI_NAME_DIMENSION),
            sli_version: dimension_or_default(descriptor, SLI_VERSION_DIMENSION),
            is_sli: descriptor.is_sli.unwrap_or(false),
            sli_details: descriptor.sli_detail.clone().unwrap_or_default(),
        },
    }
}

/// Maps every descriptor of one resource into catalog entities, in order.
#[must_use]
pub fn build_catalog_entities(
    descriptors: &[MetricDescriptor],
    resources: &ResourceAttributes,
    destinations: &Destinations,
) -> Vec<CatalogEntity> {
    descriptors
        .iter()
        .map(|d| build_entity(d, resources, destinations))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    fn resources(pairs: &[(&str, &str)]) -> ResourceAttributes {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_qualified_name_and_defaults() {
        let entities = build_catalog_entities(
            &[MetricDescriptor::new("reqs", "Request count")],
            &resources(&[("service.name", "svc")]),
            &Destinations::new(),
        );

        assert_eq!(entities.len(), 1);
        let entity = &entities[0];
        assert_eq!(entity.attributes.qualified_name, "svc-reqs");
        assert_eq!(entity.attributes.sli_name, "default");
        assert_eq!(entity.attributes.sli_version, "default");
        assert_eq!(entity.status, "ACTIVE");
        assert_eq!(entity.version, 0);
        assert_eq!(entity.type_name, "metadata");
        assert!(entity.meanings.is_empty());
    }

    #[test]
    fn test_missing_service_name_leaves_leading_dash() {
        let entity = build_entity(
            &MetricDescriptor::new("reqs", ""),
            &ResourceAttributes::new(),
            &Destinations::new(),
        );

        assert_eq!(entity.attributes.qualified_name, "-reqs");
        assert_eq!(entity.attributes.service_name, "");
        assert_eq!(entity.attributes.service_guid, "");
    }

    #[test]
    fn test_sli_fields_from_dimensions_and_scope() {
        let mut descriptor = MetricDescriptor::new("latency", "p99 latency");
        descriptor.last_publish_time_ms = 42;
        descriptor
            .dimension_types
            .insert(SLI_NAME_DIMENSION.to_string(), "STRING".to_string());
        descriptor
            .dimension_types
            .insert(SLI_VERSION_DIMENSION.to_string(), String::new());
        descriptor.is_sli = Some(true);
        descriptor.sli_detail = Some(HashMap::from([(
            "objective".to_string(),
            "99.9".to_string(),
        )]));

        let entity = build_entity(
            &descriptor,
            &resources(&[("service.name", "api"), ("service.instance.id", "i-7")]),
            &Destinations::new(),
        );

        let attributes = &entity.attributes;
        assert_eq!(attributes.sli_name, "STRING");
        assert_eq!(attributes.sli_version, "default");
        assert!(attributes.is_sli);
        assert_eq!(attributes.sli_details["objective"], "99.9");
        assert_eq!(attributes.service_guid, "i-7");
        assert_eq!(attributes.last_published_time, 42);
        assert_eq!(attributes.dimensions.len(), 2);
    }

    #[test]
    fn test_destinations_are_copied() {
        let destinations = Destinations::from([(
            "parquet".to_string(),
            BTreeMap::from([("directory".to_string(), "/data".to_string())]),
        )]);

        let entity = build_entity(
            &MetricDescriptor::new("cpu", ""),
            &ResourceAttributes::new(),
            &destinations,
        );

        assert_eq!(entity.attributes.destinations, destinations);
    }

    #[test]
    fn test_entity_serialization_field_names() {
        let entity = build_entity(
            &MetricDescriptor::new("cpu", ""),
            &resources(&[("service.name", "svc")]),
            &Destinations::new(),
        );

        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["typeName"], "metadata");
        assert_eq!(json["attributes"]["qualifiedName"], "svc-cpu");
        assert_eq!(json["attributes"]["serviceGUID"], "");
        assert_eq!(json["attributes"]["isSLI"], false);
        assert_eq!(json["attributes"]["principalId"], 0);
    }
}
