//! Attribute helpers for OTLP key-value lists.
//!
//! Dimensions keep a canonical string form of every attribute value, while
//! descriptors keep only the name of the value's type. Both copy out of the
//! request so nothing borrows the caller's batch after a call returns.

use crate::models::ResourceAttributes;
use crate::otlp::proto::common::v1::{any_value::Value, AnyValue, KeyValue};
use crate::otlp::proto::resource::v1::Resource;
use base64::Engine;
use std::collections::HashMap;

/// Resource attribute holding the service name.
pub const SERVICE_NAME: &str = "service.name";

/// Resource attribute holding the service instance id.
pub const SERVICE_INSTANCE_ID: &str = "service.instance.id";

/// Type name of a value.
///
/// Unset values report `EMPTY`.
#[must_use]
pub fn value_type_name(value: Option<&AnyValue>) -> &'static str {
    match value.and_then(|v| v.value.as_ref()) {
        Some(Value::StringValue(_)) => "STRING",
        Some(Value::BoolValue(_)) => "BOOL",
        Some(Value::IntValue(_)) => "INT",
        Some(Value::DoubleValue(_)) => "DOUBLE",
        Some(Value::ArrayValue(_)) => "SLICE",
        Some(Value::KvlistValue(_)) => "MAP",
        Some(Value::BytesValue(_)) => "BYTES",
        None => "EMPTY",
    }
}

/// Canonical string form of a value, independent of its underlying type.
///
/// Strings are returned as-is, numbers and booleans in their shortest decimal
/// form, bytes as standard base64, and arrays and maps as compact JSON.
#[must_use]
pub fn value_to_string(value: Option<&AnyValue>) -> String {
    match value.and_then(|v| v.value.as_ref()) {
        Some(Value::StringValue(s)) => s.clone(),
        Some(Value::BoolValue(b)) => b.to_string(),
        Some(Value::IntValue(i)) => i.to_string(),
        Some(Value::DoubleValue(d)) => double_to_string(*d),
        Some(Value::BytesValue(b)) => base64::engine::general_purpose::STANDARD.encode(b),
        Some(other @ (Value::ArrayValue(_) | Value::KvlistValue(_))) => {
            serde_json::to_string(&value_to_json(other)).unwrap_or_default()
        }
        None => String::new(),
    }
}

fn double_to_string(d: f64) -> String {
    if d.is_infinite() {
        if d.is_sign_positive() { "+Inf" } else { "-Inf" }.to_string()
    } else {
        d.to_string()
    }
}

/// Converts an OTLP value to `serde_json::Value`.
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::StringValue(s) => serde_json::Value::String(s.clone()),
        Value::BoolValue(b) => serde_json::Value::Bool(*b),
        Value::IntValue(i) => serde_json::Value::Number((*i).into()),
        Value::DoubleValue(d) => serde_json::Number::from_f64(*d)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::ArrayValue(arr) => serde_json::Value::Array(
            arr.values
                .iter()
                .map(|v| v.value.as_ref().map_or(serde_json::Value::Null, value_to_json))
                .collect(),
        ),
        Value::KvlistValue(kv) => {
            let mut map = serde_json::Map::new();
            for pair in &kv.values {
                let json = pair
                    .value
                    .as_ref()
                    .and_then(|v| v.value.as_ref())
                    .map_or(serde_json::Value::Null, value_to_json);
                map.insert(pair.key.clone(), json);
            }
            serde_json::Value::Object(map)
        }
        Value::BytesValue(b) => {
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
    }
}

/// Stringifies every attribute of a data point.
///
/// A key repeated within the list keeps its last value.
#[must_use]
pub fn attributes_to_dimensions(attributes: &[KeyValue]) -> HashMap<String, String> {
    attributes
        .iter()
        .map(|kv| (kv.key.clone(), value_to_string(kv.value.as_ref())))
        .collect()
}

/// Collects the attributes of a resource, stringified like dimensions.
#[must_use]
pub fn resource_attributes(resource: Option<&Resource>) -> ResourceAttributes {
    resource
        .map(|r| attributes_to_dimensions(&r.attributes))
        .unwrap_or_default()
}
