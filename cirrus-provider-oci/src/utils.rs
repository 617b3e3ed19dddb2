//! Utility functions for value normalization and conversion

use std::collections::HashMap;
use std::sync::LazyLock;

use cirrus_core::resource::Value;
use heck::{ToLowerCamelCase, ToSnakeCase};
use regex::Regex;

/// ocid1.<resource type>.<realm>.[region].<unique id>
static OCID_PATTERN: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^ocid1\.([a-z0-9]+)\.([a-z0-9]+)\.([a-z0-9-]*)\.([a-zA-Z0-9]+)$")
});

/// Parts of an Oracle Cloud identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ocid<'a> {
    pub resource_type: &'a str,
    pub realm: &'a str,
    /// Empty for identifiers of global resources such as compartments
    pub region: Option<&'a str>,
    pub unique_id: &'a str,
}

pub fn parse_ocid(s: &str) -> Option<Ocid<'_>> {
    let pattern = OCID_PATTERN.as_ref().ok()?;
    let captures = pattern.captures(s)?;
    let part = |i: usize| captures.get(i).map(|m| m.as_str()).unwrap_or_default();
    let region = part(3);
    Some(Ocid {
        resource_type: part(1),
        realm: part(2),
        region: (!region.is_empty()).then_some(region),
        unique_id: part(4),
    })
}

pub fn is_valid_ocid(s: &str) -> bool {
    parse_ocid(s).is_some()
}

/// Normalize region value (e.g., "oci.Region.us_phoenix_1" -> "us-phoenix-1")
pub fn normalize_region(s: &str) -> String {
    let region_part = if s.contains('.') {
        s.split('.').next_back().unwrap_or(s)
    } else {
        s
    };
    region_part.replace('_', "-")
}

/// Convert DSL enum value to service format
/// e.g., "oci.LicenseModel.license_included" -> "LICENSE_INCLUDED"
pub fn convert_enum_value(value: &str) -> String {
    let parts: Vec<&str> = value.split('.').collect();
    let raw_value = match parts.as_slice() {
        [type_name, raw] if type_name.chars().next().is_some_and(|c| c.is_uppercase()) => *raw,
        [provider, type_name, raw]
            if provider.chars().all(|c| c.is_lowercase())
                && type_name.chars().next().is_some_and(|c| c.is_uppercase()) =>
        {
            *raw
        }
        _ => return value.to_string(),
    };
    raw_value.to_uppercase()
}

/// Attribute name to its service field name (e.g., "cpu_core_count" -> "cpuCoreCount")
pub fn to_api_name(name: &str) -> String {
    name.to_lower_camel_case()
}

/// Service field name to its attribute name
pub fn to_attribute_name(name: &str) -> String {
    name.to_snake_case()
}

/// Attributes whose map keys are user data and keep their spelling
const VERBATIM_KEYS: &[&str] = &["freeform_tags", "defined_tags"];

/// Attributes holding service enums, which may be written as "oci.Type.value"
const ENUM_ATTRIBUTES: &[&str] = &["license_model", "deployment_type"];

/// Attribute value in the form the service stores it
pub fn normalize_attribute(name: &str, value: &Value) -> Value {
    match value {
        Value::String(s) if ENUM_ATTRIBUTES.contains(&name) => {
            Value::String(convert_enum_value(s))
        }
        other => other.clone(),
    }
}

/// Convert attributes to a service JSON object, renaming keys
pub fn attributes_to_json(attributes: &HashMap<String, Value>) -> serde_json::Value {
    serde_json::Value::Object(
        attributes
            .iter()
            .map(|(name, value)| {
                let json = if VERBATIM_KEYS.contains(&name.as_str()) {
                    value.to_json()
                } else {
                    attribute_to_json(&normalize_attribute(name, value))
                };
                (to_api_name(name), json)
            })
            .collect(),
    )
}

/// Convert an attribute value to a service JSON value, renaming map keys
pub fn attribute_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Map(map) => attributes_to_json(map),
        Value::List(items) => serde_json::Value::Array(items.iter().map(attribute_to_json).collect()),
        other => other.to_json(),
    }
}

/// Convert a service JSON object to attributes; `null` fields are dropped
pub fn json_to_attributes(value: &serde_json::Value) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    if let serde_json::Value::Object(map) = value {
        for (key, field) in map {
            let name = to_attribute_name(key);
            let converted = if VERBATIM_KEYS.contains(&name.as_str()) {
                Value::from_json(field)
            } else {
                json_to_attribute(field)
            };
            if let Some(converted) = converted {
                attributes.insert(name, converted);
            }
        }
    }
    attributes
}

fn json_to_attribute(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Object(_) => Some(Value::Map(json_to_attributes(value))),
        serde_json::Value::Array(items) => {
            Some(Value::List(items.iter().filter_map(json_to_attribute).collect()))
        }
        other => Value::from_json(other),
    }
}
