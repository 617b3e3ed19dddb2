//! Resource type configurations for OCI services
//!
//! This module defines:
//! - Resource type definitions (implementing ResourceType trait)
//! - Attribute schemas and the service each resource type belongs to

use cirrus_core::provider::{AttributeSchema, ResourceSchema, ResourceType};

use crate::config::GOLDEN_GATE_SERVICE;

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $config:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                ResourceSchema::new($config.attributes.to_vec())
            }
        }
    };
}

define_resource_type!(
    GoldenGateDeploymentType,
    "golden_gate_deployment",
    GOLDEN_GATE_DEPLOYMENT_CONFIG
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(GoldenGateDeploymentType)]
}

// =============================================================================
// Resource Configuration
// =============================================================================

/// Resource type configuration
pub struct ResourceConfig {
    /// Service the resource belongs to; selects retry settings
    pub service: &'static str,
    /// Attributes accepted in configuration
    pub attributes: &'static [AttributeSchema],
    /// Attributes only ever set by the service
    pub computed: &'static [&'static str],
    /// Nested fields sent on create or update but never returned on read
    pub write_only: &'static [(&'static str, &'static str)],
}

pub const GOLDEN_GATE_DEPLOYMENT_CONFIG: ResourceConfig = ResourceConfig {
    service: GOLDEN_GATE_SERVICE,
    attributes: &[
        AttributeSchema::required("compartment_id"),
        AttributeSchema::required("cpu_core_count"),
        AttributeSchema::required("deployment_type").force_new(),
        AttributeSchema::required("display_name"),
        AttributeSchema::required("is_auto_scaling_enabled"),
        AttributeSchema::required("license_model"),
        AttributeSchema::required("subnet_id").force_new(),
        AttributeSchema::required("ogg_data"),
        AttributeSchema::optional("deployment_backup_id").force_new(),
        AttributeSchema::optional("description"),
        AttributeSchema::optional("fqdn"),
        AttributeSchema::optional("freeform_tags"),
        AttributeSchema::optional("defined_tags"),
        AttributeSchema::optional("is_public"),
        AttributeSchema::optional("nsg_ids"),
    ],
    computed: &[
        "id",
        "state",
        "lifecycle_details",
        "is_healthy",
        "is_latest_version",
        "deployment_url",
        "private_ip_address",
        "public_ip_address",
        "time_created",
        "time_updated",
    ],
    write_only: &[("ogg_data", "admin_password"), ("ogg_data", "key")],
};

/// Get resource configuration by DSL resource type name
pub fn get_resource_config(resource_type: &str) -> Option<&'static ResourceConfig> {
    match resource_type {
        "golden_gate_deployment" => Some(&GOLDEN_GATE_DEPLOYMENT_CONFIG),
        _ => None,
    }
}
