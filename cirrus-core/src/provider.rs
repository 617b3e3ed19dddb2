//! Provider - Trait abstracting resource operations
//!
//! A Provider defines operations for a specific cloud platform.
//! It is responsible for turning resource definitions into API calls and
//! waiting for the platform to settle afterwards.

use std::future::Future;
use std::pin::Pin;

use crate::resource::{Resource, ResourceId, State, Value};

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    /// Cloud identifier of a resource that exists despite the failure
    pub identifier: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            identifier: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "golden_gate_deployment")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema {
        ResourceSchema::default()
    }
}

/// Schema of a single attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSchema {
    pub name: &'static str,
    /// Must be present on create
    pub required: bool,
    /// Can change in place; otherwise a change needs delete and recreate
    pub updatable: bool,
}

impl AttributeSchema {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            updatable: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            updatable: true,
        }
    }

    pub const fn force_new(mut self) -> Self {
        self.updatable = false;
        self
    }
}

/// Resource attribute schema
#[derive(Debug, Clone, Default)]
pub struct ResourceSchema {
    pub attributes: Vec<AttributeSchema>,
}

impl ResourceSchema {
    pub fn new(attributes: Vec<AttributeSchema>) -> Self {
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Names of required attributes missing from `attributes`
    pub fn missing_required<'a>(
        &'a self,
        attributes: &std::collections::HashMap<String, Value>,
    ) -> Vec<&'a str> {
        self.attributes
            .iter()
            .filter(|a| a.required && !attributes.contains_key(a.name))
            .map(|a| a.name)
            .collect()
    }
}

/// Main Provider trait
///
/// Each cloud provider implements this trait.
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "oci")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// Returns `State::not_found()` if the resource does not exist
    /// or no identifier is known yet.
    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the cloud identifier,
    /// once the resource has become usable. When the resource was created
    /// but never became usable, the error carries its identifier.
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource and wait until it is gone
    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, from, to)
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_provider_error_display_and_source() {
        let err = ProviderError::new("Failed to delete deployment")
            .for_resource(ResourceId::new("golden_gate_deployment", "main"))
            .with_cause(std::io::Error::other("boom"));
        assert_eq!(
            err.to_string(),
            "[golden_gate_deployment.main] Failed to delete deployment"
        );
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.identifier, None);
    }

    #[test]
    fn test_provider_error_keeps_identifier() {
        let err = ProviderError::new("Deployment did not become ACTIVE")
            .for_resource(ResourceId::new("golden_gate_deployment", "main"))
            .with_identifier("ocid1.goldengatedeployment.oc1.phx.aaaa");
        assert_eq!(
            err.identifier.as_deref(),
            Some("ocid1.goldengatedeployment.oc1.phx.aaaa")
        );
        assert_eq!(
            err.to_string(),
            "[golden_gate_deployment.main] Deployment did not become ACTIVE"
        );
    }

    #[test]
    fn test_schema_missing_required() {
        let schema = ResourceSchema::new(vec![
            AttributeSchema::required("compartment_id"),
            AttributeSchema::required("subnet_id").force_new(),
            AttributeSchema::optional("description"),
        ]);
        let mut attrs = HashMap::new();
        attrs.insert(
            "compartment_id".to_string(),
            Value::String("ocid1.compartment.oc1..x".to_string()),
        );

        assert_eq!(schema.missing_required(&attrs), vec!["subnet_id"]);
        assert!(!schema.get("subnet_id").unwrap().updatable);
    }
}
