//! Cirrus OCI Provider
//!
//! Oracle Cloud Infrastructure Provider implementation.
//!
//! ## Module Structure
//!
//! - `client` - Golden Gate service client trait and service errors
//! - `config` - Provider configuration and per-service retry settings
//! - `data_sources` - Deployment list and lookup queries
//! - `destroy` - Checks that destroyed resources are gone
//! - `memory` - In-memory Golden Gate service
//! - `models` - Service models and union registries
//! - `provider` - OciProvider implementation
//! - `resources` - Resource type definitions and configurations
//! - `sweeper` - Bulk cleanup of leftover resources
//! - `utils` - Helper functions for OCIDs and value conversion

pub mod client;
pub mod config;
pub mod data_sources;
pub mod destroy;
pub mod memory;
pub mod models;
pub mod provider;
pub mod resources;
pub mod sweeper;
pub mod utils;

// Re-export main types
pub use client::{GoldenGateClient, ServiceError};
pub use config::ProviderConfig;
pub use data_sources::{DeploymentsQuery, Filter};
pub use memory::InMemoryGoldenGate;
pub use models::Registries;
pub use provider::OciProvider;
pub use utils::{convert_enum_value, is_valid_ocid, normalize_region};

use cirrus_core::provider::{BoxFuture, Provider, ProviderResult};
use cirrus_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for OciProvider {
    fn name(&self) -> &'static str {
        "oci"
    }

    fn resource_types(&self) -> Vec<Box<dyn cirrus_core::provider::ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move {
            self.read_resource(&id.resource_type, &id.name, identifier.as_deref())
                .await
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(id, &identifier, &from, to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }
}
