//! OCI Provider implementation
//!
//! This module contains the main provider implementation that drives the
//! Golden Gate service through [`GoldenGateClient`] and waits for each
//! long-running operation to settle.

use std::collections::HashMap;
use std::sync::Arc;

use cirrus_core::provider::{ProviderError, ProviderResult, ResourceSchema};
use cirrus_core::resource::{Resource, ResourceId, State, Value};
use cirrus_core::waiter::{lifecycle_in, lifecycle_is};
use cirrus_core::{FetchError, LifecycleState, WaitOutcome, wait_for};
use serde::Serialize;

use crate::client::{GoldenGateClient, ListDeploymentsRequest, ServiceError};
use crate::config::{Operation, ProviderConfig};
use crate::data_sources::{DeploymentsQuery, GOLDEN_GATE_DEPLOYMENTS};
use crate::destroy::GOLDEN_GATE_DEPLOYMENT;
use crate::models::goldengate::{
    CreateDeploymentDetails, Deployment, DeploymentSummary, UpdateDeploymentDetails,
};
use crate::resources::{GOLDEN_GATE_DEPLOYMENT_CONFIG, ResourceConfig, get_resource_config};
use crate::utils::{attributes_to_json, is_valid_ocid, json_to_attributes, normalize_attribute};

/// Attributes that must hold OCIDs when set
const OCID_ATTRIBUTES: &[&str] = &["compartment_id", "subnet_id", "deployment_backup_id"];

/// OCI Provider
pub struct OciProvider {
    client: Arc<dyn GoldenGateClient>,
    config: ProviderConfig,
}

impl OciProvider {
    pub fn new(client: Arc<dyn GoldenGateClient>, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    // =========================================================================
    // Golden Gate API Methods
    // =========================================================================

    /// Get a deployment; `None` when the service does not know it
    pub async fn gg_get_deployment(&self, identifier: &str) -> Result<Option<Deployment>, ServiceError> {
        match self.client.get_deployment(identifier).await {
            Ok(deployment) => Ok(Some(deployment)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Poll a deployment until `predicate` holds, using the wait settings of `operation`
    async fn wait_for_deployment<P>(
        &self,
        id: &ResourceId,
        identifier: &str,
        operation: Operation,
        service: &str,
        predicate: P,
    ) -> ProviderResult<WaitOutcome<Deployment>>
    where
        P: Fn(&Deployment) -> bool,
    {
        let wait = self.config.wait_config(service, operation);
        let client = self.client.as_ref();
        wait_for(
            move || async move {
                client
                    .get_deployment(identifier)
                    .await
                    .map_err(FetchError::from)
            },
            predicate,
            &wait,
        )
        .await
        .map_err(|e| {
            ProviderError::new(format!(
                "Failed waiting for deployment {}: {}",
                identifier, e
            ))
            .for_resource(id.clone())
            .with_cause(e)
        })
    }

    /// Wait until the deployment is ACTIVE; FAILED and NEEDS_ATTENTION end the wait as errors
    async fn wait_until_active(
        &self,
        id: &ResourceId,
        identifier: &str,
        operation: Operation,
        service: &str,
    ) -> ProviderResult<Deployment> {
        let settled = lifecycle_in(vec![
            LifecycleState::Active,
            LifecycleState::Failed,
            LifecycleState::NeedsAttention,
        ]);
        match self
            .wait_for_deployment(id, identifier, operation, service, settled)
            .await?
        {
            WaitOutcome::Reached(deployment)
                if deployment.lifecycle_state == LifecycleState::Active =>
            {
                Ok(deployment)
            }
            WaitOutcome::Reached(deployment) => Err(ProviderError::new(format!(
                "Deployment {} entered {}: {}",
                identifier,
                deployment.lifecycle_state,
                deployment
                    .lifecycle_details
                    .as_deref()
                    .unwrap_or("no details")
            ))
            .for_resource(id.clone())),
            WaitOutcome::Deleted => Err(ProviderError::new(format!(
                "Deployment {} disappeared while waiting for ACTIVE",
                identifier
            ))
            .for_resource(id.clone())),
        }
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Read a resource using its configuration
    pub async fn read_resource(
        &self,
        resource_type: &str,
        name: &str,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let id = ResourceId::new(resource_type, name);
        let config = resource_config(&id)?;

        let identifier = match identifier {
            Some(identifier) => identifier,
            None => return Ok(State::not_found(id)),
        };

        let deployment = match self.gg_get_deployment(identifier).await {
            Ok(Some(deployment)) => deployment,
            Ok(None) => return Ok(State::not_found(id)),
            Err(e) => {
                return Err(ProviderError::new(format!(
                    "Failed to read deployment {}: {}",
                    identifier, e.message
                ))
                .for_resource(id)
                .with_cause(e));
            }
        };

        if deployment.lifecycle_state == LifecycleState::Deleted {
            return Ok(State::not_found(id));
        }
        deployment_to_state(id, &deployment, config, None)
    }

    /// Create a resource and wait until it is ACTIVE
    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let id = resource.id.clone();
        let config = resource_config(&id)?;
        validate_attributes(&id, &resource.attributes, config)?;

        let resource_schema = schema(config);
        let missing = resource_schema.missing_required(&resource.attributes);
        if !missing.is_empty() {
            return Err(ProviderError::new(format!(
                "Missing required attributes: {}",
                missing.join(", ")
            ))
            .for_resource(id));
        }

        let details: CreateDeploymentDetails =
            serde_json::from_value(attributes_to_json(&resource.attributes)).map_err(|e| {
                ProviderError::new(format!("Invalid attributes: {}", e)).for_resource(id.clone())
            })?;

        let created = self
            .client
            .create_deployment(&details)
            .await
            .map_err(|e| {
                ProviderError::new(format!("Failed to create deployment: {}", e.message))
                    .for_resource(id.clone())
                    .with_cause(e)
            })?;
        log::info!("Created deployment {}, waiting for ACTIVE", created.id);

        let deployment = self
            .wait_until_active(&id, &created.id, Operation::Create, config.service)
            .await
            .map_err(|e| e.with_identifier(created.id.clone()))?;
        deployment_to_state(id, &deployment, config, Some(&resource.attributes))
    }

    /// Update a resource in place
    ///
    /// A compartment change is a separate request from the other attribute
    /// changes; each one is waited on until the deployment is ACTIVE again.
    pub async fn update_resource(
        &self,
        id: ResourceId,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let config = resource_config(&id)?;
        validate_attributes(&id, &to.attributes, config)?;

        for attribute in config.attributes.iter().filter(|a| !a.updatable) {
            let desired = to
                .attributes
                .get(attribute.name)
                .map(|value| normalize_attribute(attribute.name, value));
            if from.attributes.get(attribute.name) != desired.as_ref() {
                return Err(ProviderError::new(format!(
                    "Attribute '{}' cannot be updated in place; the deployment must be replaced",
                    attribute.name
                ))
                .for_resource(id));
            }
        }

        let mut latest = None;

        if let Some(target) = to.get_str("compartment_id")
            && from.get_str("compartment_id") != Some(target)
        {
            log::info!("Moving deployment {} to compartment {}", identifier, target);
            self.client
                .change_deployment_compartment(identifier, target)
                .await
                .map_err(|e| {
                    ProviderError::new(format!(
                        "Failed to change compartment of deployment {}: {}",
                        identifier, e.message
                    ))
                    .for_resource(id.clone())
                    .with_cause(e)
                })?;
            latest = Some(
                self.wait_until_active(&id, identifier, Operation::Update, config.service)
                    .await?,
            );
        }

        let details = update_details(&id, from, &to, config)?;
        if !details.is_empty() {
            self.client
                .update_deployment(identifier, &details)
                .await
                .map_err(|e| {
                    ProviderError::new(format!(
                        "Failed to update deployment {}: {}",
                        identifier, e.message
                    ))
                    .for_resource(id.clone())
                    .with_cause(e)
                })?;
            latest = Some(
                self.wait_until_active(&id, identifier, Operation::Update, config.service)
                    .await?,
            );
        }

        let deployment = match latest {
            Some(deployment) => deployment,
            None => self
                .gg_get_deployment(identifier)
                .await
                .map_err(|e| {
                    ProviderError::new(format!(
                        "Failed to read deployment {}: {}",
                        identifier, e.message
                    ))
                    .for_resource(id.clone())
                    .with_cause(e)
                })?
                .ok_or_else(|| {
                    ProviderError::new(format!("Deployment {} not found", identifier))
                        .for_resource(id.clone())
                })?,
        };
        deployment_to_state(id, &deployment, config, Some(&to.attributes))
    }

    /// Delete a resource and wait until it is DELETED or gone
    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let config = resource_config(id)?;

        match self.client.delete_deployment(identifier).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                log::info!("Deployment {} is already deleted", identifier);
                return Ok(());
            }
            Err(e) => {
                return Err(ProviderError::new(format!(
                    "Failed to delete deployment {}: {}",
                    identifier, e.message
                ))
                .for_resource(id.clone())
                .with_cause(e));
            }
        }

        let outcome = self
            .wait_for_deployment(
                id,
                identifier,
                Operation::Delete,
                config.service,
                lifecycle_is(LifecycleState::Deleted),
            )
            .await?;
        log::info!(
            "Deployment {} {}",
            identifier,
            if outcome.is_deleted() {
                "is gone"
            } else {
                "is DELETED"
            }
        );
        Ok(())
    }

    // =========================================================================
    // Data Sources
    // =========================================================================

    /// Deployments of a compartment matching `query`, oldest first
    pub async fn list_deployments(&self, query: &DeploymentsQuery) -> ProviderResult<Vec<State>> {
        let id = ResourceId::new(GOLDEN_GATE_DEPLOYMENTS, &query.compartment_id);
        let filters = query
            .filters
            .iter()
            .map(|filter| {
                filter.compile().map_err(|e| {
                    ProviderError::new(format!("Invalid filter on '{}': {}", filter.name, e))
                        .for_resource(id.clone())
                })
            })
            .collect::<ProviderResult<Vec<_>>>()?;

        let mut request = ListDeploymentsRequest::new(&query.compartment_id);
        if let Some(display_name) = &query.display_name {
            request = request.with_display_name(display_name.clone());
        }
        if let Some(state) = &query.state {
            request = request.with_lifecycle_state(state.clone());
        }
        let collection = self.client.list_deployments(&request).await.map_err(|e| {
            ProviderError::new(format!(
                "Failed to list deployments in {}: {}",
                query.compartment_id, e.message
            ))
            .for_resource(id.clone())
            .with_cause(e)
        })?;

        let mut states = Vec::with_capacity(collection.items.len());
        for summary in &collection.items {
            let state = summary_to_state(summary, &GOLDEN_GATE_DEPLOYMENT_CONFIG)?;
            if filters.iter().all(|filter| filter.matches(&state)) {
                states.push(state);
            }
        }
        log::debug!(
            "Listed {} of {} deployments in {}",
            states.len(),
            collection.items.len(),
            query.compartment_id
        );
        Ok(states)
    }

    /// A single deployment by id; unlike a resource read, a missing deployment is an error
    pub async fn read_deployment(&self, deployment_id: &str) -> ProviderResult<State> {
        let id = ResourceId::new(GOLDEN_GATE_DEPLOYMENT, deployment_id);
        let deployment = self
            .gg_get_deployment(deployment_id)
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "Failed to read deployment {}: {}",
                    deployment_id, e.message
                ))
                .for_resource(id.clone())
                .with_cause(e)
            })?
            .ok_or_else(|| {
                ProviderError::new(format!("Deployment {} not found", deployment_id))
                    .for_resource(id.clone())
            })?;
        deployment_to_state(id, &deployment, &GOLDEN_GATE_DEPLOYMENT_CONFIG, None)
    }
}

fn resource_config(id: &ResourceId) -> ProviderResult<&'static ResourceConfig> {
    get_resource_config(&id.resource_type).ok_or_else(|| {
        ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
            .for_resource(id.clone())
    })
}

fn schema(config: &ResourceConfig) -> ResourceSchema {
    ResourceSchema::new(config.attributes.to_vec())
}

/// Reject unknown attributes and malformed OCIDs before calling the service
fn validate_attributes(
    id: &ResourceId,
    attributes: &HashMap<String, Value>,
    config: &ResourceConfig,
) -> ProviderResult<()> {
    let mut unknown: Vec<&str> = attributes
        .keys()
        .map(String::as_str)
        .filter(|name| config.attributes.iter().all(|a| a.name != *name))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(ProviderError::new(format!(
            "Unknown attributes: {}",
            unknown.join(", ")
        ))
        .for_resource(id.clone()));
    }

    let mut ocids: Vec<(&str, &Value)> = OCID_ATTRIBUTES
        .iter()
        .filter_map(|name| attributes.get(*name).map(|value| (*name, value)))
        .collect();
    if let Some(Value::List(nsg_ids)) = attributes.get("nsg_ids") {
        ocids.extend(nsg_ids.iter().map(|value| ("nsg_ids", value)));
    }
    for (name, value) in ocids {
        match value.as_str() {
            Some(ocid) if is_valid_ocid(ocid) => {}
            _ => {
                return Err(ProviderError::new(format!(
                    "Invalid OCID for '{}': {:?}",
                    name, value
                ))
                .for_resource(id.clone()));
            }
        }
    }
    Ok(())
}

/// Changed updatable attributes, except the compartment which moves separately
fn update_details(
    id: &ResourceId,
    from: &State,
    to: &Resource,
    config: &ResourceConfig,
) -> ProviderResult<UpdateDeploymentDetails> {
    let changed: HashMap<String, Value> = config
        .attributes
        .iter()
        .filter(|a| a.updatable && a.name != "compartment_id")
        .filter_map(|a| {
            let desired = normalize_attribute(a.name, to.attributes.get(a.name)?);
            differs(a.name, from.attributes.get(a.name), &desired)
                .then(|| (a.name.to_string(), desired))
        })
        .collect();

    serde_json::from_value(attributes_to_json(&changed)).map_err(|e| {
        ProviderError::new(format!("Invalid attributes: {}", e)).for_resource(id.clone())
    })
}

/// Nested blocks compare only the fields set in configuration; tag maps compare whole
fn differs(name: &str, current: Option<&Value>, desired: &Value) -> bool {
    match (current, desired) {
        (Some(Value::Map(current)), Value::Map(desired)) if !name.ends_with("_tags") => desired
            .iter()
            .any(|(key, value)| current.get(key) != Some(value)),
        (current, desired) => current != Some(desired),
    }
}

/// Attributes of a service model known to `config`, with the lifecycle state as `state`
fn model_attributes<M: Serialize>(
    id: &ResourceId,
    model: &M,
    config: &ResourceConfig,
) -> ProviderResult<HashMap<String, Value>> {
    let json = serde_json::to_value(model).map_err(|e| {
        ProviderError::new(format!("Failed to convert deployment: {}", e)).for_resource(id.clone())
    })?;

    Ok(json_to_attributes(&json)
        .into_iter()
        .filter_map(|(name, value)| {
            let name = if name == "lifecycle_state" {
                "state".to_string()
            } else {
                name
            };
            let known = config.attributes.iter().any(|a| a.name == name)
                || config.computed.iter().any(|c| *c == name);
            known.then_some((name, value))
        })
        .collect())
}

fn summary_to_state(summary: &DeploymentSummary, config: &ResourceConfig) -> ProviderResult<State> {
    let name = summary.display_name.as_deref().unwrap_or(&summary.id);
    let id = ResourceId::new(GOLDEN_GATE_DEPLOYMENTS, name);
    let attributes = model_attributes(&id, summary, config)?;
    Ok(State::existing(id, attributes)
        .with_identifier(summary.id.clone())
        .with_lifecycle_state(summary.lifecycle_state.clone()))
}

/// Build state from a deployment; write-only fields are carried over from `desired`
fn deployment_to_state(
    id: ResourceId,
    deployment: &Deployment,
    config: &ResourceConfig,
    desired: Option<&HashMap<String, Value>>,
) -> ProviderResult<State> {
    let mut attributes = model_attributes(&id, deployment, config)?;

    if let Some(desired) = desired {
        for (parent, field) in config.write_only {
            let Some(Value::Map(source)) = desired.get(*parent) else {
                continue;
            };
            let Some(secret) = source.get(*field) else {
                continue;
            };
            if let Some(Value::Map(target)) = attributes.get_mut(*parent) {
                target.insert(field.to_string(), secret.clone());
            }
        }
    }

    Ok(State::existing(id, attributes)
        .with_identifier(deployment.id.clone())
        .with_lifecycle_state(deployment.lifecycle_state.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sources::Filter;
    use crate::memory::tests::{COMPARTMENT, SUBNET, create_details};
    use crate::memory::{Call, InMemoryGoldenGate};
    use std::time::Duration;

    const OTHER_COMPARTMENT: &str = "ocid1.compartment.oc1..aaaaaaaaother";

    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    fn deployment_resource() -> Resource {
        let mut ogg = HashMap::new();
        ogg.insert("admin_username".to_string(), string("adminUsername"));
        ogg.insert("admin_password".to_string(), string("BEstrO0ng_#11"));
        ogg.insert(
            "deployment_name".to_string(),
            string("depl_test_ggs_deployment_name"),
        );

        Resource::new("golden_gate_deployment", "depl_test_ggs_deployment")
            .with_attribute("compartment_id", string(COMPARTMENT))
            .with_attribute("cpu_core_count", Value::Int(1))
            .with_attribute("deployment_type", string("OGG"))
            .with_attribute("display_name", string("displayName"))
            .with_attribute("is_auto_scaling_enabled", Value::Bool(false))
            .with_attribute("subnet_id", string(SUBNET))
            .with_attribute("license_model", string("oci.LicenseModel.license_included"))
            .with_attribute("ogg_data", Value::Map(ogg))
    }

    fn provider(service: Arc<InMemoryGoldenGate>) -> OciProvider {
        let config = ProviderConfig {
            poll_interval: Duration::from_secs(1),
            ..Default::default()
        };
        OciProvider::new(service, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_for_active() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(2));
        let provider = provider(service.clone());

        let state = provider.create_resource(deployment_resource()).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.lifecycle_state, Some(LifecycleState::Active));
        assert_eq!(state.get_str("state"), Some("ACTIVE"));
        assert_eq!(state.get_str("license_model"), Some("LICENSE_INCLUDED"));
        assert_eq!(state.attributes.get("cpu_core_count"), Some(&Value::Int(1)));

        let Some(Value::Map(ogg)) = state.attributes.get("ogg_data") else {
            panic!("Expected ogg_data map");
        };
        assert_eq!(ogg.get("admin_username"), Some(&string("adminUsername")));
        assert_eq!(ogg.get("admin_password"), Some(&string("BEstrO0ng_#11")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_retries_transient_reads() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(0));
        let provider = provider(service.clone());
        service.inject_fault(Call::Create, ServiceError::invalid_parameter("bad shape"));
        let err = provider.create_resource(deployment_resource()).await.unwrap_err();
        assert_eq!(err.message, "Failed to create deployment: bad shape");

        service.inject_fault(Call::Get, ServiceError::too_many_requests());
        service.inject_fault(Call::Get, ServiceError::internal("blip"));
        let state = provider.create_resource(deployment_resource()).await.unwrap();
        assert_eq!(state.lifecycle_state, Some(LifecycleState::Active));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_and_invalid_attributes() {
        let provider = provider(Arc::new(InMemoryGoldenGate::new()));

        let mut resource = deployment_resource();
        resource.attributes.remove("subnet_id");
        resource.attributes.remove("display_name");
        let err = provider.create_resource(resource).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "[golden_gate_deployment.depl_test_ggs_deployment] Missing required attributes: display_name, subnet_id"
        );

        let resource = deployment_resource().with_attribute("compartment_id", string("root"));
        let err = provider.create_resource(resource).await.unwrap_err();
        assert!(err.message.contains("Invalid OCID for 'compartment_id'"));

        let resource = deployment_resource().with_attribute("shape", string("VM"));
        let err = provider.create_resource(resource).await.unwrap_err();
        assert_eq!(err.message, "Unknown attributes: shape");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_missing_and_deleted() {
        let service = Arc::new(
            InMemoryGoldenGate::new()
                .with_transition_reads(0)
                .with_retained_deleted(true),
        );
        let provider = provider(service.clone());

        let state = provider
            .read_resource("golden_gate_deployment", "main", None)
            .await
            .unwrap();
        assert!(!state.exists);

        let state = provider
            .read_resource(
                "golden_gate_deployment",
                "main",
                Some("ocid1.goldengatedeployment.oc1.phx.missing"),
            )
            .await
            .unwrap();
        assert!(!state.exists);

        let created = provider.create_resource(deployment_resource()).await.unwrap();
        let identifier = created.identifier.unwrap();
        provider.delete_resource(&created.id, &identifier).await.unwrap();
        let state = provider
            .read_resource("golden_gate_deployment", "main", Some(&identifier))
            .await
            .unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn test_read_propagates_service_errors() {
        let service = Arc::new(InMemoryGoldenGate::new());
        let provider = provider(service.clone());
        service.inject_fault(
            Call::Get,
            ServiceError::new(401, "NotAuthenticated", "bad key"),
        );

        let err = provider
            .read_resource("golden_gate_deployment", "main", Some("ocid1.x.oc1..a"))
            .await
            .unwrap_err();
        assert!(err.message.contains("bad key"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_moves_compartment_then_updates() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(1));
        let provider = provider(service.clone());
        let from = provider.create_resource(deployment_resource()).await.unwrap();
        let identifier = from.identifier.clone().unwrap();

        let to = deployment_resource()
            .with_attribute("compartment_id", string(OTHER_COMPARTMENT))
            .with_attribute("display_name", string("displayName2"))
            .with_attribute("description", string("description2"));
        let state = provider
            .update_resource(from.id.clone(), &identifier, &from, to)
            .await
            .unwrap();

        assert_eq!(state.get_str("compartment_id"), Some(OTHER_COMPARTMENT));
        assert_eq!(state.get_str("display_name"), Some("displayName2"));
        assert_eq!(state.get_str("description"), Some("description2"));
        assert_eq!(state.lifecycle_state, Some(LifecycleState::Active));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_without_changes_reads_current() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(0));
        let provider = provider(service.clone());
        let from = provider.create_resource(deployment_resource()).await.unwrap();
        let identifier = from.identifier.clone().unwrap();

        let config = resource_config(&from.id).unwrap();
        let mut unchanged = Resource::new("golden_gate_deployment", "depl_test_ggs_deployment");
        for attribute in config.attributes {
            if let Some(value) = from.attributes.get(attribute.name) {
                unchanged.attributes.insert(attribute.name.to_string(), value.clone());
            }
        }

        let state = provider
            .update_resource(from.id.clone(), &identifier, &from, unchanged)
            .await
            .unwrap();
        assert_eq!(state.attributes, from.attributes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_rejects_force_new_change() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(0));
        let provider = provider(service.clone());
        let from = provider.create_resource(deployment_resource()).await.unwrap();

        let to = deployment_resource()
            .with_attribute("subnet_id", string("ocid1.subnet.oc1.phx.aaaaaaaaother"));
        let err = provider
            .update_resource(from.id.clone(), "unused", &from, to)
            .await
            .unwrap_err();
        assert!(err.message.contains("'subnet_id' cannot be updated in place"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_until_gone() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(2));
        let provider = provider(service.clone());
        let created = provider.create_resource(deployment_resource()).await.unwrap();
        let identifier = created.identifier.unwrap();

        provider.delete_resource(&created.id, &identifier).await.unwrap();
        assert!(service.is_empty());

        provider.delete_resource(&created.id, &identifier).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_times_out() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(1000));
        let config = ProviderConfig {
            create_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
            ..Default::default()
        };
        let provider = OciProvider::new(service, config);

        let err = provider.create_resource(deployment_resource()).await.unwrap_err();
        assert!(err.message.contains("operation timed out waiting for condition"));
        assert!(err.message.contains("last observed state = CREATING"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_timeout_keeps_identifier() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(1000));
        let config = ProviderConfig {
            create_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(5),
            ..Default::default()
        };
        let provider = OciProvider::new(service.clone(), config);

        let err = provider.create_resource(deployment_resource()).await.unwrap_err();
        let listed = service
            .list_deployments(&ListDeploymentsRequest::new(COMPARTMENT))
            .await
            .unwrap();
        assert_eq!(listed.items.len(), 1);
        assert_eq!(err.identifier.as_deref(), Some(listed.items[0].id.as_str()));

        service.inject_fault(Call::Create, ServiceError::invalid_parameter("bad shape"));
        let rejected = provider.create_resource(deployment_resource()).await.unwrap_err();
        assert_eq!(rejected.identifier, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_accepts_qualified_enum_values() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(0));
        let provider = provider(service.clone());
        let resource = deployment_resource()
            .with_attribute("deployment_type", string("oci.DeploymentType.ogg"));
        let from = provider.create_resource(resource.clone()).await.unwrap();
        assert_eq!(from.get_str("deployment_type"), Some("OGG"));
        assert_eq!(from.get_str("license_model"), Some("LICENSE_INCLUDED"));
        let identifier = from.identifier.clone().unwrap();

        let to = resource.with_attribute("display_name", string("renamed"));
        let details = update_details(&from.id, &from, &to, resource_config(&from.id).unwrap())
            .unwrap();
        assert_eq!(
            details,
            UpdateDeploymentDetails {
                display_name: Some("renamed".to_string()),
                ..Default::default()
            }
        );

        let state = provider
            .update_resource(from.id.clone(), &identifier, &from, to)
            .await
            .unwrap();
        assert_eq!(state.get_str("display_name"), Some("renamed"));
        assert_eq!(state.get_str("deployment_type"), Some("OGG"));
    }

    async fn named_deployment(provider: &OciProvider, display_name: &str) -> String {
        let resource = deployment_resource().with_attribute("display_name", string(display_name));
        let state = provider.create_resource(resource).await.unwrap();
        state.identifier.unwrap()
    }

    fn identifiers(states: &[State]) -> Vec<String> {
        let mut ids: Vec<String> = states
            .iter()
            .filter_map(|state| state.identifier.clone())
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_deployments_by_display_name_and_state() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(0));
        let provider = provider(service.clone());
        let first = named_deployment(&provider, "first").await;
        let second = named_deployment(&provider, "second").await;
        let creating = service.create_deployment(&create_details()).await.unwrap();

        let all = provider
            .list_deployments(&DeploymentsQuery::new(COMPARTMENT))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let named = provider
            .list_deployments(&DeploymentsQuery::new(COMPARTMENT).with_display_name("second"))
            .await
            .unwrap();
        assert_eq!(identifiers(&named), vec![second.clone()]);
        assert_eq!(named[0].get_str("display_name"), Some("second"));
        assert_eq!(named[0].get_str("state"), Some("ACTIVE"));
        assert_eq!(named[0].id.resource_type, GOLDEN_GATE_DEPLOYMENTS);

        let active = provider
            .list_deployments(&DeploymentsQuery::new(COMPARTMENT).with_state(LifecycleState::Active))
            .await
            .unwrap();
        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(identifiers(&active), expected);

        let pending = provider
            .list_deployments(
                &DeploymentsQuery::new(COMPARTMENT).with_state(LifecycleState::Creating),
            )
            .await
            .unwrap();
        assert_eq!(identifiers(&pending), vec![creating.id]);

        let elsewhere = provider
            .list_deployments(&DeploymentsQuery::new(OTHER_COMPARTMENT))
            .await
            .unwrap();
        assert!(elsewhere.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_deployments_applies_filters() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(0));
        let provider = provider(service.clone());
        named_deployment(&provider, "depl-1").await;
        named_deployment(&provider, "depl-2").await;
        let other = named_deployment(&provider, "other").await;

        let prefixed = DeploymentsQuery::new(COMPARTMENT)
            .with_filter(Filter::new("display_name", vec!["^depl-".to_string()]).with_regex());
        assert_eq!(provider.list_deployments(&prefixed).await.unwrap().len(), 2);

        let exact = DeploymentsQuery::new(COMPARTMENT)
            .with_filter(Filter::new("display_name", vec!["other".to_string()]))
            .with_filter(Filter::new("cpu_core_count", vec!["1".to_string()]));
        let matched = provider.list_deployments(&exact).await.unwrap();
        assert_eq!(identifiers(&matched), vec![other]);

        let invalid = DeploymentsQuery::new(COMPARTMENT)
            .with_filter(Filter::new("display_name", vec!["(".to_string()]).with_regex());
        let err = provider.list_deployments(&invalid).await.unwrap_err();
        assert!(err.message.starts_with("Invalid filter on 'display_name'"));
    }

    #[tokio::test]
    async fn test_list_deployments_reports_service_errors() {
        let service = Arc::new(InMemoryGoldenGate::new());
        let provider = provider(service.clone());
        service.inject_fault(Call::List, ServiceError::internal("down"));

        let err = provider
            .list_deployments(&DeploymentsQuery::new(COMPARTMENT))
            .await
            .unwrap_err();
        assert_eq!(
            err.message,
            format!("Failed to list deployments in {}: down", COMPARTMENT)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_deployment_by_id() {
        let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(0));
        let provider = provider(service.clone());
        let identifier = named_deployment(&provider, "lookup").await;

        let state = provider.read_deployment(&identifier).await.unwrap();
        assert_eq!(state.identifier.as_deref(), Some(identifier.as_str()));
        assert_eq!(state.get_str("display_name"), Some("lookup"));
        assert_eq!(state.get_str("state"), Some("ACTIVE"));

        let err = provider
            .read_deployment("ocid1.goldengatedeployment.oc1.phx.missing")
            .await
            .unwrap_err();
        assert_eq!(
            err.message,
            "Deployment ocid1.goldengatedeployment.oc1.phx.missing not found"
        );
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = provider(Arc::new(InMemoryGoldenGate::new()));
        let err = provider.read_resource("vcn", "main", None).await.unwrap_err();
        assert_eq!(err.message, "Unknown resource type: vcn");
    }
}
