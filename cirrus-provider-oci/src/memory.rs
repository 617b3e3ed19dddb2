//! In-memory Golden Gate service
//!
//! Behaves like the remote service as seen through [`GoldenGateClient`]:
//! accepted requests leave deployments in a transitional state that settles
//! after a configurable number of reads. Faults can be queued per call to
//! make the next matching request fail.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use cirrus_core::LifecycleState;
use dashmap::DashMap;

use crate::client::{GoldenGateClient, ListDeploymentsRequest, ServiceError};
use crate::models::goldengate::{
    CreateDeploymentDetails, Deployment, DeploymentCollection, DeploymentSummary, OggDeployment,
    UpdateDeploymentDetails,
};
use crate::utils::is_valid_ocid;

const DEFAULT_TRANSITION_READS: u32 = 2;

/// Region key embedded in generated OCIDs and deployment URLs
const REGION_KEY: &str = "phx";

#[derive(Debug, Clone, Copy)]
enum Target {
    Active,
    Deleted,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    /// Reads left that still observe the transitional state
    remaining: u32,
    target: Target,
}

#[derive(Debug, Clone)]
struct Entry {
    deployment: Deployment,
    pending: Option<Pending>,
}

impl Entry {
    /// Move one read forward; returns false once the deployment is gone
    fn advance(&mut self, retain_deleted: bool) -> bool {
        let Some(mut pending) = self.pending.take() else {
            return true;
        };
        if pending.remaining > 0 {
            pending.remaining -= 1;
            self.pending = Some(pending);
            return true;
        }
        match pending.target {
            Target::Active => {
                self.deployment.lifecycle_state = LifecycleState::Active;
                true
            }
            Target::Deleted => {
                self.deployment.lifecycle_state = LifecycleState::Deleted;
                retain_deleted
            }
        }
    }
}

/// Service call a queued fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Get,
    List,
    Create,
    Update,
    ChangeCompartment,
    Delete,
}

#[derive(Debug)]
pub struct InMemoryGoldenGate {
    deployments: DashMap<String, Entry>,
    faults: Mutex<VecDeque<(Call, ServiceError)>>,
    transition_reads: u32,
    retain_deleted: bool,
}

impl Default for InMemoryGoldenGate {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGoldenGate {
    pub fn new() -> Self {
        Self {
            deployments: DashMap::new(),
            faults: Mutex::new(VecDeque::new()),
            transition_reads: DEFAULT_TRANSITION_READS,
            retain_deleted: false,
        }
    }

    /// Number of reads a CREATING, UPDATING or DELETING deployment stays in that state
    pub fn with_transition_reads(mut self, reads: u32) -> Self {
        self.transition_reads = reads;
        self
    }

    /// Keep deleted deployments readable as DELETED instead of answering 404
    pub fn with_retained_deleted(mut self, retain: bool) -> Self {
        self.retain_deleted = retain;
        self
    }

    /// Make the next `call` fail with `error`; faults for one call fire in order
    pub fn inject_fault(&self, call: Call, error: ServiceError) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back((call, error));
    }

    /// Store a deployment as-is, in its current lifecycle state
    pub fn insert(&self, deployment: Deployment) {
        self.deployments.insert(
            deployment.id.clone(),
            Entry {
                deployment,
                pending: None,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.deployments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }

    fn take_fault(&self, call: Call) -> Result<(), ServiceError> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        let fault = faults
            .iter()
            .position(|(queued, _)| *queued == call)
            .and_then(|index| faults.remove(index));
        match fault {
            Some((_, error)) => {
                log::debug!("Injected fault on {:?}: {}", call, error);
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn pending(&self, target: Target) -> Option<Pending> {
        Some(Pending {
            remaining: self.transition_reads,
            target,
        })
    }

    /// Apply `change` to an ACTIVE deployment and leave it UPDATING
    fn modify(
        &self,
        deployment_id: &str,
        change: impl FnOnce(&mut Deployment),
    ) -> Result<(), ServiceError> {
        let mut entry = self
            .deployments
            .get_mut(deployment_id)
            .ok_or_else(|| not_found(deployment_id))?;
        if entry.deployment.lifecycle_state != LifecycleState::Active {
            return Err(ServiceError::conflict(format!(
                "Deployment {} is in state {}",
                deployment_id, entry.deployment.lifecycle_state
            )));
        }
        change(&mut entry.deployment);
        entry.deployment.lifecycle_state = LifecycleState::Updating;
        entry.deployment.time_updated = Some(Utc::now());
        entry.pending = self.pending(Target::Active);
        Ok(())
    }
}

fn not_found(deployment_id: &str) -> ServiceError {
    ServiceError::not_found(format!(
        "Authorization failed or requested resource not found: {}",
        deployment_id
    ))
}

#[async_trait]
impl GoldenGateClient for InMemoryGoldenGate {
    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, ServiceError> {
        self.take_fault(Call::Get)?;
        let visible = {
            let mut entry = self
                .deployments
                .get_mut(deployment_id)
                .ok_or_else(|| not_found(deployment_id))?;
            if entry.advance(self.retain_deleted) {
                Some(entry.deployment.clone())
            } else {
                None
            }
        };
        match visible {
            Some(deployment) => Ok(deployment),
            None => {
                log::debug!("Deployment {} is gone", deployment_id);
                self.deployments.remove(deployment_id);
                Err(not_found(deployment_id))
            }
        }
    }

    async fn list_deployments(
        &self,
        request: &ListDeploymentsRequest,
    ) -> Result<DeploymentCollection, ServiceError> {
        self.take_fault(Call::List)?;
        let mut items: Vec<DeploymentSummary> = self
            .deployments
            .iter()
            .map(|entry| DeploymentSummary::from(&entry.deployment))
            .filter(|summary| summary.compartment_id == request.compartment_id)
            .filter(|summary| {
                request
                    .lifecycle_state
                    .as_ref()
                    .is_none_or(|state| &summary.lifecycle_state == state)
            })
            .filter(|summary| {
                request
                    .display_name
                    .as_ref()
                    .is_none_or(|name| summary.display_name.as_ref() == Some(name))
            })
            .collect();
        items.sort_by(|a, b| a.time_created.cmp(&b.time_created).then(a.id.cmp(&b.id)));
        Ok(DeploymentCollection { items })
    }

    async fn create_deployment(
        &self,
        details: &CreateDeploymentDetails,
    ) -> Result<Deployment, ServiceError> {
        self.take_fault(Call::Create)?;
        for (field, value) in [
            ("compartmentId", &details.compartment_id),
            ("subnetId", &details.subnet_id),
        ] {
            if !is_valid_ocid(value) {
                return Err(ServiceError::invalid_parameter(format!(
                    "{} is not a valid OCID: {}",
                    field, value
                )));
            }
        }
        if details.cpu_core_count < 1 {
            return Err(ServiceError::invalid_parameter(
                "cpuCoreCount must be at least 1",
            ));
        }

        let id = format!(
            "ocid1.goldengatedeployment.oc1.{}.{}",
            REGION_KEY,
            uuid::Uuid::new_v4().simple()
        );
        let ogg_data = details.ogg_data.as_ref().map(|ogg| OggDeployment {
            deployment_name: ogg.deployment_name.clone(),
            admin_username: Some(ogg.admin_username.clone()),
            ogg_version: Some("21.3.0.0.0".to_string()),
            certificate: ogg.certificate.clone(),
        });
        let deployment_url = ogg_data.as_ref().map(|ogg| {
            format!(
                "https://{}.deployment.goldengate.{}.oci.customer-oci.com",
                ogg.deployment_name, REGION_KEY
            )
        });
        let deployment = Deployment {
            id: id.clone(),
            display_name: Some(details.display_name.clone()),
            description: details.description.clone(),
            compartment_id: details.compartment_id.clone(),
            deployment_backup_id: details.deployment_backup_id.clone(),
            time_created: Some(Utc::now()),
            time_updated: None,
            lifecycle_state: LifecycleState::Creating,
            lifecycle_details: None,
            freeform_tags: details.freeform_tags.clone(),
            defined_tags: details.defined_tags.clone(),
            is_healthy: Some(true),
            subnet_id: details.subnet_id.clone(),
            fqdn: details.fqdn.clone().filter(|fqdn| !fqdn.is_empty()),
            license_model: details.license_model,
            cpu_core_count: details.cpu_core_count,
            is_auto_scaling_enabled: details.is_auto_scaling_enabled,
            nsg_ids: details.nsg_ids.clone(),
            is_public: Some(details.is_public.unwrap_or(false)),
            public_ip_address: None,
            private_ip_address: Some("10.0.0.2".to_string()),
            deployment_url,
            is_latest_version: Some(true),
            deployment_type: details.deployment_type,
            ogg_data,
        };

        log::debug!("Created deployment {}", id);
        self.deployments.insert(
            id,
            Entry {
                deployment: deployment.clone(),
                pending: self.pending(Target::Active),
            },
        );
        Ok(deployment)
    }

    async fn update_deployment(
        &self,
        deployment_id: &str,
        details: &UpdateDeploymentDetails,
    ) -> Result<(), ServiceError> {
        self.take_fault(Call::Update)?;
        self.modify(deployment_id, |deployment| {
            if let Some(display_name) = &details.display_name {
                deployment.display_name = Some(display_name.clone());
            }
            if let Some(license_model) = details.license_model {
                deployment.license_model = license_model;
            }
            if let Some(description) = &details.description {
                deployment.description = Some(description.clone());
            }
            if let Some(tags) = &details.freeform_tags {
                deployment.freeform_tags = tags.clone();
            }
            if let Some(tags) = &details.defined_tags {
                deployment.defined_tags = tags.clone();
            }
            if let Some(fqdn) = &details.fqdn {
                deployment.fqdn = Some(fqdn.clone()).filter(|fqdn| !fqdn.is_empty());
            }
            if let Some(nsg_ids) = &details.nsg_ids {
                deployment.nsg_ids = nsg_ids.clone();
            }
            if let Some(is_public) = details.is_public {
                deployment.is_public = Some(is_public);
            }
            if let Some(count) = details.cpu_core_count {
                deployment.cpu_core_count = count;
            }
            if let Some(enabled) = details.is_auto_scaling_enabled {
                deployment.is_auto_scaling_enabled = enabled;
            }
            if let (Some(update), Some(ogg)) = (&details.ogg_data, deployment.ogg_data.as_mut()) {
                if let Some(admin_username) = &update.admin_username {
                    ogg.admin_username = Some(admin_username.clone());
                }
                if let Some(certificate) = &update.certificate {
                    ogg.certificate = Some(certificate.clone());
                }
            }
        })
    }

    async fn change_deployment_compartment(
        &self,
        deployment_id: &str,
        compartment_id: &str,
    ) -> Result<(), ServiceError> {
        self.take_fault(Call::ChangeCompartment)?;
        if !is_valid_ocid(compartment_id) {
            return Err(ServiceError::invalid_parameter(format!(
                "compartmentId is not a valid OCID: {}",
                compartment_id
            )));
        }
        self.modify(deployment_id, |deployment| {
            deployment.compartment_id = compartment_id.to_string();
        })
    }

    async fn delete_deployment(&self, deployment_id: &str) -> Result<(), ServiceError> {
        self.take_fault(Call::Delete)?;
        let mut entry = self
            .deployments
            .get_mut(deployment_id)
            .ok_or_else(|| not_found(deployment_id))?;
        match entry.deployment.lifecycle_state {
            LifecycleState::Deleted => return Err(not_found(deployment_id)),
            LifecycleState::Deleting => return Ok(()),
            LifecycleState::Creating | LifecycleState::Updating => {
                return Err(ServiceError::conflict(format!(
                    "Deployment {} is in state {}",
                    deployment_id, entry.deployment.lifecycle_state
                )));
            }
            _ => {}
        }
        entry.deployment.lifecycle_state = LifecycleState::Deleting;
        entry.pending = self.pending(Target::Deleted);
        log::debug!("Deleting deployment {}", deployment_id);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::goldengate::{
        CreateOggDeploymentDetails, DeploymentType, LicenseModel, UpdateOggDeploymentDetails,
    };
    use std::collections::HashMap;

    pub(crate) const COMPARTMENT: &str = "ocid1.compartment.oc1..aaaaaaaacompartment";
    pub(crate) const SUBNET: &str = "ocid1.subnet.oc1.phx.aaaaaaaasubnet";

    pub(crate) fn create_details() -> CreateDeploymentDetails {
        CreateDeploymentDetails {
            display_name: "displayName".to_string(),
            license_model: LicenseModel::LicenseIncluded,
            description: None,
            compartment_id: COMPARTMENT.to_string(),
            deployment_backup_id: None,
            freeform_tags: HashMap::new(),
            defined_tags: HashMap::new(),
            subnet_id: SUBNET.to_string(),
            fqdn: None,
            nsg_ids: vec![],
            is_public: None,
            cpu_core_count: 1,
            is_auto_scaling_enabled: false,
            deployment_type: DeploymentType::Ogg,
            ogg_data: Some(CreateOggDeploymentDetails {
                deployment_name: "depl_test_ggs_deployment_name".to_string(),
                admin_username: "adminUsername".to_string(),
                admin_password: "BEstrO0ng_#11".to_string(),
                certificate: None,
                key: None,
            }),
        }
    }

    #[tokio::test]
    async fn test_create_settles_after_transition_reads() {
        let service = InMemoryGoldenGate::new().with_transition_reads(2);
        let created = service.create_deployment(&create_details()).await.unwrap();
        assert_eq!(created.lifecycle_state, LifecycleState::Creating);
        assert!(crate::utils::is_valid_ocid(&created.id));

        let states: Vec<LifecycleState> = {
            let mut states = Vec::new();
            for _ in 0..3 {
                states.push(service.get_deployment(&created.id).await.unwrap().lifecycle_state);
            }
            states
        };
        assert_eq!(
            states,
            vec![
                LifecycleState::Creating,
                LifecycleState::Creating,
                LifecycleState::Active
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_then_gone() {
        let service = InMemoryGoldenGate::new().with_transition_reads(1);
        let created = service.create_deployment(&create_details()).await.unwrap();
        service.get_deployment(&created.id).await.unwrap();
        service.get_deployment(&created.id).await.unwrap();

        service.delete_deployment(&created.id).await.unwrap();
        let deleting = service.get_deployment(&created.id).await.unwrap();
        assert_eq!(deleting.lifecycle_state, LifecycleState::Deleting);

        let err = service.get_deployment(&created.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(service.is_empty());
    }

    #[tokio::test]
    async fn test_retained_deleted_stays_readable() {
        let service = InMemoryGoldenGate::new()
            .with_transition_reads(0)
            .with_retained_deleted(true);
        let created = service.create_deployment(&create_details()).await.unwrap();
        service.get_deployment(&created.id).await.unwrap();
        service.delete_deployment(&created.id).await.unwrap();

        for _ in 0..2 {
            let deployment = service.get_deployment(&created.id).await.unwrap();
            assert_eq!(deployment.lifecycle_state, LifecycleState::Deleted);
        }
        assert!(service.delete_deployment(&created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_requires_active() {
        let service = InMemoryGoldenGate::new().with_transition_reads(0);
        let created = service.create_deployment(&create_details()).await.unwrap();
        let details = UpdateDeploymentDetails {
            display_name: Some("displayName2".to_string()),
            ogg_data: Some(UpdateOggDeploymentDetails {
                admin_username: Some("adminUsername2".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let err = service.update_deployment(&created.id, &details).await.unwrap_err();
        assert_eq!(err.status, 409);

        service.get_deployment(&created.id).await.unwrap();
        service.update_deployment(&created.id, &details).await.unwrap();
        let updated = service.get_deployment(&created.id).await.unwrap();
        assert_eq!(updated.lifecycle_state, LifecycleState::Active);
        assert_eq!(updated.display_name.as_deref(), Some("displayName2"));
        assert_eq!(
            updated.ogg_data.unwrap().admin_username.as_deref(),
            Some("adminUsername2")
        );
    }

    #[tokio::test]
    async fn test_injected_faults_fire_per_call() {
        let service = InMemoryGoldenGate::new();
        service.inject_fault(Call::Get, ServiceError::too_many_requests());
        service.inject_fault(Call::List, ServiceError::internal("boom"));
        service.inject_fault(Call::Get, ServiceError::internal("again"));

        let list = ListDeploymentsRequest::new(COMPARTMENT);
        assert_eq!(service.list_deployments(&list).await.unwrap_err().status, 500);
        assert!(service.list_deployments(&list).await.unwrap().items.is_empty());
        assert_eq!(service.get_deployment("x").await.unwrap_err().status, 429);
        assert_eq!(service.get_deployment("x").await.unwrap_err().status, 500);
        assert_eq!(service.get_deployment("x").await.unwrap_err().status, 404);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let service = InMemoryGoldenGate::new().with_transition_reads(0);
        let first = service.create_deployment(&create_details()).await.unwrap();
        service.get_deployment(&first.id).await.unwrap();
        service.create_deployment(&create_details()).await.unwrap();

        let active = service
            .list_deployments(
                &ListDeploymentsRequest::new(COMPARTMENT)
                    .with_lifecycle_state(LifecycleState::Active),
            )
            .await
            .unwrap();
        assert_eq!(active.items.len(), 1);
        assert_eq!(active.items[0].id, first.id);

        let other = service
            .list_deployments(&ListDeploymentsRequest::new("ocid1.compartment.oc1..other"))
            .await
            .unwrap();
        assert!(other.items.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_subnet() {
        let service = InMemoryGoldenGate::new();
        let mut details = create_details();
        details.subnet_id = "subnet".to_string();
        let err = service.create_deployment(&details).await.unwrap_err();
        assert_eq!(err.status, 400);
        assert!(err.message.contains("subnetId"));
    }
}
