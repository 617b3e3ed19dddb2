//! Sweepers - Bulk cleanup of leftover resources in a compartment
//!
//! A sweeper lists the ACTIVE resources of one kind, deletes each of them and
//! waits a bounded time for the deletion to finish. Failures on one resource
//! are logged and never stop the sweep.

use std::sync::Arc;

use cirrus_core::waiter::lifecycle_is;
use cirrus_core::{FetchError, LifecycleState, wait_for};
use dashmap::DashMap;
use thiserror::Error;

use crate::client::{GoldenGateClient, ListDeploymentsRequest, ServiceError};
use crate::config::{GOLDEN_GATE_SERVICE, Operation, ProviderConfig};

/// Name used to exclude the deployment sweeper
pub const DEPLOYMENT_SWEEPER: &str = "GoldenGateDeployment";

const DEPLOYMENT_ID_KIND: &str = "DeploymentId";

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Error getting Deployment list for compartment id: {compartment_id}: {source}")]
    List {
        compartment_id: String,
        #[source]
        source: ServiceError,
    },
}

/// Identifiers found by sweepers, per compartment and resource kind
#[derive(Debug, Default)]
pub struct SweeperResourceIds {
    ids: DashMap<(String, &'static str), Vec<String>>,
}

impl SweeperResourceIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, compartment_id: &str, kind: &'static str) -> Option<Vec<String>> {
        self.ids
            .get(&(compartment_id.to_string(), kind))
            .map(|ids| ids.clone())
    }

    pub fn add(&self, compartment_id: &str, kind: &'static str, id: impl Into<String>) {
        self.ids
            .entry((compartment_id.to_string(), kind))
            .or_default()
            .push(id.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    pub identifier: String,
    pub reason: String,
}

/// What one sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: Vec<String>,
    /// Default resources that are never swept
    pub skipped: Vec<String>,
    pub failed: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sweeper for Golden Gate deployments
pub struct DeploymentSweeper {
    client: Arc<dyn GoldenGateClient>,
    config: ProviderConfig,
    resource_ids: Arc<SweeperResourceIds>,
}

impl DeploymentSweeper {
    pub fn new(
        client: Arc<dyn GoldenGateClient>,
        config: ProviderConfig,
        resource_ids: Arc<SweeperResourceIds>,
    ) -> Self {
        Self {
            client,
            config,
            resource_ids,
        }
    }

    /// ACTIVE deployments of a compartment; cached after the first listing
    pub async fn deployment_ids(&self, compartment_id: &str) -> Result<Vec<String>, SweepError> {
        if let Some(ids) = self.resource_ids.get(compartment_id, DEPLOYMENT_ID_KIND) {
            return Ok(ids);
        }

        let request =
            ListDeploymentsRequest::new(compartment_id).with_lifecycle_state(LifecycleState::Active);
        let collection = self
            .client
            .list_deployments(&request)
            .await
            .map_err(|source| SweepError::List {
                compartment_id: compartment_id.to_string(),
                source,
            })?;

        let ids: Vec<String> = collection.items.into_iter().map(|d| d.id).collect();
        for id in &ids {
            self.resource_ids
                .add(compartment_id, DEPLOYMENT_ID_KIND, id.clone());
        }
        Ok(ids)
    }

    /// Delete every ACTIVE deployment of a compartment
    pub async fn sweep(&self, compartment_id: &str) -> Result<SweepReport, SweepError> {
        let mut report = SweepReport::default();
        if self.config.is_sweeper_excluded(DEPLOYMENT_SWEEPER) {
            log::info!("Sweeper {} is excluded, skipping", DEPLOYMENT_SWEEPER);
            return Ok(report);
        }

        let wait = self
            .config
            .wait_config(GOLDEN_GATE_SERVICE, Operation::Sweep);
        let client = self.client.as_ref();

        for deployment_id in self.deployment_ids(compartment_id).await? {
            if self.config.is_default_resource(&deployment_id) {
                log::debug!("Skipping default deployment {}", deployment_id);
                report.skipped.push(deployment_id);
                continue;
            }

            if let Err(e) = client.delete_deployment(&deployment_id).await {
                log::warn!(
                    "Error deleting Deployment {} {}, It is possible that the resource is already deleted. Please verify manually",
                    deployment_id,
                    e
                );
                report.failed.push(SweepFailure {
                    identifier: deployment_id,
                    reason: e.to_string(),
                });
                continue;
            }

            let id = deployment_id.as_str();
            let waited = wait_for(
                move || async move { client.get_deployment(id).await.map_err(FetchError::from) },
                lifecycle_is(LifecycleState::Deleted),
                &wait,
            )
            .await;
            match waited {
                Ok(_) => {
                    log::info!("Swept deployment {}", deployment_id);
                    report.deleted.push(deployment_id);
                }
                Err(e) => {
                    log::warn!(
                        "Deployment {} was not deleted in time: {}",
                        deployment_id,
                        e
                    );
                    report.failed.push(SweepFailure {
                        identifier: deployment_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
