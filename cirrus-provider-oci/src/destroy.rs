//! Destroy checks - Verify that destroyed resources are really gone

use cirrus_core::resource::{ResourceId, State};
use cirrus_core::{FetchError, LifecycleState, NotFoundPolicy, WaitConfig, WaitError, WaitOutcome, wait_for};
use thiserror::Error;

use crate::client::GoldenGateClient;
use crate::config::{GOLDEN_GATE_SERVICE, ProviderConfig};
use crate::models::goldengate::Deployment;

pub const GOLDEN_GATE_DEPLOYMENT: &str = "golden_gate_deployment";

#[derive(Debug, Error)]
pub enum DestroyCheckError {
    #[error("at least one resource was expected from the state file, but could not be found")]
    NoResources,

    #[error("resource {0} has no identifier")]
    MissingIdentifier(ResourceId),

    #[error("resource lifecycle state: {state} is not in expected deleted lifecycle states")]
    NotDeleted {
        identifier: String,
        state: LifecycleState,
    },

    #[error("Failed to read {identifier}: {source}")]
    Fetch {
        identifier: String,
        #[source]
        source: WaitError<Deployment>,
    },
}

/// Lifecycle states a destroyed deployment may still be reported in
pub fn deleted_lifecycle_states() -> Vec<LifecycleState> {
    vec![LifecycleState::Deleted]
}

/// Check every Golden Gate deployment in `states` is DELETED or unknown to the service
///
/// Reads retry transient failures but never retry a 404, which counts as deleted.
pub async fn check_deployments_destroyed(
    client: &dyn GoldenGateClient,
    config: &ProviderConfig,
    states: &[State],
) -> Result<(), DestroyCheckError> {
    let wait = WaitConfig::new(config.delete_timeout)
        .with_poll_interval(config.poll_interval)
        .with_retry(config.retry_policy(GOLDEN_GATE_SERVICE))
        .with_not_found(NotFoundPolicy::TreatAsDeleted);
    let deleted_states = deleted_lifecycle_states();

    let mut found = false;
    for state in states
        .iter()
        .filter(|s| s.id.resource_type == GOLDEN_GATE_DEPLOYMENT)
    {
        found = true;
        let identifier = state
            .identifier
            .as_deref()
            .ok_or_else(|| DestroyCheckError::MissingIdentifier(state.id.clone()))?;

        let outcome = wait_for(
            move || async move {
                client
                    .get_deployment(identifier)
                    .await
                    .map_err(FetchError::from)
            },
            |_: &Deployment| true,
            &wait,
        )
        .await
        .map_err(|source| DestroyCheckError::Fetch {
            identifier: identifier.to_string(),
            source,
        })?;

        match outcome {
            WaitOutcome::Deleted => {}
            WaitOutcome::Reached(deployment) => {
                if !deleted_states.contains(&deployment.lifecycle_state) {
                    return Err(DestroyCheckError::NotDeleted {
                        identifier: identifier.to_string(),
                        state: deployment.lifecycle_state,
                    });
                }
            }
        }
    }

    if !found {
        return Err(DestroyCheckError::NoResources);
    }
    Ok(())
}
