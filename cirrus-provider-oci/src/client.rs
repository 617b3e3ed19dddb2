//! Golden Gate service client seam
//!
//! The provider talks to the service only through [`GoldenGateClient`].
//! Transport, signing and pagination live behind the trait.

use async_trait::async_trait;
use cirrus_core::{FetchError, FetchErrorKind, LifecycleState};
use thiserror::Error;

use crate::models::goldengate::{
    CreateDeploymentDetails, Deployment, DeploymentCollection, UpdateDeploymentDetails,
};

/// Error response returned by an OCI service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Service error (status {status}, code {code}): {message}")]
pub struct ServiceError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "NotAuthorizedOrNotFound", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, "IncorrectState", message)
    }

    pub fn too_many_requests() -> Self {
        Self::new(429, "TooManyRequests", "Too many requests for the tenancy")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, "InternalServerError", message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(400, "InvalidParameter", message)
    }

    /// How a poller should treat this error
    pub fn classify(&self) -> FetchErrorKind {
        match self.status {
            404 => FetchErrorKind::NotFound,
            409 | 429 | 500..=599 => FetchErrorKind::Transient,
            _ => FetchErrorKind::Fatal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl From<ServiceError> for FetchError {
    fn from(err: ServiceError) -> Self {
        FetchError::new(err.classify(), err.to_string()).with_status(err.status)
    }
}

/// Filters for ListDeployments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListDeploymentsRequest {
    pub compartment_id: String,
    pub lifecycle_state: Option<LifecycleState>,
    pub display_name: Option<String>,
}

impl ListDeploymentsRequest {
    pub fn new(compartment_id: impl Into<String>) -> Self {
        Self {
            compartment_id: compartment_id.into(),
            ..Default::default()
        }
    }

    pub fn with_lifecycle_state(mut self, state: LifecycleState) -> Self {
        self.lifecycle_state = Some(state);
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Operations of the Golden Gate service used by the provider
#[async_trait]
pub trait GoldenGateClient: Send + Sync {
    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, ServiceError>;

    /// All pages of ListDeployments matching `request`
    async fn list_deployments(
        &self,
        request: &ListDeploymentsRequest,
    ) -> Result<DeploymentCollection, ServiceError>;

    /// Accepts the request; the deployment starts out CREATING
    async fn create_deployment(
        &self,
        details: &CreateDeploymentDetails,
    ) -> Result<Deployment, ServiceError>;

    async fn update_deployment(
        &self,
        deployment_id: &str,
        details: &UpdateDeploymentDetails,
    ) -> Result<(), ServiceError>;

    async fn change_deployment_compartment(
        &self,
        deployment_id: &str,
        compartment_id: &str,
    ) -> Result<(), ServiceError>;

    async fn delete_deployment(&self, deployment_id: &str) -> Result<(), ServiceError>;
}
