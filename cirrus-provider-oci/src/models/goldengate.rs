//! Golden Gate service models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cirrus_core::{LifecycleState, Snapshot};
use serde::{Deserialize, Serialize};

service_enum! {
    /// Kind of replication engine a deployment runs
    pub enum DeploymentType {
        Ogg => "OGG",
    }
}

service_enum! {
    pub enum LicenseModel {
        LicenseIncluded => "LICENSE_INCLUDED",
        BringYourOwnLicense => "BRING_YOUR_OWN_LICENSE",
    }
}

pub type DefinedTags = HashMap<String, HashMap<String, serde_json::Value>>;

/// Golden Gate deployment as returned by GetDeployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub compartment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_backup_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_updated: Option<DateTime<Utc>>,
    pub lifecycle_state: LifecycleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_details: Option<String>,
    #[serde(default)]
    pub freeform_tags: HashMap<String, String>,
    #[serde(default)]
    pub defined_tags: DefinedTags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_healthy: Option<bool>,
    pub subnet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    pub license_model: LicenseModel,
    pub cpu_core_count: i32,
    pub is_auto_scaling_enabled: bool,
    #[serde(default)]
    pub nsg_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_latest_version: Option<bool>,
    pub deployment_type: DeploymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ogg_data: Option<OggDeployment>,
}

impl Snapshot for Deployment {
    fn lifecycle_state(&self) -> Option<&LifecycleState> {
        Some(&self.lifecycle_state)
    }
}

/// GoldenGate engine settings of a deployment. Secrets are never returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OggDeployment {
    pub deployment_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ogg_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
}

/// Entry of a ListDeployments page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    pub id: String,
    pub display_name: Option<String>,
    pub compartment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<DateTime<Utc>>,
    pub lifecycle_state: LifecycleState,
    pub subnet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    pub license_model: LicenseModel,
    pub cpu_core_count: i32,
    pub is_auto_scaling_enabled: bool,
    pub deployment_type: DeploymentType,
}

impl From<&Deployment> for DeploymentSummary {
    fn from(deployment: &Deployment) -> Self {
        Self {
            id: deployment.id.clone(),
            display_name: deployment.display_name.clone(),
            compartment_id: deployment.compartment_id.clone(),
            time_created: deployment.time_created,
            lifecycle_state: deployment.lifecycle_state.clone(),
            subnet_id: deployment.subnet_id.clone(),
            fqdn: deployment.fqdn.clone(),
            license_model: deployment.license_model,
            cpu_core_count: deployment.cpu_core_count,
            is_auto_scaling_enabled: deployment.is_auto_scaling_enabled,
            deployment_type: deployment.deployment_type,
        }
    }
}

impl Snapshot for DeploymentSummary {
    fn lifecycle_state(&self) -> Option<&LifecycleState> {
        Some(&self.lifecycle_state)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentCollection {
    pub items: Vec<DeploymentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentDetails {
    pub display_name: String,
    pub license_model: LicenseModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub compartment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_backup_id: Option<String>,
    #[serde(default)]
    pub freeform_tags: HashMap<String, String>,
    #[serde(default)]
    pub defined_tags: DefinedTags,
    pub subnet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default)]
    pub nsg_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    pub cpu_core_count: i32,
    pub is_auto_scaling_enabled: bool,
    pub deployment_type: DeploymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ogg_data: Option<CreateOggDeploymentDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOggDeploymentDetails {
    pub deployment_name: String,
    pub admin_username: String,
    pub admin_password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeploymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_model: Option<LicenseModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<DefinedTags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsg_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_core_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_scaling_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ogg_data: Option<UpdateOggDeploymentDetails>,
}

impl UpdateDeploymentDetails {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOggDeploymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deployment_decodes_service_payload() {
        let deployment: Deployment = serde_json::from_value(json!({
            "id": "ocid1.goldengatedeployment.oc1.phx.aaaa",
            "displayName": "displayName",
            "compartmentId": "ocid1.compartment.oc1..aaaa",
            "timeCreated": "2021-09-01T10:00:00Z",
            "lifecycleState": "CREATING",
            "subnetId": "ocid1.subnet.oc1.phx.aaaa",
            "licenseModel": "LICENSE_INCLUDED",
            "cpuCoreCount": 1,
            "isAutoScalingEnabled": false,
            "deploymentType": "OGG",
            "oggData": {
                "deploymentName": "depl_test_ggs_deployment_name",
                "adminUsername": "adminUsername"
            },
            "lifecycleSubState": "RECOVERING"
        }))
        .unwrap();

        assert_eq!(deployment.lifecycle_state(), Some(&LifecycleState::Creating));
        assert_eq!(deployment.license_model, LicenseModel::LicenseIncluded);
        assert!(deployment.freeform_tags.is_empty());
        assert_eq!(
            deployment.ogg_data.unwrap().admin_username.as_deref(),
            Some("adminUsername")
        );
    }

    #[test]
    fn test_unknown_lifecycle_state_is_kept() {
        let summary: DeploymentSummary = serde_json::from_value(json!({
            "id": "ocid1.goldengatedeployment.oc1.phx.aaaa",
            "displayName": null,
            "compartmentId": "ocid1.compartment.oc1..aaaa",
            "lifecycleState": "UPGRADING",
            "subnetId": "ocid1.subnet.oc1.phx.aaaa",
            "licenseModel": "BRING_YOUR_OWN_LICENSE",
            "cpuCoreCount": 2,
            "isAutoScalingEnabled": true,
            "deploymentType": "OGG"
        }))
        .unwrap();
        assert_eq!(
            summary.lifecycle_state,
            LifecycleState::Unknown("UPGRADING".to_string())
        );
    }

    #[test]
    fn test_update_details_skip_absent_fields() {
        let details = UpdateDeploymentDetails {
            display_name: Some("displayName2".to_string()),
            ..Default::default()
        };
        assert!(!details.is_empty());
        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({"displayName": "displayName2"})
        );
        assert!(UpdateDeploymentDetails::default().is_empty());
    }

    #[test]
    fn test_enum_values() {
        assert_eq!(DeploymentType::values(), &[DeploymentType::Ogg]);
        assert_eq!(
            LicenseModel::values()
                .iter()
                .map(LicenseModel::as_str)
                .collect::<Vec<_>>(),
            vec!["LICENSE_INCLUDED", "BRING_YOUR_OWN_LICENSE"]
        );
    }
}
