//! Data Science service models

use cirrus_core::declare_union;
use cirrus_core::polymorphic::Variant;
use serde::{Deserialize, Serialize};

service_enum! {
    pub enum ModelDeploymentType {
        SingleModel => "SINGLE_MODEL",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfiguration {
    pub instance_shape_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedSizeScalingPolicy {
    pub instance_count: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfigurationDetails {
    pub model_id: String,
    pub instance_configuration: InstanceConfiguration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling_policy: Option<FixedSizeScalingPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_mbps: Option<i32>,
}

/// Deployment serving a single model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleModelDeploymentConfigurationDetails {
    pub model_configuration_details: ModelConfigurationDetails,
}

impl Variant for SingleModelDeploymentConfigurationDetails {
    const DISCRIMINATOR: &'static str = "deploymentType";
    const TAG: &'static str = "SINGLE_MODEL";
}

declare_union! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum ModelDeploymentConfigurationDetails: "deploymentType" {
        SingleModel(SingleModelDeploymentConfigurationDetails),
    }
}

impl ModelDeploymentConfigurationDetails {
    pub fn deployment_type(&self) -> ModelDeploymentType {
        match self {
            Self::SingleModel(_) => ModelDeploymentType::SingleModel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_core::polymorphic::{DecodeError, Union};

    #[test]
    fn test_variant_tags_match_deployment_types() {
        let registry = ModelDeploymentConfigurationDetails::registry().unwrap();
        let tags: Vec<&str> = ModelDeploymentType::values()
            .iter()
            .map(ModelDeploymentType::as_str)
            .collect();
        assert_eq!(registry.tags(), tags);
    }

    #[test]
    fn test_decode_single_model() {
        let registry = ModelDeploymentConfigurationDetails::registry().unwrap();
        let details = registry
            .decode(
                br#"{
                "deploymentType": "SINGLE_MODEL",
                "modelConfigurationDetails": {
                    "modelId": "ocid1.datasciencemodel.oc1..aaaa",
                    "instanceConfiguration": {"instanceShapeName": "VM.Standard2.1"},
                    "scalingPolicy": {"instanceCount": 2}
                }
            }"#,
            )
            .unwrap();

        assert_eq!(details.deployment_type(), ModelDeploymentType::SingleModel);
        assert_eq!(details.tag(), "SINGLE_MODEL");
        let ModelDeploymentConfigurationDetails::SingleModel(single) = details;
        assert_eq!(
            single.model_configuration_details.scaling_policy,
            Some(FixedSizeScalingPolicy { instance_count: 2 })
        );
    }

    #[test]
    fn test_unsupported_deployment_type() {
        let registry = ModelDeploymentConfigurationDetails::registry().unwrap();
        let err = registry
            .decode(br#"{"deploymentType": "MULTI_MODEL"}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnknownVariant { .. }));
    }
}
