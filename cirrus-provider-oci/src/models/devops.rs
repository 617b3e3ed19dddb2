//! DevOps service models

use cirrus_core::declare_union;
use cirrus_core::polymorphic::{DecodeError, EncodeError, UnionRegistry, Variant, encode_items};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const ARTIFACT_TYPE: &str = "artifactType";

/// Generic artifact delivered by a build pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericDeliveredArtifact {
    pub deploy_artifact_id: Option<String>,
    pub output_artifact_name: Option<String>,
    pub artifact_repository_id: Option<String>,
    pub delivered_artifact_id: Option<String>,
    pub version: Option<String>,
    pub path: Option<String>,
}

impl Variant for GenericDeliveredArtifact {
    const DISCRIMINATOR: &'static str = ARTIFACT_TYPE;
    const TAG: &'static str = "GENERIC_ARTIFACT";
}

/// Container image pushed to the registry by a build pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerImageDeliveredArtifact {
    pub deploy_artifact_id: Option<String>,
    pub output_artifact_name: Option<String>,
    pub delivered_artifact_hash: Option<String>,
    pub image_uri: Option<String>,
}

impl Variant for ContainerImageDeliveredArtifact {
    const DISCRIMINATOR: &'static str = ARTIFACT_TYPE;
    const TAG: &'static str = "OCIR";
}

declare_union! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum DeliveredArtifact: "artifactType" {
        Generic(GenericDeliveredArtifact),
        ContainerImage(ContainerImageDeliveredArtifact),
    }
}

impl DeliveredArtifact {
    pub fn deploy_artifact_id(&self) -> Option<&str> {
        match self {
            DeliveredArtifact::Generic(a) => a.deploy_artifact_id.as_deref(),
            DeliveredArtifact::ContainerImage(a) => a.deploy_artifact_id.as_deref(),
        }
    }

    pub fn output_artifact_name(&self) -> Option<&str> {
        match self {
            DeliveredArtifact::Generic(a) => a.output_artifact_name.as_deref(),
            DeliveredArtifact::ContainerImage(a) => a.output_artifact_name.as_deref(),
        }
    }
}

/// Artifacts delivered by one build run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveredArtifactCollection {
    pub items: Vec<DeliveredArtifact>,
}

impl DeliveredArtifactCollection {
    /// Decode every item; a single bad item fails the whole collection
    pub fn decode(
        payload: &[u8],
        registry: &UnionRegistry<DeliveredArtifact>,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            items: registry.decode_collection(payload, "items")?,
        })
    }

    pub fn to_wire(&self) -> Result<Value, EncodeError> {
        Ok(json!({ "items": encode_items(&self.items)? }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> UnionRegistry<DeliveredArtifact> {
        DeliveredArtifact::registry().unwrap()
    }

    #[test]
    fn test_decode_mixed_collection() {
        let payload = br#"{
            "items": [
                {"artifactType": "GENERIC_ARTIFACT", "deployArtifactId": "a1",
                 "outputArtifactName": "app", "version": "1.0", "path": "/app.zip"},
                {"artifactType": "OCIR", "deployArtifactId": "a2",
                 "imageUri": "phx.ocir.io/ns/app:1.0", "deliveredArtifactHash": "sha256:ab"}
            ]
        }"#;

        let collection = DeliveredArtifactCollection::decode(payload, &registry()).unwrap();
        assert_eq!(collection.items.len(), 2);
        assert_eq!(collection.items[0].deploy_artifact_id(), Some("a1"));
        assert_eq!(collection.items[0].output_artifact_name(), Some("app"));
        match &collection.items[1] {
            DeliveredArtifact::ContainerImage(image) => {
                assert_eq!(image.image_uri.as_deref(), Some("phx.ocir.io/ns/app:1.0"));
            }
            other => panic!("Expected container image, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_collection_injects_tags() {
        let collection = DeliveredArtifactCollection {
            items: vec![
                ContainerImageDeliveredArtifact {
                    deploy_artifact_id: Some("a2".to_string()),
                    output_artifact_name: None,
                    delivered_artifact_hash: None,
                    image_uri: Some("phx.ocir.io/ns/app:1.0".to_string()),
                }
                .into(),
            ],
        };

        let wire = collection.to_wire().unwrap();
        assert_eq!(wire["items"][0]["artifactType"], "OCIR");
        assert_eq!(wire["items"][0]["imageUri"], "phx.ocir.io/ns/app:1.0");
    }

    #[test]
    fn test_unknown_item_fails_collection() {
        let payload = br#"{"items": [
            {"artifactType": "OCIR", "imageUri": "x"},
            {"artifactType": "HELM_CHART", "chartUrl": "y"}
        ]}"#;

        let err = DeliveredArtifactCollection::decode(payload, &registry()).unwrap_err();
        assert_eq!(err.unknown_tag(), Some("HELM_CHART"));
        match err {
            DecodeError::Item { index, .. } => assert_eq!(index, 1),
            other => panic!("Expected Item error, got {:?}", other),
        }
    }
}
