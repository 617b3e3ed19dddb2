//! Data Integration service models

use cirrus_core::declare_union;
use cirrus_core::polymorphic::Variant;
use serde::{Deserialize, Serialize};

const MODEL_TYPE: &str = "modelType";

/// Reference to the parent object of a published object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentReference {
    pub parent: Option<String>,
}

/// Fields shared by every published object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedObjectBase {
    pub key: Option<String>,
    pub model_version: Option<String>,
    pub parent_ref: Option<ParentReference>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub object_version: Option<i32>,
    pub object_status: Option<i32>,
    pub identifier: Option<String>,
    /// Port, parameter and config shapes are passed through untouched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_ports: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_ports: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_config_values: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_provider_delegate: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedObjectFromDataLoaderTask {
    #[serde(flatten)]
    pub base: PublishedObjectBase,
    pub data_flow: Option<serde_json::Value>,
}

impl Variant for PublishedObjectFromDataLoaderTask {
    const DISCRIMINATOR: &'static str = MODEL_TYPE;
    const TAG: &'static str = "DATA_LOADER_TASK";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedObjectFromIntegrationTask {
    #[serde(flatten)]
    pub base: PublishedObjectBase,
    pub data_flow: Option<serde_json::Value>,
}

impl Variant for PublishedObjectFromIntegrationTask {
    const DISCRIMINATOR: &'static str = MODEL_TYPE;
    const TAG: &'static str = "INTEGRATION_TASK";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedObjectFromPipelineTask {
    #[serde(flatten)]
    pub base: PublishedObjectBase,
    pub pipeline: Option<serde_json::Value>,
}

impl Variant for PublishedObjectFromPipelineTask {
    const DISCRIMINATOR: &'static str = MODEL_TYPE;
    const TAG: &'static str = "PIPELINE_TASK";
}

declare_union! {
    /// Task published to an application
    #[derive(Debug, Clone, PartialEq)]
    pub enum PublishedObject: "modelType" {
        DataLoaderTask(PublishedObjectFromDataLoaderTask),
        IntegrationTask(PublishedObjectFromIntegrationTask),
        PipelineTask(PublishedObjectFromPipelineTask),
    }
}

impl PublishedObject {
    pub fn base(&self) -> &PublishedObjectBase {
        match self {
            PublishedObject::DataLoaderTask(task) => &task.base,
            PublishedObject::IntegrationTask(task) => &task.base,
            PublishedObject::PipelineTask(task) => &task.base,
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.base().key.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.base().name.as_deref()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.base().identifier.as_deref()
    }

    pub fn object_version(&self) -> Option<i32> {
        self.base().object_version
    }
}
