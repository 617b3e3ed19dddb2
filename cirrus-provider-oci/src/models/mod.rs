//! Service models
//!
//! Request and response shapes of the OCI services used by this provider.
//! Unions are decoded through the registries held by [`Registries`], which is
//! built once and handed to whatever decodes service payloads.

use cirrus_core::polymorphic::{DynRegistry, RegistryError, UnionRegistry};
use thiserror::Error;

/// Error returned when parsing a service enum from an unknown string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {enum_name} value: {value}")]
pub struct UnknownEnumValue {
    pub enum_name: &'static str,
    pub value: String,
}

/// Declare a string enum as the services send it, with `values()` listing
/// every accepted wire string in declaration order
macro_rules! service_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( #[serde(rename = $wire)] $variant, )+
        }

        impl $name {
            pub fn values() -> &'static [$name] {
                &[$( $name::$variant ),+]
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire, )+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::values()
                    .iter()
                    .copied()
                    .find(|value| value.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| $crate::models::UnknownEnumValue {
                        enum_name: stringify!($name),
                        value: s.to_string(),
                    })
            }
        }
    };
}

pub mod dataintegration;
pub mod datascience;
pub mod devops;
pub mod goldengate;
pub mod opsi;

use dataintegration::PublishedObject;
use datascience::ModelDeploymentConfigurationDetails;
use devops::DeliveredArtifact;
use opsi::ExadataInsightResourceStatisticsAggregation;

/// Every union registry known to the provider
#[derive(Debug)]
pub struct Registries {
    pub delivered_artifact: UnionRegistry<DeliveredArtifact>,
    pub published_object: UnionRegistry<PublishedObject>,
    pub exadata_statistics: UnionRegistry<ExadataInsightResourceStatisticsAggregation>,
    pub model_deployment_configuration: UnionRegistry<ModelDeploymentConfigurationDetails>,
}

impl Registries {
    pub fn new() -> Result<Self, RegistryError> {
        Ok(Self {
            delivered_artifact: DeliveredArtifact::registry()?,
            published_object: PublishedObject::registry()?,
            exadata_statistics: ExadataInsightResourceStatisticsAggregation::registry()?,
            model_deployment_configuration: ModelDeploymentConfigurationDetails::registry()?,
        })
    }

    /// Type-erased registries, sorted by union name
    pub fn all(&self) -> Vec<&dyn DynRegistry> {
        let mut all: Vec<&dyn DynRegistry> = vec![
            &self.delivered_artifact,
            &self.published_object,
            &self.exadata_statistics,
            &self.model_deployment_configuration,
        ];
        all.sort_by_key(|registry| registry.union_name());
        all
    }

    /// Look up a registry by its union name
    pub fn find(&self, union_name: &str) -> Option<&dyn DynRegistry> {
        self.all()
            .into_iter()
            .find(|registry| registry.union_name() == union_name)
    }
}
