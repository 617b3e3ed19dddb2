//! Operations Insights service models

use cirrus_core::declare_union;
use cirrus_core::polymorphic::Variant;
use serde::{Deserialize, Serialize};

const EXADATA_RESOURCE_TYPE: &str = "exadataResourceType";

/// Usage figures of one Exadata resource over the requested interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExadataInsightResourceStatistics {
    pub usage: f64,
    pub capacity: f64,
    pub utilization_percent: f64,
    pub usage_change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseDetails {
    pub id: String,
    pub database_id: String,
    pub compartment_id: String,
    pub database_name: String,
    pub database_display_name: Option<String>,
    pub database_type: String,
    pub database_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDetails {
    pub id: String,
    pub compartment_id: String,
    pub host_name: String,
    pub host_display_name: Option<String>,
    pub platform_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExadataDatabaseStatisticsSummary {
    pub resource_details: DatabaseDetails,
    pub current_statistics: ExadataInsightResourceStatistics,
}

impl Variant for ExadataDatabaseStatisticsSummary {
    const DISCRIMINATOR: &'static str = EXADATA_RESOURCE_TYPE;
    const TAG: &'static str = "DATABASE";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExadataHostStatisticsSummary {
    pub resource_details: HostDetails,
    pub current_statistics: ExadataInsightResourceStatistics,
}

impl Variant for ExadataHostStatisticsSummary {
    const DISCRIMINATOR: &'static str = EXADATA_RESOURCE_TYPE;
    const TAG: &'static str = "HOST";
}

declare_union! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum ExadataInsightResourceStatisticsAggregation: "exadataResourceType" {
        Database(ExadataDatabaseStatisticsSummary),
        Host(ExadataHostStatisticsSummary),
    }
}

impl ExadataInsightResourceStatisticsAggregation {
    pub fn current_statistics(&self) -> &ExadataInsightResourceStatistics {
        match self {
            Self::Database(summary) => &summary.current_statistics,
            Self::Host(summary) => &summary.current_statistics,
        }
    }
}
