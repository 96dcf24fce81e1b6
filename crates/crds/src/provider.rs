//! vSphere provider payloads
//!
//! Cluster API stores provider configuration and status as opaque blobs.
//! These types give the vSphere controller a typed view of the parts it uses.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors decoding a provider payload
#[derive(Debug, Error)]
pub enum ProviderPayloadError {
    /// The embedded JSON does not match the expected shape
    #[error("invalid provider payload: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Opaque provider configuration wrapper (`providerSpec`)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    /// Inline provider configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub value: Option<serde_json::Value>,
}

/// Schema for free-form JSON fields, kept verbatim by the API server.
pub fn preserve_unknown_fields(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}

/// vSphere settings carried in a Cluster's `providerSpec.value`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VsphereClusterProviderConfig {
    /// vCenter endpoint serving this cluster's machines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsphere_server: Option<String>,
}

impl VsphereClusterProviderConfig {
    /// Decode from a `providerSpec`. An empty spec yields `None`.
    pub fn from_provider_spec(spec: &ProviderSpec) -> Result<Option<Self>, ProviderPayloadError> {
        match &spec.value {
            None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }
}

/// vSphere status recorded in a Cluster's `status.providerStatus`
///
/// Only tracks when the controller last changed the cluster's infrastructure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VsphereClusterProviderStatus {
    /// UTC timestamp of the last infrastructure change, human-readable
    #[serde(rename = "LastUpdated")]
    pub last_updated: String,
}

impl VsphereClusterProviderStatus {
    /// Status stamped with the given instant.
    pub fn at(now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            last_updated: now.to_string(),
        }
    }

    /// Parse the stored timestamp back into a `DateTime`.
    pub fn last_updated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::NaiveDateTime::parse_from_str(&self.last_updated, "%Y-%m-%d %H:%M:%S%.f UTC")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
