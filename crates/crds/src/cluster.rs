//! Cluster CRD
//!
//! The aggregate owning a set of Machines. The vSphere controller reads the
//! provider configuration and stamps `status.providerStatus` whenever it
//! records a change in the cluster's infrastructure.

use crate::provider::{
    ProviderPayloadError, ProviderSpec, VsphereClusterProviderConfig,
    VsphereClusterProviderStatus, preserve_unknown_fields,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "cluster.k8s.io",
    version = "v1alpha1",
    kind = "Cluster",
    namespaced,
    status = "ClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Cluster-wide network configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_network: Option<ClusterNetworkingConfig>,

    /// Provider-specific cluster configuration (opaque to Cluster API)
    #[serde(default)]
    pub provider_spec: ProviderSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkingConfig {
    /// Service CIDR blocks
    #[serde(default)]
    pub services: NetworkRanges,

    /// Pod CIDR blocks
    #[serde(default)]
    pub pods: NetworkRanges,

    /// DNS domain used by services
    #[serde(default)]
    pub service_domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRanges {
    /// CIDR blocks
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Endpoints of the cluster's API server
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_endpoints: Vec<ApiEndpoint>,

    /// Provider-specific status (opaque to Cluster API)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub provider_status: Option<serde_json::Value>,

    /// Machine-readable reason for a terminal error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,

    /// Human-readable description of a terminal error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    /// Hostname or IP of the endpoint
    pub host: String,

    /// Port of the endpoint
    pub port: i32,
}

impl Cluster {
    /// vSphere configuration from `spec.providerSpec`, if any.
    pub fn vsphere_config(&self) -> Result<Option<VsphereClusterProviderConfig>, ProviderPayloadError> {
        VsphereClusterProviderConfig::from_provider_spec(&self.spec.provider_spec)
    }

    /// vSphere status from `status.providerStatus`, if any.
    pub fn vsphere_status(&self) -> Result<Option<VsphereClusterProviderStatus>, ProviderPayloadError> {
        match self.status.as_ref().and_then(|s| s.provider_status.as_ref()) {
            None => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_value(raw.clone())?)),
        }
    }
}
