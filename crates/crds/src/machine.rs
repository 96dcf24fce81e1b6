//! Machine CRD
//!
//! A single compute instance managed through Cluster API. The vSphere
//! controller only reads its annotations and labels and writes the discovered
//! IP address back as an annotation.

use crate::constants::CLUSTER_NAME_LABEL;
use crate::provider::{ProviderSpec, preserve_unknown_fields};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "cluster.k8s.io",
    version = "v1alpha1",
    kind = "Machine",
    namespaced,
    status = "MachineStatus",
    shortname = "ma"
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Provider-specific machine configuration (opaque to Cluster API)
    #[serde(default)]
    pub provider_spec: ProviderSpec,

    /// Kubernetes component versions to run on the machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<MachineVersionInfo>,

    /// Identifier assigned by the infrastructure provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineVersionInfo {
    /// Kubelet version
    pub kubelet: String,

    /// Control plane version (only set on control plane machines)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    /// Name of the Node backed by this machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ref: Option<String>,

    /// Last time the status was updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,

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

impl Machine {
    /// Name of the owning Cluster, taken from the `cluster.k8s.io/cluster-name` label.
    pub fn cluster_name(&self) -> Option<&str> {
        self.labels()
            .get(CLUSTER_NAME_LABEL)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Value of a single annotation, if set.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations().get(key).map(String::as_str)
    }
}
