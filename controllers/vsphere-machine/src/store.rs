//! Control-plane store access.
//!
//! Writes replace the object (or its status subresource) with a full copy
//! carrying the resource version it was read at. The API server rejects
//! stale copies; the controller only reports the rejection.

use crate::error::ControllerError;
use crds::{Cluster, Machine};
use kube::api::PostParams;
use kube::{Api, Client, Resource, ResourceExt};
use tracing::debug;

/// Reads and writes of Cluster API objects
#[async_trait::async_trait]
pub trait MachineStore: Send + Sync {
    /// Fetch a Cluster by namespace and name.
    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Cluster, ControllerError>;

    /// Replace the stored Machine with `machine`.
    async fn replace_machine(&self, machine: &Machine) -> Result<Machine, ControllerError>;

    /// Replace the status subresource of the stored Cluster with `cluster.status`.
    async fn replace_cluster_status(&self, cluster: &Cluster) -> Result<Cluster, ControllerError> {
        let (namespace, name) = identity(cluster, "Cluster")?;
        debug!("Replacing Cluster {}/{} status at resourceVersion {:?}", namespace, name, cluster.resource_version());

        let api: Api<Cluster> = Api::namespaced(self.client.clone(), &namespace);
        api.replace_status(&name, &PostParams::default(), status_body(cluster)?)
            .await
            .map_err(|e| ControllerError::PersistFailure(format!("Cluster {}/{} status: {}", namespace, name, e)))
    }
}

/// Body of a status replace: the whole object, so the API server checks its
/// resourceVersion and takes `status` as given.
fn status_body(cluster: &Cluster) -> Result<Vec<u8>, ControllerError> {
    serde_json::to_vec(cluster).map_err(|e| {
        ControllerError::PersistFailure(format!("cannot serialize Cluster {}: {}", cluster.name_any(), e))
    })
}
