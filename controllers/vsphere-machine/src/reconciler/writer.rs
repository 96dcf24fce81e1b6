//! Persisting a discovered address

use super::Reconciler;
use crate::error::ControllerError;
use chrono::Utc;
use crds::{Cluster, Machine, VM_IP_ANNOTATION_KEY, VsphereClusterProviderStatus};
use kube::ResourceExt;
use tracing::{debug, error};

impl Reconciler {
    /// Records `ip` on the Machine, then stamps the Cluster's provider status.
    ///
    /// Both writes go through copies; the caller's objects are never mutated.
    /// The Cluster is only touched after the Machine write succeeded, and a
    /// failed Cluster write does not undo the Machine write.
    pub(crate) async fn persist_address(
        &self,
        cluster: &Cluster,
        machine: &Machine,
        ip: &str,
    ) -> Result<(), ControllerError> {
        let mut updated_machine = machine.clone();
        updated_machine
            .annotations_mut()
            .insert(VM_IP_ANNOTATION_KEY.to_string(), ip.to_string());

        self.store.replace_machine(&updated_machine).await.map_err(|e| {
            error!("Failed to record IP {} on machine {}: {}", ip, machine.name_any(), e);
            e
        })?;
        debug!("Machine {} annotated with IP {}", machine.name_any(), ip);

        let updated_cluster = Self::stamp_cluster(cluster)?;
        self.store.replace_cluster_status(&updated_cluster).await.map_err(|e| {
            error!(
                "Machine {} has IP {} recorded but cluster {} status update failed: {}",
                machine.name_any(),
                ip,
                cluster.name_any(),
                e
            );
            e
        })?;
        debug!("Cluster {} status stamped", cluster.name_any());

        Ok(())
    }

    /// Copy of `cluster` with `status.providerStatus` set to the current time.
    fn stamp_cluster(cluster: &Cluster) -> Result<Cluster, ControllerError> {
        let provider_status = serde_json::to_value(VsphereClusterProviderStatus::at(Utc::now()))
            .map_err(|e| ControllerError::PersistFailure(format!("encoding cluster provider status: {}", e)))?;

        let mut updated = cluster.clone();
        updated.status.get_or_insert_with(Default::default).provider_status = Some(provider_status);
        Ok(updated)
    }
}
