//! Machine watcher.
//!
//! Drives reconciliation passes with `kube_runtime::Controller`, which keeps
//! at most one pass in flight per Machine and re-runs it on the next change.

use crate::error::ControllerError;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crds::Machine;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::{Controller, controller::{Action, Config as RuntimeConfig}, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Delay before a failed Machine is reconciled again
const REQUEUE_AFTER_FAILURE: Duration = Duration::from_secs(60);

/// Passes allowed to run at once across all Machines
const MAX_CONCURRENT_PASSES: u16 = 16;

/// Watches Machines and reconciles each against vSphere.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    machine_api: Api<Machine>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, machine_api: Api<Machine>) -> Self {
        Self {
            reconciler,
            machine_api,
        }
    }

    /// Runs until the Machine watch stream ends.
    pub async fn watch_machines(self) -> Result<(), ControllerError> {
        info!("Starting Machine watcher");

        let config = RuntimeConfig::default().concurrency(MAX_CONCURRENT_PASSES);

        Controller::new(self.machine_api, watcher::Config::default())
            .with_config(config)
            .run(
                |machine: Arc<Machine>, reconciler: Arc<Reconciler>| async move {
                    reconcile(&reconciler, &machine).await
                },
                error_policy,
                self.reconciler,
            )
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled Machine {}", obj),
                    Err(e) => error!("Machine controller error: {}", e),
                }
            })
            .await;

        info!("Machine watcher stopped");
        Ok(())
    }
}

/// One pass for `machine`, resolving its Cluster through the cluster-name label.
pub(crate) async fn reconcile(reconciler: &Reconciler, machine: &Machine) -> Result<Action, ControllerError> {
    let name = machine.name_any();
    let namespace = machine.namespace().unwrap_or_else(|| "default".to_string());

    let Some(cluster_name) = machine.cluster_name() else {
        warn!("Machine {}/{} has no cluster label, skipping", namespace, name);
        return Ok(Action::await_change());
    };

    let cluster = reconciler
        .store
        .get_cluster(&namespace, cluster_name)
        .await
        .map_err(|e| ControllerError::LookupFailure(format!("Cluster {}/{}: {}", namespace, cluster_name, e)))?;

    info!("Reconciling Machine {}/{} of cluster {}", namespace, name, cluster_name);
    match reconciler.reconcile_machine(&cluster, machine).await? {
        ReconcileOutcome::Indeterminate => debug!("Machine {}/{}: VM state indeterminate", namespace, name),
        ReconcileOutcome::AddressAlreadyKnown(ip) => debug!("Machine {}/{} already has IP {}", namespace, name, ip),
        ReconcileOutcome::Persisted(ip) => info!("Machine {}/{} now has IP {}", namespace, name, ip),
    }

    Ok(Action::await_change())
}

fn error_policy(machine: Arc<Machine>, err: &ControllerError, _reconciler: Arc<Reconciler>) -> Action {
    if err.is_soft() {
        warn!("Machine {}: {}", machine.name_any(), err);
    } else {
        error!("Failed to reconcile Machine {}: {}", machine.name_any(), err);
    }
    Action::requeue(REQUEUE_AFTER_FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crds::VM_IP_ANNOTATION_KEY;
    use tokio_util::sync::CancellationToken;
    use vsphere_client::{MockVsphereClient, PowerState};

    fn reconciler_with(vsphere: Arc<MockVsphereClient>, store: Arc<InMemoryStore>) -> Reconciler {
        Reconciler::new(
            Arc::new(StaticSessionProvider::new(vsphere, CancellationToken::new(), Duration::from_secs(5))),
            store,
            Arc::new(RecordingEventPublisher::new()),
        )
    }

    #[tokio::test]
    async fn test_reconcile_resolves_cluster_from_label() {
        let vsphere = Arc::new(MockVsphereClient::new("vcenter.default.local"));
        vsphere.add_vm("vm-7", "worker-1-vm", Some(PowerState::PoweredOn));
        vsphere.set_guest_ip("vm-7", "10.1.0.7");

        let store = Arc::new(InMemoryStore::new());
        store.add_cluster(create_test_cluster("edge", "capi"));
        let machine = create_test_machine("worker-1", "capi", "edge", Some("vm-7"), None);
        store.add_machine(machine.clone());

        let action = reconcile(&reconciler_with(vsphere, store.clone()), &machine).await.unwrap();

        assert_eq!(action, Action::await_change());
        let stored = store.machine("capi", "worker-1").unwrap();
        assert_eq!(stored.annotation(VM_IP_ANNOTATION_KEY), Some("10.1.0.7"));
        assert!(store.cluster("capi", "edge").unwrap().status.is_some());
    }

    #[tokio::test]
    async fn test_reconcile_skips_unlabelled_machine() {
        let vsphere = Arc::new(MockVsphereClient::new("vcenter.default.local"));
        let store = Arc::new(InMemoryStore::new());
        let mut machine = create_test_machine("worker-1", "capi", "edge", Some("vm-7"), None);
        machine.metadata.labels = None;

        let action = reconcile(&reconciler_with(vsphere.clone(), store.clone()), &machine).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(vsphere.retrieve_calls(), 0);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_missing_cluster_is_lookup_failure() {
        let vsphere = Arc::new(MockVsphereClient::new("vcenter.default.local"));
        let store = Arc::new(InMemoryStore::new());
        let machine = create_test_machine("worker-1", "capi", "edge", Some("vm-7"), None);

        let err = reconcile(&reconciler_with(vsphere.clone(), store), &machine).await.unwrap_err();

        assert!(matches!(err, ControllerError::LookupFailure(_)));
        assert_eq!(vsphere.retrieve_calls(), 0);
    }

    #[test]
    fn test_error_policy_requeues() {
        let vsphere = Arc::new(MockVsphereClient::new("vcenter.default.local"));
        let reconciler = Arc::new(reconciler_with(vsphere, Arc::new(InMemoryStore::new())));
        let machine = Arc::new(create_test_machine("worker-1", "capi", "edge", None, None));

        let soft = ControllerError::NotRunning {
            name: "worker-1-vm".to_string(),
            state: PowerState::PoweredOff,
        };
        assert_eq!(
            error_policy(machine.clone(), &soft, reconciler.clone()),
            Action::requeue(REQUEUE_AFTER_FAILURE)
        );
        assert_eq!(
            error_policy(machine, &ControllerError::PersistFailure("conflict".to_string()), reconciler),
            Action::requeue(REQUEUE_AFTER_FAILURE)
        );
    }
}
