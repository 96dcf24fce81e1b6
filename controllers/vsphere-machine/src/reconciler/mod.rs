//! Reconciliation of a single Machine against its vSphere VM.
//!
//! A pass runs these stages in order, stopping at the first that ends it:
//! - `inspector`: read the VM and require it to be powered on
//! - `address`: use the recorded IP, or wait once for the guest to report one
//! - `writer`: record the IP on the Machine, then stamp the Cluster status

pub mod address;
pub mod inspector;
pub mod writer;

use crate::error::ControllerError;
use crate::events::EventPublisher;
use crate::locator;
use crate::session::{Session, SessionProvider};
use crate::store::MachineStore;
use crds::{Cluster, Machine};
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// How a successful pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// vSphere returned the VM without power state information; nothing was done
    Indeterminate,
    /// The Machine already carries this address
    AddressAlreadyKnown(String),
    /// This address was discovered and persisted
    Persisted(String),
}

/// Reconciles Machines against vSphere.
pub struct Reconciler {
    pub(crate) sessions: Arc<dyn SessionProvider>,
    pub(crate) store: Arc<dyn MachineStore>,
    pub(crate) events: Arc<dyn EventPublisher>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn MachineStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            sessions,
            store,
            events,
        }
    }

    /// Runs one reconciliation pass for `machine` owned by `cluster`.
    ///
    /// The pass context is cancelled and the vSphere session closed when
    /// this returns, on every path.
    #[instrument(skip_all, fields(machine = %machine.name_any(), cluster = %cluster.name_any()))]
    pub async fn reconcile_machine(
        &self,
        cluster: &Cluster,
        machine: &Machine,
    ) -> Result<ReconcileOutcome, ControllerError> {
        let session = self.sessions.session(cluster, machine).await?;

        let result = {
            let _context_guard = session.context.drop_guard();
            self.run_pass(&session, cluster, machine).await
        };

        if let Err(e) = session.client.logout().await {
            warn!("Failed to close vSphere session on {}: {}", session.client.server(), e);
        }

        result
    }

    async fn run_pass(
        &self,
        session: &Session,
        cluster: &Cluster,
        machine: &Machine,
    ) -> Result<ReconcileOutcome, ControllerError> {
        let vm = locator::vm_ref_for(machine)?;
        debug!("Machine backed by {}", vm);

        let Some(snapshot) = self.inspect_vm(session.client.as_ref(), &vm, &session.context).await? else {
            debug!("VM {} reported no power state, nothing to do this pass", vm);
            return Ok(ReconcileOutcome::Indeterminate);
        };
        Self::ensure_running(&snapshot)?;

        if let Some(ip) = Self::recorded_address(machine) {
            debug!("Machine already has IP {}", ip);
            return Ok(ReconcileOutcome::AddressAlreadyKnown(ip.to_string()));
        }

        let ip = self
            .resolve_address(session.client.as_ref(), &vm, &snapshot, machine, &session.context)
            .await?;

        self.persist_address(cluster, machine, &ip).await?;
        info!("Recorded IP {} for machine {}", ip, machine.name_any());

        Ok(ReconcileOutcome::Persisted(ip))
    }
}
