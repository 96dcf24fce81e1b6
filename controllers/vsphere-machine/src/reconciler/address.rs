//! IP address resolution

use super::Reconciler;
use super::inspector::VmSnapshot;
use crate::context::PassContext;
use crate::error::ControllerError;
use crate::events::MachineEvent;
use crds::{Machine, VM_IP_ANNOTATION_KEY};
use kube::Resource;
use tracing::{error, info};
use vsphere_client::{VmRef, VsphereClientTrait};

impl Reconciler {
    /// The address already recorded on the Machine, if any.
    ///
    /// An empty annotation counts as absent.
    pub(crate) fn recorded_address(machine: &Machine) -> Option<&str> {
        machine
            .annotation(VM_IP_ANNOTATION_KEY)
            .filter(|ip| !ip.trim().is_empty())
    }

    /// Waits once for the guest to report an address, bounded by `ctx`.
    ///
    /// Publishes one `IPDetected` event on success.
    pub(crate) async fn resolve_address(
        &self,
        client: &dyn VsphereClientTrait,
        vm: &VmRef,
        snapshot: &VmSnapshot,
        machine: &Machine,
        ctx: &PassContext,
    ) -> Result<String, ControllerError> {
        info!("Waiting up to {:?} for {} to report an IP address", ctx.remaining(), snapshot.name);

        let ip = match ctx.run(client.wait_for_ip(vm)).await {
            Some(Ok(ip)) => ip,
            Some(Err(e)) => {
                error!("Failed waiting for IP of {}: {}", vm, e);
                return Err(ControllerError::LookupFailure(format!("{}: {}", vm, e)));
            }
            None => {
                return Err(ControllerError::ResolutionTimeout(format!(
                    "{} ({}) reported no IP before the pass ended",
                    snapshot.name, vm
                )));
            }
        };

        info!("IP {} detected for Virtual Machine {}", ip, snapshot.name);
        self.events
            .publish(
                &machine.object_ref(&()),
                MachineEvent::IpDetected {
                    ip: ip.clone(),
                    vm_name: snapshot.name.clone(),
                },
            )
            .await;

        Ok(ip)
    }
}
