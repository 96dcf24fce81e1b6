//! VM state inspection

use super::Reconciler;
use crate::context::PassContext;
use crate::error::ControllerError;
use tracing::warn;
use vsphere_client::{PowerState, VmRef, VsphereClientTrait};

/// Point-in-time view of the VM fields reconciliation depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSnapshot {
    /// VM name in vCenter
    pub name: String,
    /// Power state at the time of the read
    pub power_state: PowerState,
}

impl Reconciler {
    /// Reads the VM's name and power state.
    ///
    /// `Ok(None)` when vSphere returns the VM without power state information.
    /// Read errors, and a context that has already ended, are `LookupFailure`.
    pub(crate) async fn inspect_vm(
        &self,
        client: &dyn VsphereClientTrait,
        vm: &VmRef,
        ctx: &PassContext,
    ) -> Result<Option<VmSnapshot>, ControllerError> {
        if ctx.is_done() {
            return Err(ControllerError::LookupFailure(format!(
                "context ended before reading {}",
                vm
            )));
        }

        let info = match ctx.run(client.retrieve_vm(vm)).await {
            Some(result) => result.map_err(|e| ControllerError::LookupFailure(format!("{}: {}", vm, e)))?,
            None => {
                return Err(ControllerError::LookupFailure(format!(
                    "context ended while reading {}",
                    vm
                )));
            }
        };

        Ok(info.power_state.map(|power_state| VmSnapshot {
            name: info.name,
            power_state,
        }))
    }

    /// `NotRunning` unless the VM is powered on.
    pub(crate) fn ensure_running(snapshot: &VmSnapshot) -> Result<(), ControllerError> {
        if snapshot.power_state == PowerState::PoweredOn {
            return Ok(());
        }

        warn!(
            vm = %snapshot.name,
            power_state = %snapshot.power_state,
            "Machine {} is not running, rather it is in {} state",
            snapshot.name,
            snapshot.power_state
        );
        Err(ControllerError::NotRunning {
            name: snapshot.name.clone(),
            state: snapshot.power_state,
        })
    }
}
