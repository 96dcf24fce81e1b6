//! Resolves a Machine to the vSphere VM backing it.

use crate::error::ControllerError;
use crds::{Machine, VM_MOREF_ANNOTATION_KEY};
use kube::ResourceExt;
use vsphere_client::VmRef;

/// VM reference recorded in the Machine's `vm-moref` annotation.
pub fn vm_ref_for(machine: &Machine) -> Result<VmRef, ControllerError> {
    machine
        .annotation(VM_MOREF_ANNOTATION_KEY)
        .map(str::trim)
        .filter(|moref| !moref.is_empty())
        .map(VmRef::virtual_machine)
        .ok_or_else(|| {
            ControllerError::LookupFailure(format!(
                "machine {} has no {} annotation",
                machine.name_any(),
                VM_MOREF_ANNOTATION_KEY
            ))
        })
}
