//! Controller-specific error types.
//!
//! Every reconciliation pass ends in at most one of these. None of them is
//! retried inside the controller; the watcher logs the failure and the next
//! watch event re-runs the pass.

use kube::Error as KubeError;
use thiserror::Error;
use vsphere_client::PowerState;

/// Errors that can occur in the vSphere Machine Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes client error outside a reconciliation pass
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Could not establish a vSphere session
    #[error("vSphere session failed: {0}")]
    SessionFailure(String),

    /// Reading the VM from vSphere failed
    #[error("VM lookup failed: {0}")]
    LookupFailure(String),

    /// The VM exists but is not powered on
    #[error("Machine {name} is not running, rather it is in {state} state")]
    NotRunning {
        /// VM name as reported by vSphere
        name: String,
        /// Observed power state
        state: PowerState,
    },

    /// The pass context ended before the guest reported an address
    #[error("Timed out waiting for IP address: {0}")]
    ResolutionTimeout(String),

    /// The control plane rejected a write
    #[error("Failed to persist state: {0}")]
    PersistFailure(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether this is the expected "VM is not running yet" condition rather than a fault.
    pub fn is_soft(&self) -> bool {
        matches!(self, ControllerError::NotRunning { .. })
    }
}
