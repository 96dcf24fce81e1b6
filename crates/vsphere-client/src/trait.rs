//! VsphereClient trait for mocking
//!
//! This trait abstracts the VsphereClient to enable mocking in unit tests.
//! The concrete VsphereClient implements this trait, and tests can use mock implementations.

use crate::error::VsphereError;
use crate::models::*;

/// Trait for vSphere API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait VsphereClientTrait: Send + Sync {
    /// vCenter endpoint this client talks to
    fn server(&self) -> &str;

    /// Establish an authenticated session
    async fn login(&self) -> Result<(), VsphereError>;

    /// End the session opened by `login`
    async fn logout(&self) -> Result<(), VsphereError>;

    /// Read the name and power state of a VM
    async fn retrieve_vm(&self, vm: &VmRef) -> Result<VmInfo, VsphereError>;

    /// Read the guest identity; `None` while VMware Tools has nothing to report
    async fn guest_identity(&self, vm: &VmRef) -> Result<Option<GuestIdentity>, VsphereError>;

    /// Block until the guest reports an IP address.
    ///
    /// Resolves only once an address is available or the API fails. Callers
    /// bound the wait by dropping the future.
    async fn wait_for_ip(&self, vm: &VmRef) -> Result<String, VsphereError>;
}
