//! Mock VsphereClient for unit testing
//!
//! This module provides a mock implementation of VsphereClientTrait that can be used
//! in unit tests without requiring a running vCenter.

use crate::error::VsphereError;
use crate::models::*;
use crate::vsphere_trait::VsphereClientTrait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Mock VsphereClient for testing
///
/// VMs and guest IPs live in memory. `wait_for_ip` blocks until an IP is set
/// for the VM (via `set_guest_ip`) or a wait failure is injected, so tests can
/// drive cancellation and late-arriving addresses.
#[derive(Clone)]
pub struct MockVsphereClient {
    server: String,
    vms: Arc<Mutex<HashMap<String, VmInfo>>>,
    guest_ips: Arc<Mutex<HashMap<String, String>>>,
    retrieve_failure: Arc<Mutex<Option<String>>>,
    wait_failure: Arc<Mutex<Option<String>>>,
    login_failure: Arc<Mutex<Option<String>>>,
    ip_changed: Arc<Notify>,
    retrieve_calls: Arc<Mutex<u32>>,
    wait_calls: Arc<Mutex<u32>>,
    logins: Arc<Mutex<u32>>,
    logouts: Arc<Mutex<u32>>,
}

impl std::fmt::Debug for MockVsphereClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockVsphereClient")
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

impl MockVsphereClient {
    /// Create a new mock client
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            vms: Arc::new(Mutex::new(HashMap::new())),
            guest_ips: Arc::new(Mutex::new(HashMap::new())),
            retrieve_failure: Arc::new(Mutex::new(None)),
            wait_failure: Arc::new(Mutex::new(None)),
            login_failure: Arc::new(Mutex::new(None)),
            ip_changed: Arc::new(Notify::new()),
            retrieve_calls: Arc::new(Mutex::new(0)),
            wait_calls: Arc::new(Mutex::new(0)),
            logins: Arc::new(Mutex::new(0)),
            logouts: Arc::new(Mutex::new(0)),
        }
    }

    /// Add a VM to the mock inventory (for test setup)
    pub fn add_vm(&self, id: &str, name: &str, power_state: Option<PowerState>) {
        self.vms.lock().unwrap().insert(
            id.to_string(),
            VmInfo {
                name: name.to_string(),
                power_state,
            },
        );
    }

    /// Report a guest IP for a VM, waking any pending `wait_for_ip`
    pub fn set_guest_ip(&self, id: &str, ip: &str) {
        self.guest_ips.lock().unwrap().insert(id.to_string(), ip.to_string());
        self.ip_changed.notify_waiters();
    }

    /// Make every `retrieve_vm` call fail with an API error
    pub fn fail_retrieve(&self, message: &str) {
        *self.retrieve_failure.lock().unwrap() = Some(message.to_string());
    }

    /// Make every `wait_for_ip` call fail with an API error
    pub fn fail_wait(&self, message: &str) {
        *self.wait_failure.lock().unwrap() = Some(message.to_string());
        self.ip_changed.notify_waiters();
    }

    /// Make `login` fail with an authentication error
    pub fn fail_login(&self, message: &str) {
        *self.login_failure.lock().unwrap() = Some(message.to_string());
    }

    /// Number of `retrieve_vm` calls so far
    pub fn retrieve_calls(&self) -> u32 {
        *self.retrieve_calls.lock().unwrap()
    }

    /// Number of `wait_for_ip` calls so far
    pub fn wait_calls(&self) -> u32 {
        *self.wait_calls.lock().unwrap()
    }

    /// Number of successful `login` calls so far
    pub fn logins(&self) -> u32 {
        *self.logins.lock().unwrap()
    }

    /// Number of `logout` calls so far
    pub fn logouts(&self) -> u32 {
        *self.logouts.lock().unwrap()
    }

    fn current_ip(&self, id: &str) -> Option<String> {
        self.guest_ips.lock().unwrap().get(id).cloned()
    }
}

#[async_trait::async_trait]
impl VsphereClientTrait for MockVsphereClient {
    fn server(&self) -> &str {
        &self.server
    }

    async fn login(&self) -> Result<(), VsphereError> {
        if let Some(message) = self.login_failure.lock().unwrap().clone() {
            return Err(VsphereError::Authentication(message));
        }
        *self.logins.lock().unwrap() += 1;
        Ok(())
    }

    async fn logout(&self) -> Result<(), VsphereError> {
        *self.logouts.lock().unwrap() += 1;
        Ok(())
    }

    async fn retrieve_vm(&self, vm: &VmRef) -> Result<VmInfo, VsphereError> {
        *self.retrieve_calls.lock().unwrap() += 1;

        if let Some(message) = self.retrieve_failure.lock().unwrap().clone() {
            return Err(VsphereError::Api(message));
        }
        self.vms
            .lock()
            .unwrap()
            .get(&vm.value)
            .cloned()
            .ok_or_else(|| VsphereError::NotFound(format!("VM {} not found", vm.value)))
    }

    async fn guest_identity(&self, vm: &VmRef) -> Result<Option<GuestIdentity>, VsphereError> {
        if !self.vms.lock().unwrap().contains_key(&vm.value) {
            return Err(VsphereError::NotFound(format!("VM {} not found", vm.value)));
        }
        Ok(self.current_ip(&vm.value).map(|ip| GuestIdentity {
            ip_address: Some(ip),
            ..Default::default()
        }))
    }

    async fn wait_for_ip(&self, vm: &VmRef) -> Result<String, VsphereError> {
        *self.wait_calls.lock().unwrap() += 1;

        loop {
            // Register interest before checking so a concurrent set_guest_ip is not missed
            let notified = self.ip_changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.wait_failure.lock().unwrap().clone() {
                return Err(VsphereError::Api(message));
            }
            if let Some(ip) = self.current_ip(&vm.value) {
                return Ok(ip);
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_for_ip_returns_known_ip() {
        let mock = MockVsphereClient::new("https://vcenter.test");
        mock.add_vm("vm-1", "worker-0", Some(PowerState::PoweredOn));
        mock.set_guest_ip("vm-1", "10.0.0.5");

        let ip = mock.wait_for_ip(&VmRef::virtual_machine("vm-1")).await.unwrap();
        assert_eq!(ip, "10.0.0.5");
        assert_eq!(mock.wait_calls(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_ip_wakes_on_late_ip() {
        let mock = MockVsphereClient::new("https://vcenter.test");
        mock.add_vm("vm-1", "worker-0", Some(PowerState::PoweredOn));

        let waiter = {
            let mock = mock.clone();
            tokio::spawn(async move { mock.wait_for_ip(&VmRef::virtual_machine("vm-1")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        mock.set_guest_ip("vm-1", "10.0.0.7");

        let ip = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(ip, "10.0.0.7");
    }

    #[tokio::test]
    async fn test_wait_for_ip_blocks_without_ip() {
        let mock = MockVsphereClient::new("https://vcenter.test");
        mock.add_vm("vm-1", "worker-0", Some(PowerState::PoweredOn));

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            mock.wait_for_ip(&VmRef::virtual_machine("vm-1")),
        )
        .await;
        assert!(result.is_err(), "wait should still be pending");
    }

    #[tokio::test]
    async fn test_retrieve_vm_missing() {
        let mock = MockVsphereClient::new("https://vcenter.test");
        let err = mock.retrieve_vm(&VmRef::virtual_machine("vm-404")).await.unwrap_err();
        assert!(matches!(err, VsphereError::NotFound(_)));
        assert_eq!(mock.retrieve_calls(), 1);
    }
}
