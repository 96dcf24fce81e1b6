//! vSphere session setup.
//!
//! Turns a (Cluster, Machine) pair into an authenticated vSphere client and a
//! fresh pass context. The Cluster's provider spec may point its machines at a
//! different vCenter than the controller default.

use crate::config::ControllerConfig;
use crate::context::PassContext;
use crate::error::ControllerError;
use crds::{Cluster, Machine};
use kube::ResourceExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vsphere_client::{VsphereClient, VsphereClientTrait};

/// An authenticated hypervisor connection plus the context bounding the pass
pub struct Session {
    /// Authenticated vSphere client
    pub client: Arc<dyn VsphereClientTrait>,
    /// Cancellation and deadline for the pass
    pub context: PassContext,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server", &self.client.server())
            .field("context", &self.context)
            .finish()
    }
}

/// Source of vSphere sessions for reconciliation passes
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Open a session for reconciling `machine` of `cluster`
    async fn session(&self, cluster: &Cluster, machine: &Machine) -> Result<Session, ControllerError>;
}

/// Logs in to vCenter with the controller's credentials for every pass
pub struct VsphereSessionProvider {
    config: Arc<ControllerConfig>,
    shutdown: CancellationToken,
}

impl VsphereSessionProvider {
    /// Creates a provider whose pass contexts are children of `shutdown`.
    pub fn new(config: Arc<ControllerConfig>, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    /// vCenter endpoint for a cluster: its provider spec override, else the default.
    fn server_for(&self, cluster: &Cluster) -> Result<String, ControllerError> {
        let provider_config = cluster.vsphere_config().map_err(|e| {
            ControllerError::SessionFailure(format!(
                "cluster {} has an unreadable provider spec: {}",
                cluster.name_any(),
                e
            ))
        })?;

        Ok(provider_config
            .and_then(|c| c.vsphere_server)
            .filter(|server| !server.is_empty())
            .unwrap_or_else(|| self.config.vsphere_server.clone()))
    }
}

#[async_trait::async_trait]
impl SessionProvider for VsphereSessionProvider {
    async fn session(&self, cluster: &Cluster, machine: &Machine) -> Result<Session, ControllerError> {
        let server = self.server_for(cluster)?;
        debug!("Opening vSphere session on {} for machine {}", server, machine.name_any());

        let client = VsphereClient::new(
            server.clone(),
            self.config.vsphere_username.clone(),
            self.config.vsphere_password.clone(),
            self.config.vsphere_insecure,
            self.config.ip_poll_interval,
        )
        .map_err(|e| ControllerError::SessionFailure(format!("{}: {}", server, e)))?;

        client
            .login()
            .await
            .map_err(|e| ControllerError::SessionFailure(format!("{}: {}", server, e)))?;

        Ok(Session {
            client: Arc::new(client),
            context: PassContext::with_timeout(&self.shutdown, self.config.ip_wait_timeout),
        })
    }
}
