//! vSphere Machine Controller
//!
//! Watches Cluster API `Machine` resources backed by vSphere VMs and records
//! each running VM's guest IP address on its Machine as the `vm-ip-address`
//! annotation, stamping the owning Cluster's provider status when it does.

mod config;
mod context;
mod controller;
mod error;
mod events;
mod locator;
mod reconciler;
mod session;
mod store;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube and reqwest both pull in rustls; pick ring explicitly
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    info!("Starting vSphere Machine Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  vCenter: {}", config.vsphere_server);
    info!("  User: {}", config.vsphere_username);
    info!("  Insecure TLS: {}", config.vsphere_insecure);
    info!("  IP wait timeout: {:?}", config.ip_wait_timeout);
    info!("  IP poll interval: {:?}", config.ip_poll_interval);
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Event reporter: {}", config.controller_name);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
