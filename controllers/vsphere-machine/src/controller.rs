//! Main controller implementation.
//!
//! Wires the Kubernetes client, vSphere sessions, store and event recorder
//! into a `Reconciler`, runs the Machine watcher and handles shutdown.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::events::KubeEventPublisher;
use crate::reconciler::Reconciler;
use crate::session::VsphereSessionProvider;
use crate::store::KubeMachineStore;
use crate::watcher::Watcher;
use crds::Machine;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Main controller for vSphere Machines.
pub struct Controller {
    machine_watcher: JoinHandle<Result<(), ControllerError>>,
    shutdown: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance and starts its watcher.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing vSphere Machine Controller");

        let kube_client = Client::try_default().await?;
        let config = Arc::new(config);
        let shutdown = CancellationToken::new();

        let machine_api: Api<Machine> = match config.namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };

        let reconciler = Arc::new(Reconciler::new(
            Arc::new(VsphereSessionProvider::new(config.clone(), shutdown.clone())),
            Arc::new(KubeMachineStore::new(kube_client.clone())),
            Arc::new(KubeEventPublisher::new(kube_client, &config.controller_name)),
        ));

        let watcher = Watcher::new(reconciler, machine_api);
        let machine_watcher = tokio::spawn(watcher.watch_machines());

        Ok(Self {
            machine_watcher,
            shutdown,
        })
    }

    /// Runs the controller until the watcher exits or Ctrl-C is received.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("vSphere Machine Controller running");

        tokio::select! {
            result = &mut self.machine_watcher => {
                self.shutdown.cancel();
                result.map_err(|e| ControllerError::Watch(format!("Machine watcher panicked: {}", e)))??;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| ControllerError::Watch(format!("failed to listen for shutdown signal: {}", e)))?;
                info!("Shutdown requested, cancelling in-flight passes");
                self.shutdown.cancel();
                self.machine_watcher.abort();
            }
        }

        Ok(())
    }
}
