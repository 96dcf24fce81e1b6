//! Test utilities for unit testing reconcilers
//!
//! Fixture builders plus in-memory stand-ins for the Kubernetes store, the
//! event recorder and the session provider.

use crate::config::ControllerConfig;
use crate::context::PassContext;
use crate::error::ControllerError;
use crate::events::{EventPublisher, MachineEvent};
use crate::session::{Session, SessionProvider};
use crate::store::MachineStore;
use crds::*;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vsphere_client::{MockVsphereClient, VsphereClientTrait};

/// Configuration with placeholder credentials
pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        vsphere_server: "vcenter.default.local".to_string(),
        vsphere_username: "administrator@vsphere.local".to_string(),
        vsphere_password: "secret".to_string(),
        vsphere_insecure: true,
        ip_wait_timeout: Duration::from_secs(60),
        ip_poll_interval: Duration::from_secs(1),
        namespace: None,
        controller_name: "vsphere-machine-controller".to_string(),
    }
}

/// Helper to create a test Machine
pub fn create_test_machine(
    name: &str,
    namespace: &str,
    cluster_name: &str,
    moref: Option<&str>,
    ip: Option<&str>,
) -> Machine {
    let mut labels = BTreeMap::new();
    labels.insert(CLUSTER_NAME_LABEL.to_string(), cluster_name.to_string());

    let mut annotations = BTreeMap::new();
    if let Some(moref) = moref {
        annotations.insert(VM_MOREF_ANNOTATION_KEY.to_string(), moref.to_string());
    }
    if let Some(ip) = ip {
        annotations.insert(VM_IP_ANNOTATION_KEY.to_string(), ip.to_string());
    }

    Machine {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            annotations: (!annotations.is_empty()).then_some(annotations),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: MachineSpec::default(),
        status: None,
    }
}

/// Helper to create a test Cluster
pub fn create_test_cluster(name: &str, namespace: &str) -> Cluster {
    Cluster {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: ClusterSpec::default(),
        status: None,
    }
}

/// A write accepted by `InMemoryStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    /// Full Machine replace (namespace/name)
    Machine(String),
    /// Cluster status replace (namespace/name)
    ClusterStatus(String),
}

fn key_of<K: kube::Resource>(obj: &K) -> String {
    format!("{}/{}", obj.namespace().unwrap_or_default(), obj.name_any())
}

/// In-memory `MachineStore` with resource-version checks and injectable rejections
#[derive(Default)]
pub struct InMemoryStore {
    machines: Mutex<HashMap<String, Machine>>,
    clusters: Mutex<HashMap<String, Cluster>>,
    writes: Mutex<Vec<StoreWrite>>,
    reject_machine: Mutex<Option<String>>,
    reject_cluster_status: Mutex<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_machine(&self, machine: Machine) {
        self.machines.lock().unwrap().insert(key_of(&machine), machine);
    }

    pub fn add_cluster(&self, cluster: Cluster) {
        self.clusters.lock().unwrap().insert(key_of(&cluster), cluster);
    }

    pub fn machine(&self, namespace: &str, name: &str) -> Option<Machine> {
        self.machines.lock().unwrap().get(&format!("{}/{}", namespace, name)).cloned()
    }

    pub fn cluster(&self, namespace: &str, name: &str) -> Option<Cluster> {
        self.clusters.lock().unwrap().get(&format!("{}/{}", namespace, name)).cloned()
    }

    /// Accepted writes, in order
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn reject_machine_writes(&self, reason: &str) {
        *self.reject_machine.lock().unwrap() = Some(reason.to_string());
    }

    pub fn reject_cluster_status_writes(&self, reason: &str) {
        *self.reject_cluster_status.lock().unwrap() = Some(reason.to_string());
    }
}

fn next_version(current: Option<&String>) -> String {
    let n = current.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
    (n + 1).to_string()
}

#[async_trait::async_trait]
impl MachineStore for InMemoryStore {
    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Cluster, ControllerError> {
        self.cluster(namespace, name).ok_or_else(|| {
            ControllerError::LookupFailure(format!("Cluster {}/{} not found", namespace, name))
        })
    }

    async fn replace_machine(&self, machine: &Machine) -> Result<Machine, ControllerError> {
        if let Some(reason) = self.reject_machine.lock().unwrap().clone() {
            return Err(ControllerError::PersistFailure(reason));
        }

        let key = key_of(machine);
        let mut machines = self.machines.lock().unwrap();
        let stored = machines
            .get(&key)
            .ok_or_else(|| ControllerError::PersistFailure(format!("Machine {} not found", key)))?;
        if stored.metadata.resource_version != machine.metadata.resource_version {
            return Err(ControllerError::PersistFailure(format!(
                "Machine {} conflict: stored version {:?}, submitted {:?}",
                key, stored.metadata.resource_version, machine.metadata.resource_version
            )));
        }

        let mut accepted = machine.clone();
        accepted.metadata.resource_version = Some(next_version(stored.metadata.resource_version.as_ref()));
        machines.insert(key.clone(), accepted.clone());
        self.writes.lock().unwrap().push(StoreWrite::Machine(key));
        Ok(accepted)
    }

    async fn replace_cluster_status(&self, cluster: &Cluster) -> Result<Cluster, ControllerError> {
        if let Some(reason) = self.reject_cluster_status.lock().unwrap().clone() {
            return Err(ControllerError::PersistFailure(reason));
        }

        let key = key_of(cluster);
        let mut clusters = self.clusters.lock().unwrap();
        let stored = clusters
            .get(&key)
            .ok_or_else(|| ControllerError::PersistFailure(format!("Cluster {} not found", key)))?;
        if stored.metadata.resource_version != cluster.metadata.resource_version {
            return Err(ControllerError::PersistFailure(format!(
                "Cluster {} conflict: stored version {:?}, submitted {:?}",
                key, stored.metadata.resource_version, cluster.metadata.resource_version
            )));
        }

        // Status subresource: only the status is taken from the submission
        let mut accepted = stored.clone();
        accepted.status = cluster.status.clone();
        accepted.metadata.resource_version = Some(next_version(stored.metadata.resource_version.as_ref()));
        clusters.insert(key.clone(), accepted.clone());
        self.writes.lock().unwrap().push(StoreWrite::ClusterStatus(key));
        Ok(accepted)
    }
}

/// A published event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub object: String,
    pub type_: String,
    pub reason: String,
    pub note: Option<String>,
}

/// `EventPublisher` that keeps every event in memory
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, machine_ref: &ObjectReference, event: MachineEvent) {
        self.events.lock().unwrap().push(RecordedEvent {
            object: machine_ref.name.clone().unwrap_or_default(),
            type_: format!("{:?}", event.event_type()),
            reason: event.reason().to_string(),
            note: Some(event.note()),
        });
    }
}

/// `SessionProvider` handing out a shared mock client
pub struct StaticSessionProvider {
    client: Arc<MockVsphereClient>,
    parent: CancellationToken,
    timeout: Duration,
}

impl StaticSessionProvider {
    pub fn new(client: Arc<MockVsphereClient>, parent: CancellationToken, timeout: Duration) -> Self {
        Self {
            client,
            parent,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn session(&self, _cluster: &Cluster, _machine: &Machine) -> Result<Session, ControllerError> {
        self.client
            .login()
            .await
            .map_err(|e| ControllerError::SessionFailure(e.to_string()))?;
        let client: Arc<dyn VsphereClientTrait> = self.client.clone();
        Ok(Session {
            client,
            context: PassContext::with_timeout(&self.parent, self.timeout),
        })
    }
}
