//! Kubernetes Events about Machines.
//!
//! Publishing is fire-and-forget: a failed publish is logged and never fails
//! the reconciliation pass.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Client;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::warn;

/// Something the controller observed about a Machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineEvent {
    /// The guest of the backing VM reported an IP address
    IpDetected {
        /// Reported address
        ip: String,
        /// VM name in vCenter
        vm_name: String,
    },
}

impl MachineEvent {
    /// Event severity
    pub fn event_type(&self) -> EventType {
        match self {
            MachineEvent::IpDetected { .. } => EventType::Normal,
        }
    }

    /// Machine-readable reason shown by `kubectl describe`
    pub fn reason(&self) -> &'static str {
        match self {
            MachineEvent::IpDetected { .. } => "IPDetected",
        }
    }

    /// Human-readable note
    pub fn note(&self) -> String {
        match self {
            MachineEvent::IpDetected { ip, vm_name } => {
                format!("IP {} detected for Virtual Machine {}", ip, vm_name)
            }
        }
    }
}

/// Sink for Machine events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `event` about the object behind `machine_ref`.
    async fn publish(&self, machine_ref: &ObjectReference, event: MachineEvent);
}

/// Publishes through the Kubernetes Events API.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Events are reported as `controller_name`, instance `POD_NAME` when set.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, machine_ref: &ObjectReference, event: MachineEvent) {
        let reason = event.reason();
        let published = self
            .recorder
            .publish(
                &Event {
                    type_: event.event_type(),
                    reason: reason.to_string(),
                    note: Some(event.note()),
                    action: "Reconcile".to_string(),
                    secondary: None,
                },
                machine_ref,
            )
            .await;

        if let Err(e) = published {
            warn!(
                machine = machine_ref.name.as_deref().unwrap_or("<unknown>"),
                reason,
                error = %e,
                "Could not record Machine event"
            );
        }
    }
}
