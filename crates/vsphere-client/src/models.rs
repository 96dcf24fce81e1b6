//! vSphere API models
//!
//! Request and response types for the subset of the vSphere Automation API
//! used by the controller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Managed object type tag for virtual machines.
pub const VIRTUAL_MACHINE_TYPE: &str = "VirtualMachine";

/// Reference to a managed object: a type tag plus an opaque identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmRef {
    /// Managed object type (e.g. "VirtualMachine")
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Managed object identifier (e.g. "vm-42")
    pub value: String,
}

impl VmRef {
    /// Reference to a virtual machine by its managed object id
    pub fn virtual_machine(value: impl Into<String>) -> Self {
        Self {
            type_tag: VIRTUAL_MACHINE_TYPE.to_string(),
            value: value.into(),
        }
    }
}

impl fmt::Display for VmRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_tag, self.value)
    }
}

/// VM power state as reported by vCenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerState {
    /// VM is running
    PoweredOn,
    /// VM is stopped
    PoweredOff,
    /// VM is suspended to disk
    Suspended,
    /// Any state this client does not know about
    #[serde(other)]
    Unknown,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PowerState::PoweredOn => "poweredOn",
            PowerState::PoweredOff => "poweredOff",
            PowerState::Suspended => "suspended",
            PowerState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// VM properties returned by `GET /api/vcenter/vm/{vm}`
///
/// Only the fields the controller reads are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInfo {
    /// Display name of the VM
    pub name: String,
    /// Power state; absent when vCenter has no runtime information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_state: Option<PowerState>,
}

/// Guest identity returned by `GET /api/vcenter/vm/{vm}/guest/identity`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestIdentity {
    /// Primary IP address reported by VMware Tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Guest hostname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    /// Guest OS family (e.g. "LINUX")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

impl GuestIdentity {
    /// The reported IP, ignoring empty strings
    pub fn ip(&self) -> Option<&str> {
        self.ip_address.as_deref().filter(|ip| !ip.is_empty())
    }
}

/// Error body returned by the vSphere REST API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Error type (e.g. "NOT_FOUND", "SERVICE_UNAVAILABLE")
    #[serde(default)]
    pub error_type: Option<String>,
    /// Localizable messages
    #[serde(default)]
    pub messages: Vec<ApiErrorMessage>,
}

/// A single message within an error body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorMessage {
    /// English rendering of the message
    #[serde(default)]
    pub default_message: String,
}

impl ApiErrorBody {
    /// Parse an error body, falling back to the raw text
    pub fn describe(body: &str) -> String {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) if !parsed.messages.is_empty() => parsed
                .messages
                .iter()
                .map(|m| m.default_message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            Ok(parsed) => parsed.error_type.unwrap_or_else(|| body.to_string()),
            Err(_) => body.to_string(),
        }
    }
}
