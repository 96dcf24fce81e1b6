//! vSphere REST API Client
//!
//! A small client for the vSphere Automation REST API covering what the
//! machine controller needs: session login, reading a VM's name and power
//! state, and waiting for VMware Tools to report the guest's IP address.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vsphere_client::{VmRef, VsphereClient, VsphereClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = VsphereClient::new(
//!     "https://vcenter.lab.local".to_string(),
//!     "administrator@vsphere.local".to_string(),
//!     "secret".to_string(),
//!     false,
//!     Duration::from_secs(5),
//! )?;
//! client.login().await?;
//!
//! let vm = VmRef::virtual_machine("vm-42");
//! let info = client.retrieve_vm(&vm).await?;
//! println!("{} is {:?}", info.name, info.power_state);
//!
//! let ip = client.wait_for_ip(&vm).await?;
//! println!("guest IP: {}", ip);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod vsphere_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::VsphereClient;
pub use error::VsphereError;
pub use models::*;
pub use vsphere_trait::VsphereClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockVsphereClient;
