//! Cluster API resource definitions
//!
//! `Machine` and `Cluster` resources (`cluster.k8s.io/v1alpha1`) as consumed by
//! the vSphere machine controller, plus the vSphere-specific provider payloads
//! carried inside their opaque `providerSpec` and `providerStatus` fields.

pub mod cluster;
pub mod constants;
pub mod machine;
pub mod provider;

pub use cluster::*;
pub use constants::*;
pub use machine::*;
pub use provider::*;
