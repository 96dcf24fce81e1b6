//! Well-known annotation and label keys.

/// Machine annotation holding the IP address reported by the hypervisor.
pub const VM_IP_ANNOTATION_KEY: &str = "vm-ip-address";

/// Machine annotation holding the vSphere managed object reference of the backing VM.
pub const VM_MOREF_ANNOTATION_KEY: &str = "vm-moref";

/// Label linking a Machine to the Cluster that owns it.
pub const CLUSTER_NAME_LABEL: &str = "cluster.k8s.io/cluster-name";
