//! Prints the Machine and Cluster CustomResourceDefinitions as a multi-document YAML stream.

use crds::{Cluster, Machine};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("---\n{}", serde_yaml::to_string(&Machine::crd())?);
    print!("---\n{}", serde_yaml::to_string(&Cluster::crd())?);
    Ok(())
}
