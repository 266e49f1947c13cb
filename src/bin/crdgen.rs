//! Prints the operator's CustomResourceDefinitions as a YAML stream

use baremetal_host_operator::crd::{BareMetalHost, FirmwareSchema, HostFirmwareSettings};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [
        serde_yaml::to_string(&BareMetalHost::crd())?,
        serde_yaml::to_string(&HostFirmwareSettings::crd())?,
        serde_yaml::to_string(&FirmwareSchema::crd())?,
    ];
    print!("{}", crds.join("---\n"));
    Ok(())
}
