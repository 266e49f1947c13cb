//! Hardware profiles
//!
//! Named defaults used when a host does not say otherwise: disk sizes, CPU
//! architecture and the disk to install onto.

use crate::crd::RootDeviceHints;
use crate::error::{Error, Result};

/// Profile used when none is named
pub const DEFAULT_PROFILE_NAME: &str = "unknown";

/// Names of all known profiles
pub const PROFILE_NAMES: &[&str] = &[
    "unknown",
    "libvirt",
    "dell",
    "dell-raid",
    "openstack",
    "empty",
];

/// Defaults for a class of hardware
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareProfile {
    pub name: &'static str,
    /// Size of the root partition in GiB
    pub root_gb: u64,
    /// Size of the local disk in GiB
    pub local_gb: u64,
    pub cpu_arch: &'static str,
    pub root_device_hints: RootDeviceHints,
}

impl HardwareProfile {
    fn new(name: &'static str, root_device_hints: RootDeviceHints) -> Self {
        Self {
            name,
            root_gb: 10,
            local_gb: 50,
            cpu_arch: "x86_64",
            root_device_hints,
        }
    }
}

fn device(name: &str) -> RootDeviceHints {
    RootDeviceHints {
        device_name: Some(name.to_string()),
        ..Default::default()
    }
}

fn hctl(address: &str) -> RootDeviceHints {
    RootDeviceHints {
        hctl: Some(address.to_string()),
        ..Default::default()
    }
}

/// Look up a profile by name. An empty name selects the default profile.
pub fn get_profile(name: &str) -> Result<HardwareProfile> {
    let name = if name.is_empty() {
        DEFAULT_PROFILE_NAME
    } else {
        name
    };

    let profile = match name {
        "unknown" => HardwareProfile::new("unknown", device("/dev/sda")),
        "libvirt" => HardwareProfile::new("libvirt", device("/dev/vda")),
        "dell" => HardwareProfile::new("dell", hctl("0:0:0:0")),
        "dell-raid" => HardwareProfile::new("dell-raid", hctl("0:2:0:0")),
        "openstack" => HardwareProfile::new("openstack", device("/dev/vdb")),
        "empty" => HardwareProfile::new("empty", RootDeviceHints::default()),
        _ => {
            return Err(Error::UnknownHardwareProfile {
                name: name.to_string(),
            })
        }
    };

    Ok(profile)
}
