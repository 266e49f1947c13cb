//! Node property patches
//!
//! Computes the JSON-patch style operations that bring a node record in the
//! hardware-management service in line with a BareMetalHost: the image to
//! deploy, sizing from the hardware profile, root device hints and boot mode.

use super::capabilities::build_capabilities_value;
use super::devicehints::make_hint_map;
use super::profile::get_profile;
use crate::crd::{BareMetalHost, ChecksumType, Image};
use crate::error::Result;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

// =============================================================================
// Types
// =============================================================================

/// Patch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOp {
    Add,
    Replace,
    Remove,
}

/// A single node patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOperation {
    pub op: UpdateOp,
    pub path: String,
    pub value: Value,
}

impl UpdateOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: UpdateOp::Add,
            path: path.into(),
            value,
        }
    }
}

/// Node as last read from the hardware-management service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub uuid: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub instance_info: BTreeMap<String, Value>,
}

impl NodeRecord {
    /// Stored capability string; present but non-string counts as empty
    pub fn capabilities(&self) -> Option<&str> {
        self.properties
            .get("capabilities")
            .map(|v| v.as_str().unwrap_or_default())
    }
}

// =============================================================================
// Builder
// =============================================================================

fn image_opts(image: &Image) -> Vec<UpdateOperation> {
    let algo = image.checksum_type.unwrap_or(ChecksumType::Md5);

    let mut opts = vec![
        UpdateOperation::add("/instance_info/image_source", json!(image.url)),
        UpdateOperation::add("/instance_info/image_os_hash_algo", json!(algo.to_string())),
        UpdateOperation::add(
            "/instance_info/image_os_hash_value",
            json!(image.checksum.clone().unwrap_or_default()),
        ),
    ];

    if let Some(format) = &image.disk_format {
        opts.push(UpdateOperation::add(
            "/instance_info/image_disk_format",
            json!(format),
        ));
    }

    opts
}

/// Patches for a node given the host it belongs to and the image to deploy
pub fn build_update_opts(
    node: &NodeRecord,
    host: &BareMetalHost,
    image: Option<&Image>,
) -> Result<Vec<UpdateOperation>> {
    let profile = get_profile(host.hardware_profile())?;
    let mut opts = Vec::new();

    if let Some(image) = image {
        opts.extend(image_opts(image));
    }

    opts.push(UpdateOperation::add(
        "/instance_uuid",
        json!(host.uid().unwrap_or_default()),
    ));

    opts.push(UpdateOperation::add(
        "/instance_info/root_gb",
        json!(profile.root_gb),
    ));

    let hints = make_hint_map(
        host.root_device_hints()
            .unwrap_or(&profile.root_device_hints),
    );
    if !hints.is_empty() {
        opts.push(UpdateOperation::add("/properties/root_device", json!(hints)));
    }

    opts.push(UpdateOperation::add(
        "/properties/local_gb",
        json!(profile.local_gb),
    ));

    let cpu_arch = host.inspected_cpu_arch().unwrap_or(profile.cpu_arch);
    opts.push(UpdateOperation::add("/properties/cpu_arch", json!(cpu_arch)));

    if let Some(boot_mode) = host.boot_mode() {
        let (op, value) = build_capabilities_value(node.capabilities(), boot_mode);
        opts.push(UpdateOperation {
            op,
            path: "/properties/capabilities".to_string(),
            value: json!(value),
        });
    }

    debug!(
        node = %node.uuid,
        host = %host.name_any(),
        profile = profile.name,
        patches = opts.len(),
        "Built node update options"
    );

    Ok(opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        BareMetalHostSpec, BareMetalHostStatus, BootMode, CpuDetails, HardwareDetails,
        ProvisionStatus, RootDeviceHints,
    };
    use crate::error::Error;
    use assert_matches::assert_matches;

    const UID: &str = "27720611-e5d1-45d3-ba3a-222dcfaa4ca2";

    fn host(profile: &str) -> BareMetalHost {
        let mut host = BareMetalHost::new("myhost", BareMetalHostSpec::default());
        host.metadata.namespace = Some("myns".into());
        host.metadata.uid = Some(UID.into());
        host.spec.online = true;
        host.status = Some(BareMetalHostStatus {
            hardware_profile: profile.into(),
            provisioning: ProvisionStatus {
                id: "provisioning-id".into(),
                ..Default::default()
            },
            ..Default::default()
        });
        host
    }

    fn image(disk_format: Option<&str>) -> Image {
        Image {
            url: "not-empty".into(),
            checksum: Some("checksum".into()),
            checksum_type: Some(ChecksumType::Md5),
            disk_format: disk_format.map(str::to_string),
        }
    }

    fn find<'a>(opts: &'a [UpdateOperation], path: &str) -> Option<&'a UpdateOperation> {
        opts.iter().find(|o| o.path == path)
    }

    #[test]
    fn test_update_opts_virtual() {
        let host = host("libvirt");
        let opts = build_update_opts(&NodeRecord::default(), &host, Some(&image(Some("raw")))).unwrap();

        let expected = [
            ("/instance_info/image_source", json!("not-empty")),
            ("/instance_info/image_os_hash_algo", json!("md5")),
            ("/instance_info/image_os_hash_value", json!("checksum")),
            ("/instance_info/image_disk_format", json!("raw")),
            ("/instance_uuid", json!(UID)),
            ("/instance_info/root_gb", json!(10)),
            ("/properties/cpu_arch", json!("x86_64")),
            ("/properties/local_gb", json!(50)),
            ("/properties/root_device", json!({"name": "s== /dev/vda"})),
        ];
        for (path, value) in expected {
            let op = find(&opts, path).unwrap_or_else(|| panic!("did not find {path}"));
            assert_eq!(op.value, value, "{path} does not match");
            assert_eq!(op.op, UpdateOp::Add);
        }
        assert!(find(&opts, "/properties/capabilities").is_none());
    }

    #[test]
    fn test_update_opts_dell_without_disk_format() {
        let host = host("dell");
        let opts = build_update_opts(&NodeRecord::default(), &host, Some(&image(None))).unwrap();

        assert!(find(&opts, "/instance_info/image_disk_format").is_none());
        assert_eq!(
            find(&opts, "/properties/root_device").unwrap().value,
            json!({"hctl": "s== 0:0:0:0"})
        );
    }

    #[test]
    fn test_update_opts_no_image() {
        let host = host("dell");
        let opts = build_update_opts(&NodeRecord::default(), &host, None).unwrap();

        for path in [
            "/instance_info/image_source",
            "/instance_info/image_os_hash_algo",
            "/instance_info/image_os_hash_value",
            "/instance_info/image_disk_format",
        ] {
            assert!(find(&opts, path).is_none(), "{path} should be absent");
        }
        assert!(find(&opts, "/instance_uuid").is_some());
    }

    #[test]
    fn test_update_opts_root_hints_from_status() {
        let mut host = host("libvirt");
        let user_hints = RootDeviceHints {
            device_name: Some("userd_devicename".into()),
            min_size_gigabytes: Some(40),
            rotational: Some(true),
            ..Default::default()
        };
        host.spec.root_device_hints = Some(RootDeviceHints {
            device_name: Some("/dev/other".into()),
            ..Default::default()
        });
        host.status.as_mut().unwrap().provisioning.root_device_hints = Some(user_hints);

        let opts = build_update_opts(&NodeRecord::default(), &host, None).unwrap();
        assert_eq!(
            find(&opts, "/properties/root_device").unwrap().value,
            json!({
                "name": "s== userd_devicename",
                "size": ">= 40",
                "rotational": "true"
            })
        );
    }

    #[test]
    fn test_update_opts_inspected_arch_and_boot_mode() {
        let mut host = host("empty");
        host.spec.boot_mode = Some(BootMode::Legacy);
        host.status.as_mut().unwrap().hardware = Some(HardwareDetails {
            cpu: CpuDetails {
                arch: "aarch64".into(),
                ..Default::default()
            },
            ..Default::default()
        });

        let node = NodeRecord {
            uuid: "node-uuid".into(),
            properties: BTreeMap::from([(
                "capabilities".to_string(),
                json!("boot_mode:uefi,cpu_vt:true"),
            )]),
            ..Default::default()
        };

        let opts = build_update_opts(&node, &host, None).unwrap();
        assert_eq!(find(&opts, "/properties/cpu_arch").unwrap().value, "aarch64");
        assert!(find(&opts, "/properties/root_device").is_none());

        let caps = find(&opts, "/properties/capabilities").unwrap();
        assert_eq!(caps.op, UpdateOp::Replace);
        assert_eq!(caps.value, "boot_mode:bios,cpu_vt:true");
    }

    #[test]
    fn test_update_opts_unknown_profile() {
        let host = host("supermicro");
        assert_matches!(
            build_update_opts(&NodeRecord::default(), &host, None),
            Err(Error::UnknownHardwareProfile { .. })
        );
    }

    #[test]
    fn test_update_operation_wire_shape() {
        let op = UpdateOperation::add("/properties/local_gb", json!(50));
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "add", "path": "/properties/local_gb", "value": 50})
        );
    }
}
