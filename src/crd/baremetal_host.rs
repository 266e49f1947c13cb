//! BareMetalHost CRD
//!
//! Declarative description of a physical machine: how to reach its BMC,
//! which image to deploy, and the hardware configuration (boot mode, RAID
//! layout, firmware toggles) the machine should converge to.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// BareMetalHost CRD
// =============================================================================

/// BareMetalHost is the desired state of a single bare-metal machine.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "metal3.io",
    derive = "PartialEq",
    version = "v1alpha1",
    kind = "BareMetalHost",
    plural = "baremetalhosts",
    shortname = "bmh",
    status = "BareMetalHostStatus",
    printcolumn = r#"{"name": "BMC", "type": "string", "jsonPath": ".spec.bmc.address"}"#,
    printcolumn = r#"{"name": "Profile", "type": "string", "jsonPath": ".status.hardwareProfile"}"#,
    printcolumn = r#"{"name": "Online", "type": "boolean", "jsonPath": ".spec.online"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalHostSpec {
    /// How to reach the baseboard management controller
    #[serde(default)]
    pub bmc: BmcDetails,

    /// Boot mode to configure on the node
    #[serde(default)]
    pub boot_mode: Option<BootMode>,

    /// Image to deploy
    #[serde(default)]
    pub image: Option<Image>,

    /// Hints for selecting the root disk
    #[serde(default)]
    pub root_device_hints: Option<RootDeviceHints>,

    /// RAID layout to build during cleaning
    #[serde(default)]
    pub raid: Option<RaidConfig>,

    /// Vendor-neutral BIOS toggles
    #[serde(default)]
    pub firmware: Option<FirmwareConfig>,

    /// Name of the hardware profile to use
    #[serde(default)]
    pub hardware_profile: String,

    /// Whether the host should be powered on
    #[serde(default)]
    pub online: bool,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// Connection details for the BMC
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BmcDetails {
    /// Address in `[scheme://]host[:port][/path]` form
    pub address: String,

    /// Secret holding the BMC username and password
    #[serde(default)]
    pub credentials_name: String,

    /// Skip TLS verification when talking to the BMC
    #[serde(default)]
    pub disable_certificate_verification: bool,
}

/// Boot mode of the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BootMode {
    #[default]
    #[serde(rename = "UEFI")]
    Uefi,
    #[serde(rename = "UEFISecureBoot")]
    UefiSecureBoot,
    #[serde(rename = "legacy")]
    Legacy,
}

impl BootMode {
    /// Value used for the `boot_mode` node capability
    pub fn capability_value(&self) -> &'static str {
        match self {
            BootMode::Uefi | BootMode::UefiSecureBoot => "uefi",
            BootMode::Legacy => "bios",
        }
    }
}

impl std::fmt::Display for BootMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootMode::Uefi => write!(f, "UEFI"),
            BootMode::UefiSecureBoot => write!(f, "UEFISecureBoot"),
            BootMode::Legacy => write!(f, "legacy"),
        }
    }
}

/// Checksum algorithm of a deployed image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    Md5,
    Sha256,
    Sha512,
}

impl std::fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumType::Md5 => write!(f, "md5"),
            ChecksumType::Sha256 => write!(f, "sha256"),
            ChecksumType::Sha512 => write!(f, "sha512"),
        }
    }
}

/// Image to write to the root disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Location of the image
    pub url: String,

    /// Checksum value, or a URL to it
    #[serde(default)]
    pub checksum: Option<String>,

    /// Checksum algorithm (md5 when unset)
    #[serde(default)]
    pub checksum_type: Option<ChecksumType>,

    /// Disk format (raw, qcow2, ...)
    #[serde(default)]
    pub disk_format: Option<String>,
}

/// Root device selection hints. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RootDeviceHints {
    /// Linux device name, e.g. /dev/vda
    #[serde(default)]
    pub device_name: Option<String>,

    /// SCSI bus address, e.g. 0:0:0:0
    #[serde(default)]
    pub hctl: Option<String>,

    /// Substring of the vendor-specific model
    #[serde(default)]
    pub model: Option<String>,

    /// Substring of the vendor name
    #[serde(default)]
    pub vendor: Option<String>,

    /// Disk serial number
    #[serde(default)]
    pub serial_number: Option<String>,

    /// Minimum size in gigabytes
    #[serde(default)]
    pub min_size_gigabytes: Option<u64>,

    #[serde(default)]
    pub wwn: Option<String>,

    #[serde(default)]
    pub wwn_with_extension: Option<String>,

    #[serde(default)]
    pub wwn_vendor_extension: Option<String>,

    /// Spinning (true) or solid-state (false) media
    #[serde(default)]
    pub rotational: Option<bool>,
}

/// RAID level of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum RaidLevel {
    #[serde(rename = "0")]
    Raid0,
    #[serde(rename = "1")]
    Raid1,
    #[serde(rename = "2")]
    Raid2,
    #[serde(rename = "5")]
    Raid5,
    #[serde(rename = "6")]
    Raid6,
    #[serde(rename = "1+0")]
    Raid10,
    #[serde(rename = "5+0")]
    Raid50,
    #[serde(rename = "6+0")]
    Raid60,
}

impl RaidLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaidLevel::Raid0 => "0",
            RaidLevel::Raid1 => "1",
            RaidLevel::Raid2 => "2",
            RaidLevel::Raid5 => "5",
            RaidLevel::Raid6 => "6",
            RaidLevel::Raid10 => "1+0",
            RaidLevel::Raid50 => "5+0",
            RaidLevel::Raid60 => "6+0",
        }
    }
}

impl std::fmt::Display for RaidLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A volume built by a hardware RAID controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HardwareRaidVolume {
    /// Size in GiB; the remaining space when unset
    #[serde(default)]
    pub size_gibibytes: Option<u64>,

    pub level: RaidLevel,

    /// Volume name, unique within the host when set
    #[serde(default)]
    pub name: String,

    /// Select spinning (true) or solid-state (false) disks
    #[serde(default)]
    pub rotational: Option<bool>,

    #[serde(default)]
    pub number_of_physical_disks: Option<u32>,
}

/// A volume assembled in software by the deploy agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareRaidVolume {
    #[serde(default)]
    pub size_gibibytes: Option<u64>,

    pub level: RaidLevel,

    /// Hints selecting the member disks
    #[serde(default)]
    pub physical_disks: Vec<RootDeviceHints>,
}

/// RAID layout. Hardware and software volumes are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RaidConfig {
    #[serde(rename = "hardwareRAIDVolumes", default)]
    pub hardware_raid_volumes: Vec<HardwareRaidVolume>,

    #[serde(rename = "softwareRAIDVolumes", default)]
    pub software_raid_volumes: Vec<SoftwareRaidVolume>,
}

/// Vendor-neutral BIOS toggles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirmwareConfig {
    #[serde(default)]
    pub virtualization_enabled: Option<bool>,

    #[serde(default)]
    pub simultaneous_multithreading_enabled: Option<bool>,

    #[serde(default)]
    pub sriov_enabled: Option<bool>,
}

// =============================================================================
// Status
// =============================================================================

/// Observed state of the BareMetalHost
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalHostStatus {
    /// Hardware profile matched during inspection
    #[serde(default)]
    pub hardware_profile: String,

    /// Inspection results
    #[serde(default)]
    pub hardware: Option<HardwareDetails>,

    /// What has been applied to the node so far
    #[serde(default)]
    pub provisioning: ProvisionStatus,
}

/// Inspection results for a host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HardwareDetails {
    #[serde(default)]
    pub hostname: String,

    #[serde(default)]
    pub cpu: CpuDetails,

    #[serde(default)]
    pub storage: Vec<StorageDetails>,
}

/// CPU details from inspection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CpuDetails {
    #[serde(default)]
    pub arch: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub count: u32,
}

/// A disk found during inspection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageDetails {
    pub name: String,

    #[serde(default)]
    pub size_bytes: u64,

    #[serde(default)]
    pub rotational: bool,
}

/// Provisioning progress and the configuration last applied to the node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionStatus {
    /// Node UUID in the hardware-management service
    #[serde(rename = "ID", default)]
    pub id: String,

    #[serde(default)]
    pub boot_mode: Option<BootMode>,

    #[serde(default)]
    pub root_device_hints: Option<RootDeviceHints>,

    /// RAID layout last applied
    #[serde(default)]
    pub raid: Option<RaidConfig>,

    /// Firmware toggles last applied
    #[serde(default)]
    pub firmware: Option<FirmwareConfig>,
}

// =============================================================================
// Helpers
// =============================================================================

impl BareMetalHost {
    /// Hardware profile name, preferring the one found by inspection
    pub fn hardware_profile(&self) -> &str {
        match &self.status {
            Some(status) if !status.hardware_profile.is_empty() => &status.hardware_profile,
            _ => &self.spec.hardware_profile,
        }
    }

    /// Root device hints, preferring the ones already applied
    pub fn root_device_hints(&self) -> Option<&RootDeviceHints> {
        self.status
            .as_ref()
            .and_then(|s| s.provisioning.root_device_hints.as_ref())
            .or(self.spec.root_device_hints.as_ref())
    }

    /// Boot mode, preferring the one already applied
    pub fn boot_mode(&self) -> Option<BootMode> {
        self.status
            .as_ref()
            .and_then(|s| s.provisioning.boot_mode)
            .or(self.spec.boot_mode)
    }

    /// CPU architecture reported by inspection, if any
    pub fn inspected_cpu_arch(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.hardware.as_ref())
            .map(|h| h.cpu.arch.as_str())
            .filter(|arch| !arch.is_empty())
    }
}
