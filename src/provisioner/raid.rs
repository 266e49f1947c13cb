//! RAID planning
//!
//! Translates a declarative [`RaidConfig`] into the logical disks to build and
//! the clean steps that build them. Hardware RAID is done by the BMC's RAID
//! interface; software RAID is assembled by the deploy agent (`agent`).

use super::devicehints::{make_hint_map, HintMap};
use crate::crd::{RaidConfig, RaidLevel, RootDeviceHints};
use crate::domain::{CleanStep, CleanStepInterface};
use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use tracing::{debug, info};

/// RAID interface of drivers without RAID support
pub const NO_RAID_INTERFACE: &str = "no-raid";

/// RAID interface that builds software RAID through the deploy agent
pub const AGENT_RAID_INTERFACE: &str = "agent";

/// Controller name of software RAID disks
pub const SOFTWARE_RAID_CONTROLLER: &str = "software";

// =============================================================================
// Logical Disks
// =============================================================================

/// Media type of a logical disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    Hdd,
    Ssd,
}

/// A disk in the target RAID configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalDisk {
    /// Size in GiB; `MAX` on the wire when unset
    #[serde(serialize_with = "serialize_size")]
    pub size_gb: Option<u64>,

    pub raid_level: RaidLevel,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_root_volume: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<DiskType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_physical_disks: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub physical_disks: Vec<HintMap>,
}

fn serialize_size<S: Serializer>(size: &Option<u64>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match size {
        Some(gb) => serializer.serialize_u64(*gb),
        None => serializer.serialize_str("MAX"),
    }
}

impl LogicalDisk {
    fn new(size_gb: Option<u64>, raid_level: RaidLevel) -> Self {
        Self {
            size_gb,
            raid_level,
            volume_name: None,
            is_root_volume: false,
            disk_type: None,
            number_of_physical_disks: None,
            controller: None,
            physical_disks: Vec::new(),
        }
    }
}

/// RAID configuration submitted to the node before cleaning
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRaidConfig {
    pub logical_disks: Vec<LogicalDisk>,
}

// =============================================================================
// Checks
// =============================================================================

/// Reject RAID settings the RAID interface cannot build
pub fn check_raid_configure(raid_interface: &str, raid: Option<&RaidConfig>) -> Result<()> {
    let Some(raid) = raid else {
        return Ok(());
    };

    let has_hardware = !raid.hardware_raid_volumes.is_empty();
    let has_software = !raid.software_raid_volumes.is_empty();

    let unsupported = |reason: String| Error::UnsupportedRaidConfiguration {
        raid_interface: raid_interface.to_string(),
        reason,
    };

    if raid_interface == NO_RAID_INTERFACE && (has_hardware || has_software) {
        return Err(unsupported(format!(
            "raid settings are defined, but the node's driver {raid_interface} does not support RAID"
        )));
    }

    if raid_interface == AGENT_RAID_INTERFACE && has_hardware {
        return Err(unsupported(format!(
            "node's driver {raid_interface} does not support hardware RAID"
        )));
    }

    if raid_interface != AGENT_RAID_INTERFACE && !has_hardware && has_software {
        return Err(unsupported(format!(
            "node's driver {raid_interface} does not support software RAID"
        )));
    }

    Ok(())
}

// =============================================================================
// Clean Steps
// =============================================================================

fn without_software_volumes(raid: Option<&RaidConfig>) -> Option<RaidConfig> {
    raid.map(|raid| RaidConfig {
        hardware_raid_volumes: raid.hardware_raid_volumes.clone(),
        software_raid_volumes: Vec::new(),
    })
}

/// Clean steps that move the node from `existing` to `target`.
///
/// Steps are ordered: any old configuration is deleted before the new one is
/// created.
pub fn build_raid_clean_steps(
    raid_interface: &str,
    target: Option<&RaidConfig>,
    existing: Option<&RaidConfig>,
) -> Result<Vec<CleanStep>> {
    check_raid_configure(raid_interface, target)?;

    let mut steps = Vec::new();

    if raid_interface == NO_RAID_INTERFACE {
        return Ok(steps);
    }

    if raid_interface == AGENT_RAID_INTERFACE {
        steps.push(CleanStep::new(CleanStepInterface::Raid, "delete_configuration"));
        steps.push(CleanStep::new(CleanStepInterface::Deploy, "erase_devices_metadata"));
        if target.is_some_and(|t| !t.software_raid_volumes.is_empty()) {
            steps.push(CleanStep::new(CleanStepInterface::Raid, "create_configuration"));
        }
        return Ok(steps);
    }

    // Hardware RAID ignores software volumes on both sides
    let target = without_software_volumes(target);
    let existing = without_software_volumes(existing);
    if target == existing {
        debug!(raid_interface, "Hardware RAID already matches, nothing to do");
        return Ok(steps);
    }

    steps.push(CleanStep::new(CleanStepInterface::Raid, "delete_configuration"));
    if target.is_some_and(|t| !t.hardware_raid_volumes.is_empty()) {
        steps.push(CleanStep::new(CleanStepInterface::Raid, "create_configuration"));
    }

    Ok(steps)
}

// =============================================================================
// Target Configuration
// =============================================================================

/// Build the logical disks for a RAID spec, without choosing a root volume.
///
/// Hardware volumes take precedence when both kinds are present.
pub fn build_target_raid_config(raid: Option<&RaidConfig>) -> Result<Vec<LogicalDisk>> {
    let Some(raid) = raid else {
        return Ok(Vec::new());
    };

    if !raid.hardware_raid_volumes.is_empty() {
        build_hardware_disks(raid)
    } else if !raid.software_raid_volumes.is_empty() {
        build_software_disks(raid)
    } else {
        Ok(Vec::new())
    }
}

fn build_hardware_disks(raid: &RaidConfig) -> Result<Vec<LogicalDisk>> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut disks = Vec::with_capacity(raid.hardware_raid_volumes.len());

    for (index, volume) in raid.hardware_raid_volumes.iter().enumerate() {
        if !volume.name.is_empty() {
            if let Some(first) = seen.get(volume.name.as_str()) {
                return Err(Error::DuplicateVolumeName {
                    name: volume.name.clone(),
                    first: *first,
                    second: index,
                });
            }
            seen.insert(&volume.name, index);
        }

        let mut disk = LogicalDisk::new(volume.size_gibibytes, volume.level);
        disk.volume_name = Some(volume.name.clone()).filter(|n| !n.is_empty());
        disk.disk_type = volume
            .rotational
            .map(|rotational| if rotational { DiskType::Hdd } else { DiskType::Ssd });
        disk.number_of_physical_disks = volume.number_of_physical_disks;
        disks.push(disk);
    }

    Ok(disks)
}

fn build_software_disks(raid: &RaidConfig) -> Result<Vec<LogicalDisk>> {
    if raid.software_raid_volumes[0].level != RaidLevel::Raid1 {
        return Err(Error::RaidBuild(
            "the level in first volume of software raid must be RAID1".into(),
        ));
    }

    Ok(raid
        .software_raid_volumes
        .iter()
        .map(|volume| {
            let mut disk = LogicalDisk::new(volume.size_gibibytes, volume.level);
            disk.controller = Some(SOFTWARE_RAID_CONTROLLER.to_string());
            disk.physical_disks = volume.physical_disks.iter().map(make_hint_map).collect();
            disk
        })
        .collect())
}

/// Mark the first disk as the root volume unless root device hints choose
/// the disk instead. Returns whether a disk was marked.
pub fn select_root_volume(disks: &mut [LogicalDisk], has_root_hints: bool) -> bool {
    if has_root_hints {
        info!("Root device hints are set, the first RAID volume will not be the root volume");
        return false;
    }

    match disks.first_mut() {
        Some(disk) => {
            disk.is_root_volume = true;
            true
        }
        None => false,
    }
}

/// Check, build and pick the root volume in one go.
///
/// Returns `None` when there is nothing to submit.
pub fn target_raid_config(
    raid_interface: &str,
    target: Option<&RaidConfig>,
    root_device_hints: Option<&RootDeviceHints>,
) -> Result<Option<TargetRaidConfig>> {
    check_raid_configure(raid_interface, target)?;

    let mut logical_disks = build_target_raid_config(target)?;
    if logical_disks.is_empty() {
        return Ok(None);
    }

    select_root_volume(&mut logical_disks, root_device_hints.is_some());
    Ok(Some(TargetRaidConfig { logical_disks }))
}
