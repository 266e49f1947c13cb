//! Manual cleaning plan
//!
//! Combines the RAID and BIOS work for a host into the clean steps and the
//! target RAID configuration submitted before manual cleaning starts.

use super::raid::{build_raid_clean_steps, target_raid_config, TargetRaidConfig};
use crate::bmc::AccessDetails;
use crate::crd::{BareMetalHost, FirmwareConfig, RaidConfig, RootDeviceHints};
use crate::domain::CleanStep;
use crate::error::Result;
use tracing::info;

/// What the host wants versus what was last applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepareData {
    pub target_raid_config: Option<RaidConfig>,
    pub actual_raid_config: Option<RaidConfig>,
    pub root_device_hints: Option<RootDeviceHints>,
    pub firmware_config: Option<FirmwareConfig>,
}

impl PrepareData {
    /// Desired configuration from the spec, last applied from the status
    pub fn from_host(host: &BareMetalHost) -> Self {
        Self {
            target_raid_config: host.spec.raid.clone(),
            actual_raid_config: host
                .status
                .as_ref()
                .and_then(|s| s.provisioning.raid.clone()),
            root_device_hints: host.spec.root_device_hints.clone(),
            firmware_config: host.spec.firmware.clone(),
        }
    }
}

/// Everything needed to run manual cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct ManualCleaningPlan {
    /// RAID layout to set on the node first, if any
    pub target_raid_config: Option<TargetRaidConfig>,
    /// Steps in execution order
    pub clean_steps: Vec<CleanStep>,
}

impl ManualCleaningPlan {
    pub fn is_empty(&self) -> bool {
        self.clean_steps.is_empty()
    }
}

/// Clean steps for a host: RAID first, then BIOS
pub fn build_manual_clean_steps(
    access: &dyn AccessDetails,
    data: &PrepareData,
) -> Result<Vec<CleanStep>> {
    let mut steps = build_raid_clean_steps(
        access.raid_interface(),
        data.target_raid_config.as_ref(),
        data.actual_raid_config.as_ref(),
    )?;

    steps.extend(access.build_bios_clean_steps(data.firmware_config.as_ref())?);
    Ok(steps)
}

/// Plan manual cleaning for a host
pub fn plan_manual_cleaning(
    access: &dyn AccessDetails,
    data: &PrepareData,
) -> Result<ManualCleaningPlan> {
    let target_raid_config = target_raid_config(
        access.raid_interface(),
        data.target_raid_config.as_ref(),
        data.root_device_hints.as_ref(),
    )?;

    let clean_steps = build_manual_clean_steps(access, data)?;

    info!(
        driver = access.driver(),
        raid_interface = access.raid_interface(),
        steps = clean_steps.len(),
        logical_disks = target_raid_config
            .as_ref()
            .map_or(0, |t| t.logical_disks.len()),
        "Planned manual cleaning"
    );

    Ok(ManualCleaningPlan {
        target_raid_config,
        clean_steps,
    })
}
