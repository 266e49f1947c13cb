//! BIOS settings built from the vendor-neutral firmware toggles
//!
//! Each driver that can configure BIOS settings supplies a [`BiosMapping`]:
//! vendor names for the toggles and, optionally, vendor spellings for the
//! rendered values. Unset toggles produce no setting.

use crate::crd::FirmwareConfig;
use crate::domain::{CleanStep, CleanStepInterface};
use crate::error::Result;
use serde::{Deserialize, Serialize};

// =============================================================================
// Field Table
// =============================================================================

/// Typed value of a firmware field before rendering
#[derive(Debug, Clone, PartialEq)]
pub enum FirmwareValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl FirmwareValue {
    /// Render the value the way the hardware expects it
    pub fn render(&self) -> String {
        match self {
            FirmwareValue::Str(s) => s.clone(),
            FirmwareValue::Bool(b) => b.to_string(),
            FirmwareValue::Int(n) => n.to_string(),
            FirmwareValue::Float(f) => f.to_string(),
        }
    }
}

/// Fields of a firmware config, in declaration order
pub fn firmware_fields(config: &FirmwareConfig) -> Vec<(&'static str, Option<FirmwareValue>)> {
    vec![
        (
            "VirtualizationEnabled",
            config.virtualization_enabled.map(FirmwareValue::Bool),
        ),
        (
            "SimultaneousMultithreadingEnabled",
            config
                .simultaneous_multithreading_enabled
                .map(FirmwareValue::Bool),
        ),
        ("SriovEnabled", config.sriov_enabled.map(FirmwareValue::Bool)),
    ]
}

// =============================================================================
// Mapping
// =============================================================================

/// A vendor BIOS setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiosSetting {
    pub name: String,
    pub value: String,
}

/// Vendor naming for the firmware fields
#[derive(Debug, Clone, Copy, Default)]
pub struct BiosMapping {
    /// Fields to leave out
    pub exclude: &'static [&'static str],
    /// Field name to vendor setting name
    pub names: &'static [(&'static str, &'static str)],
    /// Rendered value to vendor value
    pub values: &'static [(&'static str, &'static str)],
}

const ENABLED_DISABLED: &[(&str, &str)] = &[("true", "Enabled"), ("false", "Disabled")];

/// Dell iDRAC
pub const IDRAC_BIOS: BiosMapping = BiosMapping {
    exclude: &[],
    names: &[
        ("VirtualizationEnabled", "ProcVirtualization"),
        ("SimultaneousMultithreadingEnabled", "LogicalProc"),
        ("SriovEnabled", "SriovGlobalEnable"),
    ],
    values: ENABLED_DISABLED,
};

/// Fujitsu iRMC
pub const IRMC_BIOS: BiosMapping = BiosMapping {
    exclude: &[],
    names: &[
        ("VirtualizationEnabled", "cpu_vt_enabled"),
        ("SimultaneousMultithreadingEnabled", "hyper_threading_enabled"),
        (
            "SriovEnabled",
            "single_root_io_virtualization_support_enabled",
        ),
    ],
    values: &[],
};

/// HPE iLO
pub const ILO_BIOS: BiosMapping = BiosMapping {
    exclude: &[],
    names: &[
        ("VirtualizationEnabled", "ProcVirtualization"),
        ("SimultaneousMultithreadingEnabled", "ProcHyperthreading"),
        ("SriovEnabled", "Sriov"),
    ],
    values: ENABLED_DISABLED,
};

fn lookup<'a>(table: &'a [(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    table
        .iter()
        .find(|(k, v)| *k == key && !v.is_empty())
        .map(|(_, v)| *v)
}

impl BiosMapping {
    /// Translate fields to vendor settings, skipping excluded and unset ones
    pub fn settings(&self, fields: &[(&str, Option<FirmwareValue>)]) -> Vec<BiosSetting> {
        fields
            .iter()
            .filter(|(name, _)| !self.exclude.iter().any(|excluded| excluded == name))
            .filter_map(|(name, value)| {
                let value = value.as_ref()?.render();
                if value.is_empty() {
                    return None;
                }
                Some(BiosSetting {
                    name: lookup(self.names, name).unwrap_or(*name).to_string(),
                    value: lookup(self.values, &value)
                        .map(str::to_string)
                        .unwrap_or(value),
                })
            })
            .collect()
    }
}

/// Build the `bios.apply_configuration` step for a firmware config.
///
/// Returns no steps when there is nothing to apply.
pub fn build_bios_clean_steps(
    firmware: Option<&FirmwareConfig>,
    mapping: &BiosMapping,
) -> Result<Vec<CleanStep>> {
    let Some(firmware) = firmware else {
        return Ok(Vec::new());
    };

    let settings = mapping.settings(&firmware_fields(firmware));
    if settings.is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![CleanStep::new(
        CleanStepInterface::Bios,
        "apply_configuration",
    )
    .with_arg("settings", serde_json::to_value(settings)?)])
}
