//! Provisioning Planners
//!
//! Pure functions computing what to send to the hardware-management service:
//! - RAID layouts and the clean steps that build them
//! - Manual cleaning plans combining RAID and BIOS work
//! - Node property patches, including the capability string
//! - Root device hints and hardware profile defaults

pub mod capabilities;
pub mod cleaning;
pub mod devicehints;
pub mod profile;
pub mod raid;
pub mod update_opts;

pub use capabilities::build_capabilities_value;
pub use cleaning::{build_manual_clean_steps, plan_manual_cleaning, ManualCleaningPlan, PrepareData};
pub use devicehints::{make_hint_map, HintMap};
pub use profile::{get_profile, HardwareProfile, DEFAULT_PROFILE_NAME};
pub use raid::{
    build_raid_clean_steps, build_target_raid_config, check_raid_configure, select_root_volume,
    target_raid_config, DiskType, LogicalDisk, TargetRaidConfig,
};
pub use update_opts::{build_update_opts, NodeRecord, UpdateOp, UpdateOperation};
