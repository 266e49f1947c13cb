//! Custom Resource Definitions for the Bare-Metal Host Operator
//!
//! This module contains all CRD types:
//! - BareMetalHost: Desired hardware configuration of a physical machine
//! - HostFirmwareSettings: Requested and observed BIOS settings of a host
//! - FirmwareSchema: Setting metadata shared by identical hardware

pub mod baremetal_host;
pub mod firmware_schema;
pub mod host_firmware_settings;

pub use baremetal_host::*;
pub use firmware_schema::*;
pub use host_firmware_settings::*;

// Re-export common types for convenience
pub use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
pub use std::collections::BTreeMap;
