//! Bare-Metal Host Operator - Reconciliation Core
//!
//! Kubernetes-side logic for managing physical machines through a
//! hardware-management service: resolving BMC addresses to drivers, planning
//! RAID and BIOS cleaning, building node property patches, and keeping
//! firmware settings resources valid.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                 HostFirmwareSettings Controller                       │
//! │         (kube-runtime, pivot recovery, conflict retry)                │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌────────────────────┐  │
//! │  │  BMC Access      │  │  Provisioning    │  │  Firmware          │  │
//! │  │  Resolver        │  │  Planners        │  │  Validation        │  │
//! │  │  (ipmi, redfish, │  │  (RAID, BIOS,    │  │  (schema naming,   │  │
//! │  │   idrac, ilo...) │  │   capabilities)  │  │   value checks)    │  │
//! │  └──────────────────┘  └──────────────────┘  └────────────────────┘  │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                        Ports & Stores                                 │
//! │  ┌───────────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │  FirmwareStore                │  │  FirmwareProvisioner        │  │
//! │  │  (Kubernetes API, in-memory)  │  │  (hardware settings source) │  │
//! │  └───────────────────────────────┘  └─────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`bmc`]: BMC address parsing and driver access details
//! - [`provisioner`]: RAID, cleaning, capability and node update planners
//! - [`firmware`]: Firmware settings validation, stores and reconciler
//! - [`crd`]: Custom Resource Definitions
//! - [`domain`]: Core domain types and traits
//! - [`error`]: Error types and handling

pub mod bmc;
pub mod crd;
pub mod domain;
pub mod error;
pub mod firmware;
pub mod provisioner;

// Re-export commonly used types
pub use bmc::{AccessDetails, AccessRegistry, Credentials, DriverInfo};

pub use crd::{
    BareMetalHost, BareMetalHostSpec, BareMetalHostStatus, BootMode, FirmwareConfig,
    FirmwareSchema, FirmwareSchemaSpec, HostFirmwareSettings, HostFirmwareSettingsSpec,
    HostFirmwareSettingsStatus, RaidConfig, RootDeviceHints, SettingSchema,
};

pub use domain::{
    CleanStep, CleanStepInterface, FirmwareProvisioner, FirmwareStore, ObjectKey,
};

pub use error::{Error, ErrorAction, Result};

pub use firmware::{
    HostFirmwareSettingsReconciler, InMemoryFirmwareStore, KubeFirmwareStore, ReconcileOutcome,
    ReconcilerConfig,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
