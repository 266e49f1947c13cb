//! Firmware settings management
//!
//! - [`validation`]: schema naming and desired-settings checks
//! - [`store`]: Kubernetes and in-memory resource stores
//! - [`reconciler`]: storing observed settings, pivot recovery, validation
//! - [`controller`]: kube-runtime controller around the reconciler

pub mod controller;
pub mod reconciler;
pub mod store;
pub mod validation;

pub use reconciler::{HostFirmwareSettingsReconciler, ReconcileOutcome, ReconcilerConfig};
pub use store::{InMemoryFirmwareStore, KubeFirmwareStore};
pub use validation::{schema_name, validate_host_firmware_settings, validate_settings};
