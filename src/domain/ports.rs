//! Domain Ports - Core trait definitions for the host operator
//!
//! These traits define the boundaries between the reconciliation logic and
//! external systems. Adapters implement these traits to provide concrete
//! functionality: the Kubernetes API or an in-memory store for resources,
//! and the hardware-management service for firmware data.

use crate::crd::{FirmwareSchema, HostFirmwareSettings, SchemaMap, SettingsMap};
use crate::error::Result;
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;

// =============================================================================
// Object Keys
// =============================================================================

/// Namespaced name of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing resource
    pub fn of<K: ResourceExt>(resource: &K) -> Self {
        Self {
            namespace: resource.namespace().unwrap_or_default(),
            name: resource.name_any(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// =============================================================================
// Resource Store Port
// =============================================================================

/// Access to the firmware resources of the cluster
#[async_trait]
pub trait FirmwareStore: Send + Sync {
    /// Fetch a settings resource; `None` when it does not exist
    async fn get_settings(&self, key: &ObjectKey) -> Result<Option<HostFirmwareSettings>>;

    /// Create a settings resource
    async fn create_settings(&self, hfs: &HostFirmwareSettings) -> Result<HostFirmwareSettings>;

    /// Write spec, metadata and status of a settings resource.
    /// Fails with `Error::Conflict` when the resource version is stale.
    async fn update_settings(&self, hfs: &HostFirmwareSettings) -> Result<HostFirmwareSettings>;

    /// Fetch a schema resource; `None` when it does not exist
    async fn get_schema(&self, key: &ObjectKey) -> Result<Option<FirmwareSchema>>;

    /// Create a schema resource.
    /// Fails with `Error::ResourceExists` when the name is taken.
    async fn create_schema(&self, schema: &FirmwareSchema) -> Result<FirmwareSchema>;
}

// =============================================================================
// Provisioner Port
// =============================================================================

/// Firmware data reported by the hardware-management service for one host
#[async_trait]
pub trait FirmwareProvisioner: Send + Sync {
    /// Current BIOS settings, and their schema when `include_schema` is set
    async fn get_firmware_settings(&self, include_schema: bool)
        -> Result<(SettingsMap, SchemaMap)>;
}

// =============================================================================
// Type Aliases
// =============================================================================

pub type FirmwareStoreRef = Arc<dyn FirmwareStore>;
