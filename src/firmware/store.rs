//! Firmware resource stores
//!
//! Two [`FirmwareStore`] adapters:
//! - [`KubeFirmwareStore`]: the Kubernetes API
//! - [`InMemoryFirmwareStore`]: a map with resource-version checks, for tests
//!   and dry runs

use crate::crd::{FirmwareSchema, HostFirmwareSettings};
use crate::domain::ports::{FirmwareStore, ObjectKey};
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

const SETTINGS_KIND: &str = "HostFirmwareSettings";
const SCHEMA_KIND: &str = "FirmwareSchema";

// =============================================================================
// In-memory Store
// =============================================================================

/// Store keeping resources in memory
#[derive(Debug, Default)]
pub struct InMemoryFirmwareStore {
    settings: RwLock<BTreeMap<ObjectKey, HostFirmwareSettings>>,
    schemas: RwLock<BTreeMap<ObjectKey, FirmwareSchema>>,
    next_version: AtomicUsize,
    injected_conflicts: AtomicUsize,
}

impl InMemoryFirmwareStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_version(&self) -> String {
        (self.next_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Make the next `count` settings updates fail with a conflict
    pub fn inject_conflicts(&self, count: usize) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Schema resources currently stored
    pub fn schema_count(&self) -> usize {
        self.schemas.read().len()
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl FirmwareStore for InMemoryFirmwareStore {
    async fn get_settings(&self, key: &ObjectKey) -> Result<Option<HostFirmwareSettings>> {
        Ok(self.settings.read().get(key).cloned())
    }

    async fn create_settings(&self, hfs: &HostFirmwareSettings) -> Result<HostFirmwareSettings> {
        let key = ObjectKey::of(hfs);
        let mut settings = self.settings.write();
        if settings.contains_key(&key) {
            return Err(Error::ResourceExists {
                kind: SETTINGS_KIND.into(),
                name: key.to_string(),
            });
        }

        let mut created = hfs.clone();
        created.metadata.resource_version = Some(self.bump_version());
        settings.insert(key, created.clone());
        Ok(created)
    }

    async fn update_settings(&self, hfs: &HostFirmwareSettings) -> Result<HostFirmwareSettings> {
        let key = ObjectKey::of(hfs);
        let conflict = || Error::Conflict {
            kind: SETTINGS_KIND.into(),
            name: key.to_string(),
        };

        if self.take_injected_conflict() {
            return Err(conflict());
        }

        let mut settings = self.settings.write();
        let Some(current) = settings.get(&key) else {
            return Err(Error::ResourceNotFound {
                kind: SETTINGS_KIND.into(),
                name: key.to_string(),
            });
        };

        if hfs.metadata.resource_version.is_some()
            && hfs.metadata.resource_version != current.metadata.resource_version
        {
            return Err(conflict());
        }

        let mut updated = hfs.clone();
        updated.metadata.resource_version = Some(self.bump_version());
        settings.insert(key.clone(), updated.clone());
        Ok(updated)
    }

    async fn get_schema(&self, key: &ObjectKey) -> Result<Option<FirmwareSchema>> {
        Ok(self.schemas.read().get(key).cloned())
    }

    async fn create_schema(&self, schema: &FirmwareSchema) -> Result<FirmwareSchema> {
        let key = ObjectKey::of(schema);
        let mut schemas = self.schemas.write();
        if schemas.contains_key(&key) {
            return Err(Error::ResourceExists {
                kind: SCHEMA_KIND.into(),
                name: key.to_string(),
            });
        }

        let mut created = schema.clone();
        created.metadata.resource_version = Some(self.bump_version());
        schemas.insert(key, created.clone());
        Ok(created)
    }
}

// =============================================================================
// Kubernetes Store
// =============================================================================

/// Store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeFirmwareStore {
    client: Client,
}

impl KubeFirmwareStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn settings_api(&self, namespace: &str) -> Api<HostFirmwareSettings> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn schema_api(&self, namespace: &str) -> Api<FirmwareSchema> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Translate write failures into conflict and already-exists errors
fn map_write_error(err: kube::Error, kind: &str, key: &ObjectKey) -> Error {
    match err {
        kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
            Error::ResourceExists {
                kind: kind.to_string(),
                name: key.to_string(),
            }
        }
        kube::Error::Api(ae) if ae.code == 409 => Error::Conflict {
            kind: kind.to_string(),
            name: key.to_string(),
        },
        kube::Error::Api(ae) if ae.code == 404 => Error::ResourceNotFound {
            kind: kind.to_string(),
            name: key.to_string(),
        },
        other => Error::Kube(other),
    }
}

impl KubeFirmwareStore {
    /// Write the status subresource, keeping spec and metadata as stored
    async fn write_status(
        &self,
        stored: HostFirmwareSettings,
        desired: &HostFirmwareSettings,
        key: &ObjectKey,
    ) -> Result<HostFirmwareSettings> {
        if desired.status.is_none() {
            return Ok(stored);
        }

        let mut with_status = stored;
        with_status.status = desired.status.clone();

        self.settings_api(&key.namespace)
            .replace_status(
                &key.name,
                &PostParams::default(),
                serde_json::to_vec(&with_status)?,
            )
            .await
            .map_err(|e| map_write_error(e, SETTINGS_KIND, key))
    }
}

#[async_trait]
impl FirmwareStore for KubeFirmwareStore {
    async fn get_settings(&self, key: &ObjectKey) -> Result<Option<HostFirmwareSettings>> {
        Ok(self.settings_api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn create_settings(&self, hfs: &HostFirmwareSettings) -> Result<HostFirmwareSettings> {
        let key = ObjectKey::of(hfs);
        let created = self
            .settings_api(&key.namespace)
            .create(&PostParams::default(), hfs)
            .await
            .map_err(|e| map_write_error(e, SETTINGS_KIND, &key))?;

        debug!(settings = %key, "Created host firmware settings");
        // status is dropped on create
        self.write_status(created, hfs, &key).await
    }

    async fn update_settings(&self, hfs: &HostFirmwareSettings) -> Result<HostFirmwareSettings> {
        let key = ObjectKey::of(hfs);
        let updated = self
            .settings_api(&key.namespace)
            .replace(&key.name, &PostParams::default(), hfs)
            .await
            .map_err(|e| map_write_error(e, SETTINGS_KIND, &key))?;

        self.write_status(updated, hfs, &key).await
    }

    async fn get_schema(&self, key: &ObjectKey) -> Result<Option<FirmwareSchema>> {
        Ok(self.schema_api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn create_schema(&self, schema: &FirmwareSchema) -> Result<FirmwareSchema> {
        let key = ObjectKey::of(schema);
        let created = self
            .schema_api(&key.namespace)
            .create(&PostParams::default(), schema)
            .await
            .map_err(|e| map_write_error(e, SCHEMA_KIND, &key))?;

        debug!(schema = %key, owner_refs = created.owner_references().len(), "Created firmware schema");
        Ok(created)
    }
}
