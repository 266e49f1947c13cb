//! HostFirmwareSettings reconciliation
//!
//! Keeps settings resources in line with what the hardware reports and
//! checks the settings users ask for. All reads and writes go through a
//! [`FirmwareStore`](crate::domain::ports::FirmwareStore); writes that lose an
//! optimistic-concurrency race are retried from a fresh read.

use super::validation::{is_password_setting, schema_name, validate_host_firmware_settings};
use crate::crd::{
    FirmwareSchema, FirmwareSchemaSpec, HostFirmwareSettings, HostFirmwareSettingsSpec,
    HostFirmwareSettingsStatus, IntOrString, SchemaMap, SchemaReference, SettingSchema,
    SettingsMap,
};
use crate::domain::ports::{FirmwareProvisioner, FirmwareStore, FirmwareStoreRef, ObjectKey};
use crate::error::{Error, Result};
use backoff::ExponentialBackoff;
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Reconciler configuration
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Give up retrying conflicting writes after this long
    pub conflict_retry_timeout: Duration,
    /// First delay between conflicting writes
    pub conflict_retry_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            conflict_retry_timeout: Duration::from_secs(30),
            conflict_retry_interval: Duration::from_millis(100),
        }
    }
}

/// Result of one reconcile pass
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The settings resource does not exist
    NotFound,
    /// Observed settings are empty and must be read from the hardware again
    SettingsCleared,
    /// The referenced schema resource does not exist
    SchemaMissing(SchemaReference),
    /// The desired settings were rejected
    InvalidSpec(Error),
    Valid,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Reconciles HostFirmwareSettings resources
pub struct HostFirmwareSettingsReconciler {
    store: FirmwareStoreRef,
    config: ReconcilerConfig,
}

impl HostFirmwareSettingsReconciler {
    pub fn new(store: FirmwareStoreRef, config: ReconcilerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Check a settings resource, restoring its schema reference after a pivot
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let Some(hfs) = self
            .retry_on_conflict(|| self.restore_schema_reference(key))
            .await?
        else {
            debug!(settings = %key, "Host firmware settings not found");
            return Ok(ReconcileOutcome::NotFound);
        };

        if hfs.observed_settings().is_none() {
            info!(settings = %key, "Observed firmware settings are empty");
            return Ok(ReconcileOutcome::SettingsCleared);
        }

        let schema = match hfs.schema_reference() {
            Some(reference) => {
                match self.store.get_schema(&schema_key(key, reference)).await? {
                    Some(schema) => Some(schema),
                    None => {
                        warn!(settings = %key, schema = %reference.name, "Firmware schema not found");
                        return Ok(ReconcileOutcome::SchemaMissing(reference.clone()));
                    }
                }
            }
            None => None,
        };

        match validate_host_firmware_settings(&hfs, schema.as_ref()) {
            Ok(()) => {
                debug!(settings = %key, "Host firmware settings are valid");
                Ok(ReconcileOutcome::Valid)
            }
            Err(e) => {
                warn!(settings = %key, error = %e, "Invalid host firmware settings");
                Ok(ReconcileOutcome::InvalidSpec(e))
            }
        }
    }

    /// Record settings and schema read from the hardware.
    ///
    /// Password settings are dropped. A new resource gets every writable
    /// setting in its spec; an existing one keeps its desired values and
    /// only gains settings it has not seen before.
    pub async fn store_host_firmware_settings(
        &self,
        key: &ObjectKey,
        settings: SettingsMap,
        schema: SchemaMap,
    ) -> Result<HostFirmwareSettings> {
        let observed: SettingsMap = settings
            .into_iter()
            .filter(|(name, _)| !is_password_setting(name))
            .collect();

        let reference = (!schema.is_empty()).then(|| SchemaReference {
            namespace: key.namespace.clone(),
            name: schema_name(&schema),
        });

        let hfs = self
            .retry_on_conflict(|| self.write_settings(key, &observed, &schema, reference.as_ref()))
            .await?;

        if let Some(reference) = &reference {
            self.ensure_schema(&hfs, reference, schema).await?;
        }

        info!(
            settings = %key,
            observed = observed.len(),
            schema = reference.as_ref().map(|r| r.name.as_str()).unwrap_or("none"),
            "Stored host firmware settings"
        );
        Ok(hfs)
    }

    /// Load and validate a settings resource, re-reading the hardware when
    /// the observed settings were cleared
    pub async fn get_host_firmware_settings(
        &self,
        key: &ObjectKey,
        provisioner: &dyn FirmwareProvisioner,
    ) -> Result<HostFirmwareSettings> {
        let mut hfs = self
            .store
            .get_settings(key)
            .await?
            .ok_or_else(|| Error::ResourceNotFound {
                kind: HostFirmwareSettings::kind(&()).to_string(),
                name: key.to_string(),
            })?;

        if hfs.observed_settings().is_none() {
            info!(settings = %key, "Observed firmware settings are empty, reading them from the hardware");
            let (settings, schema) = provisioner.get_firmware_settings(true).await?;
            hfs = self.store_host_firmware_settings(key, settings, schema).await?;
        }

        let schema = match hfs.schema_reference() {
            Some(reference) => {
                let schema = self
                    .store
                    .get_schema(&schema_key(key, reference))
                    .await?
                    .ok_or_else(|| Error::ResourceNotFound {
                        kind: FirmwareSchema::kind(&()).to_string(),
                        name: reference.name.clone(),
                    })?;
                Some(schema)
            }
            None => None,
        };

        validate_host_firmware_settings(&hfs, schema.as_ref())?;
        Ok(hfs)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn retry_on_conflict<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let policy = ExponentialBackoff {
            current_interval: self.config.conflict_retry_interval,
            initial_interval: self.config.conflict_retry_interval,
            max_elapsed_time: Some(self.config.conflict_retry_timeout),
            ..Default::default()
        };

        backoff::future::retry(policy, || {
            let attempt = op();
            async move {
                attempt.await.map_err(|e| {
                    if e.is_conflict() {
                        debug!(error = %e, "Write conflicted, retrying");
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await
    }

    async fn restore_schema_reference(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<HostFirmwareSettings>> {
        let Some(mut hfs) = self.store.get_settings(key).await? else {
            return Ok(None);
        };

        if hfs.schema_reference().is_some() {
            return Ok(Some(hfs));
        }
        let Some(mut reference) = hfs.annotated_schema_reference() else {
            return Ok(Some(hfs));
        };
        if reference.namespace.is_empty() {
            reference.namespace = key.namespace.clone();
        }

        info!(settings = %key, schema = %reference.name, "Restoring firmware schema reference from annotations");
        hfs.set_schema_reference(reference);
        self.store.update_settings(&hfs).await.map(Some)
    }

    async fn write_settings(
        &self,
        key: &ObjectKey,
        observed: &SettingsMap,
        schema: &SchemaMap,
        reference: Option<&SchemaReference>,
    ) -> Result<HostFirmwareSettings> {
        let writable = |name: &str| schema.get(name).map_or(true, SettingSchema::is_writable);
        let status = HostFirmwareSettingsStatus {
            firmware_schema: None,
            settings: observed.clone(),
            last_updated: Some(Utc::now()),
        };

        match self.store.get_settings(key).await? {
            None => {
                let desired = observed
                    .iter()
                    .filter(|(name, _)| writable(name.as_str()))
                    .map(|(name, value)| (name.clone(), IntOrString::String(value.clone())))
                    .collect();

                let mut hfs =
                    HostFirmwareSettings::new(&key.name, HostFirmwareSettingsSpec { settings: desired });
                hfs.metadata.namespace = Some(key.namespace.clone());
                hfs.status = Some(status);
                if let Some(reference) = reference {
                    hfs.set_schema_reference(reference.clone());
                }

                debug!(settings = %key, desired = hfs.spec.settings.len(), "Creating host firmware settings");
                self.store.create_settings(&hfs).await.map_err(|e| match e {
                    // created by another writer since the read; retry takes the update path
                    Error::ResourceExists { kind, name } => Error::Conflict { kind, name },
                    e => e,
                })
            }
            Some(mut hfs) => {
                for (name, value) in observed {
                    if writable(name.as_str()) && !hfs.spec.settings.contains_key(name) {
                        hfs.spec
                            .settings
                            .insert(name.clone(), IntOrString::String(value.clone()));
                    }
                }

                hfs.status = Some(status);
                if let Some(reference) = reference {
                    hfs.set_schema_reference(reference.clone());
                }

                debug!(settings = %key, desired = hfs.spec.settings.len(), "Updating host firmware settings");
                self.store.update_settings(&hfs).await
            }
        }
    }

    async fn ensure_schema(
        &self,
        owner: &HostFirmwareSettings,
        reference: &SchemaReference,
        schema: SchemaMap,
    ) -> Result<()> {
        let key = ObjectKey::new(&reference.namespace, &reference.name);
        if self.store.get_schema(&key).await?.is_some() {
            debug!(schema = %key, "Firmware schema already exists");
            return Ok(());
        }

        let mut resource = FirmwareSchema::new(
            &reference.name,
            FirmwareSchemaSpec {
                schema,
                ..Default::default()
            },
        );
        resource.metadata.namespace = Some(reference.namespace.clone());
        resource.metadata.owner_references = Some(vec![OwnerReference {
            api_version: HostFirmwareSettings::api_version(&()).to_string(),
            kind: HostFirmwareSettings::kind(&()).to_string(),
            name: owner.name_any(),
            uid: owner.uid().unwrap_or_default(),
            ..Default::default()
        }]);

        match self.store.create_schema(&resource).await {
            Ok(_) => {
                info!(schema = %key, "Created firmware schema");
                Ok(())
            }
            // another host with the same settings got there first
            Err(Error::ResourceExists { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn schema_key(key: &ObjectKey, reference: &SchemaReference) -> ObjectKey {
    let namespace = if reference.namespace.is_empty() {
        &key.namespace
    } else {
        &reference.namespace
    };
    ObjectKey::new(namespace, &reference.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        FIRMWARE_SCHEMA_NAMESPACE_ANNOTATION, FIRMWARE_SCHEMA_NAME_ANNOTATION,
    };
    use crate::firmware::store::InMemoryFirmwareStore;
    use crate::firmware::validation::tests::{test_observed, test_schema};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const HOST_NAME: &str = "myHostName";
    const HOST_NAMESPACE: &str = "myHostNamespace";
    const SCHEMA_NAME: &str = "schema-6579d6c1";

    struct MockProvisioner {
        settings: SettingsMap,
        schema: SchemaMap,
        calls: AtomicUsize,
    }

    impl MockProvisioner {
        fn new(settings: SettingsMap, schema: SchemaMap) -> Self {
            Self {
                settings,
                schema,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FirmwareProvisioner for MockProvisioner {
        async fn get_firmware_settings(
            &self,
            include_schema: bool,
        ) -> Result<(SettingsMap, SchemaMap)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let schema = if include_schema {
                self.schema.clone()
            } else {
                SchemaMap::new()
            };
            Ok((self.settings.clone(), schema))
        }
    }

    fn key() -> ObjectKey {
        ObjectKey::new(HOST_NAMESPACE, HOST_NAME)
    }

    fn reference() -> SchemaReference {
        SchemaReference {
            namespace: HOST_NAMESPACE.into(),
            name: SCHEMA_NAME.into(),
        }
    }

    fn settings(pairs: &[(&str, &str)]) -> SettingsMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn desired(pairs: &[(&str, &str)]) -> BTreeMap<String, IntOrString> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), IntOrString::String(v.to_string())))
            .collect()
    }

    fn test_config() -> ReconcilerConfig {
        ReconcilerConfig {
            conflict_retry_timeout: Duration::from_millis(200),
            conflict_retry_interval: Duration::from_millis(1),
        }
    }

    fn reconciler(store: Arc<InMemoryFirmwareStore>) -> HostFirmwareSettingsReconciler {
        HostFirmwareSettingsReconciler::new(store, test_config())
    }

    /// Store that loses create races against other writers
    struct RacingStore {
        inner: Arc<InMemoryFirmwareStore>,
        /// Seeded into `inner` just before the next settings create
        competing_settings: parking_lot::Mutex<Option<HostFirmwareSettings>>,
        /// Hide existing schemas from reads so creates collide
        hide_schemas: bool,
    }

    #[async_trait]
    impl FirmwareStore for RacingStore {
        async fn get_settings(&self, key: &ObjectKey) -> Result<Option<HostFirmwareSettings>> {
            self.inner.get_settings(key).await
        }

        async fn create_settings(&self, hfs: &HostFirmwareSettings) -> Result<HostFirmwareSettings> {
            let competing = self.competing_settings.lock().take();
            if let Some(competing) = competing {
                self.inner.create_settings(&competing).await?;
            }
            self.inner.create_settings(hfs).await
        }

        async fn update_settings(&self, hfs: &HostFirmwareSettings) -> Result<HostFirmwareSettings> {
            self.inner.update_settings(hfs).await
        }

        async fn get_schema(&self, key: &ObjectKey) -> Result<Option<FirmwareSchema>> {
            if self.hide_schemas {
                return Ok(None);
            }
            self.inner.get_schema(key).await
        }

        async fn create_schema(&self, schema: &FirmwareSchema) -> Result<FirmwareSchema> {
            self.inner.create_schema(schema).await
        }
    }

    async fn seed_schema(store: &InMemoryFirmwareStore) {
        let mut schema = FirmwareSchema::new(
            SCHEMA_NAME,
            FirmwareSchemaSpec {
                schema: test_schema(),
                ..Default::default()
            },
        );
        schema.metadata.namespace = Some(HOST_NAMESPACE.into());
        store.create_schema(&schema).await.unwrap();
    }

    async fn seed_settings(
        store: &InMemoryFirmwareStore,
        spec: &[(&str, &str)],
        observed: SettingsMap,
        with_schema: bool,
    ) {
        let mut hfs = HostFirmwareSettings::new(
            HOST_NAME,
            HostFirmwareSettingsSpec {
                settings: desired(spec),
            },
        );
        hfs.metadata.namespace = Some(HOST_NAMESPACE.into());
        hfs.status = Some(HostFirmwareSettingsStatus {
            settings: observed,
            ..Default::default()
        });
        if with_schema {
            hfs.set_schema_reference(reference());
        }
        store.create_settings(&hfs).await.unwrap();
    }

    async fn stored(store: &InMemoryFirmwareStore) -> HostFirmwareSettings {
        store.get_settings(&key()).await.unwrap().unwrap()
    }

    // =========================================================================
    // store_host_firmware_settings
    // =========================================================================

    #[tokio::test]
    async fn test_store_new_settings_only() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        let r = reconciler(store.clone());

        let current = settings(&[
            ("L2Cache", "10x256 KB"),
            ("NetworkBootRetryCount", "10"),
            ("ProcVirtualization", "Enabled"),
            ("SysPassword", ""),
        ]);
        r.store_host_firmware_settings(&key(), current, SchemaMap::new())
            .await
            .unwrap();

        let hfs = stored(&store).await;
        assert_eq!(
            hfs.spec.settings,
            desired(&[
                ("L2Cache", "10x256 KB"),
                ("NetworkBootRetryCount", "10"),
                ("ProcVirtualization", "Enabled"),
            ])
        );
        let status = hfs.status.as_ref().unwrap();
        assert_eq!(
            status.settings,
            settings(&[
                ("L2Cache", "10x256 KB"),
                ("NetworkBootRetryCount", "10"),
                ("ProcVirtualization", "Enabled"),
            ])
        );
        assert!(status.firmware_schema.is_none());
        assert!(status.last_updated.is_some());
        assert!(hfs.metadata.annotations.is_none());
        assert_eq!(store.schema_count(), 0);
    }

    #[tokio::test]
    async fn test_store_new_settings_and_schema() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        let r = reconciler(store.clone());

        let current = settings(&[
            ("AssetTag", "X45672917"),
            ("L2Cache", "10x256 KB"),
            ("NetworkBootRetryCount", "10"),
            ("ProcVirtualization", "Enabled"),
        ]);
        r.store_host_firmware_settings(&key(), current.clone(), test_schema())
            .await
            .unwrap();

        let hfs = stored(&store).await;
        // read-only and unique settings stay out of the spec
        assert_eq!(
            hfs.spec.settings,
            desired(&[("NetworkBootRetryCount", "10"), ("ProcVirtualization", "Enabled")])
        );
        assert_eq!(hfs.status.as_ref().unwrap().settings, current);
        assert_eq!(hfs.schema_reference(), Some(&reference()));

        let annotations = hfs.metadata.annotations.as_ref().unwrap();
        assert_eq!(annotations[FIRMWARE_SCHEMA_NAME_ANNOTATION], SCHEMA_NAME);
        assert_eq!(annotations[FIRMWARE_SCHEMA_NAMESPACE_ANNOTATION], HOST_NAMESPACE);

        let schema = store
            .get_schema(&ObjectKey::new(HOST_NAMESPACE, SCHEMA_NAME))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(schema.spec.schema, test_schema());

        let owners = schema.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].api_version, "metal3.io/v1alpha1");
        assert_eq!(owners[0].kind, "HostFirmwareSettings");
        assert_eq!(owners[0].name, HOST_NAME);
    }

    #[tokio::test]
    async fn test_store_updated_settings_no_schema() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        let r = reconciler(store.clone());

        let initial = &[
            ("L2Cache", "10x256 KB"),
            ("NetworkBootRetryCount", "10"),
            ("ProcVirtualization", "Enabled"),
        ];
        seed_settings(&store, initial, settings(initial), false).await;

        let current = settings(&[
            ("L2Cache", "10x512 KB"),
            ("NetworkBootRetryCount", "20"),
            ("ProcVirtualization", "Disabled"),
            ("SecureBoot", "Enabled"),
            ("AssetTag", "X45672917"),
        ]);
        r.store_host_firmware_settings(&key(), current.clone(), SchemaMap::new())
            .await
            .unwrap();

        let hfs = stored(&store).await;
        assert_eq!(
            hfs.spec.settings,
            desired(&[
                ("AssetTag", "X45672917"),
                ("L2Cache", "10x256 KB"),
                ("NetworkBootRetryCount", "10"),
                ("ProcVirtualization", "Enabled"),
                ("SecureBoot", "Enabled"),
            ])
        );
        assert_eq!(hfs.status.as_ref().unwrap().settings, current);
        assert!(hfs.schema_reference().is_none());
        assert_eq!(hfs.metadata.resource_version.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_store_new_settings_existing_schema() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        seed_schema(&store).await;
        let r = reconciler(store.clone());

        let current = settings(&[
            ("L2Cache", "10x512 KB"),
            ("NetworkBootRetryCount", "10"),
            ("ProcVirtualization", "Disabled"),
        ]);
        r.store_host_firmware_settings(&key(), current.clone(), test_schema())
            .await
            .unwrap();

        let hfs = stored(&store).await;
        assert_eq!(
            hfs.spec.settings,
            desired(&[("NetworkBootRetryCount", "10"), ("ProcVirtualization", "Disabled")])
        );
        assert_eq!(hfs.status.as_ref().unwrap().settings, current);
        assert_eq!(hfs.schema_reference(), Some(&reference()));
        assert_eq!(store.schema_count(), 1);
    }

    #[tokio::test]
    async fn test_store_retries_conflicts() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        seed_settings(&store, &[], test_observed(), false).await;
        let r = reconciler(store.clone());

        store.inject_conflicts(2);
        let hfs = r
            .store_host_firmware_settings(&key(), test_observed(), SchemaMap::new())
            .await
            .unwrap();
        assert_eq!(hfs.spec.settings.len(), test_observed().len());
    }

    #[tokio::test]
    async fn test_store_gives_up_on_persistent_conflict() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        seed_settings(&store, &[], test_observed(), false).await;
        let r = reconciler(store.clone());

        store.inject_conflicts(usize::MAX);
        assert_matches!(
            r.store_host_firmware_settings(&key(), test_observed(), SchemaMap::new())
                .await,
            Err(Error::Conflict { .. })
        );
    }

    #[tokio::test]
    async fn test_store_settings_created_concurrently() {
        let inner = Arc::new(InMemoryFirmwareStore::new());
        let mut competing = HostFirmwareSettings::new(
            HOST_NAME,
            HostFirmwareSettingsSpec {
                settings: desired(&[("ProcVirtualization", "Disabled")]),
            },
        );
        competing.metadata.namespace = Some(HOST_NAMESPACE.into());

        let store = Arc::new(RacingStore {
            inner: inner.clone(),
            competing_settings: parking_lot::Mutex::new(Some(competing)),
            hide_schemas: false,
        });
        let r = HostFirmwareSettingsReconciler::new(store, test_config());

        let hfs = r
            .store_host_firmware_settings(&key(), test_observed(), test_schema())
            .await
            .unwrap();

        // the losing create falls back to updating the other writer's resource
        assert_eq!(hfs.metadata.resource_version.as_deref(), Some("2"));
        assert_eq!(
            hfs.spec.settings.get("ProcVirtualization"),
            Some(&IntOrString::String("Disabled".into()))
        );
        assert_eq!(hfs.status.as_ref().unwrap().settings, test_observed());
        assert_eq!(hfs.schema_reference(), Some(&reference()));
        assert_eq!(stored(&inner).await, hfs);
        assert_eq!(inner.schema_count(), 1);
    }

    #[tokio::test]
    async fn test_store_schema_created_concurrently() {
        let inner = Arc::new(InMemoryFirmwareStore::new());
        seed_schema(&inner).await;

        let store = Arc::new(RacingStore {
            inner: inner.clone(),
            competing_settings: parking_lot::Mutex::new(None),
            hide_schemas: true,
        });
        let r = HostFirmwareSettingsReconciler::new(store, test_config());

        let hfs = r
            .store_host_firmware_settings(&key(), test_observed(), test_schema())
            .await
            .unwrap();

        assert_eq!(hfs.schema_reference(), Some(&reference()));
        assert_eq!(stored(&inner).await.schema_reference(), Some(&reference()));
        assert_eq!(inner.schema_count(), 1);

        // the schema that won the race is left as it was
        let schema = inner
            .get_schema(&ObjectKey::new(HOST_NAMESPACE, SCHEMA_NAME))
            .await
            .unwrap()
            .unwrap();
        assert!(schema.metadata.owner_references.is_none());
    }

    // =========================================================================
    // get_host_firmware_settings
    // =========================================================================

    async fn get_with_spec(
        spec: &[(&str, &str)],
        with_schema: bool,
    ) -> Result<HostFirmwareSettings> {
        let store = Arc::new(InMemoryFirmwareStore::new());
        if with_schema {
            seed_schema(&store).await;
        }
        seed_settings(&store, spec, test_observed(), with_schema).await;

        let provisioner = MockProvisioner::new(test_observed(), test_schema());
        let result = reconciler(store)
            .get_host_firmware_settings(&key(), &provisioner)
            .await;
        assert_eq!(provisioner.calls.load(Ordering::SeqCst), 0);
        result
    }

    #[tokio::test]
    async fn test_get_valid_no_schema() {
        let spec = &[
            ("L2Cache", "10x512 KB"),
            ("ProcVirtualization", "Disabled"),
            ("NetworkBootRetryCount", "20"),
        ];
        let hfs = get_with_spec(spec, false).await.unwrap();
        assert_eq!(hfs.spec.settings, desired(spec));
        assert_eq!(hfs.status.unwrap().settings, test_observed());
    }

    #[tokio::test]
    async fn test_get_valid_with_schema() {
        let spec = &[
            ("CustomPostMessage", "All tests passed"),
            ("ProcVirtualization", "Disabled"),
            ("NetworkBootRetryCount", "20"),
        ];
        let hfs = get_with_spec(spec, true).await.unwrap();
        assert_eq!(hfs.spec.settings, desired(spec));
    }

    #[tokio::test]
    async fn test_get_invalid_values() {
        let cases = [
            ("CustomPostMessage", "A really long POST message"),
            ("NetworkBootRetryCount", "2000"),
            ("ProcVirtualization", "Not enabled"),
        ];

        for (name, value) in cases {
            let mut spec = vec![
                ("CustomPostMessage", "All tests passed"),
                ("ProcVirtualization", "Disabled"),
                ("NetworkBootRetryCount", "20"),
            ];
            for entry in spec.iter_mut() {
                if entry.0 == name {
                    entry.1 = value;
                }
            }

            assert_matches!(
                get_with_spec(&spec, true).await,
                Err(Error::InvalidHostFirmwareValue { name: n, value: v }) if n == name && v == value
            );
        }
    }

    #[tokio::test]
    async fn test_get_invalid_names() {
        assert_matches!(
            get_with_spec(&[("SomeNewSetting", "foo")], true).await,
            Err(Error::InvalidHostFirmwareName { name }) if name == "SomeNewSetting"
        );

        assert_matches!(
            get_with_spec(
                &[
                    ("CustomPostMessage", "All tests passed"),
                    ("SysPassword", "Pa%$word"),
                ],
                true
            )
            .await,
            Err(Error::InvalidHostFirmwareName { name }) if name == "SysPassword"
        );
    }

    #[tokio::test]
    async fn test_get_missing_resource() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        let provisioner = MockProvisioner::new(test_observed(), test_schema());
        assert_matches!(
            reconciler(store)
                .get_host_firmware_settings(&key(), &provisioner)
                .await,
            Err(Error::ResourceNotFound { .. })
        );
    }

    #[tokio::test]
    async fn test_get_restores_cleared_settings() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        let spec = &[
            ("CustomPostMessage", "All tests passed"),
            ("ProcVirtualization", "Disabled"),
            ("NetworkBootRetryCount", "20"),
        ];
        seed_settings(&store, spec, SettingsMap::new(), false).await;

        let mut observed = test_observed();
        observed.insert("SysPassword".into(), String::new());
        let provisioner = MockProvisioner::new(observed, test_schema());

        let hfs = reconciler(store.clone())
            .get_host_firmware_settings(&key(), &provisioner)
            .await
            .unwrap();

        assert_eq!(provisioner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(hfs.status.as_ref().unwrap().settings, test_observed());
        assert_eq!(hfs.schema_reference(), Some(&reference()));
        assert_eq!(hfs.spec.settings.get("ProcVirtualization"), desired(spec).get("ProcVirtualization"));
        assert_eq!(store.schema_count(), 1);
    }

    // =========================================================================
    // reconcile
    // =========================================================================

    #[tokio::test]
    async fn test_reconcile_not_found() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        assert_matches!(
            reconciler(store).reconcile(&key()).await,
            Ok(ReconcileOutcome::NotFound)
        );
    }

    #[tokio::test]
    async fn test_reconcile_valid_and_invalid() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        seed_schema(&store).await;
        seed_settings(&store, &[("ProcVirtualization", "Disabled")], test_observed(), true).await;
        let r = reconciler(store.clone());

        assert_matches!(r.reconcile(&key()).await, Ok(ReconcileOutcome::Valid));

        let mut hfs = stored(&store).await;
        hfs.spec
            .settings
            .insert("ProcVirtualization".into(), IntOrString::String("Not enabled".into()));
        store.update_settings(&hfs).await.unwrap();

        assert_matches!(
            r.reconcile(&key()).await,
            Ok(ReconcileOutcome::InvalidSpec(Error::InvalidHostFirmwareValue { name, .. }))
                if name == "ProcVirtualization"
        );
        // status is left alone
        assert_eq!(stored(&store).await.status, hfs.status);
    }

    #[tokio::test]
    async fn test_reconcile_schema_missing() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        seed_settings(&store, &[], test_observed(), true).await;

        assert_matches!(
            reconciler(store).reconcile(&key()).await,
            Ok(ReconcileOutcome::SchemaMissing(r)) if r.name == SCHEMA_NAME
        );
    }

    #[tokio::test]
    async fn test_reconcile_restores_schema_reference() {
        let store = Arc::new(InMemoryFirmwareStore::new());
        seed_schema(&store).await;

        let mut hfs = HostFirmwareSettings::new(HOST_NAME, HostFirmwareSettingsSpec::default());
        hfs.metadata.namespace = Some(HOST_NAMESPACE.into());
        hfs.metadata.annotations = Some(BTreeMap::from([
            (FIRMWARE_SCHEMA_NAME_ANNOTATION.to_string(), SCHEMA_NAME.to_string()),
            (FIRMWARE_SCHEMA_NAMESPACE_ANNOTATION.to_string(), HOST_NAMESPACE.to_string()),
        ]));
        store.create_settings(&hfs).await.unwrap();

        assert_matches!(
            reconciler(store.clone()).reconcile(&key()).await,
            Ok(ReconcileOutcome::SettingsCleared)
        );

        let hfs = stored(&store).await;
        assert_eq!(hfs.schema_reference(), Some(&reference()));
    }
}
