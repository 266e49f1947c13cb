//! HostFirmwareSettings CRD
//!
//! Holds the BIOS settings a user wants applied to a host (spec) next to the
//! settings last read from the hardware (status), plus a reference to the
//! schema describing them.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation recording the schema name, used to recover after a pivot
pub const FIRMWARE_SCHEMA_NAME_ANNOTATION: &str = "firmwareSchemaName";

/// Annotation recording the schema namespace, used to recover after a pivot
pub const FIRMWARE_SCHEMA_NAMESPACE_ANNOTATION: &str = "firmwareSchemaNamespace";

/// Desired setting values
pub type DesiredSettingsMap = BTreeMap<String, IntOrString>;

/// Observed setting values
pub type SettingsMap = BTreeMap<String, String>;

// =============================================================================
// HostFirmwareSettings CRD
// =============================================================================

/// HostFirmwareSettings tracks requested and actual BIOS settings of a host.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "metal3.io",
    derive = "PartialEq",
    version = "v1alpha1",
    kind = "HostFirmwareSettings",
    plural = "hostfirmwaresettings",
    shortname = "hfs",
    status = "HostFirmwareSettingsStatus",
    printcolumn = r#"{"name": "Schema", "type": "string", "jsonPath": ".status.schema.name"}"#,
    printcolumn = r#"{"name": "Updated", "type": "date", "jsonPath": ".status.lastUpdated"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HostFirmwareSettingsSpec {
    /// Settings the user wants applied
    #[serde(default)]
    pub settings: DesiredSettingsMap,
}

/// Reference to a FirmwareSchema resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaReference {
    pub namespace: String,
    pub name: String,
}

// =============================================================================
// Status
// =============================================================================

/// Settings last read from the hardware
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostFirmwareSettingsStatus {
    /// Schema describing the settings
    #[serde(rename = "schema", default)]
    pub firmware_schema: Option<SchemaReference>,

    /// Current setting values; empty after a pivot until re-read
    #[serde(default)]
    pub settings: SettingsMap,

    /// Last time the settings were read
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl HostFirmwareSettings {
    /// Observed settings, empty when the status was never written or was cleared
    pub fn observed_settings(&self) -> Option<&SettingsMap> {
        self.status
            .as_ref()
            .map(|s| &s.settings)
            .filter(|s| !s.is_empty())
    }

    /// Schema reference recorded in the status
    pub fn schema_reference(&self) -> Option<&SchemaReference> {
        self.status.as_ref().and_then(|s| s.firmware_schema.as_ref())
    }

    /// Schema reference recorded in the annotations
    pub fn annotated_schema_reference(&self) -> Option<SchemaReference> {
        let annotations = self.metadata.annotations.as_ref()?;
        let name = annotations.get(FIRMWARE_SCHEMA_NAME_ANNOTATION)?;
        let namespace = annotations
            .get(FIRMWARE_SCHEMA_NAMESPACE_ANNOTATION)
            .cloned()
            .unwrap_or_default();

        Some(SchemaReference {
            namespace,
            name: name.clone(),
        })
    }

    /// Record a schema reference in both the annotations and the status
    pub fn set_schema_reference(&mut self, reference: SchemaReference) {
        let annotations = self.metadata.annotations.get_or_insert_with(BTreeMap::new);
        annotations.insert(
            FIRMWARE_SCHEMA_NAME_ANNOTATION.to_string(),
            reference.name.clone(),
        );
        annotations.insert(
            FIRMWARE_SCHEMA_NAMESPACE_ANNOTATION.to_string(),
            reference.namespace.clone(),
        );

        self.status
            .get_or_insert_with(HostFirmwareSettingsStatus::default)
            .firmware_schema = Some(reference);
    }
}
