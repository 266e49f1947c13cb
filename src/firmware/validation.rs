//! Firmware settings validation
//!
//! Checks the settings a user asks for against the settings the hardware
//! reported and, when available, the schema describing them.

use crate::crd::{
    int_or_string_value, FirmwareSchema, HostFirmwareSettings, IntOrString, SchemaMap,
    SettingsMap,
};
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};

/// Prefix of generated schema names
pub const SCHEMA_NAME_PREFIX: &str = "schema-";

/// Settings whose names contain this are never exposed or accepted
pub const PASSWORD_MARKER: &str = "Password";

/// Whether a setting holds a password
pub fn is_password_setting(name: &str) -> bool {
    name.contains(PASSWORD_MARKER)
}

/// Name shared by all schemas with the same setting names.
///
/// Only the keys are hashed, so schemas with equal names but different
/// bounds map to the same resource.
pub fn schema_name(schema: &SchemaMap) -> String {
    let mut keys: Vec<&str> = schema.keys().map(String::as_str).collect();
    keys.sort_unstable();

    let digest = Sha256::digest(format!("[{}]", keys.join(" ")).as_bytes());
    let hash = hex::encode(digest);

    format!("{SCHEMA_NAME_PREFIX}{}", &hash[..8])
}

/// Check one desired value against the schema; settings the schema does not
/// describe are accepted
pub fn check_setting_is_valid(schema: &SchemaMap, name: &str, value: &IntOrString) -> bool {
    schema
        .get(name)
        .map_or(true, |entry| entry.check_value(value))
}

/// Validate desired settings in iteration order, stopping at the first
/// violation
pub fn validate_settings<'a, K, I>(
    desired: I,
    observed: &SettingsMap,
    schema: Option<&SchemaMap>,
) -> Result<()>
where
    K: AsRef<str>,
    I: IntoIterator<Item = (K, &'a IntOrString)>,
{
    for (name, value) in desired {
        let name = name.as_ref();

        if is_password_setting(name) || !observed.contains_key(name) {
            return Err(Error::InvalidHostFirmwareName {
                name: name.to_string(),
            });
        }

        if let Some(schema) = schema {
            if !check_setting_is_valid(schema, name, value) {
                return Err(Error::InvalidHostFirmwareValue {
                    name: name.to_string(),
                    value: int_or_string_value(value),
                });
            }
        }
    }

    Ok(())
}

/// Validate the spec of a settings resource against its status and schema
pub fn validate_host_firmware_settings(
    hfs: &HostFirmwareSettings,
    schema: Option<&FirmwareSchema>,
) -> Result<()> {
    let empty = SettingsMap::new();
    let observed = hfs.status.as_ref().map_or(&empty, |s| &s.settings);

    validate_settings(
        &hfs.spec.settings,
        observed,
        schema.map(|s| &s.spec.schema),
    )
}
