//! FirmwareSchema CRD
//!
//! Describes the BIOS settings a model of hardware exposes: their types,
//! bounds and allowed values. Hosts with the same set of setting names share
//! a single schema resource.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Setting name to schema entry
pub type SchemaMap = BTreeMap<String, SettingSchema>;

// =============================================================================
// FirmwareSchema CRD
// =============================================================================

/// FirmwareSchema holds the setting metadata reported by the hardware.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "metal3.io",
    derive = "PartialEq",
    version = "v1alpha1",
    kind = "FirmwareSchema",
    plural = "firmwareschemas",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FirmwareSchemaSpec {
    /// Vendor of the hardware this schema was read from
    #[serde(default)]
    pub hardware_vendor: Option<String>,

    /// Model of the hardware this schema was read from
    #[serde(default)]
    pub hardware_model: Option<String>,

    /// Per-setting metadata
    #[serde(default)]
    pub schema: SchemaMap,
}

// =============================================================================
// Setting Schema
// =============================================================================

/// Type of a firmware attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AttributeType {
    Enumeration,
    String,
    Integer,
    Boolean,
    Password,
}

/// Metadata for a single firmware setting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingSchema {
    #[serde(default)]
    pub attribute_type: Option<AttributeType>,

    /// Allowed values for an Enumeration
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowable_values: Vec<String>,

    /// Lowest value for an Integer
    #[serde(default)]
    pub lower_bound: Option<i64>,

    /// Highest value for an Integer
    #[serde(default)]
    pub upper_bound: Option<i64>,

    /// Minimum length for a String
    #[serde(default)]
    pub min_length: Option<usize>,

    /// Maximum length for a String
    #[serde(default)]
    pub max_length: Option<usize>,

    /// Setting cannot be changed
    #[serde(default)]
    pub read_only: Option<bool>,

    /// Value is unique to the host and assigned by the hardware
    #[serde(default)]
    pub unique: Option<bool>,
}

impl SettingSchema {
    pub fn is_read_only(&self) -> bool {
        self.read_only.unwrap_or(false)
    }

    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }

    /// Whether a user may ever request a value for this setting
    pub fn is_writable(&self) -> bool {
        !self.is_read_only() && !self.is_unique()
    }

    /// Check a desired value against this entry
    pub fn check_value(&self, value: &IntOrString) -> bool {
        if self.is_read_only() {
            return false;
        }

        let value = int_or_string_value(value);

        match self.attribute_type {
            Some(AttributeType::Enumeration) => self.allowable_values.iter().any(|v| *v == value),
            Some(AttributeType::Integer) => {
                let Ok(n) = value.parse::<i64>() else {
                    return false;
                };
                self.lower_bound.map_or(true, |lower| n >= lower)
                    && self.upper_bound.map_or(true, |upper| n <= upper)
            }
            Some(AttributeType::String) => {
                if self.is_unique() {
                    return false;
                }
                let len = value.chars().count();
                self.min_length.map_or(true, |min| len >= min)
                    && self.max_length.map_or(true, |max| len <= max)
            }
            Some(AttributeType::Boolean) => value == "true" || value == "false",
            Some(AttributeType::Password) => false,
            None => true,
        }
    }
}

/// Render an int-or-string as the literal the user wrote
pub fn int_or_string_value(value: &IntOrString) -> String {
    match value {
        IntOrString::Int(n) => n.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> IntOrString {
        IntOrString::String(v.to_string())
    }

    #[test]
    fn test_integer_bounds_inclusive() {
        let entry = SettingSchema {
            attribute_type: Some(AttributeType::Integer),
            lower_bound: Some(0),
            upper_bound: Some(20),
            read_only: Some(false),
            ..Default::default()
        };

        assert!(entry.check_value(&s("0")));
        assert!(entry.check_value(&s("20")));
        assert!(entry.check_value(&IntOrString::Int(7)));
        assert!(!entry.check_value(&s("21")));
        assert!(!entry.check_value(&s("-1")));
        assert!(!entry.check_value(&s("ten")));
        assert!(!entry.check_value(&s(" 20 ")));
        assert!(!entry.check_value(&s("20\n")));
    }

    #[test]
    fn test_string_length_and_unique() {
        let entry = SettingSchema {
            attribute_type: Some(AttributeType::String),
            min_length: Some(0),
            max_length: Some(20),
            unique: Some(false),
            ..Default::default()
        };
        assert!(entry.check_value(&s("All tests passed")));
        assert!(!entry.check_value(&s("A really long POST message")));

        let unique = SettingSchema {
            unique: Some(true),
            ..entry
        };
        assert!(!unique.check_value(&s("X45672917")));
        assert!(!unique.is_writable());
    }

    #[test]
    fn test_enumeration_and_read_only() {
        let entry = SettingSchema {
            attribute_type: Some(AttributeType::Enumeration),
            allowable_values: vec!["Enabled".into(), "Disabled".into()],
            ..Default::default()
        };
        assert!(entry.check_value(&s("Disabled")));
        assert!(!entry.check_value(&s("Not enabled")));

        let read_only = SettingSchema {
            read_only: Some(true),
            ..entry
        };
        assert!(!read_only.check_value(&s("Enabled")));
    }

    #[test]
    fn test_boolean_and_untyped() {
        let boolean = SettingSchema {
            attribute_type: Some(AttributeType::Boolean),
            ..Default::default()
        };
        assert!(boolean.check_value(&s("true")));
        assert!(!boolean.check_value(&s("yes")));

        assert!(SettingSchema::default().check_value(&s("anything")));
    }
}
