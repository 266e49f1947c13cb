//! Clean steps submitted to the hardware-management service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Interface a clean step runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanStepInterface {
    Raid,
    Deploy,
    Bios,
}

impl std::fmt::Display for CleanStepInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanStepInterface::Raid => write!(f, "raid"),
            CleanStepInterface::Deploy => write!(f, "deploy"),
            CleanStepInterface::Bios => write!(f, "bios"),
        }
    }
}

/// A single manual cleaning operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanStep {
    pub interface: CleanStepInterface,
    pub step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<BTreeMap<String, serde_json::Value>>,
}

impl CleanStep {
    /// Create a step without arguments
    pub fn new(interface: CleanStepInterface, step: impl Into<String>) -> Self {
        Self {
            interface,
            step: step.into(),
            args: None,
        }
    }

    /// Attach an argument to the step
    pub fn with_arg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.args
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }
}

impl std::fmt::Display for CleanStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.interface, self.step)
    }
}
