//! Node capability string merging
//!
//! Capabilities live in a single node property as a comma-separated list of
//! `key:value` tokens. Only the boot-related keys are touched; every other
//! token is carried through as-is and in order.

use super::update_opts::UpdateOp;
use crate::crd::BootMode;

/// Set `key:value`, replacing an existing token for the key in place or
/// appending a new one
fn set_capability(tokens: &mut Vec<String>, key: &str, value: &str) {
    let token = format!("{key}:{value}");
    match tokens
        .iter_mut()
        .find(|t| t.split_once(':').map(|(k, _)| k) == Some(key))
    {
        Some(existing) => *existing = token,
        None => tokens.push(token),
    }
}

/// Merge the boot mode into the stored capability string.
///
/// `current` is `None` when the node has no capabilities property yet, in
/// which case the property is added rather than replaced.
pub fn build_capabilities_value(current: Option<&str>, boot_mode: BootMode) -> (UpdateOp, String) {
    let op = if current.is_some() {
        UpdateOp::Replace
    } else {
        UpdateOp::Add
    };

    let mut tokens: Vec<String> = current
        .unwrap_or_default()
        .split(',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    set_capability(&mut tokens, "boot_mode", boot_mode.capability_value());
    if boot_mode == BootMode::UefiSecureBoot {
        set_capability(&mut tokens, "secure_boot", "true");
    }

    (op, tokens.join(","))
}
