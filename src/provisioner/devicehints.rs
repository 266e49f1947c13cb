//! Root device hints in the form the hardware-management service expects

use crate::crd::RootDeviceHints;
use std::collections::BTreeMap;

/// Hint name to operator-prefixed value
pub type HintMap = BTreeMap<String, String>;

/// Build the hint map for a set of device hints.
///
/// Unset fields contribute nothing.
pub fn make_hint_map(hints: &RootDeviceHints) -> HintMap {
    let mut map = HintMap::new();

    let mut exact = |key: &str, value: &Option<String>| {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            map.insert(key.to_string(), format!("s== {value}"));
        }
    };
    exact("name", &hints.device_name);
    exact("hctl", &hints.hctl);
    exact("serial", &hints.serial_number);
    exact("wwn", &hints.wwn);
    exact("wwn_with_extension", &hints.wwn_with_extension);
    exact("wwn_vendor_extension", &hints.wwn_vendor_extension);

    for (key, value) in [("model", &hints.model), ("vendor", &hints.vendor)] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            map.insert(key.to_string(), format!("<in> {value}"));
        }
    }

    if let Some(size) = hints.min_size_gigabytes.filter(|s| *s > 0) {
        map.insert("size".to_string(), format!(">= {size}"));
    }

    if let Some(rotational) = hints.rotational {
        map.insert("rotational".to_string(), rotational.to_string());
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_hints() {
        let hints = RootDeviceHints {
            device_name: Some("userd_devicename".into()),
            hctl: Some("1:2:3:4".into()),
            model: Some("userd_model".into()),
            vendor: Some("userd_vendor".into()),
            serial_number: Some("userd_serial".into()),
            min_size_gigabytes: Some(40),
            wwn: Some("userd_wwn".into()),
            wwn_with_extension: Some("userd_with_extension".into()),
            wwn_vendor_extension: Some("userd_vendor_extension".into()),
            rotational: Some(true),
        };

        let expected: HintMap = [
            ("name", "s== userd_devicename"),
            ("hctl", "s== 1:2:3:4"),
            ("model", "<in> userd_model"),
            ("vendor", "<in> userd_vendor"),
            ("serial", "s== userd_serial"),
            ("size", ">= 40"),
            ("wwn", "s== userd_wwn"),
            ("wwn_with_extension", "s== userd_with_extension"),
            ("wwn_vendor_extension", "s== userd_vendor_extension"),
            ("rotational", "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(make_hint_map(&hints), expected);
    }

    #[test]
    fn test_empty_hints() {
        assert!(make_hint_map(&RootDeviceHints::default()).is_empty());

        let hints = RootDeviceHints {
            device_name: Some(String::new()),
            min_size_gigabytes: Some(0),
            rotational: Some(false),
            ..Default::default()
        };
        let map = make_hint_map(&hints);
        assert_eq!(map.len(), 1);
        assert_eq!(map["rotational"], "false");
    }
}
