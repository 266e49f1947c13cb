//! Redfish access, with network boot or virtual media

use super::address::{host_port, transport};
use super::{AccessDetails, Credentials, DriverInfo};
use crate::error::Result;
use serde_json::json;
use url::Url;

/// Build the `redfish_*` driver info shared by Redfish-based drivers
pub(crate) fn redfish_driver_info(
    url: &Url,
    disable_certificate_verification: bool,
    credentials: &Credentials,
) -> DriverInfo {
    let scheme = transport(url).unwrap_or("https");

    let mut info = DriverInfo::from([
        ("redfish_system_id".to_string(), json!(url.path())),
        ("redfish_username".to_string(), json!(credentials.username)),
        ("redfish_password".to_string(), json!(credentials.password)),
        (
            "redfish_address".to_string(),
            json!(format!("{scheme}://{}", host_port(url))),
        ),
    ]);

    if disable_certificate_verification {
        info.insert("redfish_verify_ca".to_string(), json!(false));
    }

    info
}

/// Access details for generic Redfish BMCs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedfishAccessDetails {
    url: Url,
    virtual_media: bool,
    disable_certificate_verification: bool,
}

/// Factory registered for `redfish` and `redfish-virtualmedia`
pub fn new_redfish_access_details(
    url: &Url,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>> {
    let virtual_media = url.scheme().starts_with("redfish-virtualmedia");
    Ok(Box::new(RedfishAccessDetails {
        url: url.clone(),
        virtual_media,
        disable_certificate_verification,
    }))
}

impl AccessDetails for RedfishAccessDetails {
    fn bmc_type(&self) -> &str {
        self.url.scheme()
    }

    fn driver(&self) -> &'static str {
        "redfish"
    }

    fn boot_interface(&self) -> &'static str {
        if self.virtual_media {
            "redfish-virtual-media"
        } else {
            "ipxe"
        }
    }

    fn raid_interface(&self) -> &'static str {
        "redfish"
    }

    fn supports_secure_boot(&self) -> bool {
        true
    }

    fn needs_mac(&self) -> bool {
        true
    }

    fn driver_info(&self, credentials: &Credentials) -> DriverInfo {
        redfish_driver_info(&self.url, self.disable_certificate_verification, credentials)
    }
}
