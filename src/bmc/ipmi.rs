//! IPMI and libvirt (virtual BMC) access

use super::address::{hostname, DEFAULT_SCHEME};
use super::{AccessDetails, Credentials, DriverInfo};
use crate::error::Result;
use serde_json::json;
use url::Url;

/// Port used when the address does not name one
pub const DEFAULT_IPMI_PORT: &str = "623";

/// Privilege level used when the address does not name one
pub const DEFAULT_PRIVILEGE_LEVEL: &str = "ADMINISTRATOR";

/// Access details for IPMI and libvirt BMCs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpmiAccessDetails {
    bmc_type: String,
    port: Option<u16>,
    hostname: String,
    privilege_level: String,
    disable_certificate_verification: bool,
}

/// Factory registered for `ipmi` and `libvirt`
pub fn new_ipmi_access_details(
    url: &Url,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>> {
    let privilege_level = url
        .query_pairs()
        .find(|(key, _)| key == "privilegelevel")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_PRIVILEGE_LEVEL.to_string());

    Ok(Box::new(IpmiAccessDetails {
        bmc_type: url.scheme().to_string(),
        port: url.port(),
        hostname: hostname(url),
        privilege_level,
        disable_certificate_verification,
    }))
}

impl IpmiAccessDetails {
    pub fn privilege_level(&self) -> &str {
        &self.privilege_level
    }

    pub fn disable_certificate_verification(&self) -> bool {
        self.disable_certificate_verification
    }
}

impl AccessDetails for IpmiAccessDetails {
    fn bmc_type(&self) -> &str {
        &self.bmc_type
    }

    fn driver(&self) -> &'static str {
        DEFAULT_SCHEME
    }

    fn boot_interface(&self) -> &'static str {
        "ipxe"
    }

    fn raid_interface(&self) -> &'static str {
        "no-raid"
    }

    // libvirt hosts do not get their ports discovered
    fn needs_mac(&self) -> bool {
        self.bmc_type == "libvirt"
    }

    fn driver_info(&self, credentials: &Credentials) -> DriverInfo {
        let port = self
            .port
            .map(|p| p.to_string())
            .unwrap_or_else(|| DEFAULT_IPMI_PORT.to_string());

        DriverInfo::from([
            ("ipmi_port".to_string(), json!(port)),
            ("ipmi_username".to_string(), json!(credentials.username)),
            ("ipmi_password".to_string(), json!(credentials.password)),
            ("ipmi_address".to_string(), json!(self.hostname)),
            ("ipmi_priv_level".to_string(), json!(self.privilege_level)),
        ])
    }
}
