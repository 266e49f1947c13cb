//! Dell iDRAC access, over WS-Man or Redfish virtual media

use super::address::{hostname, transport};
use super::bios::{build_bios_clean_steps, IDRAC_BIOS};
use super::redfish::redfish_driver_info;
use super::{AccessDetails, Credentials, DriverInfo};
use crate::crd::FirmwareConfig;
use crate::domain::CleanStep;
use crate::error::Result;
use serde_json::json;
use url::Url;

// =============================================================================
// WS-Man
// =============================================================================

/// Access details for iDRAC over WS-Man
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdracAccessDetails {
    bmc_type: String,
    hostname: String,
    port: Option<u16>,
    path: String,
}

/// Factory registered for `idrac`
pub fn new_idrac_access_details(
    url: &Url,
    _disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>> {
    Ok(Box::new(IdracAccessDetails {
        bmc_type: url.scheme().to_string(),
        hostname: hostname(url),
        port: url.port(),
        path: url.path().to_string(),
    }))
}

impl AccessDetails for IdracAccessDetails {
    fn bmc_type(&self) -> &str {
        &self.bmc_type
    }

    fn driver(&self) -> &'static str {
        "idrac"
    }

    fn boot_interface(&self) -> &'static str {
        "ipxe"
    }

    fn raid_interface(&self) -> &'static str {
        "idrac-wsman"
    }

    fn needs_mac(&self) -> bool {
        false
    }

    fn driver_info(&self, credentials: &Credentials) -> DriverInfo {
        let mut info = DriverInfo::from([
            ("drac_username".to_string(), json!(credentials.username)),
            ("drac_password".to_string(), json!(credentials.password)),
            ("drac_address".to_string(), json!(self.hostname)),
        ]);

        if let Some((_, protocol)) = self.bmc_type.split_once('+') {
            info.insert("drac_protocol".to_string(), json!(protocol));
        }
        if let Some(port) = self.port {
            info.insert("drac_port".to_string(), json!(port.to_string()));
        }
        if !self.path.is_empty() {
            info.insert("drac_path".to_string(), json!(self.path));
        }

        info
    }

    fn build_bios_clean_steps(&self, firmware: Option<&FirmwareConfig>) -> Result<Vec<CleanStep>> {
        build_bios_clean_steps(firmware, &IDRAC_BIOS)
    }
}

// =============================================================================
// Redfish virtual media
// =============================================================================

/// Access details for iDRAC over Redfish with virtual media boot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdracVirtualMediaAccessDetails {
    url: Url,
    disable_certificate_verification: bool,
}

/// Factory registered for `idrac-virtualmedia`
pub fn new_idrac_virtualmedia_access_details(
    url: &Url,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>> {
    Ok(Box::new(IdracVirtualMediaAccessDetails {
        url: url.clone(),
        disable_certificate_verification,
    }))
}

impl IdracVirtualMediaAccessDetails {
    /// Transport named in the scheme, if any
    pub fn transport(&self) -> Option<&str> {
        transport(&self.url)
    }
}

impl AccessDetails for IdracVirtualMediaAccessDetails {
    fn bmc_type(&self) -> &str {
        self.url.scheme()
    }

    fn driver(&self) -> &'static str {
        "idrac"
    }

    fn boot_interface(&self) -> &'static str {
        "idrac-redfish-virtual-media"
    }

    fn management_interface(&self) -> &'static str {
        "idrac-redfish"
    }

    fn power_interface(&self) -> &'static str {
        "idrac-redfish"
    }

    fn raid_interface(&self) -> &'static str {
        "no-raid"
    }

    fn vendor_interface(&self) -> &'static str {
        "no-vendor"
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

    fn build_bios_clean_steps(&self, firmware: Option<&FirmwareConfig>) -> Result<Vec<CleanStep>> {
        build_bios_clean_steps(firmware, &IDRAC_BIOS)
    }
}
