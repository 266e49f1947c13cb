//! Fujitsu iRMC access

use super::address::hostname;
use super::bios::{build_bios_clean_steps, IRMC_BIOS};
use super::{AccessDetails, Credentials, DriverInfo};
use crate::crd::FirmwareConfig;
use crate::domain::CleanStep;
use crate::error::Result;
use serde_json::json;
use url::Url;

/// Access details for iRMC BMCs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrmcAccessDetails {
    bmc_type: String,
    hostname: String,
    port: Option<u16>,
    disable_certificate_verification: bool,
}

/// Factory registered for `irmc`
pub fn new_irmc_access_details(
    url: &Url,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>> {
    Ok(Box::new(IrmcAccessDetails {
        bmc_type: url.scheme().to_string(),
        hostname: hostname(url),
        port: url.port(),
        disable_certificate_verification,
    }))
}

impl AccessDetails for IrmcAccessDetails {
    fn bmc_type(&self) -> &str {
        &self.bmc_type
    }

    fn driver(&self) -> &'static str {
        "irmc"
    }

    fn boot_interface(&self) -> &'static str {
        "pxe"
    }

    fn power_interface(&self) -> &'static str {
        "ipmitool"
    }

    fn raid_interface(&self) -> &'static str {
        "irmc"
    }

    fn supports_secure_boot(&self) -> bool {
        true
    }

    fn needs_mac(&self) -> bool {
        true
    }

    // iRMC also speaks IPMI for power control
    fn driver_info(&self, credentials: &Credentials) -> DriverInfo {
        let mut info = DriverInfo::from([
            ("irmc_username".to_string(), json!(credentials.username)),
            ("irmc_password".to_string(), json!(credentials.password)),
            ("irmc_address".to_string(), json!(self.hostname)),
            ("ipmi_username".to_string(), json!(credentials.username)),
            ("ipmi_password".to_string(), json!(credentials.password)),
            ("ipmi_address".to_string(), json!(self.hostname)),
        ]);

        if self.disable_certificate_verification {
            info.insert("irmc_verify_ca".to_string(), json!(false));
        }
        if let Some(port) = self.port {
            info.insert("irmc_port".to_string(), json!(port.to_string()));
        }

        info
    }

    fn build_bios_clean_steps(&self, firmware: Option<&FirmwareConfig>) -> Result<Vec<CleanStep>> {
        build_bios_clean_steps(firmware, &IRMC_BIOS)
    }
}
