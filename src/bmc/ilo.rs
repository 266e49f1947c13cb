//! HPE iLO 4 and iLO 5 access

use super::address::hostname;
use super::bios::{build_bios_clean_steps, ILO_BIOS};
use super::{AccessDetails, Credentials, DriverInfo};
use crate::crd::FirmwareConfig;
use crate::domain::CleanStep;
use crate::error::Result;
use serde_json::json;
use url::Url;

/// iLO hardware generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IloGeneration {
    Ilo4,
    Ilo5,
}

/// Access details for iLO BMCs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IloAccessDetails {
    generation: IloGeneration,
    bmc_type: String,
    hostname: String,
    port: Option<u16>,
    disable_certificate_verification: bool,
}

fn new_ilo_access_details(
    generation: IloGeneration,
    url: &Url,
    disable_certificate_verification: bool,
) -> Box<dyn AccessDetails> {
    Box::new(IloAccessDetails {
        generation,
        bmc_type: url.scheme().to_string(),
        hostname: hostname(url),
        port: url.port(),
        disable_certificate_verification,
    })
}

/// Factory registered for `ilo4`
pub fn new_ilo4_access_details(
    url: &Url,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>> {
    Ok(new_ilo_access_details(
        IloGeneration::Ilo4,
        url,
        disable_certificate_verification,
    ))
}

/// Factory registered for `ilo5`
pub fn new_ilo5_access_details(
    url: &Url,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>> {
    Ok(new_ilo_access_details(
        IloGeneration::Ilo5,
        url,
        disable_certificate_verification,
    ))
}

impl IloAccessDetails {
    pub fn generation(&self) -> IloGeneration {
        self.generation
    }
}

impl AccessDetails for IloAccessDetails {
    fn bmc_type(&self) -> &str {
        &self.bmc_type
    }

    fn driver(&self) -> &'static str {
        match self.generation {
            IloGeneration::Ilo4 => "ilo",
            IloGeneration::Ilo5 => "ilo5",
        }
    }

    fn boot_interface(&self) -> &'static str {
        "ilo-ipxe"
    }

    // only iLO 5 has a hardware RAID interface
    fn raid_interface(&self) -> &'static str {
        match self.generation {
            IloGeneration::Ilo4 => "no-raid",
            IloGeneration::Ilo5 => "ilo5",
        }
    }

    fn supports_secure_boot(&self) -> bool {
        true
    }

    fn needs_mac(&self) -> bool {
        true
    }

    fn driver_info(&self, credentials: &Credentials) -> DriverInfo {
        let mut info = DriverInfo::from([
            ("ilo_username".to_string(), json!(credentials.username)),
            ("ilo_password".to_string(), json!(credentials.password)),
            ("ilo_address".to_string(), json!(self.hostname)),
        ]);

        if self.disable_certificate_verification {
            info.insert("ilo_verify_ca".to_string(), json!(false));
        }
        if let Some(port) = self.port {
            info.insert("client_port".to_string(), json!(port.to_string()));
        }

        info
    }

    fn build_bios_clean_steps(&self, firmware: Option<&FirmwareConfig>) -> Result<Vec<CleanStep>> {
        build_bios_clean_steps(firmware, &ILO_BIOS)
    }
}
