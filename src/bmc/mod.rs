//! BMC Access Resolution
//!
//! Turns a BMC address into an [`AccessDetails`] descriptor for the driver
//! that manages the machine:
//! - IPMI / libvirt: `ipmi://`, `libvirt://` or a bare host
//! - Redfish: `redfish://`, `redfish-virtualmedia://`
//! - Dell iDRAC: `idrac://`, `idrac-virtualmedia://`
//! - Fujitsu iRMC: `irmc://`
//! - HPE iLO: `ilo4://`, `ilo5://`
//!
//! Drivers are looked up through an [`AccessRegistry`] that is built once
//! and passed to whoever needs it.

pub mod address;
pub mod bios;
pub mod idrac;
pub mod ilo;
pub mod ipmi;
pub mod irmc;
pub mod redfish;

pub use address::parse_address;
pub use idrac::IdracAccessDetails;
pub use ilo::IloAccessDetails;
pub use ipmi::IpmiAccessDetails;
pub use irmc::IrmcAccessDetails;
pub use redfish::RedfishAccessDetails;

use crate::crd::FirmwareConfig;
use crate::domain::CleanStep;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use url::Url;

/// Driver-specific connection parameters for the hardware-management service
pub type DriverInfo = BTreeMap<String, serde_json::Value>;

// =============================================================================
// Credentials
// =============================================================================

/// Username and password for a BMC
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reject credentials with a missing field
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(Error::MissingCredentials(
                "Missing BMC connection detail 'username' in credentials".into(),
            ));
        }
        if self.password.is_empty() {
            return Err(Error::MissingCredentials(
                "Missing BMC connection detail 'password' in credentials".into(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Access Details
// =============================================================================

/// How to reach and drive a BMC.
///
/// Built once from an address and never mutated.
pub trait AccessDetails: Send + Sync + std::fmt::Debug {
    /// BMC type as written in the address scheme
    fn bmc_type(&self) -> &str;

    /// Driver family; both `ipmi` and `libvirt` use `ipmi`
    fn driver(&self) -> &'static str;

    fn boot_interface(&self) -> &'static str;

    fn management_interface(&self) -> &'static str {
        ""
    }

    fn power_interface(&self) -> &'static str {
        ""
    }

    fn raid_interface(&self) -> &'static str;

    fn vendor_interface(&self) -> &'static str {
        ""
    }

    /// Whether the driver can change the secure boot state
    fn supports_secure_boot(&self) -> bool {
        false
    }

    /// Whether a port must be created for the host instead of discovered
    fn needs_mac(&self) -> bool;

    /// Connection and authentication parameters. Callers add boot-image
    /// parameters on top.
    fn driver_info(&self, credentials: &Credentials) -> DriverInfo;

    /// Clean steps applying the firmware toggles
    fn build_bios_clean_steps(&self, _firmware: Option<&FirmwareConfig>) -> Result<Vec<CleanStep>> {
        Ok(Vec::new())
    }
}

/// Builds access details from a parsed address
pub type AccessDetailsFactory = fn(&Url, bool) -> Result<Box<dyn AccessDetails>>;

// =============================================================================
// Registry
// =============================================================================

/// Maps BMC types to driver factories
#[derive(Clone, Default)]
pub struct AccessRegistry {
    factories: HashMap<String, AccessDetailsFactory>,
}

impl AccessRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every driver shipped by the operator
    pub fn with_default_drivers() -> Self {
        let mut registry = Self::new();
        registry.register("ipmi", &[], ipmi::new_ipmi_access_details);
        registry.register("libvirt", &[], ipmi::new_ipmi_access_details);
        registry.register("redfish", &["http", "https"], redfish::new_redfish_access_details);
        registry.register(
            "redfish-virtualmedia",
            &["http", "https"],
            redfish::new_redfish_access_details,
        );
        registry.register("idrac", &["http", "https"], idrac::new_idrac_access_details);
        registry.register(
            "idrac-virtualmedia",
            &["http", "https"],
            idrac::new_idrac_virtualmedia_access_details,
        );
        registry.register("irmc", &[], irmc::new_irmc_access_details);
        registry.register("ilo4", &[], ilo::new_ilo4_access_details);
        registry.register("ilo5", &[], ilo::new_ilo5_access_details);
        registry
    }

    /// Map `name` and every `name+transport` to the factory
    pub fn register(&mut self, name: &str, transports: &[&str], factory: AccessDetailsFactory) {
        self.factories.insert(name.to_string(), factory);
        for transport in transports {
            self.factories.insert(format!("{name}+{transport}"), factory);
        }
    }

    /// Whether a BMC type is known
    pub fn supports(&self, bmc_type: &str) -> bool {
        self.factories.contains_key(bmc_type)
    }

    /// All known BMC types, sorted
    pub fn bmc_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Resolve an address to access details
    pub fn resolve(
        &self,
        address: &str,
        disable_certificate_verification: bool,
    ) -> Result<Box<dyn AccessDetails>> {
        let url = parse_address(address)?;

        let factory = self
            .factories
            .get(url.scheme())
            .ok_or_else(|| Error::UnknownBmcType {
                address: address.to_string(),
                bmc_type: url.scheme().to_string(),
            })?;

        let details = factory(&url, disable_certificate_verification)?;
        debug!(
            bmc_type = details.bmc_type(),
            driver = details.driver(),
            "Resolved BMC access details"
        );
        Ok(details)
    }
}

impl std::fmt::Debug for AccessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessRegistry")
            .field("bmc_types", &self.bmc_types())
            .finish()
    }
}
