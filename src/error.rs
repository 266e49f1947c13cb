//! Error types for the Bare-Metal Host Operator
//!
//! Provides structured error types for all reconciliation components including
//! BMC access resolution, firmware settings validation, RAID planning and the
//! resource store adapters.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the operator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Resource already exists: {kind}/{name}")]
    ResourceExists { kind: String, name: String },

    #[error("Resource was modified concurrently: {kind}/{name}")]
    Conflict { kind: String, name: String },

    // =========================================================================
    // BMC Access Errors
    // =========================================================================
    #[error("missing BMC address")]
    MissingBmcAddress,

    #[error("Unknown BMC type '{bmc_type}' for address {address}")]
    UnknownBmcType { address: String, bmc_type: String },

    #[error("failed to parse BMC address information {address}: {reason}")]
    BmcAddressParse { address: String, reason: String },

    #[error("Invalid BMC credentials: {0}")]
    MissingCredentials(String),

    // =========================================================================
    // Firmware Settings Errors
    // =========================================================================
    #[error("Setting {name} is invalid, unknown or not allowed")]
    InvalidHostFirmwareName { name: String },

    #[error("Invalid value {value} for setting {name}")]
    InvalidHostFirmwareValue { name: String, value: String },

    // =========================================================================
    // RAID Errors
    // =========================================================================
    #[error("RAID configuration not supported by interface {raid_interface}: {reason}")]
    UnsupportedRaidConfiguration {
        raid_interface: String,
        reason: String,
    },

    #[error("the names({name}) of volume[{second}] and volume[{first}] are repeated")]
    DuplicateVolumeName {
        name: String,
        first: usize,
        second: usize,
    },

    #[error("failed to build RAID settings: {0}")]
    RaidBuild(String),

    // =========================================================================
    // Hardware Profile Errors
    // =========================================================================
    #[error("Unknown hardware profile: {name}")]
    UnknownHardwareProfile { name: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient errors - retry with backoff
            Error::Kube(_) | Error::Conflict { .. } => ErrorAction::RequeueWithBackoff,

            // The referenced object may show up shortly
            Error::ResourceNotFound { .. } => ErrorAction::RequeueAfter(Duration::from_secs(30)),

            // User input errors - nothing changes until the spec is edited
            Error::MissingBmcAddress
            | Error::UnknownBmcType { .. }
            | Error::BmcAddressParse { .. }
            | Error::MissingCredentials(_)
            | Error::InvalidHostFirmwareName { .. }
            | Error::InvalidHostFirmwareValue { .. }
            | Error::UnsupportedRaidConfiguration { .. }
            | Error::DuplicateVolumeName { .. }
            | Error::RaidBuild(_)
            | Error::UnknownHardwareProfile { .. }
            | Error::Configuration(_) => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Kube(_) | Error::Conflict { .. })
    }

    /// Check if this error is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}

/// Result type alias for the operator
pub type Result<T> = std::result::Result<T, Error>;
