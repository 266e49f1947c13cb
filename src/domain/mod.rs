//! Domain Layer - Core business logic and port definitions
//!
//! This module contains the shared value types and the trait definitions
//! (ports) that define boundaries between the reconciliation logic and the
//! resource store or remote hardware-management service.

pub mod clean_step;
pub mod ports;

pub use clean_step::*;
pub use ports::*;
