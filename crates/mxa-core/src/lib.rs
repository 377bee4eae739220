//! mxa-core - record access facade
//!
//! The public surface of mxaccess:
//! - [`RecordAccess`]: `fetch`, `list`, `create`, `update`, `update_status`, `ping`
//! - [`WriteVerifier`]: re-reads after every accepted write
//! - [`AccessConfig`]: explicit TOML-loadable configuration
//! - [`AccessReport`]: tagged success / partial success / failure summaries
//!
//! # Example
//!
//! ```rust,ignore
//! use mxa_core::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AccessConfig::from_file("mxaccess.toml")?;
//! let access = RecordAccess::connect(config)?;
//!
//! let key = ResourceKey::parse(ResourceType::Asset, "13150", Some("BEDFORD"))?;
//! let outcome = access.update(&key, &FieldSet::new().with("status", "ACTIVE")).await?;
//! match outcome.verification_status() {
//!     VerificationStatus::FullyVerified => println!("done"),
//!     other => println!("accepted but {other:?}: {:?}", outcome.verification.mismatches()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod config;
pub mod error;
pub mod outcome;
pub mod telemetry;
pub mod verifier;

pub use access::RecordAccess;
pub use config::{AccessConfig, ConfigError, CREDENTIAL_PLACEHOLDERS, HOST_PLACEHOLDERS};
pub use error::AccessError;
pub use outcome::{
    AccessReport, CreateOutcome, FetchOutcome, KeySource, ReportStatus, Reportable, UpdateOutcome,
};
pub use telemetry::init_tracing;
pub use verifier::{
    compare, FieldCheck, FieldVerification, Mismatch, VerificationResult, VerificationStatus,
    WriteVerifier,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the facade
    pub use crate::{
        AccessConfig, AccessError, AccessReport, CreateOutcome, FetchOutcome, RecordAccess,
        Reportable, UpdateOutcome, VerificationStatus,
    };
    pub use mxa_strategy::{AuthScheme, Credentials};
    pub use mxa_wire::{FieldSet, FieldValue, ResourceKey, ResourceType, SearchCriteria};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
