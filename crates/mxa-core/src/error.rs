//! Error types for the access facade
//!
//! Only caller-visible failures live here:
//! - Configuration that cannot work (no strategy is attempted)
//! - Records that do not resolve when a write needs them
//! - Exhaustion of every strategy in a chain
//! - The overall deadline running out
//!
//! Verification outcomes are results, not errors; see
//! [`VerificationStatus`](crate::VerificationStatus).

use crate::config::ConfigError;
use mxa_strategy::{AttemptDiagnostic, AttemptFailure, ChainFailure, StrategyError};
use mxa_wire::{FieldSetError, KeyError};
use std::time::Duration;

/// Main access error type
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Configuration is missing or malformed
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The record a write needs does not exist
    #[error("{key} not found")]
    NotFound {
        /// Key display form
        key: String,
    },

    /// Every strategy in the chain failed
    #[error("{0}")]
    AllStrategiesExhausted(#[from] ChainFailure),

    /// The call did not finish within the overall deadline
    #[error("operation did not finish within {}s", .0.as_secs())]
    DeadlineExceeded(Duration),

    /// The request cannot be performed as given
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl AccessError {
    /// Check if the record was not found
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if error is retryable
    ///
    /// Exhaustion caused by at least one network failure and a missed
    /// deadline may succeed later; rejections by the backend will not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DeadlineExceeded(_) => true,
            Self::AllStrategiesExhausted(failure) => failure
                .diagnostics
                .iter()
                .any(|d| matches!(d.failure, AttemptFailure::Network { .. })),
            _ => false,
        }
    }

    /// Per-strategy diagnostics, in attempt order
    #[must_use]
    pub fn diagnostics(&self) -> &[AttemptDiagnostic] {
        match self {
            Self::AllStrategiesExhausted(failure) => &failure.diagnostics,
            _ => &[],
        }
    }
}

impl From<KeyError> for AccessError {
    fn from(err: KeyError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<FieldSetError> for AccessError {
    fn from(err: FieldSetError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<StrategyError> for AccessError {
    fn from(err: StrategyError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
