//! Tagged facade outcomes and the report shape served to outer layers
//!
//! Each facade operation returns its own outcome type; [`Reportable`] maps
//! any of them (and [`AccessError`]) onto one serializable [`AccessReport`].

use crate::error::AccessError;
use crate::verifier::{VerificationResult, VerificationStatus};
use mxa_strategy::{AttemptDiagnostic, StrategyKind};
use mxa_wire::{FieldSet, ResourceKey};
use serde::Serialize;

/// Result of `fetch`
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// At least one record matched
    Found {
        /// Logical records
        records: Vec<FieldSet>,
        /// Strategy that answered
        strategy: StrategyKind,
    },
    /// Nothing matched; a normal outcome
    NotFound {
        /// Key that was looked up
        key: ResourceKey,
    },
}

impl FetchOutcome {
    /// Records found, empty when nothing matched
    #[must_use]
    pub fn records(&self) -> &[FieldSet] {
        match self {
            Self::Found { records, .. } => records,
            Self::NotFound { .. } => &[],
        }
    }

    /// Check for a miss
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Where a created record's key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Read from the create response
    Response,
    /// Found by the scoped search after the create
    Search,
}

/// Result of `create`
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// Record created and its generated key identified
    Created {
        /// Generated key, site-scoped when a site was given
        key: ResourceKey,
        /// Strategy that created the record
        strategy: StrategyKind,
        /// How the key was identified
        source: KeySource,
        /// Attempts that failed before the accepted one
        failed_attempts: Vec<AttemptDiagnostic>,
    },
    /// Backend accepted the create but its key could not be confirmed
    PartialSuccess {
        /// Strategy that created the record
        strategy: StrategyKind,
        /// What could not be confirmed
        message: String,
        /// Attempts that failed before the accepted one
        failed_attempts: Vec<AttemptDiagnostic>,
    },
}

impl CreateOutcome {
    /// Confirmed key, if any
    #[must_use]
    pub fn key(&self) -> Option<&ResourceKey> {
        match self {
            Self::Created { key, .. } => Some(key),
            Self::PartialSuccess { .. } => None,
        }
    }

    /// Strategy that created the record
    #[must_use]
    pub fn strategy(&self) -> StrategyKind {
        match self {
            Self::Created { strategy, .. } | Self::PartialSuccess { strategy, .. } => *strategy,
        }
    }
}

/// Result of `update`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Updated record
    pub key: ResourceKey,
    /// Strategy whose write was accepted
    pub strategy: StrategyKind,
    /// Status the backend answered with
    pub status: u16,
    /// What the re-read observed
    pub verification: VerificationResult,
    /// Attempts that failed before the accepted one
    pub failed_attempts: Vec<AttemptDiagnostic>,
}

impl UpdateOutcome {
    /// Aggregate verification status
    #[inline]
    #[must_use]
    pub fn verification_status(&self) -> VerificationStatus {
        self.verification.status
    }
}

/// Report status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Done and confirmed
    Success,
    /// Accepted by the backend but not fully confirmed
    PartialSuccess,
    /// Not done
    Failure,
}

/// Serializable summary of one facade call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessReport {
    /// Tagged status
    pub status: ReportStatus,
    /// Human-readable summary
    pub message: String,
    /// Key display form, when one is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Records returned by a read
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<FieldSet>,
    /// Verification detail of a write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
    /// Per-strategy diagnostics
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<AttemptDiagnostic>,
}

impl AccessReport {
    fn new(status: ReportStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            key: None,
            records: Vec::new(),
            verification: None,
            diagnostics: Vec::new(),
        }
    }

    fn with_key(mut self, key: &ResourceKey) -> Self {
        self.key = Some(key.to_string());
        self
    }

    fn with_diagnostics(mut self, diagnostics: &[AttemptDiagnostic]) -> Self {
        self.diagnostics = diagnostics.to_vec();
        self
    }
}

/// Conversion into an [`AccessReport`]
pub trait Reportable {
    /// Build the report
    fn report(&self) -> AccessReport;
}

impl Reportable for FetchOutcome {
    fn report(&self) -> AccessReport {
        match self {
            Self::Found { records, strategy } => {
                let mut report = AccessReport::new(
                    ReportStatus::Success,
                    format!("found {} record(s) via {strategy}", records.len()),
                );
                report.records.clone_from(records);
                report
            }
            Self::NotFound { key } => {
                AccessReport::new(ReportStatus::Success, format!("no records match {key}"))
                    .with_key(key)
            }
        }
    }
}

impl Reportable for Vec<FieldSet> {
    fn report(&self) -> AccessReport {
        let mut report =
            AccessReport::new(ReportStatus::Success, format!("listed {} record(s)", self.len()));
        report.records.clone_from(self);
        report
    }
}

impl Reportable for CreateOutcome {
    fn report(&self) -> AccessReport {
        match self {
            Self::Created {
                key,
                strategy,
                source,
                failed_attempts,
            } => {
                let how = match source {
                    KeySource::Response => "from the response",
                    KeySource::Search => "by search",
                };
                AccessReport::new(
                    ReportStatus::Success,
                    format!("created {key} via {strategy}, key identified {how}"),
                )
                .with_key(key)
                .with_diagnostics(failed_attempts)
            }
            Self::PartialSuccess {
                strategy,
                message,
                failed_attempts,
            } => AccessReport::new(
                ReportStatus::PartialSuccess,
                format!("create accepted via {strategy}; {message}"),
            )
            .with_diagnostics(failed_attempts),
        }
    }
}

impl Reportable for UpdateOutcome {
    fn report(&self) -> AccessReport {
        let (status, message) = match self.verification.status {
            VerificationStatus::FullyVerified => (
                ReportStatus::Success,
                format!("updated {} via {}, every field verified", self.key, self.strategy),
            ),
            VerificationStatus::PartiallyVerified => {
                let mismatched: Vec<String> = self
                    .verification
                    .mismatches()
                    .iter()
                    .map(|m| format!("{} expected '{}' got '{}'", m.field, m.expected, m.actual))
                    .collect();
                let unobservable = self.verification.unobservable();
                let mut detail = Vec::new();
                if !mismatched.is_empty() {
                    detail.push(format!("mismatched: {}", mismatched.join(", ")));
                }
                if !unobservable.is_empty() {
                    detail.push(format!("not observed: {}", unobservable.join(", ")));
                }
                (
                    ReportStatus::PartialSuccess,
                    format!(
                        "update of {} accepted via {} but not fully applied ({})",
                        self.key,
                        self.strategy,
                        detail.join("; ")
                    ),
                )
            }
            VerificationStatus::Unverifiable => (
                ReportStatus::PartialSuccess,
                format!(
                    "update of {} accepted via {} but could not be verified",
                    self.key, self.strategy
                ),
            ),
        };
        let mut report = AccessReport::new(status, message)
            .with_key(&self.key)
            .with_diagnostics(&self.failed_attempts);
        report.verification = Some(self.verification.clone());
        report
    }
}

impl Reportable for AccessError {
    fn report(&self) -> AccessReport {
        AccessReport::new(ReportStatus::Failure, self.to_string())
            .with_diagnostics(self.diagnostics())
    }
}

impl<T: Reportable> Reportable for Result<T, AccessError> {
    fn report(&self) -> AccessReport {
        match self {
            Ok(outcome) => outcome.report(),
            Err(err) => err.report(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::compare;
    use mxa_strategy::{AttemptFailure, ChainFailure, OperationKind};
    use mxa_wire::ResourceType;
    use pretty_assertions::assert_eq;

    fn key() -> ResourceKey {
        ResourceKey::parse(ResourceType::Asset, "13150", Some("BEDFORD")).unwrap()
    }

    #[test]
    fn mismatch_is_partial_success() {
        let outcome = UpdateOutcome {
            key: key(),
            strategy: StrategyKind::OslcNamespaced,
            status: 204,
            verification: compare(
                &FieldSet::new().with("status", "ACTIVE"),
                &FieldSet::new().with("status", "INACTIVE"),
            ),
            failed_attempts: Vec::new(),
        };
        let report = outcome.report();
        assert_eq!(report.status, ReportStatus::PartialSuccess);
        assert!(report.message.contains("status expected 'ACTIVE' got 'INACTIVE'"));
        assert_eq!(report.key.as_deref(), Some("asset assetnum=13150 siteid=BEDFORD"));
    }

    #[test]
    fn exhaustion_is_failure_with_diagnostics() {
        let result: Result<FetchOutcome, AccessError> =
            Err(AccessError::AllStrategiesExhausted(ChainFailure {
                operation: OperationKind::Read,
                diagnostics: vec![AttemptDiagnostic {
                    strategy: StrategyKind::RestPlain,
                    failure: AttemptFailure::Protocol {
                        status: 401,
                        excerpt: "unauthorized".into(),
                    },
                }],
            }));
        let report = result.report();
        assert_eq!(report.status, ReportStatus::Failure);
        assert_eq!(report.diagnostics.len(), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["diagnostics"][0]["failure"]["kind"], "protocol");
    }

    #[test]
    fn partial_create_carries_no_key() {
        let outcome = CreateOutcome::PartialSuccess {
            strategy: StrategyKind::ActionBulk,
            message: "generated key not confirmed".into(),
            failed_attempts: Vec::new(),
        };
        assert!(outcome.key().is_none());
        let report = outcome.report();
        assert_eq!(report.status, ReportStatus::PartialSuccess);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "partial_success");
        assert!(json.get("key").is_none());
    }

    #[test]
    fn not_found_fetch_is_not_a_failure() {
        let report = FetchOutcome::NotFound { key: key() }.report();
        assert_eq!(report.status, ReportStatus::Success);
        assert!(report.records.is_empty());
    }
}
