//! Write verification
//!
//! After an accepted write the backend is not taken at its word: the
//! verifier waits a fixed settle delay, re-reads the record through the read
//! chain and compares every submitted field with what it observes.
//!
//! | Observation | Field check | Aggregate |
//! |-------------|-------------|-----------|
//! | every field equal | `Verified` | `FullyVerified` |
//! | a field differs or is absent | `Mismatch` / `Unobservable` | `PartiallyVerified` |
//! | re-read failed or found nothing | `Unobservable` | `Unverifiable` |

use mxa_strategy::{Connection, OperationRequest, ReadRequest, StrategyChain, Transport};
use mxa_wire::{FieldSet, FieldValue, ResourceKey};
use serde::Serialize;
use std::time::Duration;

/// Outcome of comparing one field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum FieldCheck {
    /// Observed value equals the submitted one
    Verified,
    /// Observed value differs
    Mismatch {
        /// Submitted value
        expected: FieldValue,
        /// Observed value
        actual: FieldValue,
    },
    /// Field could not be observed
    Unobservable,
}

/// Check of one submitted field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldVerification {
    /// Logical field name
    pub field: String,
    /// Result
    #[serde(flatten)]
    pub check: FieldCheck,
}

/// Aggregate verification status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Every submitted field was re-read and matched
    FullyVerified,
    /// The record was re-read but not every field matched
    PartiallyVerified,
    /// The record could not be re-read; the write may or may not have applied
    Unverifiable,
}

/// Field that was observed with a different value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// Logical field name
    pub field: String,
    /// Submitted value
    pub expected: FieldValue,
    /// Observed value
    pub actual: FieldValue,
}

/// Classified verification result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    /// Aggregate status
    pub status: VerificationStatus,
    /// Per-field checks, in submission order
    pub fields: Vec<FieldVerification>,
    /// Why verification was not possible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl VerificationResult {
    /// Result for a record that could not be re-read
    #[must_use]
    pub fn unverifiable(submitted: &FieldSet, note: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Unverifiable,
            fields: submitted
                .names()
                .map(|field| FieldVerification {
                    field: field.to_string(),
                    check: FieldCheck::Unobservable,
                })
                .collect(),
            note: Some(note.into()),
        }
    }

    /// Check for full verification
    #[inline]
    #[must_use]
    pub fn is_fully_verified(&self) -> bool {
        self.status == VerificationStatus::FullyVerified
    }

    /// Fields observed with a different value
    #[must_use]
    pub fn mismatches(&self) -> Vec<Mismatch> {
        self.fields
            .iter()
            .filter_map(|f| match &f.check {
                FieldCheck::Mismatch { expected, actual } => Some(Mismatch {
                    field: f.field.clone(),
                    expected: expected.clone(),
                    actual: actual.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Fields the re-read did not return
    #[must_use]
    pub fn unobservable(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.check == FieldCheck::Unobservable)
            .map(|f| f.field.as_str())
            .collect()
    }
}

/// Compare submitted fields with an observed logical record
#[must_use]
pub fn compare(submitted: &FieldSet, observed: &FieldSet) -> VerificationResult {
    let fields: Vec<FieldVerification> = submitted
        .iter()
        .map(|(field, expected)| {
            let check = match observed.get(field) {
                Some(actual) if expected.matches(actual) => FieldCheck::Verified,
                Some(actual) => FieldCheck::Mismatch {
                    expected: expected.clone(),
                    actual: actual.clone(),
                },
                None => FieldCheck::Unobservable,
            };
            FieldVerification {
                field: field.to_string(),
                check,
            }
        })
        .collect();

    let status = if fields.iter().all(|f| f.check == FieldCheck::Verified) {
        VerificationStatus::FullyVerified
    } else {
        VerificationStatus::PartiallyVerified
    };

    VerificationResult {
        status,
        fields,
        note: None,
    }
}

/// Re-reads records after writes
#[derive(Debug, Clone, Copy)]
pub struct WriteVerifier {
    settle: Duration,
}

impl WriteVerifier {
    /// Create verifier with a settle delay
    #[inline]
    #[must_use]
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    /// Settle delay
    #[inline]
    #[must_use]
    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// Wait, re-read `key` through `chain` and compare with `submitted`
    pub async fn verify(
        &self,
        chain: &StrategyChain,
        connection: &Connection,
        transport: &dyn Transport,
        key: &ResourceKey,
        submitted: &FieldSet,
    ) -> VerificationResult {
        tokio::time::sleep(self.settle).await;

        let selection: Vec<String> = submitted.names().map(str::to_string).collect();
        let read = ReadRequest::by_key(key.clone()).with_selection(selection.clone());
        let result = match chain
            .execute(connection, transport, &OperationRequest::Read(read))
            .await
        {
            Err(failure) => VerificationResult::unverifiable(
                submitted,
                format!("verification read failed: {failure}"),
            ),
            Ok(success) => match success.accepted.records.first() {
                None => VerificationResult::unverifiable(
                    submitted,
                    format!("{key} not found on verification read"),
                ),
                Some(record) => {
                    let observed = connection
                        .normalizer()
                        .normalize_record(record, Some(&selection));
                    compare(submitted, &observed)
                }
            },
        };

        match result.status {
            VerificationStatus::FullyVerified => {
                tracing::info!(resource = %key.resource(), "write verified: {}", key);
            }
            VerificationStatus::PartiallyVerified => tracing::warn!(
                resource = %key.resource(),
                "write partially verified: {} ({} mismatched, {} unobservable)",
                key,
                result.mismatches().len(),
                result.unobservable().len()
            ),
            VerificationStatus::Unverifiable => tracing::warn!(
                resource = %key.resource(),
                "write unverifiable: {}",
                result.note.as_deref().unwrap_or_default()
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn all_equal_is_fully_verified() {
        let submitted = FieldSet::new().with("status", "ACTIVE").with("priority", 2);
        let observed = FieldSet::new().with("STATUS", "ACTIVE").with("priority", "2");
        let result = compare(&submitted, &observed);
        assert!(result.is_fully_verified());
        assert!(result.mismatches().is_empty());
    }

    #[test]
    fn differing_value_is_a_mismatch() {
        let submitted = FieldSet::new().with("status", "ACTIVE");
        let observed = FieldSet::new().with("status", "INACTIVE");
        let result = compare(&submitted, &observed);
        assert_eq!(result.status, VerificationStatus::PartiallyVerified);
        assert_eq!(
            result.mismatches(),
            vec![Mismatch {
                field: "status".into(),
                expected: "ACTIVE".into(),
                actual: "INACTIVE".into(),
            }]
        );
    }

    #[test]
    fn absent_field_is_unobservable_not_verified() {
        let submitted = FieldSet::new().with("status", "ACTIVE").with("location", "L-1");
        let observed = FieldSet::new().with("status", "ACTIVE");
        let result = compare(&submitted, &observed);
        assert_eq!(result.status, VerificationStatus::PartiallyVerified);
        assert_eq!(result.unobservable(), vec!["location"]);
        assert!(result.mismatches().is_empty());
    }

    #[test]
    fn unverifiable_marks_every_field() {
        let submitted = FieldSet::new().with("status", "ACTIVE");
        let result = VerificationResult::unverifiable(&submitted, "read failed");
        assert_eq!(result.status, VerificationStatus::Unverifiable);
        assert_eq!(result.unobservable(), vec!["status"]);
        assert_eq!(result.note.as_deref(), Some("read failed"));
    }

    #[test]
    fn serializes_checks_flat() {
        let result = compare(
            &FieldSet::new().with("status", "ACTIVE"),
            &FieldSet::new().with("status", "INACTIVE"),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "partially_verified");
        assert_eq!(json["fields"][0]["check"], "mismatch");
        assert_eq!(json["fields"][0]["actual"], "INACTIVE");
    }
}
