//! Record access facade
//!
//! The public surface of mxaccess. A [`RecordAccess`] owns an immutable
//! connection, the strategy chains and a transport; every call builds its
//! own requests and shares no mutable state with concurrent calls.
//!
//! # Workflow
//! 1. Prepare the logical request (key, criteria, field set)
//! 2. Run the operation's strategy chain until one strategy is accepted
//! 3. For writes, re-read and verify what the backend actually stored
//! 4. Return a tagged outcome
//!
//! Each call is bounded by the configured overall deadline; dropping the
//! returned future cancels whatever attempt is in flight.

use crate::config::{AccessConfig, ConfigError};
use crate::error::AccessError;
use crate::outcome::{CreateOutcome, FetchOutcome, KeySource, UpdateOutcome};
use crate::verifier::WriteVerifier;
use mxa_strategy::{
    ChainSuccess, Connection, CreateRequest, OperationKind, OperationRequest, OrderBy,
    ReadRequest, ReqwestTransport, RestPlainStrategy, StrategyChain, StrategyKind,
    StrategyRegistry, Transport, UpdateRequest,
};
use mxa_wire::{
    envelope, Condition, CustomResource, FieldSet, FieldValue, KeyValue, ResourceKey,
    ResourceType, SearchCriteria, WireRecord, SITE_FIELD,
};
use std::future::Future;
use std::sync::Arc;

/// Field that carries the optimistic concurrency token
const ROWSTAMP_FIELD: &str = "_rowstamp";

/// Field searched on by the create fallback
const DESCRIPTION_FIELD: &str = "description";

/// Record access facade
#[derive(Debug, Clone)]
pub struct RecordAccess {
    config: AccessConfig,
    connection: Connection,
    registry: StrategyRegistry,
    transport: Arc<dyn Transport>,
    verifier: WriteVerifier,
}

impl RecordAccess {
    /// Create facade over an injected transport
    ///
    /// Fails with a configuration error before any request is made when
    /// the host or credentials are missing or placeholders.
    pub fn new(config: AccessConfig, transport: Arc<dyn Transport>) -> Result<Self, AccessError> {
        let connection = config.connection()?;
        tracing::info!("Record access configured for {}", connection.host());
        Ok(Self {
            verifier: WriteVerifier::new(config.verify_settle()),
            config,
            connection,
            registry: StrategyRegistry::with_defaults(),
            transport,
        })
    }

    /// Create facade over HTTPS
    pub fn connect(config: AccessConfig) -> Result<Self, AccessError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.accept_invalid_certs)
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Self::new(config, Arc::new(transport))
    }

    /// Replace the strategy chains
    #[must_use]
    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Connection
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Strategy chains
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Read records by natural key
    ///
    /// `fields` selects logical fields; `None` means the resource default.
    /// A key matching nothing is [`FetchOutcome::NotFound`], not an error.
    pub async fn fetch(
        &self,
        key: &ResourceKey,
        fields: Option<&[String]>,
    ) -> Result<FetchOutcome, AccessError> {
        self.within(async {
            tracing::info!(resource = %key.resource(), "Fetching {}", key);
            let mut read = ReadRequest::by_key(key.clone());
            if let Some(fields) = fields {
                read = read.with_selection(fields.to_vec());
            }
            let (success, records) = self.read(read).await?;
            if records.is_empty() {
                tracing::info!("No records match {}", key);
                return Ok(FetchOutcome::NotFound { key: key.clone() });
            }
            Ok(FetchOutcome::Found {
                records,
                strategy: success.strategy,
            })
        })
        .await
    }

    /// Read records matching search criteria
    pub async fn list(
        &self,
        resource: &ResourceType,
        criteria: &SearchCriteria,
        fields: Option<&[String]>,
        max_results: u32,
    ) -> Result<Vec<FieldSet>, AccessError> {
        if max_results == 0 {
            return Err(AccessError::InvalidRequest("max_results must be positive".into()));
        }
        self.within(async {
            tracing::info!(resource = %resource, "Listing up to {} record(s)", max_results);
            let mut read = ReadRequest::by_criteria(resource.clone(), criteria.clone())
                .with_page_size(max_results);
            if let Some(fields) = fields {
                read = read.with_selection(fields.to_vec());
            }
            let (_, mut records) = self.read(read).await?;
            records.truncate(usize::try_from(max_results).unwrap_or(usize::MAX));
            Ok(records)
        })
        .await
    }

    /// Create a record whose primary key the backend generates
    ///
    /// Once a create strategy has been accepted this never fails: a key
    /// that cannot be identified yields [`CreateOutcome::PartialSuccess`].
    pub async fn create(
        &self,
        resource: &ResourceType,
        site: Option<&str>,
        fields: &FieldSet,
    ) -> Result<CreateOutcome, AccessError> {
        let request = CreateRequest::new(resource.clone(), site, fields);
        if request.fields.is_empty() {
            return Err(AccessError::InvalidRequest("no fields to create".into()));
        }

        self.within(async {
            tracing::info!(
                resource = %resource,
                "Creating record with {} field(s)",
                request.fields.len()
            );
            let success = self
                .registry
                .chain(OperationKind::Create)
                .execute(
                    &self.connection,
                    self.transport.as_ref(),
                    &OperationRequest::Create(request.clone()),
                )
                .await?;

            let generated = envelope::extract_generated_key(
                &success.accepted.body,
                resource,
                self.connection.normalizer(),
            );
            let (generated, source) = match generated {
                Some(pk) => (Some(pk), KeySource::Response),
                None => {
                    tracing::info!("Create response carried no key; searching for the new record");
                    (self.find_created(&request).await, KeySource::Search)
                }
            };

            let site_id = request.site.as_deref();
            let outcome = match generated.map(|pk| created_key(resource, &pk, site_id)) {
                Some(Ok(key)) => {
                    tracing::info!(strategy = %success.strategy, "Created {}", key);
                    CreateOutcome::Created {
                        key,
                        strategy: success.strategy,
                        source,
                        failed_attempts: success.failed,
                    }
                }
                Some(Err(err)) => partial_create(success, format!("generated key unusable: {err}")),
                None => partial_create(success, "generated key could not be confirmed".into()),
            };
            Ok(outcome)
        })
        .await
    }

    /// Update an existing record and verify the result
    ///
    /// The record must resolve first; a key matching nothing fails with
    /// [`AccessError::NotFound`] and no write is attempted.
    pub async fn update(
        &self,
        key: &ResourceKey,
        changes: &FieldSet,
    ) -> Result<UpdateOutcome, AccessError> {
        if changes.is_empty() {
            return Err(AccessError::InvalidRequest("no fields to update".into()));
        }
        if !key.is_point() {
            return Err(AccessError::InvalidRequest(format!(
                "update needs a single-record key, got {key}"
            )));
        }

        self.within(async {
            tracing::info!(
                resource = %key.resource(),
                "Updating {} ({} field(s))",
                key,
                changes.len()
            );

            let resolve = ReadRequest::by_key(key.clone());
            let selection = resolve.effective_selection();
            let resolved = self
                .registry
                .chain(OperationKind::Read)
                .execute(
                    &self.connection,
                    self.transport.as_ref(),
                    &OperationRequest::Read(resolve),
                )
                .await?;
            let Some(record) = self.first_match(&resolved, &selection) else {
                tracing::warn!("Refusing to update {}: not found", key);
                return Err(AccessError::NotFound { key: key.to_string() });
            };

            let update = UpdateRequest::new(key.clone(), changes.clone())
                .with_resource_uri(resource_uri(resolved.strategy, record))
                .with_rowstamp(self.rowstamp(record));
            let written = self
                .registry
                .chain(OperationKind::Update)
                .execute(
                    &self.connection,
                    self.transport.as_ref(),
                    &OperationRequest::Update(update),
                )
                .await?;

            let verification = self
                .verifier
                .verify(
                    self.registry.chain(OperationKind::Read),
                    &self.connection,
                    self.transport.as_ref(),
                    key,
                    changes,
                )
                .await;

            Ok(UpdateOutcome {
                key: key.clone(),
                strategy: written.strategy,
                status: written.accepted.status,
                verification,
                failed_attempts: written.failed,
            })
        })
        .await
    }

    /// Change a record's status
    pub async fn update_status(
        &self,
        key: &ResourceKey,
        status: &str,
    ) -> Result<UpdateOutcome, AccessError> {
        self.update(key, &FieldSet::new().with("status", status)).await
    }

    /// Check connectivity and credentials by reading one person record
    pub async fn ping(&self) -> Result<FetchOutcome, AccessError> {
        self.within(async {
            let chain =
                StrategyChain::new(OperationKind::Read).with(Arc::new(RestPlainStrategy::new()));
            let key = ResourceKey::scoped(person_resource());
            let read = ReadRequest::by_key(key.clone()).with_page_size(1);
            let selection = read.effective_selection();

            let success = chain
                .execute(&self.connection, self.transport.as_ref(), &OperationRequest::Read(read))
                .await?;
            tracing::info!("Backend {} reachable", self.connection.host());
            let records = self.normalize(&success, &selection);
            if records.is_empty() {
                return Ok(FetchOutcome::NotFound { key });
            }
            Ok(FetchOutcome::Found {
                records,
                strategy: success.strategy,
            })
        })
        .await
    }

    async fn read(&self, read: ReadRequest) -> Result<(ChainSuccess, Vec<FieldSet>), AccessError> {
        let selection = read.effective_selection();
        let success = self
            .registry
            .chain(OperationKind::Read)
            .execute(&self.connection, self.transport.as_ref(), &OperationRequest::Read(read))
            .await?;
        let records = self.normalize(&success, &selection);
        Ok((success, records))
    }

    /// First raw record that carries any selected field, as `fetch` sees it
    fn first_match<'a>(
        &self,
        success: &'a ChainSuccess,
        selection: &[String],
    ) -> Option<&'a WireRecord> {
        success.accepted.records.iter().find(|record| {
            !self
                .connection
                .normalizer()
                .normalize_record(record, Some(selection))
                .is_empty()
        })
    }

    fn normalize(&self, success: &ChainSuccess, selection: &[String]) -> Vec<FieldSet> {
        success
            .accepted
            .records
            .iter()
            .map(|record| self.connection.normalizer().normalize_record(record, Some(selection)))
            .filter(|record| !record.is_empty())
            .collect()
    }

    /// Best-effort search for a record just created without a key in the
    /// response: newest records in the same site with the same description
    async fn find_created(&self, create: &CreateRequest) -> Option<String> {
        tokio::time::sleep(self.config.create_settle()).await;

        let resource = &create.resource;
        let mut criteria = SearchCriteria::new();
        if let Some(site) = &create.site {
            criteria = criteria.with(SITE_FIELD, Condition::Equals(site.clone()));
        }
        if let Some(description) = create
            .fields
            .get(DESCRIPTION_FIELD)
            .and_then(FieldValue::as_text)
        {
            criteria = criteria.with(DESCRIPTION_FIELD, Condition::Equals(description.to_string()));
        }

        let mut selection = vec![resource.primary_key().to_string()];
        selection.extend(create.fields.names().map(str::to_string));
        let read = ReadRequest::by_criteria(resource.clone(), criteria)
            .with_selection(selection)
            .with_order(OrderBy::descending(resource.sequence_field()))
            .with_page_size(self.config.search_page_size);

        let (_, candidates) = match self.read(read).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("Search for created record failed: {}", err);
                return None;
            }
        };

        let best = candidates
            .iter()
            .find(|candidate| resembles(candidate, &create.fields))
            .or_else(|| candidates.first())?;
        best.get(resource.primary_key())
            .map(FieldValue::normalized)
            .filter(|pk| !pk.is_empty())
    }

    fn rowstamp(&self, record: &WireRecord) -> Option<String> {
        self.connection
            .normalizer()
            .value_of(record, ROWSTAMP_FIELD)
            .map(|v| v.normalized())
            .filter(|v| !v.is_empty())
    }

    async fn within<T>(
        &self,
        call: impl Future<Output = Result<T, AccessError>>,
    ) -> Result<T, AccessError> {
        let deadline = self.config.deadline();
        match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Call abandoned after {}s deadline", deadline.as_secs());
                Err(AccessError::DeadlineExceeded(deadline))
            }
        }
    }
}

/// Every submitted field the candidate carries matches, ignoring case
fn resembles(candidate: &FieldSet, submitted: &FieldSet) -> bool {
    submitted.iter().all(|(field, expected)| match candidate.get(field) {
        Some(observed) => {
            expected.matches(observed)
                || expected.normalized().eq_ignore_ascii_case(&observed.normalized())
        }
        None => true,
    })
}

fn resource_uri(strategy: StrategyKind, record: &WireRecord) -> Option<String> {
    // Only OSLC resolutions carry a URI the OSLC update can target
    if strategy != StrategyKind::OslcNamespaced {
        return None;
    }
    envelope::resource_uri(record).map(str::to_string)
}

fn created_key(
    resource: &ResourceType,
    pk: &str,
    site: Option<&str>,
) -> Result<ResourceKey, mxa_wire::KeyError> {
    let key = ResourceKey::new(resource.clone(), KeyValue::Single(pk.to_string()))?;
    match site {
        Some(site) => key.with_site(site),
        None => Ok(key),
    }
}

fn partial_create(success: ChainSuccess, message: String) -> CreateOutcome {
    tracing::warn!(strategy = %success.strategy, "Create accepted but {}", message);
    CreateOutcome::PartialSuccess {
        strategy: success.strategy,
        message,
        failed_attempts: success.failed,
    }
}

fn person_resource() -> ResourceType {
    ResourceType::Custom(Box::new(CustomResource {
        object_structure: "mxperson".into(),
        bulk_name: "PERSON".into(),
        primary_key: "personid".into(),
        sequence_field: "personuid".into(),
        default_selection: vec!["personid".into(), "displayname".into()],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resembles_ignores_case_and_missing_fields() {
        let submitted = FieldSet::new()
            .with("description", "Pump X")
            .with("assettype", "PUMP");
        let candidate = FieldSet::new().with("description", "PUMP X");
        assert!(resembles(&candidate, &submitted));

        let other = FieldSet::new().with("description", "Pump Y");
        assert!(!resembles(&other, &submitted));
    }

    #[test]
    fn created_key_is_site_scoped() {
        let key = created_key(&ResourceType::Asset, "13150", Some("BEDFORD")).unwrap();
        assert_eq!(key.to_string(), "asset assetnum=13150 siteid=BEDFORD");
        assert!(created_key(&ResourceType::Asset, "13150", None).unwrap().site().is_none());
    }

    #[test]
    fn person_probe_selects_identity_fields() {
        let read = ReadRequest::by_key(ResourceKey::scoped(person_resource()));
        assert_eq!(read.effective_selection(), vec!["personid", "displayname"]);
    }
}
