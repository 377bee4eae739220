//! Strategy abstraction
//!
//! A strategy is one wire convention for performing a read or a write: it
//! turns an [`OperationRequest`] into an [`HttpRequest`] and interprets the
//! response as an [`OperationOutcome`]. Strategies hold no state and never
//! perform I/O themselves.

use crate::connection::Connection;
use crate::transport::{HttpRequest, HttpResponse};
use mxa_wire::{
    envelope, FieldSet, KeyValue, ResourceKey, ResourceType, SearchCriteria, WireConvention,
    WireRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Strategy capability tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// OSLC API with namespaced field names
    OslcNamespaced,
    /// REST API with plain field names
    RestPlain,
    /// REST API bulk `_action` payloads
    ActionBulk,
    /// Bare POST to the REST collection
    DirectPost,
}

impl StrategyKind {
    /// Stable name used in diagnostics
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::OslcNamespaced => "oslc_namespaced",
            Self::RestPlain => "rest_plain",
            Self::ActionBulk => "action_bulk",
            Self::DirectPost => "direct_post",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operation kind; each has its own chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Read by key or criteria
    Read,
    /// Create with a backend-generated key
    Create,
    /// Update an existing record
    Update,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
        })
    }
}

/// What a read selects on
#[derive(Debug, Clone, PartialEq)]
pub enum ReadTarget {
    /// Natural key (point or IN-list)
    Key(ResourceKey),
    /// Search criteria
    Criteria(SearchCriteria),
}

/// Result ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Logical field
    pub field: String,
    /// Newest/largest first
    pub descending: bool,
}

impl OrderBy {
    /// Descending on a field
    #[must_use]
    pub fn descending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// Read request
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    /// Resource type
    pub resource: ResourceType,
    /// Key or criteria
    pub target: ReadTarget,
    /// Logical fields to return; `None` means the resource default
    pub selection: Option<Vec<String>>,
    /// Ordering
    pub order_by: Option<OrderBy>,
    /// Page size
    pub page_size: Option<u32>,
}

impl ReadRequest {
    /// Read by natural key
    #[must_use]
    pub fn by_key(key: ResourceKey) -> Self {
        Self {
            resource: key.resource().clone(),
            target: ReadTarget::Key(key),
            selection: None,
            order_by: None,
            page_size: None,
        }
    }

    /// Read by search criteria
    #[must_use]
    pub fn by_criteria(resource: ResourceType, criteria: SearchCriteria) -> Self {
        Self {
            resource,
            target: ReadTarget::Criteria(criteria),
            selection: None,
            order_by: None,
            page_size: None,
        }
    }

    /// Select logical fields
    #[must_use]
    pub fn with_selection(mut self, fields: Vec<String>) -> Self {
        self.selection = Some(fields);
        self
    }

    /// Order results
    #[must_use]
    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    /// Limit results
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Logical fields to request: the selection (or resource default)
    /// with the primary key always included
    #[must_use]
    pub fn effective_selection(&self) -> Vec<String> {
        let mut fields: Vec<String> = match &self.selection {
            Some(fields) => fields.iter().map(|f| mxa_wire::logical_name(f)).collect(),
            None => self
                .resource
                .default_selection()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };
        let primary = self.resource.primary_key();
        if !fields.iter().any(|f| f == primary) {
            fields.insert(0, primary.to_string());
        }
        fields
    }

    /// Where-clause for a convention
    #[must_use]
    pub fn filter(&self, connection: &Connection, convention: WireConvention) -> Option<String> {
        match &self.target {
            ReadTarget::Key(key) if key.fields().is_empty() => None,
            ReadTarget::Key(key) => Some(connection.filter().build(convention, key)),
            ReadTarget::Criteria(criteria) => {
                connection.filter().build_criteria(convention, criteria)
            }
        }
    }
}

/// Create request
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    /// Resource type
    pub resource: ResourceType,
    /// Site scope
    pub site: Option<String>,
    /// Fields to submit; primary key and site are never sent from here
    pub fields: FieldSet,
}

impl CreateRequest {
    /// Create request with the caller's key and site fields stripped
    #[must_use]
    pub fn new(resource: ResourceType, site: Option<&str>, fields: &FieldSet) -> Self {
        let mut fields = fields.clone();
        fields.remove(resource.primary_key());
        fields.remove(mxa_wire::SITE_FIELD);
        Self {
            site: site.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
            resource,
            fields,
        }
    }
}

/// Update request
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    /// Record key
    pub key: ResourceKey,
    /// Changed fields
    pub changes: FieldSet,
    /// Canonical resource URI, when the record was resolved with one
    pub resource_uri: Option<String>,
    /// Optimistic concurrency token
    pub rowstamp: Option<String>,
}

impl UpdateRequest {
    /// Update by key only
    #[must_use]
    pub fn new(key: ResourceKey, changes: FieldSet) -> Self {
        Self {
            key,
            changes,
            resource_uri: None,
            rowstamp: None,
        }
    }

    /// Target a resolved resource URI
    #[must_use]
    pub fn with_resource_uri(mut self, uri: Option<String>) -> Self {
        self.resource_uri = uri;
        self
    }

    /// Forward a rowstamp
    #[must_use]
    pub fn with_rowstamp(mut self, rowstamp: Option<String>) -> Self {
        self.rowstamp = rowstamp;
        self
    }

    /// Single-valued key fields; writes cannot address IN-lists
    pub fn key_fields(&self) -> Result<Vec<(&str, &str)>, StrategyError> {
        self.key
            .fields()
            .iter()
            .map(|(name, value)| match value {
                KeyValue::Single(v) => Ok((name.as_str(), v.as_str())),
                KeyValue::Many(_) => Err(StrategyError::InvalidRequest(format!(
                    "update key field '{name}' has several values"
                ))),
            })
            .collect()
    }
}

/// One logical operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    /// Read
    Read(ReadRequest),
    /// Create
    Create(CreateRequest),
    /// Update
    Update(UpdateRequest),
}

impl OperationRequest {
    /// Operation kind
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Read(_) => OperationKind::Read,
            Self::Create(_) => OperationKind::Create,
            Self::Update(_) => OperationKind::Update,
        }
    }

    /// Resource type addressed
    #[must_use]
    pub fn resource(&self) -> &ResourceType {
        match self {
            Self::Read(r) => &r.resource,
            Self::Create(c) => &c.resource,
            Self::Update(u) => u.key.resource(),
        }
    }
}

/// Accepted response
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    /// HTTP status
    pub status: u16,
    /// Parsed body; `Null` when the backend sent none
    pub body: Value,
    /// Records carried by the body
    pub records: Vec<WireRecord>,
}

impl Accepted {
    /// Interpret a body for an operation
    ///
    /// Reads only ever yield envelope members; a read body without a
    /// member list matched nothing. Write bodies without an envelope are
    /// taken as the bare record they echo back.
    #[must_use]
    pub fn from_body(operation: OperationKind, status: u16, body: Value) -> Self {
        let mut records = envelope::members_of(&body);
        let enveloped = envelope::MEMBER_KEYS.iter().any(|k| body.get(k).is_some());
        if records.is_empty() && !enveloped && operation != OperationKind::Read {
            if let Some(record) = body.as_object().filter(|r| !r.is_empty()) {
                records.push(record.clone());
            }
        }
        Self {
            status,
            body,
            records,
        }
    }
}

/// Result of one strategy attempt
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// Backend accepted the request
    Success(Accepted),
    /// Backend answered but rejected the request
    ProtocolFailure {
        /// HTTP status
        status: u16,
        /// Body excerpt
        excerpt: String,
    },
    /// Request never got a usable answer
    NetworkFailure {
        /// Cause
        cause: String,
    },
}

impl OperationOutcome {
    /// Check for success
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Classify a response against the operation's accepted statuses
    ///
    /// An accepted status with an unparseable body is a protocol failure;
    /// the backend is not trusted to have done what it said.
    #[must_use]
    pub fn classify(operation: OperationKind, response: &HttpResponse) -> Self {
        if !accepted_statuses(operation).contains(&response.status) {
            return Self::ProtocolFailure {
                status: response.status,
                excerpt: response.excerpt(),
            };
        }
        match envelope::parse_body(&response.body) {
            Ok(body) => Self::Success(Accepted::from_body(operation, response.status, body)),
            Err(err) => Self::ProtocolFailure {
                status: response.status,
                excerpt: format!("{err}: {}", response.excerpt()),
            },
        }
    }
}

/// Request construction failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    /// Strategy cannot perform this operation
    #[error("{strategy} does not support {operation}")]
    Unsupported {
        /// Strategy
        strategy: StrategyKind,
        /// Operation
        operation: OperationKind,
    },

    /// Request cannot be expressed in this convention
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// One wire convention for performing operations
pub trait Strategy: Send + Sync + fmt::Debug {
    /// Capability tag
    fn kind(&self) -> StrategyKind;

    /// Name for diagnostics
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Check whether this strategy performs an operation
    fn supports(&self, operation: OperationKind) -> bool;

    /// Per-attempt timeout
    fn timeout(&self, operation: OperationKind, connection: &Connection) -> Duration {
        match operation {
            OperationKind::Read => connection.timeouts().read,
            OperationKind::Create | OperationKind::Update => connection.timeouts().write,
        }
    }

    /// Describe the HTTP request for an operation
    fn build_request(
        &self,
        connection: &Connection,
        request: &OperationRequest,
    ) -> Result<HttpRequest, StrategyError>;

    /// Interpret the backend's answer
    fn interpret(&self, operation: OperationKind, response: &HttpResponse) -> OperationOutcome {
        OperationOutcome::classify(operation, response)
    }
}

/// Statuses that count as acceptance
#[must_use]
pub fn accepted_statuses(operation: OperationKind) -> &'static [u16] {
    match operation {
        OperationKind::Read => &[200],
        OperationKind::Create => &[200, 201],
        OperationKind::Update => &[200, 201, 204],
    }
}

/// Headers every request carries
pub(crate) fn base_headers(connection: &Connection, with_body: bool) -> Vec<(String, String)> {
    let mut headers = connection.auth_headers().to_vec();
    headers.push(("Accept".to_string(), "application/json".to_string()));
    if with_body {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    headers
}

/// Cache-busting timestamp
pub(crate) fn cache_buster() -> String {
    chrono::Utc::now().timestamp().to_string()
}

pub(crate) fn unsupported(strategy: StrategyKind, operation: OperationKind) -> StrategyError {
    StrategyError::Unsupported {
        strategy,
        operation,
    }
}
