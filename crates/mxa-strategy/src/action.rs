//! Action bulk strategy
//!
//! Coarse fallback for writes: the payload is an array wrapped under the
//! upper-cased resource name, with upper-cased fields inside:
//!
//! ```text
//! POST /maximo/api/os/mxasset?_action=Change&oslc.where=assetnum="13150"
//! {"ASSET": [{"ASSETNUM": "13150", "SITEID": "BEDFORD", "STATUS": "ACTIVE"}]}
//! ```

use crate::connection::Connection;
use crate::strategy::{
    base_headers, unsupported, CreateRequest, OperationKind, OperationRequest, Strategy,
    StrategyError, StrategyKind, UpdateRequest,
};
use crate::transport::HttpRequest;
use mxa_wire::{ResourceType, WireConvention, SITE_FIELD};
use serde_json::{Map, Value};

const CONVENTION: WireConvention = WireConvention::UpperCase;

/// REST API `_action` bulk payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionBulkStrategy;

impl ActionBulkStrategy {
    /// Create new action strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn update(
        connection: &Connection,
        update: &UpdateRequest,
    ) -> Result<HttpRequest, StrategyError> {
        if update.changes.is_empty() {
            return Err(StrategyError::InvalidRequest("no fields to update".into()));
        }
        let normalizer = connection.normalizer();
        let mut entry = Map::new();
        for (name, value) in update.key_fields()? {
            entry.insert(normalizer.wire_name(CONVENTION, name), Value::String(value.to_string()));
        }
        for (name, value) in update.changes.iter() {
            entry.insert(normalizer.wire_name(CONVENTION, name), value.to_json());
        }

        let resource = update.key.resource();
        Ok(HttpRequest::post(connection.api_url(resource), wrap(resource, entry))
            .with_headers(&base_headers(connection, true))
            .with_query("_action", "Change")
            .with_query(
                "oslc.where",
                connection.filter().build(WireConvention::Plain, &update.key),
            ))
    }

    fn create(connection: &Connection, create: &CreateRequest) -> HttpRequest {
        let normalizer = connection.normalizer();
        let mut entry = Map::new();
        if let Some(site) = &create.site {
            entry.insert(normalizer.wire_name(CONVENTION, SITE_FIELD), Value::String(site.clone()));
        }
        for (name, value) in create.fields.iter() {
            entry.insert(normalizer.wire_name(CONVENTION, name), value.to_json());
        }

        HttpRequest::post(connection.api_url(&create.resource), wrap(&create.resource, entry))
            .with_headers(&base_headers(connection, true))
            .with_query("_action", "Add")
            .with_query("lean", "1")
    }
}

fn wrap(resource: &ResourceType, entry: Map<String, Value>) -> Value {
    let mut body = Map::new();
    body.insert(
        resource.bulk_name().to_string(),
        Value::Array(vec![Value::Object(entry)]),
    );
    Value::Object(body)
}

impl Strategy for ActionBulkStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ActionBulk
    }

    fn supports(&self, operation: OperationKind) -> bool {
        matches!(operation, OperationKind::Create | OperationKind::Update)
    }

    fn build_request(
        &self,
        connection: &Connection,
        request: &OperationRequest,
    ) -> Result<HttpRequest, StrategyError> {
        let http = match request {
            OperationRequest::Update(update) => Self::update(connection, update)?,
            OperationRequest::Create(create) => Self::create(connection, create),
            OperationRequest::Read(_) => return Err(unsupported(self.kind(), request.kind())),
        };
        Ok(http.with_timeout(self.timeout(request.kind(), connection)))
    }
}
