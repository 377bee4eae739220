//! REST plain strategy
//!
//! The lean JSON API: unprefixed field names, reads under `member`, and
//! updates as a `SYNC` post to the collection carrying the natural key.

use crate::connection::Connection;
use crate::strategy::{
    base_headers, cache_buster, unsupported, OperationKind, OperationRequest, ReadRequest,
    Strategy, StrategyError, StrategyKind, UpdateRequest,
};
use crate::transport::HttpRequest;
use mxa_wire::WireConvention;
use serde_json::{Map, Value};
use std::time::Duration;

const CONVENTION: WireConvention = WireConvention::Plain;

/// REST API with plain field names
#[derive(Debug, Clone, Copy, Default)]
pub struct RestPlainStrategy;

impl RestPlainStrategy {
    /// Create new REST strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn read(connection: &Connection, read: &ReadRequest) -> HttpRequest {
        let mut request = HttpRequest::get(connection.api_url(&read.resource))
            .with_headers(&base_headers(connection, false));
        if let Some(filter) = read.filter(connection, CONVENTION) {
            request = request.with_query("oslc.where", filter);
        }
        request = request
            .with_query("oslc.select", read.effective_selection().join(","))
            .with_query("lean", "1")
            .with_query("_format", "json");
        if let Some(order) = &read.order_by {
            let sign = if order.descending { '-' } else { '+' };
            request = request.with_query("oslc.orderBy", format!("{sign}{}", order.field));
        }
        if let Some(size) = read.page_size {
            request = request.with_query("oslc.pageSize", size.to_string());
        }
        request.with_query("_ts", cache_buster())
    }

    fn update(
        connection: &Connection,
        update: &UpdateRequest,
    ) -> Result<HttpRequest, StrategyError> {
        if update.changes.is_empty() {
            return Err(StrategyError::InvalidRequest("no fields to update".into()));
        }
        let normalizer = connection.normalizer();
        let mut payload = Map::new();
        for (name, value) in update.changes.iter() {
            payload.insert(normalizer.wire_name(CONVENTION, name), value.to_json());
        }
        for (name, value) in update.key_fields()? {
            payload.insert(
                normalizer.wire_name(CONVENTION, name),
                Value::String(value.to_string()),
            );
        }

        Ok(
            HttpRequest::post(connection.api_url(update.key.resource()), Value::Object(payload))
                .with_headers(&base_headers(connection, true))
                .with_header("x-method-override", "SYNC")
                .with_header("properties", "*"),
        )
    }
}

impl Strategy for RestPlainStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RestPlain
    }

    fn supports(&self, operation: OperationKind) -> bool {
        matches!(operation, OperationKind::Read | OperationKind::Update)
    }

    fn timeout(&self, operation: OperationKind, connection: &Connection) -> Duration {
        match operation {
            OperationKind::Read => connection.timeouts().rest_read,
            OperationKind::Create | OperationKind::Update => connection.timeouts().write,
        }
    }

    fn build_request(
        &self,
        connection: &Connection,
        request: &OperationRequest,
    ) -> Result<HttpRequest, StrategyError> {
        let http = match request {
            OperationRequest::Read(read) => Self::read(connection, read),
            OperationRequest::Update(update) => Self::update(connection, update)?,
            OperationRequest::Create(_) => return Err(unsupported(self.kind(), request.kind())),
        };
        Ok(http.with_timeout(self.timeout(request.kind(), connection)))
    }
}
