//! Direct POST strategy
//!
//! Last-resort create: a bare JSON object of lower-cased fields posted to
//! the REST collection. No wrapper, no headers beyond the basics.

use crate::connection::Connection;
use crate::strategy::{
    base_headers, unsupported, CreateRequest, OperationKind, OperationRequest, Strategy,
    StrategyError, StrategyKind,
};
use crate::transport::HttpRequest;
use mxa_wire::{WireConvention, SITE_FIELD};
use serde_json::{Map, Value};

const CONVENTION: WireConvention = WireConvention::LowerCase;

/// Bare POST to the REST collection
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectPostStrategy;

impl DirectPostStrategy {
    /// Create new direct strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn create(connection: &Connection, create: &CreateRequest) -> HttpRequest {
        let normalizer = connection.normalizer();
        let mut payload = Map::new();
        if let Some(site) = &create.site {
            payload.insert(
                normalizer.wire_name(CONVENTION, SITE_FIELD),
                Value::String(site.clone()),
            );
        }
        for (name, value) in create.fields.iter() {
            payload.insert(normalizer.wire_name(CONVENTION, name), value.to_json());
        }
        HttpRequest::post(connection.api_url(&create.resource), Value::Object(payload))
            .with_headers(&base_headers(connection, true))
    }
}

impl Strategy for DirectPostStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectPost
    }

    fn supports(&self, operation: OperationKind) -> bool {
        operation == OperationKind::Create
    }

    fn build_request(
        &self,
        connection: &Connection,
        request: &OperationRequest,
    ) -> Result<HttpRequest, StrategyError> {
        match request {
            OperationRequest::Create(create) => Ok(Self::create(connection, create)
                .with_timeout(self.timeout(request.kind(), connection))),
            _ => Err(unsupported(self.kind(), request.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{AuthScheme, Credentials};
    use mxa_wire::{FieldSet, ResourceType};
    use serde_json::json;

    #[test]
    fn create_posts_lower_case_fields() {
        let connection = Connection::new(
            "https://mx.test",
            &Credentials::ApiKey { api_key: "k".into() },
            AuthScheme::ApiKey,
        );
        let create = CreateRequest::new(
            ResourceType::WorkOrder,
            Some("BEDFORD"),
            &FieldSet::new().with("Description", "Fix pump").with("WORKTYPE", "CM"),
        );
        let http = DirectPostStrategy::new()
            .build_request(&connection, &OperationRequest::Create(create))
            .unwrap();

        assert_eq!(http.url, "https://mx.test/maximo/api/os/mxwo");
        assert!(http.query.is_empty());
        assert_eq!(
            http.body,
            Some(json!({"siteid": "BEDFORD", "description": "Fix pump", "worktype": "CM"}))
        );
    }
}
