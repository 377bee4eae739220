//! OSLC namespaced strategy
//!
//! Richest convention: every field name in filters, selections and
//! payloads carries the namespace token. Tried first for every operation.

use crate::connection::Connection;
use crate::strategy::{
    base_headers, cache_buster, CreateRequest, OperationKind, OperationRequest, OrderBy,
    ReadRequest, Strategy, StrategyError, StrategyKind, UpdateRequest,
};
use crate::transport::HttpRequest;
use mxa_wire::{WireConvention, SITE_FIELD};
use serde_json::{Map, Value};

const CONVENTION: WireConvention = WireConvention::Namespaced;

/// OSLC API with `spi:`-style field names
#[derive(Debug, Clone, Copy, Default)]
pub struct OslcNamespacedStrategy;

impl OslcNamespacedStrategy {
    /// Create new OSLC strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn read(connection: &Connection, read: &ReadRequest) -> HttpRequest {
        let normalizer = connection.normalizer();
        let select = read
            .effective_selection()
            .iter()
            .map(|f| normalizer.wire_name(CONVENTION, f))
            .collect::<Vec<_>>()
            .join(",");

        let mut request = HttpRequest::get(connection.oslc_url(&read.resource))
            .with_headers(&base_headers(connection, false));
        if let Some(filter) = read.filter(connection, CONVENTION) {
            request = request.with_query("oslc.where", filter);
        }
        request = request.with_query("oslc.select", select);
        if let Some(order) = &read.order_by {
            request = request.with_query("oslc.orderBy", order_term(connection, order));
        }
        if let Some(size) = read.page_size {
            request = request.with_query("oslc.pageSize", size.to_string());
        }
        request.with_query("_ts", cache_buster())
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

        HttpRequest::post(connection.oslc_url(&create.resource), Value::Object(payload))
            .with_headers(&base_headers(connection, true))
            .with_header("Properties", "*")
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

        if update.resource_uri.is_none() {
            for (name, value) in update.key_fields()? {
                payload.insert(
                    normalizer.wire_name(CONVENTION, name),
                    Value::String(value.to_string()),
                );
            }
        }
        for (name, value) in update.changes.iter() {
            payload.insert(normalizer.wire_name(CONVENTION, name), value.to_json());
        }
        if let Some(rowstamp) = &update.rowstamp {
            payload.insert(
                format!("{}_rowstamp", normalizer.namespace()),
                Value::String(rowstamp.clone()),
            );
        }

        let properties = update.changes.names().collect::<Vec<_>>().join(",");
        let request = match &update.resource_uri {
            Some(uri) => HttpRequest::post(connection.resolve(uri), Value::Object(payload)),
            None => {
                let url = connection.oslc_url(update.key.resource());
                HttpRequest::post(url, Value::Object(payload))
                    .with_query("oslc.where", connection.filter().build(CONVENTION, &update.key))
            }
        };

        Ok(request
            .with_headers(&base_headers(connection, true))
            .with_header("x-method-override", "PATCH")
            .with_header("Properties", properties)
            .with_header("patchtype", "MERGE"))
    }
}

fn order_term(connection: &Connection, order: &OrderBy) -> String {
    let sign = if order.descending { '-' } else { '+' };
    format!("{sign}{}", connection.normalizer().wire_name(CONVENTION, &order.field))
}

impl Strategy for OslcNamespacedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OslcNamespaced
    }

    fn supports(&self, _operation: OperationKind) -> bool {
        true
    }

    fn build_request(
        &self,
        connection: &Connection,
        request: &OperationRequest,
    ) -> Result<HttpRequest, StrategyError> {
        let http = match request {
            OperationRequest::Read(read) => Self::read(connection, read),
            OperationRequest::Create(create) => Self::create(connection, create),
            OperationRequest::Update(update) => Self::update(connection, update)?,
        };
        Ok(http.with_timeout(self.timeout(request.kind(), connection)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{AuthScheme, Credentials};
    use crate::transport::HttpMethod;
    use mxa_wire::{FieldSet, ResourceKey, ResourceType};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn connection() -> Connection {
        Connection::new(
            "https://mx.test",
            &Credentials::ApiKey { api_key: "k".into() },
            AuthScheme::ApiKey,
        )
    }

    fn key() -> ResourceKey {
        ResourceKey::parse(ResourceType::Asset, "13150", Some("BEDFORD")).unwrap()
    }

    #[test]
    fn read_prefixes_filter_and_selection() {
        let read = ReadRequest::by_key(key()).with_selection(vec!["status".into()]);
        let http = OslcNamespacedStrategy::new()
            .build_request(&connection(), &OperationRequest::Read(read))
            .unwrap();

        assert_eq!(http.method, HttpMethod::Get);
        assert_eq!(http.url, "https://mx.test/maximo/oslc/os/mxasset");
        assert_eq!(
            http.query_value("oslc.where"),
            Some(r#"spi:assetnum="13150" and spi:siteid="BEDFORD""#)
        );
        assert_eq!(http.query_value("oslc.select"), Some("spi:assetnum,spi:status"));
        assert!(http.query_value("_ts").is_some());
        assert_eq!(http.header("apikey"), Some("k"));
        assert_eq!(http.timeout, Duration::from_secs(30));
    }

    #[test]
    fn update_by_collection_carries_key_and_merge_headers() {
        let update = UpdateRequest::new(key(), FieldSet::new().with("status", "ACTIVE"))
            .with_rowstamp(Some("99".into()));
        let http = OslcNamespacedStrategy::new()
            .build_request(&connection(), &OperationRequest::Update(update))
            .unwrap();

        assert_eq!(http.method, HttpMethod::Post);
        assert_eq!(http.header("x-method-override"), Some("PATCH"));
        assert_eq!(http.header("properties"), Some("status"));
        assert_eq!(http.header("patchtype"), Some("MERGE"));
        assert!(http.query_value("oslc.where").is_some());
        assert_eq!(
            http.body,
            Some(json!({
                "spi:assetnum": "13150",
                "spi:siteid": "BEDFORD",
                "spi:status": "ACTIVE",
                "spi:_rowstamp": "99"
            }))
        );
        assert_eq!(http.timeout, Duration::from_secs(60));
    }

    #[test]
    fn update_by_resource_uri_omits_key() {
        let update = UpdateRequest::new(key(), FieldSet::new().with("description", "New"))
            .with_resource_uri(Some("https://mx.test/maximo/oslc/os/mxasset/_QQ--".into()));
        let http = OslcNamespacedStrategy::new()
            .build_request(&connection(), &OperationRequest::Update(update))
            .unwrap();

        assert_eq!(http.url, "https://mx.test/maximo/oslc/os/mxasset/_QQ--");
        assert!(http.query_value("oslc.where").is_none());
        assert_eq!(http.body, Some(json!({"spi:description": "New"})));
    }

    #[test]
    fn create_sends_site_scope_without_primary_key() {
        let create = CreateRequest::new(
            ResourceType::Asset,
            Some("BEDFORD"),
            &FieldSet::new().with("assetnum", "X").with("description", "Pump X"),
        );
        let http = OslcNamespacedStrategy::new()
            .build_request(&connection(), &OperationRequest::Create(create))
            .unwrap();

        assert_eq!(http.header("Properties"), Some("*"));
        assert_eq!(
            http.body,
            Some(json!({"spi:siteid": "BEDFORD", "spi:description": "Pump X"}))
        );
    }

    #[test]
    fn empty_update_is_rejected() {
        let update = UpdateRequest::new(key(), FieldSet::new());
        assert!(OslcNamespacedStrategy::new()
            .build_request(&connection(), &OperationRequest::Update(update))
            .is_err());
    }
}
