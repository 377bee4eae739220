//! Testing utilities for the mxaccess workspace
//!
//! A scripted transport standing in for the backend, plus record, response
//! and configuration fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use mxa_core::{AccessConfig, RecordAccess};
use mxa_strategy::{Credentials, HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use mxa_wire::{ResourceKey, ResourceType};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_HOST: &str = "https://mx.test";
pub const TEST_API_KEY: &str = "test-api-key";

/// What a rule answers with
#[derive(Debug, Clone)]
pub enum Reply {
    Response(HttpResponse),
    Error(TransportError),
}

/// One scripted exchange: matchers plus a reply
#[derive(Debug, Clone)]
pub struct Rule {
    method: Option<HttpMethod>,
    url_contains: Option<String>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    times: Option<usize>,
    used: usize,
    reply: Reply,
}

impl Rule {
    fn new(method: Option<HttpMethod>, url_contains: &str) -> Self {
        Self {
            method,
            url_contains: Some(url_contains.to_string()),
            query: Vec::new(),
            headers: Vec::new(),
            times: None,
            used: 0,
            reply: Reply::Error(TransportError::Connect("rule has no reply".into())),
        }
    }

    /// Any request whose URL contains `url_contains`
    pub fn any(url_contains: &str) -> Self {
        Self::new(None, url_contains)
    }

    pub fn get(url_contains: &str) -> Self {
        Self::new(Some(HttpMethod::Get), url_contains)
    }

    pub fn post(url_contains: &str) -> Self {
        Self::new(Some(HttpMethod::Post), url_contains)
    }

    /// Query parameter `name` must contain `fragment`
    #[must_use]
    pub fn query(mut self, name: &str, fragment: &str) -> Self {
        self.query.push((name.to_string(), fragment.to_string()));
        self
    }

    /// Header `name` must equal `value` (name case-insensitive)
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Match at most `n` requests
    #[must_use]
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    #[must_use]
    pub fn respond(mut self, status: u16, body: &Value) -> Self {
        self.reply = Reply::Response(HttpResponse::json(status, body));
        self
    }

    #[must_use]
    pub fn respond_raw(mut self, status: u16, body: &str) -> Self {
        self.reply = Reply::Response(HttpResponse::new(status, body));
        self
    }

    #[must_use]
    pub fn respond_empty(mut self, status: u16) -> Self {
        self.reply = Reply::Response(HttpResponse::empty(status));
        self
    }

    #[must_use]
    pub fn fail(mut self, error: TransportError) -> Self {
        self.reply = Reply::Error(error);
        self
    }

    fn matches(&self, request: &HttpRequest) -> bool {
        if self.times.is_some_and(|n| self.used >= n) {
            return false;
        }
        if self.method.is_some_and(|m| m != request.method) {
            return false;
        }
        if let Some(fragment) = &self.url_contains {
            if !request.url.contains(fragment.as_str()) {
                return false;
            }
        }
        let query_ok = self.query.iter().all(|(name, fragment)| {
            request
                .query_value(name)
                .is_some_and(|v| v.contains(fragment.as_str()))
        });
        let headers_ok = self
            .headers
            .iter()
            .all(|(name, value)| request.header(name) == Some(value.as_str()));
        query_ok && headers_ok
    }
}

/// Transport answering from ordered rules and logging every request
///
/// The first matching rule wins. A request no rule matches fails with a
/// connection error, so unexpected traffic shows up as a network failure.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    rules: Mutex<Vec<Rule>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rule(self, rule: Rule) -> Self {
        self.push(rule);
        self
    }

    pub fn push(&self, rule: Rule) {
        self.rules.lock().push(rule);
    }

    /// Every request sent so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Requests carrying `x-method-override: verb`
    pub fn overridden(&self, verb: &str) -> Vec<HttpRequest> {
        self.log
            .lock()
            .iter()
            .filter(|r| r.header("x-method-override") == Some(verb))
            .cloned()
            .collect()
    }

    /// Write requests (every POST)
    pub fn writes(&self) -> Vec<HttpRequest> {
        self.log
            .lock()
            .iter()
            .filter(|r| r.method == HttpMethod::Post)
            .cloned()
            .collect()
    }

    /// Read requests (every GET)
    pub fn reads(&self) -> Vec<HttpRequest> {
        self.log
            .lock()
            .iter()
            .filter(|r| r.method == HttpMethod::Get)
            .cloned()
            .collect()
    }

    fn reply_for(&self, request: &HttpRequest) -> Reply {
        let mut rules = self.rules.lock();
        match rules.iter_mut().find(|rule| rule.matches(request)) {
            Some(rule) => {
                rule.used += 1;
                rule.reply.clone()
            }
            None => Reply::Error(TransportError::Connect(format!(
                "no scripted reply for {} {}",
                request.method, request.url
            ))),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = self.reply_for(&request);
        self.log.lock().push(request);
        match reply {
            Reply::Response(response) => Ok(response),
            Reply::Error(error) => Err(error),
        }
    }
}

/// Configuration pointing at [`TEST_HOST`] with short settle delays
pub fn test_config() -> AccessConfig {
    AccessConfig::new(
        TEST_HOST,
        Credentials::ApiKey {
            api_key: TEST_API_KEY.into(),
        },
    )
    .with_verify_settle(Duration::from_millis(10))
    .with_create_settle(Duration::from_millis(10))
}

pub fn test_access(transport: &Arc<ScriptedTransport>) -> RecordAccess {
    let transport: Arc<dyn Transport> = transport.clone();
    RecordAccess::new(test_config(), transport).unwrap()
}

pub fn asset_key(assetnum: &str, site: &str) -> ResourceKey {
    ResourceKey::parse(ResourceType::Asset, assetnum, Some(site)).unwrap()
}

/// Encoded resource URI as the OSLC API renders it: `_<base64(pk/site)>--`
pub fn asset_uri(assetnum: &str, site: &str) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(format!("{assetnum}/{site}"));
    format!("{TEST_HOST}/maximo/oslc/os/mxasset/_{encoded}--")
}

/// Asset as the OSLC API returns it
pub fn oslc_asset(assetnum: &str, site: &str, status: &str) -> Value {
    json!({
        "rdf:about": asset_uri(assetnum, site),
        "spi:assetnum": assetnum,
        "spi:siteid": site,
        "spi:status": status,
        "spi:description": format!("Asset {assetnum}"),
        "spi:_rowstamp": "1234567"
    })
}

/// Asset as the lean REST API returns it
pub fn rest_asset(assetnum: &str, site: &str, status: &str) -> Value {
    json!({
        "href": asset_uri(assetnum, site),
        "assetnum": assetnum,
        "siteid": site,
        "status": status,
        "description": format!("Asset {assetnum}"),
        "_rowstamp": "1234567"
    })
}

/// OSLC collection page
pub fn rdfs_page(records: Vec<Value>) -> Value {
    json!({ "rdfs:member": records })
}

/// REST collection page
pub fn member_page(records: Vec<Value>) -> Value {
    json!({ "member": records })
}
