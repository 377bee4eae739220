//! Backend connection parameters
//!
//! Immutable per backend: endpoints, authentication headers, the field
//! normalizer and per-attempt timeouts. Shared read-only by every strategy.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mxa_wire::{FieldNormalizer, FilterBuilder, ResourceType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// OSLC API path under the host
pub const OSLC_PATH: &str = "/maximo/oslc/os";

/// REST API path under the host
pub const API_PATH: &str = "/maximo/api/os";

/// How credentials are presented to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `apikey: <key>`
    ApiKey,
    /// `Authorization: Basic <base64(user:password)>`
    Basic,
    /// `maxauth: <base64(user:password)>`
    #[serde(rename = "maxauth")]
    MaxAuth,
}

/// Backend credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    /// API key
    ApiKey {
        /// Key value
        api_key: String,
    },
    /// Username and password
    UserPassword {
        /// Login name
        username: String,
        /// Password
        password: String,
    },
}

impl Credentials {
    /// Scheme used when none is configured
    #[must_use]
    pub fn default_scheme(&self) -> AuthScheme {
        match self {
            Self::ApiKey { .. } => AuthScheme::ApiKey,
            Self::UserPassword { .. } => AuthScheme::Basic,
        }
    }

    /// Authentication headers for a scheme
    ///
    /// An API key is always sent as `apikey`; the scheme only chooses
    /// between the two username/password encodings.
    #[must_use]
    pub fn headers(&self, scheme: AuthScheme) -> Vec<(String, String)> {
        match self {
            Self::ApiKey { api_key } => vec![("apikey".to_string(), api_key.clone())],
            Self::UserPassword { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                match scheme {
                    AuthScheme::MaxAuth => vec![("maxauth".to_string(), encoded)],
                    AuthScheme::Basic | AuthScheme::ApiKey => {
                        vec![("Authorization".to_string(), format!("Basic {encoded}"))]
                    }
                }
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey { .. } => f.write_str("Credentials::ApiKey(<redacted>)"),
            Self::UserPassword { username, .. } => {
                write!(f, "Credentials::UserPassword({username}, <redacted>)")
            }
        }
    }
}

/// Per-attempt timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// OSLC reads
    pub read: Duration,
    /// REST reads
    pub rest_read: Duration,
    /// Every write
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(30),
            rest_read: Duration::from_secs(15),
            write: Duration::from_secs(60),
        }
    }
}

/// Immutable connection to one backend
#[derive(Debug, Clone)]
pub struct Connection {
    host: String,
    auth_headers: Vec<(String, String)>,
    normalizer: FieldNormalizer,
    filter: FilterBuilder,
    timeouts: Timeouts,
}

impl Connection {
    /// Create connection; a host without scheme is taken as `https://`
    #[must_use]
    pub fn new(host: &str, credentials: &Credentials, scheme: AuthScheme) -> Self {
        let host = host.trim().trim_end_matches('/');
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        let normalizer = FieldNormalizer::default();
        Self {
            host,
            auth_headers: credentials.headers(scheme),
            filter: FilterBuilder::new(normalizer.clone()),
            normalizer,
            timeouts: Timeouts::default(),
        }
    }

    /// Use a different namespace token
    #[must_use]
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.normalizer = FieldNormalizer::new(namespace);
        self.filter = FilterBuilder::new(self.normalizer.clone());
        self
    }

    /// Use different timeouts
    #[inline]
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Base host URL
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// OSLC collection URL for a resource
    #[must_use]
    pub fn oslc_url(&self, resource: &ResourceType) -> String {
        format!("{}{OSLC_PATH}/{}", self.host, resource.object_structure())
    }

    /// REST collection URL for a resource
    #[must_use]
    pub fn api_url(&self, resource: &ResourceType) -> String {
        format!("{}{API_PATH}/{}", self.host, resource.object_structure())
    }

    /// REST URL for an arbitrary object structure
    #[must_use]
    pub fn api_url_for(&self, object_structure: &str) -> String {
        format!("{}{API_PATH}/{object_structure}", self.host)
    }

    /// Absolute form of a resource URI returned by the backend
    #[must_use]
    pub fn resolve(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!("{}/{}", self.host, uri.trim_start_matches('/'))
        }
    }

    /// Authentication headers
    #[inline]
    #[must_use]
    pub fn auth_headers(&self) -> &[(String, String)] {
        &self.auth_headers
    }

    /// Field normalizer
    #[inline]
    #[must_use]
    pub fn normalizer(&self) -> &FieldNormalizer {
        &self.normalizer
    }

    /// Filter builder
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &FilterBuilder {
        &self.filter
    }

    /// Timeouts
    #[inline]
    #[must_use]
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_key() -> Credentials {
        Credentials::ApiKey {
            api_key: "k3y".into(),
        }
    }

    #[test]
    fn urls_from_bare_host() {
        let conn = Connection::new("maximo.example.com/", &api_key(), AuthScheme::ApiKey);
        assert_eq!(
            conn.oslc_url(&ResourceType::Asset),
            "https://maximo.example.com/maximo/oslc/os/mxasset"
        );
        assert_eq!(
            conn.api_url(&ResourceType::Location),
            "https://maximo.example.com/maximo/api/os/mxlocation"
        );
        assert_eq!(
            conn.resolve("/maximo/oslc/os/mxasset/_QQ--"),
            "https://maximo.example.com/maximo/oslc/os/mxasset/_QQ--"
        );
    }

    #[test]
    fn auth_headers_per_scheme() {
        let user = Credentials::UserPassword {
            username: "wilson".into(),
            password: "wilson".into(),
        };
        assert_eq!(user.default_scheme(), AuthScheme::Basic);
        assert_eq!(
            user.headers(AuthScheme::Basic),
            vec![("Authorization".to_string(), "Basic d2lsc29uOndpbHNvbg==".to_string())]
        );
        assert_eq!(user.headers(AuthScheme::MaxAuth)[0].0, "maxauth");
        assert_eq!(
            api_key().headers(AuthScheme::Basic)[0],
            ("apikey".to_string(), "k3y".to_string())
        );
    }

    #[test]
    fn scheme_names_on_the_wire() {
        let names: Vec<String> = [AuthScheme::ApiKey, AuthScheme::Basic, AuthScheme::MaxAuth]
            .iter()
            .map(|scheme| serde_json::to_value(scheme).unwrap().to_string())
            .collect();
        assert_eq!(names, vec![r#""api_key""#, r#""basic""#, r#""maxauth""#]);
        let parsed: AuthScheme = serde_json::from_str(r#""maxauth""#).unwrap();
        assert_eq!(parsed, AuthScheme::MaxAuth);
    }

    #[test]
    fn debug_redacts_secrets() {
        let shown = format!("{:?}", api_key());
        assert!(!shown.contains("k3y"));
    }
}
