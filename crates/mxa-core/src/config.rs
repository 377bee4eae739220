//! Access configuration
//!
//! An explicit value handed to [`RecordAccess`](crate::RecordAccess) at
//! construction; nothing is read from process-wide state. Loaded from TOML:
//!
//! ```toml
//! host = "https://maximo.example.com"
//! namespace = "spi:"
//! verify_settle_ms = 2000
//!
//! [credentials]
//! api_key = "..."
//! ```

use mxa_strategy::{AuthScheme, Connection, Credentials, Timeouts};
use mxa_wire::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Host values that mean "not configured yet"
pub const HOST_PLACEHOLDERS: &[&str] = &["your.maximo.com", "YOUR_MAXIMO_HOST_HERE"];

/// Credential values that mean "not configured yet"
pub const CREDENTIAL_PLACEHOLDERS: &[&str] =
    &["your_long_api_key", "YOUR_MAXIMO_API_KEY_HERE", "apikey"];

/// Configuration errors; fatal before any strategy runs
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No host configured
    #[error("backend host is not configured")]
    MissingHost,

    /// Host is a template placeholder
    #[error("backend host '{0}' is a placeholder")]
    PlaceholderHost(String),

    /// No credentials configured
    #[error("credentials are not configured (need api_key or username/password)")]
    MissingCredentials,

    /// A credential is a template placeholder
    #[error("credential '{0}' is a placeholder")]
    PlaceholderCredential(&'static str),

    /// Auth scheme does not fit the credentials
    #[error("auth scheme {scheme:?} cannot be used with {credentials} credentials")]
    SchemeMismatch {
        /// Configured scheme
        scheme: AuthScheme,
        /// Credential kind
        credentials: &'static str,
    },

    /// A numeric setting is out of range
    #[error("invalid setting '{field}': {reason}")]
    InvalidValue {
        /// Setting name
        field: &'static str,
        /// Why it is invalid
        reason: String,
    },

    /// HTTP client could not be built from these settings
    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),

    /// TOML could not be parsed
    #[error("invalid configuration TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Access configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Backend base URL; `https://` is assumed when no scheme is given
    pub host: String,
    /// API key or username/password
    pub credentials: Option<Credentials>,
    /// Presentation of username/password; inferred when absent
    pub auth_scheme: Option<AuthScheme>,
    /// Namespace token of the OSLC convention
    pub namespace: String,
    /// OSLC read timeout in seconds
    pub read_timeout_secs: u64,
    /// REST read timeout in seconds
    pub rest_read_timeout_secs: u64,
    /// Write timeout in seconds
    pub write_timeout_secs: u64,
    /// Pause before a verification read, in milliseconds
    pub verify_settle_ms: u64,
    /// Pause before a create fallback search, in milliseconds
    pub create_settle_ms: u64,
    /// Overall bound on one facade call, in seconds
    pub deadline_secs: u64,
    /// Accept self-signed TLS certificates
    pub accept_invalid_certs: bool,
    /// Rows fetched by the create fallback search
    pub search_page_size: u32,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            credentials: None,
            auth_scheme: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            read_timeout_secs: 30,
            rest_read_timeout_secs: 15,
            write_timeout_secs: 60,
            verify_settle_ms: 2000,
            create_settle_ms: 3000,
            deadline_secs: 300,
            accept_invalid_certs: true,
            search_page_size: 5,
        }
    }
}

impl AccessConfig {
    /// Create configuration for a host and credentials
    #[must_use]
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            credentials: Some(credentials),
            ..Self::default()
        }
    }

    /// Parse TOML
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Read a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// With auth scheme
    #[inline]
    #[must_use]
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = Some(scheme);
        self
    }

    /// With namespace token
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// With verification settle delay
    #[inline]
    #[must_use]
    pub fn with_verify_settle(mut self, settle: Duration) -> Self {
        self.verify_settle_ms = duration_ms(settle);
        self
    }

    /// With create-search settle delay
    #[inline]
    #[must_use]
    pub fn with_create_settle(mut self, settle: Duration) -> Self {
        self.create_settle_ms = duration_ms(settle);
        self
    }

    /// With overall deadline, rounded up to whole seconds
    #[inline]
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        let partial = u64::from(deadline.subsec_nanos() > 0);
        self.deadline_secs = deadline.as_secs().saturating_add(partial);
        self
    }

    /// Fail fast on missing or placeholder settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if HOST_PLACEHOLDERS.iter().any(|p| host.contains(p)) {
            return Err(ConfigError::PlaceholderHost(host.to_string()));
        }

        let credentials = self.credentials.as_ref().ok_or(ConfigError::MissingCredentials)?;
        match credentials {
            Credentials::ApiKey { api_key } => {
                check_secret("api_key", api_key)?;
                if let Some(scheme @ (AuthScheme::Basic | AuthScheme::MaxAuth)) = self.auth_scheme {
                    return Err(ConfigError::SchemeMismatch {
                        scheme,
                        credentials: "api key",
                    });
                }
            }
            Credentials::UserPassword { username, password } => {
                check_secret("username", username)?;
                check_secret("password", password)?;
                if self.auth_scheme == Some(AuthScheme::ApiKey) {
                    return Err(ConfigError::SchemeMismatch {
                        scheme: AuthScheme::ApiKey,
                        credentials: "username/password",
                    });
                }
            }
        }

        for (field, value) in [
            ("read_timeout_secs", self.read_timeout_secs),
            ("rest_read_timeout_secs", self.rest_read_timeout_secs),
            ("write_timeout_secs", self.write_timeout_secs),
            ("deadline_secs", self.deadline_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero".into(),
                });
            }
        }
        if self.search_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search_page_size",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Validated connection for this configuration
    pub fn connection(&self) -> Result<Connection, ConfigError> {
        self.validate()?;
        let credentials = self.credentials.as_ref().ok_or(ConfigError::MissingCredentials)?;
        let scheme = self
            .auth_scheme
            .unwrap_or_else(|| credentials.default_scheme());
        Ok(Connection::new(&self.host, credentials, scheme)
            .with_namespace(&self.namespace)
            .with_timeouts(self.timeouts()))
    }

    /// Per-attempt timeouts
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            read: Duration::from_secs(self.read_timeout_secs),
            rest_read: Duration::from_secs(self.rest_read_timeout_secs),
            write: Duration::from_secs(self.write_timeout_secs),
        }
    }

    /// Verification settle delay
    #[inline]
    #[must_use]
    pub fn verify_settle(&self) -> Duration {
        Duration::from_millis(self.verify_settle_ms)
    }

    /// Create-search settle delay
    #[inline]
    #[must_use]
    pub fn create_settle(&self) -> Duration {
        Duration::from_millis(self.create_settle_ms)
    }

    /// Overall deadline per facade call
    #[inline]
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

fn check_secret(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::MissingCredentials);
    }
    if CREDENTIAL_PLACEHOLDERS.contains(&value) {
        return Err(ConfigError::PlaceholderCredential(field));
    }
    Ok(())
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_key(key: &str) -> Credentials {
        Credentials::ApiKey {
            api_key: key.to_string(),
        }
    }

    #[test]
    fn defaults() {
        let config = AccessConfig::default();
        assert_eq!(config.namespace, "spi:");
        assert_eq!(config.timeouts().rest_read, Duration::from_secs(15));
        assert_eq!(config.verify_settle(), Duration::from_secs(2));
        assert_eq!(config.deadline(), Duration::from_secs(300));
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn parses_toml_with_user_password() {
        let config = AccessConfig::from_toml_str(
            r#"
            host = "mx.example.com"
            auth_scheme = "maxauth"
            write_timeout_secs = 90

            [credentials]
            username = "wilson"
            password = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.write_timeout_secs, 90);
        assert_eq!(config.read_timeout_secs, 30);
        assert_eq!(config.auth_scheme, Some(AuthScheme::MaxAuth));
        assert!(matches!(config.credentials, Some(Credentials::UserPassword { .. })));
        let connection = config.connection().unwrap();
        assert_eq!(connection.auth_headers()[0].0, "maxauth");
    }

    #[test]
    fn rejects_missing_and_placeholder_settings() {
        assert!(matches!(
            AccessConfig::default().validate(),
            Err(ConfigError::MissingHost)
        ));
        assert!(matches!(
            AccessConfig::new("https://your.maximo.com", api_key("k")).validate(),
            Err(ConfigError::PlaceholderHost(_))
        ));
        assert!(matches!(
            AccessConfig::new("mx.example.com", api_key("YOUR_MAXIMO_API_KEY_HERE")).validate(),
            Err(ConfigError::PlaceholderCredential("api_key"))
        ));
        let no_credentials = AccessConfig {
            host: "mx.example.com".into(),
            ..AccessConfig::default()
        };
        assert!(matches!(
            no_credentials.validate(),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn rejects_scheme_mismatch_and_zero_timeouts() {
        let config = AccessConfig::new("mx.example.com", api_key("real-key"))
            .with_auth_scheme(AuthScheme::MaxAuth);
        assert!(matches!(config.validate(), Err(ConfigError::SchemeMismatch { .. })));

        let config = AccessConfig {
            write_timeout_secs: 0,
            ..AccessConfig::new("mx.example.com", api_key("real-key"))
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "write_timeout_secs", .. })
        ));
    }

    #[test]
    fn sub_second_deadline_rounds_up() {
        let config = AccessConfig::new("mx.example.com", api_key("real-key"))
            .with_deadline(Duration::from_millis(250));
        assert_eq!(config.deadline(), Duration::from_secs(1));
        assert!(config.validate().is_ok());

        let config = config.with_deadline(Duration::from_millis(2500));
        assert_eq!(config.deadline_secs, 3);
        let config = config.with_deadline(Duration::from_secs(7));
        assert_eq!(config.deadline_secs, 7);
    }

    #[test]
    fn bad_toml_is_parse_error() {
        assert!(matches!(
            AccessConfig::from_toml_str("host = "),
            Err(ConfigError::Parse(_))
        ));
    }
}
