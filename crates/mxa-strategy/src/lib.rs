//! mxa-strategy - wire-convention strategies and fallback chains
//!
//! One backend, several incompatible conventions. Each [`Strategy`] knows
//! one of them; a [`StrategyChain`] tries them in order until one succeeds:
//! - [`OslcNamespacedStrategy`]: OSLC API, `spi:` field names
//! - [`RestPlainStrategy`]: REST API, plain field names, `SYNC` updates
//! - [`ActionBulkStrategy`]: REST `_action` bulk payloads
//! - [`DirectPostStrategy`]: bare create POST
//!
//! # Example
//!
//! ```rust,ignore
//! use mxa_strategy::prelude::*;
//!
//! # async fn example(transport: &dyn Transport) -> Result<(), Box<dyn std::error::Error>> {
//! let connection = Connection::new("maximo.example.com", &credentials, AuthScheme::ApiKey);
//! let registry = StrategyRegistry::with_defaults();
//! let request = OperationRequest::Read(ReadRequest::by_key(key));
//! let success = registry
//!     .chain(OperationKind::Read)
//!     .execute(&connection, transport, &request)
//!     .await?;
//! println!("{} answered with {} records", success.strategy, success.accepted.records.len());
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod connection;
pub mod direct;
pub mod executor;
pub mod oslc;
pub mod registry;
pub mod rest;
pub mod strategy;
pub mod transport;

pub use action::ActionBulkStrategy;
pub use connection::{AuthScheme, Connection, Credentials, Timeouts};
pub use direct::DirectPostStrategy;
pub use executor::{
    AttemptDiagnostic, AttemptFailure, ChainFailure, ChainState, ChainSuccess, StrategyChain,
};
pub use oslc::OslcNamespacedStrategy;
pub use registry::StrategyRegistry;
pub use rest::RestPlainStrategy;
pub use strategy::{
    accepted_statuses, Accepted, CreateRequest, OperationKind, OperationOutcome, OperationRequest,
    OrderBy, ReadRequest, ReadTarget, Strategy, StrategyError, StrategyKind, UpdateRequest,
};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with strategies
    pub use crate::{
        AuthScheme, Connection, Credentials, OperationKind, OperationRequest, ReadRequest,
        StrategyChain, StrategyRegistry, Transport, UpdateRequest,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
