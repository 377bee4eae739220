//! Strategy chain executor
//!
//! Runs an ordered list of strategies for one operation until one of them
//! succeeds. Every strategy is attempted at most once per call, strictly in
//! order; failures are recorded and the chain moves on. Exhausting the chain
//! yields a [`ChainFailure`] carrying *every* attempt's diagnostic.
//!
//! ```text
//! Pending -> Attempting(0) -> Attempting(1) -> ... -> Success(i)
//!                                             \-> AllExhausted
//! ```

use crate::connection::Connection;
use crate::strategy::{
    Accepted, OperationKind, OperationOutcome, OperationRequest, Strategy, StrategyKind,
};
use crate::transport::{Transport, TransportError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Position of one chain execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Nothing attempted yet
    Pending,
    /// Strategy at this index is in flight
    Attempting(usize),
    /// Strategy at this index succeeded
    Success(usize),
    /// Every strategy failed
    AllExhausted,
}

impl ChainState {
    /// Leave `Pending` for a chain of `len` strategies
    #[must_use]
    pub fn start(self, len: usize) -> Self {
        match self {
            Self::Pending if len == 0 => Self::AllExhausted,
            Self::Pending => Self::Attempting(0),
            other => other,
        }
    }

    /// Transition after the in-flight attempt reports
    #[must_use]
    pub fn after_attempt(self, succeeded: bool, len: usize) -> Self {
        match self {
            Self::Attempting(i) if succeeded => Self::Success(i),
            Self::Attempting(i) if i + 1 < len => Self::Attempting(i + 1),
            Self::Attempting(_) => Self::AllExhausted,
            other => other,
        }
    }

    /// Check for a terminal state
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success(_) | Self::AllExhausted)
    }
}

/// Why one attempt did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptFailure {
    /// Backend answered with a non-accepted status
    Protocol {
        /// HTTP status
        status: u16,
        /// Body excerpt
        excerpt: String,
    },
    /// No usable answer (connection, transport error or timeout)
    Network {
        /// Cause
        cause: String,
    },
    /// Strategy could not express the request; nothing was sent
    Rejected {
        /// Reason
        reason: String,
    },
}

/// Diagnostic for one failed attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptDiagnostic {
    /// Strategy attempted
    pub strategy: StrategyKind,
    /// What went wrong
    pub failure: AttemptFailure,
}

impl AttemptDiagnostic {
    /// HTTP status, when the backend answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match &self.failure {
            AttemptFailure::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for AttemptDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            AttemptFailure::Protocol { status, excerpt } if excerpt.is_empty() => {
                write!(f, "{}: HTTP {status}", self.strategy)
            }
            AttemptFailure::Protocol { status, excerpt } => {
                write!(f, "{}: HTTP {status}: {excerpt}", self.strategy)
            }
            AttemptFailure::Network { cause } => write!(f, "{}: network: {cause}", self.strategy),
            AttemptFailure::Rejected { reason } => {
                write!(f, "{}: not attempted: {reason}", self.strategy)
            }
        }
    }
}

/// Successful chain execution
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSuccess {
    /// Strategy that succeeded
    pub strategy: StrategyKind,
    /// Accepted response
    pub accepted: Accepted,
    /// Attempts that failed before it
    pub failed: Vec<AttemptDiagnostic>,
}

/// Every strategy in the chain failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFailure {
    /// Operation attempted
    pub operation: OperationKind,
    /// One diagnostic per strategy, in attempt order
    pub diagnostics: Vec<AttemptDiagnostic>,
}

impl fmt::Display for ChainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "all {} {} strategies failed",
            self.diagnostics.len(),
            self.operation
        )?;
        for diagnostic in &self.diagnostics {
            write!(f, "; {diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ChainFailure {}

/// Ordered strategies for one operation kind
#[derive(Debug, Clone)]
pub struct StrategyChain {
    operation: OperationKind,
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyChain {
    /// Create empty chain
    #[must_use]
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy (builder style)
    #[must_use]
    pub fn with(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.push(strategy);
        self
    }

    /// Append a strategy
    pub fn push(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.push(strategy);
    }

    /// Operation kind
    #[inline]
    #[must_use]
    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    /// Strategy kinds in attempt order
    #[must_use]
    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Number of strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run the chain
    pub async fn execute(
        &self,
        connection: &Connection,
        transport: &dyn Transport,
        request: &OperationRequest,
    ) -> Result<ChainSuccess, ChainFailure> {
        let operation = request.kind();
        if operation != self.operation {
            tracing::warn!("{} chain executing a {} request", self.operation, operation);
        }

        let len = self.strategies.len();
        let mut diagnostics = Vec::with_capacity(len);
        let mut state = ChainState::Pending.start(len);

        while let ChainState::Attempting(index) = state {
            let Some(strategy) = self.strategies.get(index) else {
                break;
            };
            let kind = strategy.kind();
            tracing::debug!(
                strategy = %kind,
                operation = %operation,
                resource = %request.resource(),
                "attempting strategy {}/{}",
                index + 1,
                len
            );

            match attempt(strategy.as_ref(), connection, transport, request).await {
                Ok(accepted) => {
                    tracing::info!(
                        state = ?state.after_attempt(true, len),
                        strategy = %kind,
                        operation = %operation,
                        status = accepted.status,
                        "strategy succeeded after {} failed attempt(s)",
                        diagnostics.len()
                    );
                    return Ok(ChainSuccess {
                        strategy: kind,
                        accepted,
                        failed: diagnostics,
                    });
                }
                Err(failure) => {
                    let diagnostic = AttemptDiagnostic {
                        strategy: kind,
                        failure,
                    };
                    tracing::warn!(operation = %operation, "strategy failed: {}", diagnostic);
                    diagnostics.push(diagnostic);
                    state = state.after_attempt(false, len);
                }
            }
        }

        tracing::error!(
            operation = %operation,
            resource = %request.resource(),
            "all {} strategies exhausted",
            diagnostics.len()
        );
        Err(ChainFailure {
            operation,
            diagnostics,
        })
    }
}

async fn attempt(
    strategy: &dyn Strategy,
    connection: &Connection,
    transport: &dyn Transport,
    request: &OperationRequest,
) -> Result<Accepted, AttemptFailure> {
    let operation = request.kind();
    if !strategy.supports(operation) {
        return Err(AttemptFailure::Rejected {
            reason: format!("{operation} not supported"),
        });
    }

    let http = strategy
        .build_request(connection, request)
        .map_err(|e| AttemptFailure::Rejected {
            reason: e.to_string(),
        })?;

    let limit = http.timeout;
    let response = match tokio::time::timeout(limit, transport.send(http)).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            return Err(AttemptFailure::Network {
                cause: err.to_string(),
            })
        }
        Err(_) => {
            return Err(AttemptFailure::Network {
                cause: TransportError::Timeout(limit).to_string(),
            })
        }
    };

    match strategy.interpret(operation, &response) {
        OperationOutcome::Success(accepted) => Ok(accepted),
        OperationOutcome::ProtocolFailure { status, excerpt } => {
            Err(AttemptFailure::Protocol { status, excerpt })
        }
        OperationOutcome::NetworkFailure { cause } => Err(AttemptFailure::Network { cause }),
    }
}
