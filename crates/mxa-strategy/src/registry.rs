//! Strategy registry
//!
//! Holds one [`StrategyChain`] per operation kind. The default order puts
//! the richest convention first and the lossy fallbacks last:
//!
//! | Operation | Chain |
//! |-----------|-------|
//! | read      | OSLC namespaced, REST plain |
//! | update    | OSLC namespaced (PATCH), REST plain (SYNC), action bulk (Change) |
//! | create    | OSLC namespaced, action bulk (Add), direct POST |

use crate::action::ActionBulkStrategy;
use crate::direct::DirectPostStrategy;
use crate::executor::StrategyChain;
use crate::oslc::OslcNamespacedStrategy;
use crate::rest::RestPlainStrategy;
use crate::strategy::{OperationKind, Strategy, StrategyKind};
use std::sync::Arc;

/// Strategy chains per operation kind
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    read: StrategyChain,
    create: StrategyChain,
    update: StrategyChain,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl StrategyRegistry {
    /// Create registry with empty chains
    #[must_use]
    pub fn new() -> Self {
        Self {
            read: StrategyChain::new(OperationKind::Read),
            create: StrategyChain::new(OperationKind::Create),
            update: StrategyChain::new(OperationKind::Update),
        }
    }

    /// Create registry with the built-in chains
    #[must_use]
    pub fn with_defaults() -> Self {
        let oslc: Arc<dyn Strategy> = Arc::new(OslcNamespacedStrategy::new());
        let rest: Arc<dyn Strategy> = Arc::new(RestPlainStrategy::new());
        let action: Arc<dyn Strategy> = Arc::new(ActionBulkStrategy::new());

        let mut registry = Self::new();
        registry.register(OperationKind::Read, Arc::clone(&oslc));
        registry.register(OperationKind::Read, Arc::clone(&rest));

        registry.register(OperationKind::Update, Arc::clone(&oslc));
        registry.register(OperationKind::Update, rest);
        registry.register(OperationKind::Update, Arc::clone(&action));

        registry.register(OperationKind::Create, oslc);
        registry.register(OperationKind::Create, action);
        registry.register(OperationKind::Create, Arc::new(DirectPostStrategy::new()));
        registry
    }

    /// Append a strategy to an operation's chain
    pub fn register(&mut self, operation: OperationKind, strategy: Arc<dyn Strategy>) {
        self.chain_mut(operation).push(strategy);
    }

    /// Replace an operation's chain
    pub fn set_chain(&mut self, chain: StrategyChain) {
        let operation = chain.operation();
        *self.chain_mut(operation) = chain;
    }

    /// Chain for an operation
    #[must_use]
    pub fn chain(&self, operation: OperationKind) -> &StrategyChain {
        match operation {
            OperationKind::Read => &self.read,
            OperationKind::Create => &self.create,
            OperationKind::Update => &self.update,
        }
    }

    /// Strategy kinds of an operation's chain, in attempt order
    #[must_use]
    pub fn kinds(&self, operation: OperationKind) -> Vec<StrategyKind> {
        self.chain(operation).kinds()
    }

    fn chain_mut(&mut self, operation: OperationKind) -> &mut StrategyChain {
        match operation {
            OperationKind::Read => &mut self.read,
            OperationKind::Create => &mut self.create,
            OperationKind::Update => &mut self.update,
        }
    }
}
