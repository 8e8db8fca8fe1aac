//! Named compensation handlers
//!
//! Compensations are registered under an identifier, either by name on the
//! workflow definition or as a function value attached to a step. On
//! failure the execution context unwinds them in reverse registration order.

use crate::error::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Input passed to a compensation handler.
#[derive(Debug, Clone)]
pub struct CompensationInput {
    pub run_id: Option<String>,
    /// Identifier the handler was resolved under
    pub identifier: String,
    /// Message of the error that triggered the rollback
    pub error: String,
    /// Kind of the triggering error, see [`WorkflowError::kind`](crate::WorkflowError::kind)
    pub error_kind: &'static str,
    /// Results of compensations that already ran, keyed by identifier
    pub accumulator: Map<String, Value>,
}

pub type CompensationFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Type-erased compensation handler.
pub type CompensationFn = Arc<dyn Fn(CompensationInput) -> CompensationFuture + Send + Sync>;

/// Wrap an async closure as a [`CompensationFn`].
pub fn compensation<F, Fut>(handler: F) -> CompensationFn
where
    F: Fn(CompensationInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(move |input| Box::pin(handler(input)))
}

/// Handlers of one workflow definition, keyed by name.
#[derive(Clone, Default)]
pub struct CompensationRegistry {
    handlers: HashMap<String, CompensationFn>,
}

impl CompensationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A later registration under the same name wins.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(CompensationInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.handlers.insert(name.into(), compensation(handler));
        self
    }

    pub fn register_fn(&mut self, name: impl Into<String>, handler: CompensationFn) -> &mut Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<CompensationFn> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for CompensationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompensationRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
