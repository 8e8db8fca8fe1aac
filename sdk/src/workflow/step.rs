//! Step options

use super::compensation::{compensation, CompensationFn, CompensationInput};
use crate::error::Result;
use serde_json::Value;
use std::future::Future;

/// Options for a single durable step.
#[derive(Clone, Default)]
pub struct StepOptions {
    /// Retries after the first attempt
    pub retries: u32,
    /// Names of definition-level compensation handlers to register
    pub rollback: Vec<String>,
    /// Compensation function registered under the step's own id
    pub rollback_fn: Option<CompensationFn>,
}

impl StepOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Register a named compensation handler when the step first runs.
    pub fn rollback(mut self, name: impl Into<String>) -> Self {
        self.rollback.push(name.into());
        self
    }

    pub fn rollback_fn<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(CompensationInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.rollback_fn = Some(compensation(handler));
        self
    }
}

impl std::fmt::Debug for StepOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepOptions")
            .field("retries", &self.retries)
            .field("rollback", &self.rollback)
            .field("rollback_fn", &self.rollback_fn.is_some())
            .finish()
    }
}
