//! Run lifecycle hooks for observability
//!
//! Hooks are told about every execution attempt a worker makes and how it
//! ended. They observe only; nothing they do affects the run.

use async_trait::async_trait;
use serde_json::Value;

/// Hook trait for observing execution attempts
///
/// Register implementations with [`WorkflowClientBuilder::hook`] to receive
/// notifications from every worker the client creates.
///
/// [`WorkflowClientBuilder::hook`]: crate::client::WorkflowClientBuilder::hook
#[async_trait]
pub trait WorkflowHook: Send + Sync {
    /// Called before the workflow body runs for a delivered job
    async fn on_run_started(&self, _run_id: &str, _workflow_name: &str, _input: &[Value]) {}

    /// Called when an attempt completes the run
    async fn on_run_completed(&self, _run_id: &str, _workflow_name: &str, _output: &Value) {}

    /// Called when an attempt ends waiting on a timer or signal
    async fn on_run_suspended(&self, _run_id: &str, _workflow_name: &str, _reason: &str) {}

    /// Called when an attempt fails, including circuit breaker timeouts
    async fn on_run_failed(&self, _run_id: &str, _workflow_name: &str, _error: &str) {}
}

/// Composite hook that delegates to multiple hooks in registration order
pub struct CompositeWorkflowHook {
    hooks: Vec<Box<dyn WorkflowHook>>,
}

impl CompositeWorkflowHook {
    pub fn new(hooks: Vec<Box<dyn WorkflowHook>>) -> Self {
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[async_trait]
impl WorkflowHook for CompositeWorkflowHook {
    async fn on_run_started(&self, run_id: &str, workflow_name: &str, input: &[Value]) {
        for hook in &self.hooks {
            hook.on_run_started(run_id, workflow_name, input).await;
        }
    }

    async fn on_run_completed(&self, run_id: &str, workflow_name: &str, output: &Value) {
        for hook in &self.hooks {
            hook.on_run_completed(run_id, workflow_name, output).await;
        }
    }

    async fn on_run_suspended(&self, run_id: &str, workflow_name: &str, reason: &str) {
        for hook in &self.hooks {
            hook.on_run_suspended(run_id, workflow_name, reason).await;
        }
    }

    async fn on_run_failed(&self, run_id: &str, workflow_name: &str, error: &str) {
        for hook in &self.hooks {
            hook.on_run_failed(run_id, workflow_name, error).await;
        }
    }
}

/// A no-op hook (the default)
pub struct NoOpHook;

#[async_trait]
impl WorkflowHook for NoOpHook {}

/// A hook that logs attempts through `tracing`
pub struct LoggingHook {
    level: tracing::Level,
}

impl LoggingHook {
    pub fn new(level: tracing::Level) -> Self {
        Self { level }
    }

    pub fn info() -> Self {
        Self::new(tracing::Level::INFO)
    }

    pub fn debug() -> Self {
        Self::new(tracing::Level::DEBUG)
    }

    fn log(&self, run_id: &str, workflow_name: &str, message: &str) {
        match self.level {
            tracing::Level::DEBUG | tracing::Level::TRACE => {
                tracing::debug!(run_id = %run_id, workflow = %workflow_name, "{}", message);
            }
            _ => {
                tracing::info!(run_id = %run_id, workflow = %workflow_name, "{}", message);
            }
        }
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::info()
    }
}

#[async_trait]
impl WorkflowHook for LoggingHook {
    async fn on_run_started(&self, run_id: &str, workflow_name: &str, _input: &[Value]) {
        self.log(run_id, workflow_name, "Run attempt started");
    }

    async fn on_run_completed(&self, run_id: &str, workflow_name: &str, _output: &Value) {
        self.log(run_id, workflow_name, "Run completed");
    }

    async fn on_run_suspended(&self, run_id: &str, workflow_name: &str, reason: &str) {
        match self.level {
            tracing::Level::DEBUG | tracing::Level::TRACE => {
                tracing::debug!(run_id = %run_id, workflow = %workflow_name, reason = %reason, "Run suspended");
            }
            _ => {
                tracing::info!(run_id = %run_id, workflow = %workflow_name, reason = %reason, "Run suspended");
            }
        }
    }

    async fn on_run_failed(&self, run_id: &str, workflow_name: &str, error: &str) {
        tracing::error!(
            run_id = %run_id,
            workflow = %workflow_name,
            error = %error,
            "Run failed"
        );
    }
}
