//! WorkflowClient builder for fluent configuration

use crate::client::hook::{CompositeWorkflowHook, NoOpHook, WorkflowHook};
use crate::client::workflow_client::WorkflowClient;
use crate::config::{ClientConfig, WorkerConfig};
use crate::error::Result;
use crate::worker::registry::{RegisteredWorkflow, WorkflowRegistry};
use crate::workflow::definition::WorkflowDefinition;
use rocketflow_core::{HttpWorkflowClient, JobQueue, WorkflowService};
use std::sync::Arc;

/// Builder for creating WorkflowClient instances
///
/// Example:
/// ```ignore
/// let client = WorkflowClient::builder()
///     .http(ClientConfig::from_env())
///     .register(OrderWorkflow::new())
///     .register_workflow(workflow("signup").run(signup))
///     .hook(LoggingHook::info())
///     .build()?;
/// ```
pub struct WorkflowClientBuilder {
    config: ClientConfig,
    service: Option<Arc<dyn WorkflowService>>,
    queue: Option<Arc<dyn JobQueue>>,
    workflows: Vec<RegisteredWorkflow>,
    hooks: Vec<Box<dyn WorkflowHook>>,
    worker_config: WorkerConfig,
}

impl Default for WorkflowClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            service: None,
            queue: None,
            workflows: Vec::new(),
            hooks: Vec::new(),
            worker_config: WorkerConfig::default(),
        }
    }

    /// Talk to the remote service over HTTP (the default transport).
    pub fn http(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use one value as both the Run/Event service and the job queue.
    pub fn backend<B>(self, backend: Arc<B>) -> Self
    where
        B: WorkflowService + JobQueue + 'static,
    {
        let service: Arc<dyn WorkflowService> = backend.clone();
        let queue: Arc<dyn JobQueue> = backend;
        self.service(service).queue(queue)
    }

    pub fn service(mut self, service: Arc<dyn WorkflowService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Register a [`WorkflowDefinition`] implementation.
    pub fn register<W: WorkflowDefinition>(mut self, definition: W) -> Self {
        self.workflows
            .push(RegisteredWorkflow::from_definition(definition));
        self
    }

    /// Register a closure-based workflow built with
    /// [`workflow`](crate::workflow::definition::workflow).
    pub fn register_workflow(mut self, workflow: RegisteredWorkflow) -> Self {
        self.workflows.push(workflow);
        self
    }

    /// Add a lifecycle hook. Multiple hooks run in registration order.
    pub fn hook<H: WorkflowHook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn worker_config(mut self, config: WorkerConfig) -> Self {
        self.worker_config = config;
        self
    }

    /// Build the client.
    ///
    /// Fails on duplicate workflow names and, when no backend was supplied,
    /// on an invalid HTTP configuration.
    pub fn build(self) -> Result<WorkflowClient> {
        let registry = WorkflowRegistry::new();
        for workflow in self.workflows {
            registry.register_workflow(workflow)?;
        }

        let (service, queue) = match (self.service, self.queue) {
            (Some(service), Some(queue)) => (service, queue),
            (service, queue) => {
                let http = Arc::new(HttpWorkflowClient::new(&self.config)?);
                let default_service: Arc<dyn WorkflowService> = http.clone();
                let default_queue: Arc<dyn JobQueue> = http;
                (
                    service.unwrap_or(default_service),
                    queue.unwrap_or(default_queue),
                )
            }
        };

        let hooks: Arc<dyn WorkflowHook> = match self.hooks.len() {
            0 => Arc::new(NoOpHook),
            _ => Arc::new(CompositeWorkflowHook::new(self.hooks)),
        };

        Ok(WorkflowClient::from_parts(
            service,
            queue,
            Arc::new(registry),
            hooks,
            self.worker_config,
        ))
    }
}
