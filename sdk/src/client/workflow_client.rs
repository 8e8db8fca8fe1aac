//! WorkflowClient - main entry point for application code

use crate::client::builder::WorkflowClientBuilder;
use crate::client::hook::WorkflowHook;
use crate::config::WorkerConfig;
use crate::error::{Result, WorkflowError};
use crate::worker::registry::WorkflowRegistry;
use crate::worker::workflow_worker::WorkflowWorker;
use crate::workflow::context::WorkflowContext;
use crate::workflow::entry::run_entry;
use crate::workflow::outcome::ExecutionOutcome;
use rocketflow_core::{
    workflow_queue_name, EventType, JobKind, JobMessage, JobQueue, NewEvent, NewRun,
    PaginatedList, QueueOptions, RunFilter, WorkflowEvent, WorkflowOptions, WorkflowRun,
    WorkflowService,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Client for triggering, signalling and inspecting workflow runs.
///
/// Cheap to clone; clones share the collaborators and the registry.
#[derive(Clone)]
pub struct WorkflowClient {
    service: Arc<dyn WorkflowService>,
    queue: Arc<dyn JobQueue>,
    registry: Arc<WorkflowRegistry>,
    hooks: Arc<dyn WorkflowHook>,
    worker_config: WorkerConfig,
}

impl WorkflowClient {
    /// Create a new builder for WorkflowClient
    pub fn builder() -> WorkflowClientBuilder {
        WorkflowClientBuilder::new()
    }

    pub(crate) fn from_parts(
        service: Arc<dyn WorkflowService>,
        queue: Arc<dyn JobQueue>,
        registry: Arc<WorkflowRegistry>,
        hooks: Arc<dyn WorkflowHook>,
        worker_config: WorkerConfig,
    ) -> Self {
        Self {
            service,
            queue,
            registry,
            hooks,
            worker_config,
        }
    }

    pub fn service(&self) -> &Arc<dyn WorkflowService> {
        &self.service
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    pub(crate) fn hooks(&self) -> &Arc<dyn WorkflowHook> {
        &self.hooks
    }

    pub fn worker_config(&self) -> &WorkerConfig {
        &self.worker_config
    }

    /// Create a run and queue its start job.
    ///
    /// Options registered with the workflow are merged under `overrides`.
    pub async fn trigger(
        &self,
        workflow_name: &str,
        input: Vec<Value>,
        overrides: WorkflowOptions,
    ) -> Result<WorkflowRun> {
        let defaults = self
            .registry
            .get(workflow_name)
            .map(|w| w.options().clone())
            .unwrap_or_default();
        self.start_run(workflow_name, input, defaults.merge(&overrides))
            .await
    }

    pub(crate) async fn start_run(
        &self,
        workflow_name: &str,
        input: Vec<Value>,
        options: WorkflowOptions,
    ) -> Result<WorkflowRun> {
        let run = self
            .service
            .create_run(NewRun::new(workflow_name, input.clone(), &options))
            .await?;

        let message =
            JobMessage::new(JobKind::WorkflowStart, &run.run_id, workflow_name).with_input(input);
        self.queue
            .queue_message(
                &workflow_queue_name(workflow_name),
                message,
                QueueOptions::for_run(&run.run_id, &run.run_id),
            )
            .await?;

        info!(run_id = %run.run_id, workflow = %workflow_name, "Run triggered");
        Ok(run)
    }

    /// Queue a resume job for an existing run.
    pub async fn resume(&self, run_id: &str) -> Result<WorkflowRun> {
        let run = self.service.get_run(run_id).await?;
        let message = JobMessage::new(JobKind::Resume, &run.run_id, &run.workflow_name)
            .with_input(run.input.clone());
        self.queue
            .queue_message(
                &workflow_queue_name(&run.workflow_name),
                message,
                QueueOptions::for_run(&run.run_id, &run.run_id),
            )
            .await?;

        debug!(run_id = %run.run_id, workflow = %run.workflow_name, "Resume requested");
        Ok(run)
    }

    /// Deliver signal `name` to a run and request its redelivery.
    ///
    /// Returns the correlation id the payload was recorded under, which is
    /// `signal-{name}-{uuid}` unless one is supplied.
    pub async fn send_signal<T: Serialize>(
        &self,
        run_id: &str,
        name: &str,
        data: T,
        correlation_id: Option<&str>,
    ) -> Result<String> {
        let correlation_id = correlation_id
            .map(str::to_string)
            .unwrap_or_else(|| format!("signal-{}-{}", name, Uuid::new_v4()));
        let data = serde_json::to_value(data)?;

        self.service
            .create_event(
                run_id,
                NewEvent::new(EventType::SignalReceived, correlation_id.clone())
                    .with("name", name)
                    .with("data", data),
            )
            .await?;

        let run = self.service.get_run(run_id).await?;
        let message = JobMessage::new(JobKind::Signal, &run.run_id, &run.workflow_name)
            .with_input(run.input.clone());
        self.queue
            .queue_message(
                &workflow_queue_name(&run.workflow_name),
                message,
                QueueOptions::for_run(&run.run_id, format!("{}-{}", run.run_id, correlation_id)),
            )
            .await?;

        debug!(run_id = %run_id, signal = %name, correlation_id = %correlation_id, "Signal sent");
        Ok(correlation_id)
    }

    pub async fn get_run(&self, run_id: &str) -> Result<WorkflowRun> {
        Ok(self.service.get_run(run_id).await?)
    }

    pub async fn list_runs(&self, filter: &RunFilter) -> Result<PaginatedList<WorkflowRun>> {
        Ok(self.service.list_runs(filter).await?)
    }

    /// Full history of a run, in append order.
    pub async fn list_events(&self, run_id: &str) -> Result<Vec<WorkflowEvent>> {
        Ok(self.service.list_events(run_id).await?)
    }

    pub async fn cancel_run(&self, run_id: &str, reason: Option<&str>) -> Result<()> {
        self.service.cancel_run(run_id, reason).await?;
        info!(run_id = %run_id, reason = reason.unwrap_or(""), "Run cancelled");
        Ok(())
    }

    /// Trigger a registered workflow and run its first attempt inline.
    pub async fn run_workflow(
        &self,
        workflow_name: &str,
        input: Vec<Value>,
    ) -> Result<ExecutionOutcome> {
        let workflow = self
            .registry
            .get(workflow_name)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(workflow_name.to_string()))?;

        let ctx = Arc::new(
            WorkflowContext::new(workflow_name, Arc::clone(&self.service))
                .with_compensations(workflow.compensations())
                .with_retry_backoff(self.worker_config.retry_backoff),
        );
        Ok(run_entry(self, ctx, &workflow, input).await)
    }

    /// Worker sharing this client's registry, using the client's worker config.
    pub fn worker(&self) -> WorkflowWorker {
        WorkflowWorker::new(self.clone(), self.worker_config.clone())
    }

    pub fn worker_with_config(&self, config: WorkerConfig) -> WorkflowWorker {
        WorkflowWorker::new(self.clone(), config)
    }
}

impl std::fmt::Debug for WorkflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowClient")
            .field("registry", &self.registry)
            .field("worker_config", &self.worker_config)
            .finish_non_exhaustive()
    }
}
