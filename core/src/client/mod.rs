//! Collaborator interfaces for the remote workflow service.
//!
//! The Run/Event service and the job queue are modelled as two traits so the
//! SDK can run against the HTTP implementation in production and an
//! in-memory implementation in tests.

mod auth;
mod config;
mod http;

pub use auth::ApiCredentials;
pub use config::ClientConfig;
pub use http::HttpWorkflowClient;

use crate::error::CoreResult;
use crate::workflow::{
    JobMessage, NewEvent, NewRun, PaginatedList, QueueOptions, RunFilter, RunUpdate,
    WorkflowEvent, WorkflowJob, WorkflowRun,
};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Remote Run/Event service. Owns runs and their append-only event log.
#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// Create a run in `pending` status.
    async fn create_run(&self, run: NewRun) -> CoreResult<WorkflowRun>;

    async fn get_run(&self, run_id: &str) -> CoreResult<WorkflowRun>;

    /// Request a status transition, optionally with output or error.
    async fn update_run(&self, run_id: &str, update: RunUpdate) -> CoreResult<WorkflowRun>;

    async fn cancel_run(&self, run_id: &str, reason: Option<&str>) -> CoreResult<()>;

    async fn list_runs(&self, filter: &RunFilter) -> CoreResult<PaginatedList<WorkflowRun>>;

    /// Append an event to a run's history.
    async fn create_event(&self, run_id: &str, event: NewEvent) -> CoreResult<WorkflowEvent>;

    /// Full history of a run in append order.
    async fn list_events(&self, run_id: &str) -> CoreResult<Vec<WorkflowEvent>>;
}

/// Job queue with at-least-once, possibly duplicate, push delivery.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn queue_message(
        &self,
        queue_name: &str,
        message: JobMessage,
        options: QueueOptions,
    ) -> CoreResult<()>;

    /// Remove a delivered job from the queue.
    async fn ack(&self, job_id: &str) -> CoreResult<()>;

    /// Return a delivered job to the queue for redelivery.
    async fn nack(&self, job_id: &str) -> CoreResult<()>;

    /// Extend the delivery lease of a job being processed.
    async fn touch(&self, job_id: &str) -> CoreResult<()>;

    /// Subscribe to a queue. Returns once the subscription is confirmed.
    async fn subscribe(&self, queue_name: &str) -> CoreResult<Subscription>;

    async fn unsubscribe(&self, queue_name: &str) -> CoreResult<()>;
}

/// A confirmed queue subscription delivering jobs in arrival order.
#[derive(Debug)]
pub struct Subscription {
    queue_name: String,
    receiver: mpsc::Receiver<WorkflowJob>,
}

impl Subscription {
    pub fn new(queue_name: impl Into<String>, receiver: mpsc::Receiver<WorkflowJob>) -> Self {
        Self {
            queue_name: queue_name.into(),
            receiver,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Next delivered job, or `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<WorkflowJob> {
        self.receiver.recv().await
    }
}
