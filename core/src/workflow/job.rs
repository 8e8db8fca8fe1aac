//! Job and queue message types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of the per-workflow job queue name.
pub const WORKFLOW_QUEUE_PREFIX: &str = "__wkf_workflow_";

/// Name of the queue carrying jobs for `workflow_name`.
pub fn workflow_queue_name(workflow_name: &str) -> String {
    format!("{}{}", WORKFLOW_QUEUE_PREFIX, workflow_name)
}

/// Why a job was queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    WorkflowStart,
    Resume,
    Signal,
}

/// Message body carried by a workflow job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<JobKind>,
    pub run_id: String,
    pub workflow_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<Value>>,
}

impl JobMessage {
    pub fn new(kind: JobKind, run_id: impl Into<String>, workflow_name: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            run_id: run_id.into(),
            workflow_name: workflow_name.into(),
            input: None,
        }
    }

    pub fn with_input(mut self, input: Vec<Value>) -> Self {
        self.input = Some(input);
        self
    }
}

/// A delivered job: transport message id plus message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: String,
    pub data: JobMessage,
}

impl WorkflowJob {
    pub fn run_id(&self) -> &str {
        &self.data.run_id
    }

    pub fn workflow_name(&self) -> &str {
        &self.data.workflow_name
    }
}

/// Options attached to an enqueue request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// De-duplicates trigger and resume requests at the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl QueueOptions {
    pub fn for_run(run_id: impl Into<String>, idempotency_key: impl Into<String>) -> Self {
        Self {
            run_id: Some(run_id.into()),
            idempotency_key: Some(idempotency_key.into()),
        }
    }
}
