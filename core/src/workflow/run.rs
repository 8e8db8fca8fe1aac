//! Run model - one execution instance of a workflow definition

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Externally observable status of a run.
///
/// Suspension is not a status: a suspended run stays `Running` with a
/// dangling `wait_created` or `signal_waiting` event in its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the run can no longer change status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details recorded on a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl RunError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// A workflow run as stored by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub run_id: String,
    #[serde(default)]
    pub deployment_id: Option<String>,
    pub workflow_name: String,
    pub status: RunStatus,
    #[serde(default)]
    pub input: Vec<Value>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<RunError>,
    #[serde(default)]
    pub event_count: Option<u64>,
    #[serde(default)]
    pub max_events: Option<u64>,
    /// Execution timeout in milliseconds
    #[serde(default)]
    pub execution_timeout: Option<u64>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-definition run options, merged under per-trigger overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_events: Option<u64>,
    /// Execution timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
}

impl WorkflowOptions {
    pub fn with_max_events(mut self, max_events: u64) -> Self {
        self.max_events = Some(max_events);
        self
    }

    pub fn with_execution_timeout(mut self, timeout_ms: u64) -> Self {
        self.execution_timeout = Some(timeout_ms);
        self
    }

    pub fn with_deployment_id(mut self, deployment_id: impl Into<String>) -> Self {
        self.deployment_id = Some(deployment_id.into());
        self
    }

    /// Overlay `overrides` on top of these options. Fields set in
    /// `overrides` win.
    pub fn merge(&self, overrides: &WorkflowOptions) -> WorkflowOptions {
        WorkflowOptions {
            max_events: overrides.max_events.or(self.max_events),
            execution_timeout: overrides.execution_timeout.or(self.execution_timeout),
            deployment_id: overrides
                .deployment_id
                .clone()
                .or_else(|| self.deployment_id.clone()),
        }
    }
}

/// Body of a create-run request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRun {
    pub deployment_id: String,
    pub workflow_name: String,
    pub input: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_events: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_timeout: Option<u64>,
}

/// Deployment id used when neither definition nor trigger sets one.
pub const DEFAULT_DEPLOYMENT_ID: &str = "sdk";

impl NewRun {
    pub fn new(workflow_name: impl Into<String>, input: Vec<Value>, options: &WorkflowOptions) -> Self {
        Self {
            deployment_id: options
                .deployment_id
                .clone()
                .unwrap_or_else(|| DEFAULT_DEPLOYMENT_ID.to_string()),
            workflow_name: workflow_name.into(),
            input,
            max_events: options.max_events,
            execution_timeout: options.execution_timeout,
        }
    }
}

/// Partial update of a run. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
}

impl RunUpdate {
    pub fn running() -> Self {
        Self {
            status: Some(RunStatus::Running),
            ..Default::default()
        }
    }

    pub fn completed(output: Value) -> Self {
        Self {
            status: Some(RunStatus::Completed),
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(error: RunError) -> Self {
        Self {
            status: Some(RunStatus::Failed),
            output: None,
            error: Some(error),
        }
    }
}

/// Filter for listing runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub workflow_name: Option<String>,
    pub status: Option<RunStatus>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl RunFilter {
    pub fn workflow(name: impl Into<String>) -> Self {
        Self {
            workflow_name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query string pairs in wire order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.workflow_name {
            pairs.push(("workflowName", name.clone()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        pairs
    }

    /// Whether a run passes this filter. Limit and cursor are ignored.
    pub fn matches(&self, run: &WorkflowRun) -> bool {
        self.workflow_name
            .as_ref()
            .map_or(true, |name| &run.workflow_name == name)
            && self.status.map_or(true, |status| run.status == status)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedList<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub total_pages: u32,
    pub items: Vec<T>,
}

impl<T> PaginatedList<T> {
    /// Single page holding every item.
    pub fn single_page(items: Vec<T>) -> Self {
        let len = items.len();
        Self {
            page: 1,
            per_page: len as u32,
            total_items: len as u64,
            total_pages: 1,
            items,
        }
    }
}
