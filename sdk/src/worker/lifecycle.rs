//! Worker lifecycle types

use crate::error::WorkflowError;
use crate::workflow::outcome::ExecutionOutcome;
use rocketflow_core::RunStatus;
use serde_json::Value;
use std::time::SystemTime;

/// Current status of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkerStatus {
    /// Created, not started.
    #[default]
    Initializing,

    /// Waiting for subscriptions to be confirmed.
    Subscribing,

    /// Every subscription is confirmed; jobs are accepted.
    Running {
        /// Subscribed queue names.
        queues: Vec<String>,
        /// When the worker became ready.
        started_at: SystemTime,
    },

    /// Unsubscribed, draining in-flight jobs.
    ShuttingDown {
        /// Number of jobs still being processed.
        in_flight_count: usize,
    },

    /// Fully stopped.
    Stopped,
}

impl WorkerStatus {
    /// Whether jobs are accepted.
    pub fn is_running(&self) -> bool {
        matches!(self, WorkerStatus::Running { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, WorkerStatus::Stopped)
    }
}

/// Options of [`WorkflowWorker::start`](super::WorkflowWorker::start).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOptions {
    /// Resubmit pending and running runs of the subscribed workflows.
    pub resume: bool,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self { resume: true }
    }
}

impl StartOptions {
    pub fn without_resume() -> Self {
        Self { resume: false }
    }
}

/// Why a job was handed back to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NackReason {
    /// The worker was not running when the job arrived.
    NotReady,
    /// No implementation is registered under the job's workflow name.
    UnregisteredWorkflow(String),
}

impl std::fmt::Display for NackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NackReason::NotReady => write!(f, "worker not ready"),
            NackReason::UnregisteredWorkflow(name) => {
                write!(f, "workflow '{}' is not registered", name)
            }
        }
    }
}

/// Result of an acknowledged job.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(Value),
    Suspended { reason: String },
    Failed(WorkflowError),
    /// The run had already finished; the duplicate delivery was dropped.
    AlreadyFinished(RunStatus),
    /// The run or its history could not be fetched; the job was dropped.
    HistoryUnavailable(String),
}

impl From<ExecutionOutcome> for JobOutcome {
    fn from(outcome: ExecutionOutcome) -> Self {
        match outcome {
            ExecutionOutcome::Completed(value) => JobOutcome::Completed(value),
            ExecutionOutcome::Suspended { reason } => JobOutcome::Suspended { reason },
            ExecutionOutcome::Failed(e) => JobOutcome::Failed(e),
        }
    }
}

/// What the worker did with a delivered job.
#[derive(Debug)]
pub enum JobDisposition {
    Acked(JobOutcome),
    Nacked(NackReason),
}

impl JobDisposition {
    pub fn is_acked(&self) -> bool {
        matches!(self, JobDisposition::Acked(_))
    }

    pub fn is_nacked(&self) -> bool {
        matches!(self, JobDisposition::Nacked(_))
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        match self {
            JobDisposition::Acked(outcome) => Some(outcome),
            JobDisposition::Nacked(_) => None,
        }
    }
}
