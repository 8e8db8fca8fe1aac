//! Tagged result of one execution attempt

use crate::error::{Result, WorkflowError};
use serde_json::Value;

/// How one execution attempt of a workflow body ended.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// The body returned a value
    Completed(Value),
    /// The body is durably checkpointed and waits for a timer or signal
    Suspended { reason: String },
    /// The body failed
    Failed(WorkflowError),
}

impl ExecutionOutcome {
    /// Sort a body result into an outcome, lifting suspension out of the
    /// error channel.
    pub fn from_result(result: Result<Value>) -> Self {
        match result {
            Ok(value) => ExecutionOutcome::Completed(value),
            Err(WorkflowError::Suspended { reason }) => ExecutionOutcome::Suspended { reason },
            Err(e) => ExecutionOutcome::Failed(e),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed(_))
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, ExecutionOutcome::Suspended { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExecutionOutcome::Failed(_))
    }

    /// Output of a completed attempt.
    pub fn output(&self) -> Option<&Value> {
        match self {
            ExecutionOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// Error of a failed attempt.
    pub fn error(&self) -> Option<&WorkflowError> {
        match self {
            ExecutionOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// `Ok(Some(output))` on completion, `Ok(None)` on suspension, the
    /// error otherwise.
    pub fn into_result(self) -> Result<Option<Value>> {
        match self {
            ExecutionOutcome::Completed(value) => Ok(Some(value)),
            ExecutionOutcome::Suspended { .. } => Ok(None),
            ExecutionOutcome::Failed(e) => Err(e),
        }
    }
}
