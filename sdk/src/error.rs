//! Error types for the RocketFlow SDK

pub use rocketflow_core::CoreError;

/// Default message of a rollback stop.
pub const ROLLBACK_STOPPED_MESSAGE: &str = "Rollback stopped";

/// Main error type for the RocketFlow SDK
///
/// `Suspended` and `RollbackStopped` are control signals rather than
/// failures. Use [`WorkflowError::is_suspension`] and
/// [`WorkflowError::is_rollback_stop`] to tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Execution is durably checkpointed, waiting on a timer or a signal
    #[error("Workflow suspended: {reason}")]
    Suspended { reason: String },

    /// Raised by a compensation handler to halt further unwinding
    #[error("{message}")]
    RollbackStopped { message: String },

    /// The same step id was invoked twice within one execution attempt
    #[error("Duplicate step id: {0}")]
    DuplicateStepId(String),

    /// Execution exceeded the run's execution timeout
    #[error("CircuitBreaker: Execution timeout")]
    CircuitBreakerTimeout { timeout_ms: u64 },

    /// Sleep duration could not be parsed
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// A durable operation was called without a run attached
    #[error("Cannot {0} outside of a workflow context")]
    NotInWorkflow(&'static str),

    /// Step code failed
    #[error("{0}")]
    StepFailed(String),

    /// Workflow definition not found
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Failed call to the Run/Event service or the job queue
    #[error("Transport error: {0}")]
    Transport(#[from] CoreError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl WorkflowError {
    /// Failure raised from step code.
    pub fn step(message: impl Into<String>) -> Self {
        WorkflowError::StepFailed(message.into())
    }

    /// Stop signal with the default message.
    pub fn stop_rollback() -> Self {
        WorkflowError::RollbackStopped {
            message: ROLLBACK_STOPPED_MESSAGE.to_string(),
        }
    }

    pub fn suspended(reason: impl Into<String>) -> Self {
        WorkflowError::Suspended {
            reason: reason.into(),
        }
    }

    pub fn is_suspension(&self) -> bool {
        matches!(self, WorkflowError::Suspended { .. })
    }

    pub fn is_rollback_stop(&self) -> bool {
        matches!(self, WorkflowError::RollbackStopped { .. })
    }

    pub fn is_circuit_breaker(&self) -> bool {
        matches!(self, WorkflowError::CircuitBreakerTimeout { .. })
    }

    /// Short machine-readable category, used as the recorded error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Suspended { .. } => "Suspended",
            WorkflowError::RollbackStopped { .. } => "StopRollback",
            WorkflowError::DuplicateStepId(_) => "DuplicateStepId",
            WorkflowError::CircuitBreakerTimeout { .. } => "CircuitBreakerTimeout",
            WorkflowError::InvalidDuration(_) => "InvalidDuration",
            WorkflowError::NotInWorkflow(_) => "NotInWorkflow",
            WorkflowError::StepFailed(_) => "StepFailed",
            WorkflowError::WorkflowNotFound(_) => "WorkflowNotFound",
            WorkflowError::InvalidConfiguration(_) => "InvalidConfiguration",
            WorkflowError::InvalidInput(_) => "InvalidInput",
            WorkflowError::Transport(_) => "TransportError",
            WorkflowError::Serialization(_) => "SerializationError",
            WorkflowError::Other(_) => "Error",
        }
    }
}

/// Result type alias for RocketFlow SDK operations
pub type Result<T> = std::result::Result<T, WorkflowError>;
