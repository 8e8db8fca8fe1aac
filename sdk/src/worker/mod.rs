//! Registry and the job-processing worker

pub mod heartbeat;
pub mod lifecycle;
pub mod registry;
pub mod workflow_worker;

pub use heartbeat::Heartbeat;
pub use lifecycle::{JobDisposition, JobOutcome, NackReason, StartOptions, WorkerStatus};
pub use registry::{BoxedWorkflowFn, RegisteredWorkflow, WorkflowMetadata, WorkflowRegistry};
pub use workflow_worker::WorkflowWorker;
