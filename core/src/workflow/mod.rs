//! Workflow wire model - runs, events and jobs

pub mod event;
pub mod job;
pub mod run;

pub use event::{EventType, NewEvent, WorkflowEvent};
pub use job::{
    workflow_queue_name, JobKind, JobMessage, QueueOptions, WorkflowJob, WORKFLOW_QUEUE_PREFIX,
};
pub use run::{
    NewRun, PaginatedList, RunError, RunFilter, RunStatus, RunUpdate, WorkflowOptions,
    WorkflowRun, DEFAULT_DEPLOYMENT_ID,
};
