//! RocketFlow SDK for Rust
//!
//! Durable workflows written as ordinary async functions. Every side effect
//! goes through a [`WorkflowContext`], which records it in the run's
//! append-only event log. When a job is redelivered the body runs again from
//! the top and the context answers already-recorded calls from history, so
//! each logical step executes once no matter how often the run is resumed.
//!
//! ## Modules
//!
//! - [`workflow`] - Execution context, authoring front-ends, entry-point lifecycle
//! - [`worker`] - Registry and the job-processing worker
//! - [`client`] - Client facade for triggering, signalling and inspecting runs
//! - [`config`] - Worker presets and connection settings
//! - [`testing`] - In-memory backend (`testing` feature)

pub mod client;
pub mod config;
pub mod error;
pub mod worker;
pub mod workflow;

/// Testing utilities for workflows.
/// Available only with the `testing` feature enabled.
#[cfg(feature = "testing")]
pub mod testing;

pub use error::{Result, WorkflowError};

pub use config::{ClientConfig, ConfigError, WorkerConfig};

pub use client::{
    CompositeWorkflowHook, LoggingHook, NoOpHook, WorkflowClient, WorkflowClientBuilder,
    WorkflowHook,
};

pub use workflow::{
    compensation, input_arg, run_entry, workflow, CompensationFn, CompensationInput,
    CompensationRegistry, ExecutionOutcome, ReplayState, SleepDuration, StepOptions,
    WorkflowBuilder, WorkflowContext, WorkflowDefinition,
};

pub use worker::{
    JobDisposition, JobOutcome, NackReason, RegisteredWorkflow, StartOptions, WorkerStatus,
    WorkflowMetadata, WorkflowRegistry, WorkflowWorker,
};

pub use rocketflow_core::{
    EventType, RunError, RunFilter, RunStatus, WorkflowEvent, WorkflowOptions, WorkflowRun,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::{LoggingHook, WorkflowClient, WorkflowHook};
    pub use crate::config::{ClientConfig, WorkerConfig};
    pub use crate::error::{Result, WorkflowError};
    pub use crate::worker::{StartOptions, WorkflowWorker};
    pub use crate::workflow::scope::{self, sleep, step, wait_for_signal};
    pub use crate::workflow::{
        input_arg, workflow, CompensationInput, CompensationRegistry, ExecutionOutcome,
        StepOptions, WorkflowContext, WorkflowDefinition,
    };
    pub use rocketflow_core::{RunStatus, WorkflowOptions};
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{json, Value};
}
