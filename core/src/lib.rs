//! # RocketFlow Core
//!
//! Wire model and collaborator interfaces for RocketFlow durable workflows.
//!
//! This crate holds everything that describes the remote side of a workflow:
//! runs, the append-only event log, queue jobs, and the two service traits
//! the SDK talks to. It has no replay logic of its own.
//!
//! ## Modules
//!
//! - [`workflow`] - Runs, events, jobs and options
//! - [`client`] - `WorkflowService` / `JobQueue` traits and the HTTP client
//! - [`error`] - Core error types

pub mod client;
pub mod error;
pub mod workflow;

pub use error::{CoreError, CoreResult};

pub use client::{
    ApiCredentials, ClientConfig, HttpWorkflowClient, JobQueue, Subscription, WorkflowService,
};

pub use workflow::{
    workflow_queue_name, EventType, JobKind, JobMessage, NewEvent, NewRun, PaginatedList,
    QueueOptions, RunError, RunFilter, RunStatus, RunUpdate, WorkflowEvent, WorkflowJob,
    WorkflowOptions, WorkflowRun, DEFAULT_DEPLOYMENT_ID, WORKFLOW_QUEUE_PREFIX,
};
