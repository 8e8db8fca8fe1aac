//! Client facade: triggering, signalling and inspecting runs

pub mod builder;
pub mod hook;
pub mod workflow_client;

pub use builder::WorkflowClientBuilder;
pub use hook::{CompositeWorkflowHook, LoggingHook, NoOpHook, WorkflowHook};
pub use workflow_client::WorkflowClient;
