//! Workflow types and execution

pub mod compensation;
pub mod context;
pub mod definition;
pub mod duration;
pub mod entry;
pub mod outcome;
pub mod scope;
pub mod state;
pub mod step;

pub use compensation::{compensation, CompensationFn, CompensationInput, CompensationRegistry};
pub use context::WorkflowContext;
pub use definition::{input_arg, workflow, WorkflowBuilder, WorkflowDefinition};
pub use duration::{parse_duration, SleepDuration};
pub use entry::run_entry;
pub use outcome::ExecutionOutcome;
pub use state::ReplayState;
pub use step::StepOptions;
