//! Entry-point lifecycle shared by both authoring styles
//!
//! trigger (when no run is attached) -> running -> body ->
//! completed, or rollback then failed.

use crate::client::WorkflowClient;
use crate::error::WorkflowError;
use crate::worker::registry::RegisteredWorkflow;
use crate::workflow::context::WorkflowContext;
use crate::workflow::outcome::ExecutionOutcome;
use crate::workflow::scope;
use rocketflow_core::{RunError, RunUpdate};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Execute one attempt of `workflow` in `ctx`.
///
/// A context without a run gets one created through `client` first. The
/// body runs with `ctx` as the ambient context.
pub async fn run_entry(
    client: &WorkflowClient,
    ctx: Arc<WorkflowContext>,
    workflow: &RegisteredWorkflow,
    input: Vec<Value>,
) -> ExecutionOutcome {
    let run_id = match ctx.run_id() {
        Some(run_id) => run_id,
        None => {
            let options = workflow.options().clone();
            match client.start_run(workflow.name(), input.clone(), options).await {
                Ok(run) => {
                    ctx.attach_run(run.run_id.clone());
                    run.run_id
                }
                Err(e) => return ExecutionOutcome::Failed(e),
            }
        }
    };

    let service = Arc::clone(ctx.service());
    if let Err(e) = service.update_run(&run_id, RunUpdate::running()).await {
        return ExecutionOutcome::Failed(e.into());
    }

    let result = scope::with_context(ctx.clone(), workflow.execute(ctx.clone(), input)).await;

    match result {
        Ok(_) if ctx.is_suspended() => {
            // the body swallowed a suspension; the attempt is still parked
            debug!(run_id = %run_id, "Body returned while suspended");
            ExecutionOutcome::Suspended {
                reason: "Suspended".to_string(),
            }
        }
        Ok(output) => {
            match service
                .update_run(&run_id, RunUpdate::completed(output.clone()))
                .await
            {
                Ok(_) => ExecutionOutcome::Completed(output),
                Err(e) => ExecutionOutcome::Failed(e.into()),
            }
        }
        Err(WorkflowError::Suspended { reason }) => ExecutionOutcome::Suspended { reason },
        Err(e) => {
            let compensated = ctx.run_rollback(&e).await;
            debug!(
                run_id = %run_id,
                compensations = compensated.len(),
                "Rollback finished"
            );

            let error = RunError::new(e.to_string()).with_stack(format!("{:?}", e));
            if let Err(update_err) = service.update_run(&run_id, RunUpdate::failed(error)).await {
                warn!(run_id = %run_id, error = %update_err, "Failed to mark run failed");
            }
            ExecutionOutcome::Failed(e)
        }
    }
}
