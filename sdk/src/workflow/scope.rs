//! Ambient workflow context
//!
//! The entry-point wrapper runs each workflow body inside a task-local
//! scope so helper code can reach the current context without it being
//! passed explicitly. The scope follows the task, not the thread, so
//! concurrent jobs never see each other's context.

use super::context::WorkflowContext;
use super::duration::SleepDuration;
use super::step::StepOptions;
use crate::error::{Result, WorkflowError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static CURRENT: Arc<WorkflowContext>;
}

/// Run `future` with `ctx` as the ambient context.
pub async fn with_context<F>(ctx: Arc<WorkflowContext>, future: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(ctx, future).await
}

/// The ambient context, if the caller runs inside a workflow body.
pub fn current() -> Option<Arc<WorkflowContext>> {
    CURRENT.try_with(Arc::clone).ok()
}

/// Durable step against the ambient context.
///
/// `id` of `None` uses an auto-generated `step-N` id. Outside a workflow
/// body `f` is simply called.
pub async fn step<T, F, Fut>(id: Option<&str>, options: StepOptions, mut f: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match current() {
        Some(ctx) => match id {
            Some(id) => ctx.execute_step(id, options, f).await,
            None => ctx.step_auto(options, f).await,
        },
        None => f().await,
    }
}

/// Durable sleep against the ambient context.
pub async fn sleep(duration: impl Into<SleepDuration>) -> Result<()> {
    let ctx = current().ok_or(WorkflowError::NotInWorkflow("sleep"))?;
    ctx.sleep(duration).await
}

/// Wait for a signal against the ambient context.
pub async fn wait_for_signal<T: DeserializeOwned>(name: &str) -> Result<T> {
    let ctx = current().ok_or(WorkflowError::NotInWorkflow("wait for a signal"))?;
    ctx.wait_for_signal(name).await
}
