//! Workflow authoring front-ends
//!
//! Two ways to author a workflow, both producing a
//! [`RegisteredWorkflow`]:
//!
//! - implement [`WorkflowDefinition`] on a type, or
//! - wrap a closure with [`workflow`]`(name).run(..)`.

use crate::error::{Result, WorkflowError};
use crate::worker::registry::{BoxedWorkflowFn, RegisteredWorkflow, WorkflowMetadata};
use crate::workflow::compensation::{CompensationInput, CompensationRegistry};
use crate::workflow::context::WorkflowContext;
use async_trait::async_trait;
use rocketflow_core::WorkflowOptions;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// A workflow implemented as a type.
///
/// # Example
///
/// ```ignore
/// struct OrderWorkflow;
///
/// #[async_trait]
/// impl WorkflowDefinition for OrderWorkflow {
///     fn name(&self) -> &str { "order" }
///
///     fn compensations(&self, registry: &mut CompensationRegistry) {
///         registry.register("refund", |input| async move { refund(input).await });
///     }
///
///     async fn run(&self, ctx: &WorkflowContext, input: Vec<Value>) -> Result<Value> {
///         let charged: Value = ctx
///             .execute_step("charge", StepOptions::new().rollback("refund"), || charge())
///             .await?;
///         ctx.sleep("1m").await?;
///         Ok(charged)
///     }
/// }
/// ```
#[async_trait]
pub trait WorkflowDefinition: Send + Sync + 'static {
    /// Unique workflow name
    fn name(&self) -> &str;

    /// Workflow body. Called again from the top on every delivery.
    async fn run(&self, ctx: &WorkflowContext, input: Vec<Value>) -> Result<Value>;

    /// Default run options
    fn options(&self) -> WorkflowOptions {
        WorkflowOptions::default()
    }

    fn description(&self) -> Option<&str> {
        None
    }

    /// Register the named compensation handlers steps may refer to.
    fn compensations(&self, _registry: &mut CompensationRegistry) {}
}

/// Start building a closure-based workflow.
pub fn workflow(name: impl Into<String>) -> WorkflowBuilder {
    WorkflowBuilder {
        metadata: WorkflowMetadata::new(name),
        compensations: CompensationRegistry::new(),
    }
}

/// Builder for closure-based workflows.
pub struct WorkflowBuilder {
    metadata: WorkflowMetadata,
    compensations: CompensationRegistry,
}

impl WorkflowBuilder {
    pub fn options(mut self, options: WorkflowOptions) -> Self {
        self.metadata.options = options;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// Register a named compensation handler.
    pub fn compensate<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CompensationInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.compensations.register(name, handler);
        self
    }

    /// Finish with the workflow body.
    pub fn run<F, Fut, O>(self, body: F) -> RegisteredWorkflow
    where
        F: Fn(Arc<WorkflowContext>, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
        O: Serialize,
    {
        let body: BoxedWorkflowFn = Arc::new(move |ctx, input| {
            let fut = body(ctx, input);
            Box::pin(async move { Ok(serde_json::to_value(fut.await?)?) })
        });
        RegisteredWorkflow::new(self.metadata, self.compensations, body)
    }
}

impl std::fmt::Debug for WorkflowBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowBuilder")
            .field("metadata", &self.metadata)
            .field("compensations", &self.compensations)
            .finish()
    }
}

/// Deserialize the input argument at `index`.
pub fn input_arg<T: DeserializeOwned>(input: &[Value], index: usize) -> Result<T> {
    let value = input.get(index).ok_or_else(|| {
        WorkflowError::InvalidInput(format!(
            "missing argument {} ({} given)",
            index,
            input.len()
        ))
    })?;
    Ok(serde_json::from_value(value.clone())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryBackend;
    use serde_json::json;

    #[test]
    fn test_builder_collects_metadata() {
        let registered = workflow("signup")
            .description("Onboards a user")
            .options(WorkflowOptions::default().with_deployment_id("v2"))
            .compensate("delete-account", |_| async { Ok(Value::Null) })
            .run(|_ctx, _input| async { Ok("ok") });

        assert_eq!(registered.name(), "signup");
        assert_eq!(registered.metadata.description.as_deref(), Some("Onboards a user"));
        assert_eq!(registered.options().deployment_id.as_deref(), Some("v2"));
        assert!(registered.compensations().contains("delete-account"));
    }

    #[tokio::test]
    async fn test_closure_body_output_is_serialized() {
        #[derive(Serialize)]
        struct Receipt {
            total: u32,
        }

        let backend = InMemoryBackend::new();
        let registered = workflow("sum").run(|_ctx, input| async move {
            let a: u32 = input_arg(&input, 0)?;
            let b: u32 = input_arg(&input, 1)?;
            Ok(Receipt { total: a + b })
        });

        let ctx = Arc::new(WorkflowContext::new("sum", backend.service()));
        let output = registered
            .execute(ctx.clone(), vec![json!(2), json!(3)])
            .await
            .unwrap();
        assert_eq!(output, json!({"total": 5}));

        let err = registered.execute(ctx, vec![json!(2)]).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }

    #[test]
    fn test_input_arg_type_mismatch() {
        let err = input_arg::<u32>(&[json!("nope")], 0).unwrap_err();
        assert!(matches!(err, WorkflowError::Serialization(_)));
    }
}
