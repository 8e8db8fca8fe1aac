//! WorkflowRegistry - Registry for workflow definitions

use crate::error::{Result, WorkflowError};
use crate::workflow::compensation::CompensationRegistry;
use crate::workflow::context::WorkflowContext;
use crate::workflow::definition::WorkflowDefinition;
use parking_lot::RwLock;
use rocketflow_core::WorkflowOptions;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Static description of a registered workflow
#[derive(Debug, Clone, Default)]
pub struct WorkflowMetadata {
    /// Unique workflow name, also the queue suffix
    pub name: String,
    /// Description of the workflow
    pub description: Option<String>,
    /// Default run options, overridable per trigger
    pub options: WorkflowOptions,
}

impl WorkflowMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Type alias for boxed workflow bodies
pub type BoxedWorkflowFn = Arc<
    dyn Fn(Arc<WorkflowContext>, Vec<Value>) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>>
        + Send
        + Sync,
>;

/// A workflow implementation as the worker sees it: metadata, named
/// compensation handlers and a body.
///
/// Both authoring styles produce one of these; see
/// [`RegisteredWorkflow::from_definition`] and
/// [`workflow`](crate::workflow::definition::workflow).
#[derive(Clone)]
pub struct RegisteredWorkflow {
    pub metadata: WorkflowMetadata,
    compensations: Arc<CompensationRegistry>,
    body: BoxedWorkflowFn,
}

impl RegisteredWorkflow {
    pub fn new(
        metadata: WorkflowMetadata,
        compensations: CompensationRegistry,
        body: BoxedWorkflowFn,
    ) -> Self {
        Self {
            metadata,
            compensations: Arc::new(compensations),
            body,
        }
    }

    /// Wrap an implementation of [`WorkflowDefinition`].
    pub fn from_definition<W: WorkflowDefinition>(definition: W) -> Self {
        let metadata = WorkflowMetadata {
            name: definition.name().to_string(),
            description: definition.description().map(str::to_string),
            options: definition.options(),
        };
        let mut compensations = CompensationRegistry::new();
        definition.compensations(&mut compensations);

        let definition = Arc::new(definition);
        let body: BoxedWorkflowFn = Arc::new(move |ctx, input| {
            let definition = Arc::clone(&definition);
            Box::pin(async move { definition.run(&ctx, input).await })
        });

        Self::new(metadata, compensations, body)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.metadata.options
    }

    pub fn compensations(&self) -> Arc<CompensationRegistry> {
        Arc::clone(&self.compensations)
    }

    /// Run the body once. Lifecycle handling lives in the entry-point
    /// wrapper, not here.
    pub async fn execute(&self, ctx: Arc<WorkflowContext>, input: Vec<Value>) -> Result<Value> {
        (self.body)(ctx, input).await
    }
}

impl std::fmt::Debug for RegisteredWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredWorkflow")
            .field("metadata", &self.metadata)
            .field("compensations", &self.compensations)
            .field("body", &"<function>")
            .finish()
    }
}

/// Name to implementation mapping shared by clients and workers.
/// Read-only once workers start.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: RwLock<HashMap<String, Arc<RegisteredWorkflow>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// Register a prepared workflow. Names must be unique.
    pub fn register_workflow(&self, workflow: RegisteredWorkflow) -> Result<()> {
        let name = workflow.name().to_string();
        let mut workflows = self.workflows.write();

        if workflows.contains_key(&name) {
            return Err(WorkflowError::InvalidConfiguration(format!(
                "Workflow '{}' is already registered. Each workflow name must be unique.",
                name
            )));
        }

        workflows.insert(name, Arc::new(workflow));
        Ok(())
    }

    /// Register a [`WorkflowDefinition`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// registry.register(OrderWorkflow::new(payments))?;
    /// ```
    pub fn register<W: WorkflowDefinition>(&self, definition: W) -> Result<()> {
        self.register_workflow(RegisteredWorkflow::from_definition(definition))
    }

    /// Register a closure body under `name` with default options.
    pub fn register_fn<F, Fut>(&self, name: &str, body: F) -> Result<()>
    where
        F: Fn(Arc<WorkflowContext>, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let body: BoxedWorkflowFn = Arc::new(move |ctx, input| Box::pin(body(ctx, input)));
        self.register_workflow(RegisteredWorkflow::new(
            WorkflowMetadata::new(name),
            CompensationRegistry::new(),
            body,
        ))
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredWorkflow>> {
        self.workflows.read().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.workflows.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workflows.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_all_metadata(&self) -> Vec<WorkflowMetadata> {
        self.workflows
            .read()
            .values()
            .map(|w| w.metadata.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.workflows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.read().is_empty()
    }
}

impl std::fmt::Debug for WorkflowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRegistry")
            .field("workflows", &self.names())
            .finish()
    }
}
