//! Both authoring styles, registered side by side and run inline or through
//! manually driven jobs.

use crate::fixtures::{fan_out_workflow, greeting_workflow, OrderWorkflow};
use crate::{init_tracing, run_status};
use chrono::Utc;
use rocketflow_core::workflow_queue_name;
use rocketflow_sdk::prelude::*;
use rocketflow_sdk::testing::InMemoryBackend;
use rocketflow_sdk::{EventType, JobOutcome, RunFilter, WorkflowError};
use serde_json::json;
use std::sync::Arc;

fn client(backend: &InMemoryBackend) -> WorkflowClient {
    WorkflowClient::builder()
        .backend(Arc::new(backend.clone()))
        .register(OrderWorkflow::default())
        .register_workflow(greeting_workflow())
        .register_workflow(fan_out_workflow())
        .hook(LoggingHook::debug())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_registry_holds_both_styles() {
    let backend = InMemoryBackend::new();
    let client = client(&backend);

    let mut names = client.registry().names();
    names.sort();
    assert_eq!(names, vec!["fan-out", "greeting", "order"]);

    let greeting = client.registry().get("greeting").unwrap();
    assert_eq!(
        greeting.metadata.description.as_deref(),
        Some("Greets through ambient steps")
    );
    let order = client.registry().get("order").unwrap();
    assert!(order.compensations().contains("release-stock"));
    assert_eq!(order.options().execution_timeout, Some(10_000));
}

#[tokio::test]
async fn test_closure_workflow_uses_ambient_steps() {
    init_tracing();
    let backend = InMemoryBackend::new();
    let client = client(&backend);

    let outcome = client
        .run_workflow("greeting", vec![json!("ada")])
        .await
        .unwrap();
    assert_eq!(outcome.output(), Some(&json!("Hello, ADA!")));

    let runs = client
        .list_runs(&RunFilter::workflow("greeting"))
        .await
        .unwrap();
    assert_eq!(runs.items.len(), 1);
    let run_id = runs.items[0].run_id.clone();
    assert_eq!(run_status(&backend, &run_id), Some(RunStatus::Completed));

    let completed: Vec<String> = backend
        .events(&run_id)
        .iter()
        .filter(|e| e.event_type == EventType::StepCompleted)
        .map(|e| e.correlation().to_string())
        .collect();
    assert_eq!(completed, vec!["step-0", "greet"]);
}

#[tokio::test]
async fn test_ambient_helpers_outside_a_workflow() {
    let upper: String = step(None, StepOptions::new(), || async { Ok("x".to_uppercase()) })
        .await
        .unwrap();
    assert_eq!(upper, "X");

    let err = sleep("1s").await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotInWorkflow(_)));
    let err = wait_for_signal::<Value>("go").await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotInWorkflow(_)));
}

#[tokio::test]
async fn test_declarative_workflow_suspends_inline() {
    let backend = InMemoryBackend::new();
    let client = client(&backend);

    let outcome = client
        .run_workflow("order", vec![json!({"item": "cup", "quantity": 1})])
        .await
        .unwrap();
    assert!(outcome.is_suspended());

    let runs = client
        .list_runs(&RunFilter::workflow("order"))
        .await
        .unwrap();
    let run = &runs.items[0];
    assert_eq!(run.status, RunStatus::Running);
    // Options registered with the workflow reach the run
    assert_eq!(run.execution_timeout, Some(10_000));
}

#[tokio::test]
async fn test_parallel_branches_resume_after_timer() {
    init_tracing();
    let backend = InMemoryBackend::new();
    let client = client(&backend);
    let worker = client.worker();
    worker
        .start(&[], StartOptions::without_resume())
        .await
        .unwrap();
    let queue = workflow_queue_name("fan-out");

    let run_id = client
        .trigger("fan-out", vec![], WorkflowOptions::default())
        .await
        .unwrap()
        .run_id;

    let job = backend.next_job(&queue).unwrap();
    let disposition = worker.process_job(job).await.unwrap();
    assert!(matches!(
        disposition.outcome(),
        Some(JobOutcome::Suspended { .. })
    ));
    // The fast branch finished before the slow one parked
    let fast = backend
        .events(&run_id)
        .into_iter()
        .find(|e| e.event_type == EventType::StepCompleted)
        .unwrap();
    assert_eq!(fast.correlation(), "fast");

    backend.fire_due_waits_at(Utc::now() + chrono::Duration::minutes(1));
    let job = backend.next_job(&queue).unwrap();
    let disposition = worker.process_job(job).await.unwrap();
    assert!(matches!(
        disposition.outcome(),
        Some(JobOutcome::Completed(output)) if *output == json!(3)
    ));
    assert_eq!(run_status(&backend, &run_id), Some(RunStatus::Completed));

    worker.stop().await;
}
