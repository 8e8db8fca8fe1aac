//! Worker tests: jobs flow from the queue subscription through replay to a
//! terminal run status.

use crate::fixtures::{echo_workflow, slow_step_workflow, OrderWorkflow};
use crate::{count_events, has_event, init_tracing, run_status, wait_for, with_timeout, TEST_TIMEOUT};
use chrono::Utc;
use rocketflow_core::workflow_queue_name;
use rocketflow_sdk::testing::InMemoryBackend;
use rocketflow_sdk::{
    EventType, RunStatus, StartOptions, WorkerConfig, WorkflowClient, WorkflowOptions,
};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn order_client(backend: &InMemoryBackend, order: &OrderWorkflow) -> WorkflowClient {
    WorkflowClient::builder()
        .backend(Arc::new(backend.clone()))
        .register(order.clone())
        .build()
        .expect("client builds")
}

#[tokio::test]
async fn test_order_completes_through_sleep_and_signal() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, "order_completes", async {
        let backend = InMemoryBackend::new();
        let order = OrderWorkflow::default();
        let client = order_client(&backend, &order);
        let worker = client.worker();
        worker
            .start(&["order"], StartOptions::without_resume())
            .await
            .unwrap();

        let run = client
            .trigger(
                "order",
                vec![json!({"item": "book", "quantity": 2})],
                WorkflowOptions::default(),
            )
            .await
            .unwrap();
        let run_id = run.run_id.clone();

        wait_for(|| has_event(&backend, &run_id, EventType::WaitCreated)).await;
        assert_eq!(run_status(&backend, &run_id), Some(RunStatus::Running));

        let fired = backend.fire_due_waits_at(Utc::now() + chrono::Duration::hours(1));
        assert_eq!(fired, 1);

        wait_for(|| has_event(&backend, &run_id, EventType::SignalWaiting)).await;
        client
            .send_signal(&run_id, "approve", true, None)
            .await
            .unwrap();

        wait_for(|| run_status(&backend, &run_id) == Some(RunStatus::Completed)).await;

        let run = backend.run(&run_id).unwrap();
        assert_eq!(
            run.output,
            Some(json!({"reservation": "res-book", "quantity": 2}))
        );
        assert!(run.completed_at.is_some());
        assert_eq!(order.reservations.load(Ordering::SeqCst), 1);
        assert_eq!(count_events(&backend, &run_id, EventType::StepStarted), 1);
        assert!(order.released.lock().is_empty());

        worker.stop().await;
    })
    .await;
}

#[tokio::test]
async fn test_rejected_order_rolls_back() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, "rejected_order", async {
        let backend = InMemoryBackend::new();
        let order = OrderWorkflow::default();
        let client = order_client(&backend, &order);
        let worker = client.worker();
        worker
            .start(&["order"], StartOptions::without_resume())
            .await
            .unwrap();

        let run_id = client
            .trigger(
                "order",
                vec![json!({"item": "lamp", "quantity": 1})],
                WorkflowOptions::default(),
            )
            .await
            .unwrap()
            .run_id;

        wait_for(|| has_event(&backend, &run_id, EventType::WaitCreated)).await;
        backend.fire_due_waits_at(Utc::now() + chrono::Duration::hours(1));
        wait_for(|| has_event(&backend, &run_id, EventType::SignalWaiting)).await;
        client
            .send_signal(&run_id, "approve", false, None)
            .await
            .unwrap();

        wait_for(|| run_status(&backend, &run_id) == Some(RunStatus::Failed)).await;

        let run = backend.run(&run_id).unwrap();
        assert_eq!(run.error.map(|e| e.message), Some("order rejected".to_string()));
        assert_eq!(*order.released.lock(), vec!["order rejected".to_string()]);
        // Reserved once, on the first delivery
        assert_eq!(order.reservations.load(Ordering::SeqCst), 1);

        worker.stop().await;
    })
    .await;
}

#[tokio::test]
async fn test_job_for_unregistered_workflow_is_nacked() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, "unregistered_nack", async {
        let backend = InMemoryBackend::new();
        let client = order_client(&backend, &OrderWorkflow::default());
        let worker = client.worker();
        worker
            .start(&["order", "ghost"], StartOptions::without_resume())
            .await
            .unwrap();

        let run = client
            .trigger("ghost", vec![], WorkflowOptions::default())
            .await
            .unwrap();

        wait_for(|| !backend.nacked().is_empty()).await;
        assert_eq!(run_status(&backend, &run.run_id), Some(RunStatus::Pending));
        assert!(backend.events(&run.run_id).is_empty());

        worker.stop().await;
    })
    .await;
}

#[tokio::test]
async fn test_start_resumes_unfinished_runs() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, "resume_on_start", async {
        let backend = InMemoryBackend::new();
        let client = WorkflowClient::builder()
            .backend(Arc::new(backend.clone()))
            .register_workflow(echo_workflow())
            .build()
            .unwrap();

        let run = backend.seed_run("echo", vec![json!("left over")]).await;

        let worker = client.worker();
        worker.start(&["echo"], StartOptions::default()).await.unwrap();

        wait_for(|| run_status(&backend, &run.run_id) == Some(RunStatus::Completed)).await;
        assert_eq!(
            backend.run(&run.run_id).unwrap().output,
            Some(json!(["left over"]))
        );

        worker.stop().await;
    })
    .await;
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_jobs() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, "stop_drains", async {
        let backend = InMemoryBackend::new();
        let client = WorkflowClient::builder()
            .backend(Arc::new(backend.clone()))
            .register_workflow(slow_step_workflow())
            .worker_config(WorkerConfig::LOW_RESOURCE)
            .build()
            .unwrap();
        let worker = client.worker();
        worker
            .start(&["slow-step"], StartOptions::without_resume())
            .await
            .unwrap();

        let run_id = client
            .trigger("slow-step", vec![], WorkflowOptions::default())
            .await
            .unwrap()
            .run_id;
        wait_for(|| has_event(&backend, &run_id, EventType::StepStarted)).await;

        worker.stop().await;

        assert!(worker.status().is_stopped());
        assert_eq!(run_status(&backend, &run_id), Some(RunStatus::Completed));
        assert_eq!(backend.subscriber_count(&workflow_queue_name("slow-step")), 0);
    })
    .await;
}

#[tokio::test]
async fn test_redelivered_trigger_runs_once() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, "redelivered_trigger", async {
        let backend = InMemoryBackend::new();
        let order = OrderWorkflow::default();
        let client = order_client(&backend, &order);
        let worker = client.worker();
        worker
            .start(&["order"], StartOptions::without_resume())
            .await
            .unwrap();

        let run_id = client
            .trigger(
                "order",
                vec![json!({"item": "pen", "quantity": 3})],
                WorkflowOptions::default(),
            )
            .await
            .unwrap()
            .run_id;
        wait_for(|| has_event(&backend, &run_id, EventType::WaitCreated)).await;
        wait_for(|| backend.acked().len() == 1).await;

        // A lost ack: the same run is delivered again before the timer fires
        client.resume(&run_id).await.unwrap();
        wait_for(|| backend.acked().len() >= 2).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(order.reservations.load(Ordering::SeqCst), 1);
        assert_eq!(count_events(&backend, &run_id, EventType::WaitCreated), 1);
        assert_eq!(count_events(&backend, &run_id, EventType::RollbackRegistered), 1);

        worker.stop().await;
    })
    .await;
}
