//! WorkflowWorker - drives delivered jobs through the replay engine

use crate::client::WorkflowClient;
use crate::config::WorkerConfig;
use crate::error::{Result, WorkflowError};
use crate::worker::heartbeat::Heartbeat;
use crate::worker::lifecycle::{JobDisposition, JobOutcome, NackReason, StartOptions, WorkerStatus};
use crate::workflow::context::WorkflowContext;
use crate::workflow::entry::run_entry;
use crate::workflow::outcome::ExecutionOutcome;
use parking_lot::{Mutex, RwLock};
use rocketflow_core::{
    workflow_queue_name, RunError, RunFilter, RunStatus, RunUpdate, Subscription, WorkflowJob,
};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Worker that subscribes to workflow queues and executes delivered jobs.
///
/// Cheap to clone; clones control the same worker.
#[derive(Clone)]
pub struct WorkflowWorker {
    inner: Arc<WorkerInner>,
}

struct WorkerInner {
    client: WorkflowClient,
    config: WorkerConfig,
    status: RwLock<WorkerStatus>,
    semaphore: Arc<Semaphore>,
    queues: Mutex<Vec<String>>,
    shutdown_tx: watch::Sender<bool>,
    dispatchers: Mutex<Vec<JoinHandle<()>>>,
    in_flight: Mutex<JoinSet<()>>,
}

impl WorkflowWorker {
    pub fn new(client: WorkflowClient, config: WorkerConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            inner: Arc::new(WorkerInner {
                client,
                config,
                status: RwLock::new(WorkerStatus::Initializing),
                semaphore,
                queues: Mutex::new(Vec::new()),
                shutdown_tx,
                dispatchers: Mutex::new(Vec::new()),
                in_flight: Mutex::new(JoinSet::new()),
            }),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.inner.config
    }

    pub fn status(&self) -> WorkerStatus {
        self.inner.status.read().clone()
    }

    /// Whether every subscription is confirmed and jobs are accepted.
    pub fn is_ready(&self) -> bool {
        self.inner.status.read().is_running()
    }

    /// Subscribe to the queues of `workflow_names` and start dispatching.
    ///
    /// Returns once every subscription is confirmed and, with
    /// `options.resume`, pending and running runs were resubmitted.
    pub async fn start(&self, workflow_names: &[&str], options: StartOptions) -> Result<()> {
        {
            let mut status = self.inner.status.write();
            if !matches!(*status, WorkerStatus::Initializing | WorkerStatus::Stopped) {
                return Err(WorkflowError::InvalidConfiguration(
                    "Worker already started".to_string(),
                ));
            }
            *status = WorkerStatus::Subscribing;
        }
        self.inner.shutdown_tx.send_replace(false);

        info!(workflows = ?workflow_names, "Starting workflow worker");

        let mut subscriptions = Vec::with_capacity(workflow_names.len());
        for name in workflow_names {
            if !self.inner.client.registry().has(name) {
                warn!(workflow = %name, "Subscribing to a workflow with no registered implementation");
            }
            let queue_name = workflow_queue_name(name);
            match self.inner.client.queue().subscribe(&queue_name).await {
                Ok(subscription) => {
                    info!(queue = %queue_name, "Subscription confirmed");
                    self.inner.queues.lock().push(queue_name);
                    subscriptions.push(subscription);
                }
                Err(e) => {
                    error!(queue = %queue_name, error = %e, "Subscription failed");
                    self.inner.unsubscribe_all().await;
                    *self.inner.status.write() = WorkerStatus::Stopped;
                    return Err(e.into());
                }
            }
        }

        *self.inner.status.write() = WorkerStatus::Running {
            queues: self.inner.queues.lock().clone(),
            started_at: SystemTime::now(),
        };
        info!(subscriptions = subscriptions.len(), "Workflow worker ready");

        {
            let mut dispatchers = self.inner.dispatchers.lock();
            for subscription in subscriptions {
                let inner = Arc::clone(&self.inner);
                let shutdown_rx = self.inner.shutdown_tx.subscribe();
                dispatchers.push(tokio::spawn(WorkerInner::dispatch(
                    inner,
                    subscription,
                    shutdown_rx,
                )));
            }
        }

        if options.resume {
            for name in workflow_names {
                self.resume_unfinished(name).await;
            }
        }

        Ok(())
    }

    async fn resume_unfinished(&self, workflow_name: &str) {
        for status in [RunStatus::Pending, RunStatus::Running] {
            let filter = RunFilter::workflow(workflow_name).with_status(status);
            let runs = match self.inner.client.list_runs(&filter).await {
                Ok(runs) => runs.items,
                Err(e) => {
                    warn!(workflow = %workflow_name, error = %e, "Failed to list runs to resume");
                    continue;
                }
            };
            for run in runs {
                match self.inner.client.resume(&run.run_id).await {
                    Ok(_) => info!(run_id = %run.run_id, workflow = %workflow_name, "Resubmitted run"),
                    Err(e) => {
                        warn!(run_id = %run.run_id, error = %e, "Failed to resubmit run")
                    }
                }
            }
        }
    }

    /// Process one delivered job and acknowledge it.
    pub async fn process_job(&self, job: WorkflowJob) -> Result<JobDisposition> {
        self.inner.process_job(job).await
    }

    /// Unsubscribe everything and wait for in-flight jobs to settle.
    pub async fn stop(&self) {
        {
            let mut status = self.inner.status.write();
            if matches!(*status, WorkerStatus::Initializing | WorkerStatus::Stopped) {
                *status = WorkerStatus::Stopped;
                return;
            }
            *status = WorkerStatus::ShuttingDown {
                in_flight_count: self.inner.in_flight.lock().len(),
            };
        }
        info!("Stopping workflow worker");

        self.inner.shutdown_tx.send_replace(true);
        self.inner.unsubscribe_all().await;

        let dispatchers: Vec<_> = std::mem::take(&mut *self.inner.dispatchers.lock());
        for dispatcher in dispatchers {
            if let Err(e) = dispatcher.await {
                warn!(error = %e, "Dispatch loop ended abnormally");
            }
        }

        let mut in_flight = std::mem::take(&mut *self.inner.in_flight.lock());
        let draining = in_flight.len();
        while let Some(result) = in_flight.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Job task ended abnormally");
            }
        }

        *self.inner.status.write() = WorkerStatus::Stopped;
        info!(drained = draining, "Workflow worker stopped");
    }
}

impl WorkerInner {
    async fn dispatch(
        inner: Arc<WorkerInner>,
        mut subscription: Subscription,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            let job = tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                job = subscription.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let permit = match Arc::clone(&inner.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            debug!(
                queue = %subscription.queue_name(),
                job_id = %job.id,
                run_id = %job.run_id(),
                "Job delivered"
            );

            let worker = Arc::clone(&inner);
            {
                let mut in_flight = inner.in_flight.lock();
                while in_flight.try_join_next().is_some() {}
                in_flight.spawn(async move {
                    let _permit = permit;
                    let job_id = job.id.clone();
                    if let Err(e) = worker.process_job(job).await {
                        error!(job_id = %job_id, error = %e, "Failed to settle job");
                    }
                });
            }
        }
        debug!(queue = %subscription.queue_name(), "Dispatch loop stopped");
    }

    async fn unsubscribe_all(&self) {
        let queues: Vec<String> = std::mem::take(&mut *self.queues.lock());
        for queue_name in queues {
            if let Err(e) = self.client.queue().unsubscribe(&queue_name).await {
                warn!(queue = %queue_name, error = %e, "Failed to unsubscribe");
            }
        }
    }

    async fn nack(&self, job: &WorkflowJob, reason: NackReason) -> Result<JobDisposition> {
        warn!(
            job_id = %job.id,
            run_id = %job.run_id(),
            workflow = %job.workflow_name(),
            reason = %reason,
            "Job nacked"
        );
        self.client.queue().nack(&job.id).await?;
        Ok(JobDisposition::Nacked(reason))
    }

    async fn ack(&self, job: &WorkflowJob, outcome: JobOutcome) -> Result<JobDisposition> {
        self.client.queue().ack(&job.id).await?;
        debug!(job_id = %job.id, run_id = %job.run_id(), "Job acked");
        Ok(JobDisposition::Acked(outcome))
    }

    async fn process_job(&self, job: WorkflowJob) -> Result<JobDisposition> {
        if !self.status.read().is_running() {
            return self.nack(&job, NackReason::NotReady).await;
        }

        let workflow_name = job.workflow_name().to_string();
        let Some(workflow) = self.client.registry().get(&workflow_name) else {
            return self
                .nack(&job, NackReason::UnregisteredWorkflow(workflow_name))
                .await;
        };

        let run_id = job.run_id().to_string();
        info!(job_id = %job.id, run_id = %run_id, workflow = %workflow_name, "Processing job");

        let heartbeat = Heartbeat::start(
            Arc::clone(self.client.queue()),
            job.id.clone(),
            self.config.heartbeat_interval,
        );

        let service = self.client.service();
        let fetched = tokio::try_join!(service.get_run(&run_id), service.list_events(&run_id));
        let (run, events) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                drop(heartbeat);
                error!(job_id = %job.id, run_id = %run_id, error = %e, "Failed to fetch run history, dropping job");
                return self
                    .ack(&job, JobOutcome::HistoryUnavailable(e.to_string()))
                    .await;
            }
        };

        if run.status.is_terminal() {
            drop(heartbeat);
            debug!(run_id = %run_id, status = run.status.as_str(), "Run already finished");
            return self.ack(&job, JobOutcome::AlreadyFinished(run.status)).await;
        }

        let ctx = Arc::new(
            WorkflowContext::new(workflow_name.clone(), Arc::clone(service))
                .with_run_id(run_id.clone())
                .with_compensations(workflow.compensations())
                .with_retry_backoff(self.config.retry_backoff),
        );
        ctx.rebuild_state(&events);

        let input = job.data.input.clone().unwrap_or_else(|| run.input.clone());
        let hooks = Arc::clone(self.client.hooks());
        hooks.on_run_started(&run_id, &workflow_name, &input).await;

        // Zero means unset.
        let timeout = run
            .execution_timeout
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(self.config.default_execution_timeout);

        // Detached so a timed-out body keeps running in the background.
        let client = self.client.clone();
        let execution = tokio::spawn(async move { run_entry(&client, ctx, &workflow, input).await });

        // The entry wrapper never saw these failures, so the run is marked here.
        let (outcome, unrecorded) = match tokio::time::timeout(timeout, execution).await {
            Ok(Ok(outcome)) => (outcome, false),
            Ok(Err(e)) => (
                ExecutionOutcome::Failed(WorkflowError::Other(format!(
                    "Workflow execution aborted: {}",
                    e
                ))),
                true,
            ),
            Err(_) => (
                ExecutionOutcome::Failed(WorkflowError::CircuitBreakerTimeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }),
                true,
            ),
        };
        drop(heartbeat);

        match &outcome {
            ExecutionOutcome::Suspended { reason } => {
                info!(run_id = %run_id, reason = %reason, "Run suspended");
                hooks.on_run_suspended(&run_id, &workflow_name, reason).await;
            }
            ExecutionOutcome::Completed(output) => {
                info!(run_id = %run_id, workflow = %workflow_name, "Run completed");
                hooks.on_run_completed(&run_id, &workflow_name, output).await;
            }
            ExecutionOutcome::Failed(e) => {
                error!(run_id = %run_id, workflow = %workflow_name, error = %e, "Run failed");
                if unrecorded {
                    let update = RunUpdate::failed(RunError::new(e.to_string()));
                    if let Err(update_err) = service.update_run(&run_id, update).await {
                        warn!(run_id = %run_id, error = %update_err, "Failed to mark aborted run failed");
                    }
                }
                hooks.on_run_failed(&run_id, &workflow_name, &e.to_string()).await;
            }
        }

        self.ack(&job, outcome.into()).await
    }
}

impl std::fmt::Debug for WorkflowWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowWorker")
            .field("config", &self.inner.config)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::hook::WorkflowHook;
    use crate::testing::InMemoryBackend;
    use crate::workflow::definition::workflow;
    use crate::workflow::step::StepOptions;
    use async_trait::async_trait;
    use rocketflow_core::{EventType, JobKind, JobMessage, WorkflowOptions};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn job(id: &str, run_id: &str, workflow: &str) -> WorkflowJob {
        WorkflowJob {
            id: id.to_string(),
            data: JobMessage::new(JobKind::Resume, run_id, workflow),
        }
    }

    fn client(backend: &InMemoryBackend) -> WorkflowClient {
        WorkflowClient::builder()
            .backend(Arc::new(backend.clone()))
            .register_workflow(workflow("nap").run(|ctx, _input| async move {
                let n: u32 = ctx
                    .execute_step("before", StepOptions::new(), || async { Ok(1) })
                    .await?;
                ctx.sleep("1h").await?;
                Ok(n + 1)
            }))
            .register_workflow(
                workflow("slow")
                    .options(WorkflowOptions::default().with_execution_timeout(100))
                    .run(|_ctx, _input| async move {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        Ok(())
                    }),
            )
            .register_workflow(workflow("boom").run(|_ctx, _input| async move {
                if true {
                    panic!("inventory exploded");
                }
                Ok(())
            }))
            .build()
            .unwrap()
    }

    /// Ready worker with no subscriptions, so jobs only arrive through
    /// explicit `process_job` calls.
    async fn ready_worker(client: &WorkflowClient) -> WorkflowWorker {
        let worker = client.worker();
        worker.start(&[], StartOptions::without_resume()).await.unwrap();
        worker
    }

    #[tokio::test]
    async fn test_job_before_ready_is_nacked() {
        let backend = InMemoryBackend::new();
        let worker = client(&backend).worker();
        let run = backend.seed_run("nap", vec![]).await;

        let disposition = worker.process_job(job("j1", &run.run_id, "nap")).await.unwrap();
        assert!(matches!(disposition, JobDisposition::Nacked(NackReason::NotReady)));
        assert_eq!(backend.nacked(), vec!["j1".to_string()]);
        assert!(backend.events(&run.run_id).is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_workflow_is_nacked_without_mutation() {
        let backend = InMemoryBackend::new();
        let worker = ready_worker(&client(&backend)).await;
        let run = backend.seed_run("ghost", vec![]).await;

        let disposition = worker.process_job(job("j1", &run.run_id, "ghost")).await.unwrap();
        assert!(matches!(
            disposition,
            JobDisposition::Nacked(NackReason::UnregisteredWorkflow(ref name)) if name == "ghost"
        ));
        assert_eq!(backend.nacked(), vec!["j1".to_string()]);
        assert!(backend.acked().is_empty());

        let stored = backend.run(&run.run_id).unwrap();
        assert_eq!(stored.status, RunStatus::Pending);
        assert!(backend.events(&run.run_id).is_empty());
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_suspension_is_acked_without_status_change() {
        let backend = InMemoryBackend::new();
        let worker = ready_worker(&client(&backend)).await;
        let run = backend.seed_run("nap", vec![]).await;

        let disposition = worker.process_job(job("j1", &run.run_id, "nap")).await.unwrap();
        assert!(matches!(
            disposition.outcome(),
            Some(JobOutcome::Suspended { reason }) if reason == "Waiting for timer: sleep-0"
        ));
        assert_eq!(backend.acked(), vec!["j1".to_string()]);
        assert_eq!(backend.run(&run.run_id).unwrap().status, RunStatus::Running);

        let types: Vec<EventType> = backend.events(&run.run_id).iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![EventType::StepStarted, EventType::StepCompleted, EventType::WaitCreated]
        );
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_redelivery_after_wake_completes_run() {
        let backend = InMemoryBackend::new();
        let worker = ready_worker(&client(&backend)).await;
        let run = backend.seed_run("nap", vec![]).await;

        worker.process_job(job("j1", &run.run_id, "nap")).await.unwrap();
        backend
            .append(&run.run_id, EventType::WaitCompleted, "sleep-0", json!({}))
            .await;

        let disposition = worker.process_job(job("j2", &run.run_id, "nap")).await.unwrap();
        assert!(matches!(disposition.outcome(), Some(JobOutcome::Completed(v)) if *v == json!(2)));

        let stored = backend.run(&run.run_id).unwrap();
        assert_eq!(stored.status, RunStatus::Completed);
        assert_eq!(stored.output, Some(json!(2)));
        // the completed step was replayed, not re-run
        let started = backend
            .events(&run.run_id)
            .iter()
            .filter(|e| e.event_type == EventType::StepStarted)
            .count();
        assert_eq!(started, 1);
        worker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marks_run_failed_and_acks() {
        let backend = InMemoryBackend::new();
        let client = client(&backend);
        let worker = ready_worker(&client).await;
        let run = client
            .trigger("slow", vec![], WorkflowOptions::default())
            .await
            .unwrap();
        assert_eq!(run.execution_timeout, Some(100));

        let disposition = worker.process_job(job("j1", &run.run_id, "slow")).await.unwrap();
        assert!(matches!(
            disposition.outcome(),
            Some(JobOutcome::Failed(e)) if e.is_circuit_breaker()
        ));
        assert_eq!(backend.acked(), vec!["j1".to_string()]);

        let stored = backend.run(&run.run_id).unwrap();
        assert_eq!(stored.status, RunStatus::Failed);
        assert_eq!(stored.error.unwrap().message, "CircuitBreaker: Execution timeout");
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_duplicate_delivery_of_finished_run_is_dropped() {
        let backend = InMemoryBackend::new();
        let worker = ready_worker(&client(&backend)).await;
        let run = backend.seed_run("nap", vec![]).await;
        worker
            .inner
            .client
            .service()
            .update_run(&run.run_id, RunUpdate::completed(json!(0)))
            .await
            .unwrap();

        let disposition = worker.process_job(job("j1", &run.run_id, "nap")).await.unwrap();
        assert!(matches!(
            disposition.outcome(),
            Some(JobOutcome::AlreadyFinished(RunStatus::Completed))
        ));
        assert!(backend.events(&run.run_id).is_empty());
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_missing_run_is_acked_and_dropped() {
        let backend = InMemoryBackend::new();
        let worker = ready_worker(&client(&backend)).await;

        for id in ["j1", "j2"] {
            let disposition = worker.process_job(job(id, "missing", "nap")).await.unwrap();
            assert!(matches!(
                disposition.outcome(),
                Some(JobOutcome::HistoryUnavailable(_))
            ));
        }
        assert_eq!(backend.acked(), vec!["j1".to_string(), "j2".to_string()]);
        assert!(backend.nacked().is_empty());
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_panicking_body_marks_run_failed() {
        let backend = InMemoryBackend::new();
        let worker = ready_worker(&client(&backend)).await;
        let run = backend.seed_run("boom", vec![]).await;

        let disposition = worker.process_job(job("j1", &run.run_id, "boom")).await.unwrap();
        assert!(matches!(
            disposition.outcome(),
            Some(JobOutcome::Failed(WorkflowError::Other(msg))) if msg.starts_with("Workflow execution aborted")
        ));
        assert_eq!(backend.acked(), vec!["j1".to_string()]);

        let stored = backend.run(&run.run_id).unwrap();
        assert_eq!(stored.status, RunStatus::Failed);
        assert!(stored.error.unwrap().message.starts_with("Workflow execution aborted"));
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_zero_execution_timeout_uses_default() {
        let backend = InMemoryBackend::new();
        let client = client(&backend);
        let worker = ready_worker(&client).await;
        let run = client
            .trigger("nap", vec![], WorkflowOptions::default().with_execution_timeout(0))
            .await
            .unwrap();
        assert_eq!(run.execution_timeout, Some(0));

        let disposition = worker.process_job(job("j1", &run.run_id, "nap")).await.unwrap();
        assert!(matches!(
            disposition.outcome(),
            Some(JobOutcome::Suspended { .. })
        ));
        assert_eq!(backend.run(&run.run_id).unwrap().status, RunStatus::Running);
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_start_twice_fails_and_stop_is_idempotent() {
        let backend = InMemoryBackend::new();
        let worker = client(&backend).worker();
        worker.start(&["nap"], StartOptions::without_resume()).await.unwrap();
        assert!(worker.is_ready());
        assert_eq!(backend.subscriber_count("__wkf_workflow_nap"), 1);
        assert!(worker.start(&["nap"], StartOptions::default()).await.is_err());

        worker.stop().await;
        assert!(worker.status().is_stopped());
        worker.stop().await;
        assert!(worker.status().is_stopped());
        assert_eq!(backend.subscriber_count("__wkf_workflow_nap"), 0);
    }

    #[tokio::test]
    async fn test_start_resubmits_unfinished_runs() {
        let backend = InMemoryBackend::new();
        let client = client(&backend);
        let pending = backend.seed_run("nap", vec![]).await;
        let finished = backend.seed_run("nap", vec![]).await;
        client
            .service()
            .update_run(&finished.run_id, RunUpdate::completed(json!(null)))
            .await
            .unwrap();

        let worker = client.worker();
        worker.start(&["nap"], StartOptions::default()).await.unwrap();

        let resumed: Vec<String> = backend
            .messages("__wkf_workflow_nap")
            .into_iter()
            .filter(|m| m.message.kind == Some(JobKind::Resume))
            .map(|m| m.message.run_id)
            .collect();
        assert_eq!(resumed, vec![pending.run_id.clone()]);
        worker.stop().await;
    }

    #[derive(Default)]
    struct Recorder {
        suspended: AtomicU32,
        failed: AtomicU32,
    }

    #[async_trait]
    impl WorkflowHook for Arc<Recorder> {
        async fn on_run_suspended(&self, _: &str, _: &str, _: &str) {
            self.suspended.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_run_failed(&self, _: &str, _: &str, _: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_hooks_observe_outcomes() {
        let backend = InMemoryBackend::new();
        let recorder = Arc::new(Recorder::default());
        let client = WorkflowClient::builder()
            .backend(Arc::new(backend.clone()))
            .hook(recorder.clone())
            .register_workflow(workflow("wait").run(|ctx, _input| async move {
                let approved: bool = ctx.wait_for_signal("approve").await?;
                if approved {
                    Ok(Value::Null)
                } else {
                    Err(WorkflowError::step("rejected"))
                }
            }))
            .build()
            .unwrap();
        let worker = ready_worker(&client).await;

        let run = backend.seed_run("wait", vec![]).await;
        worker.process_job(job("j1", &run.run_id, "wait")).await.unwrap();
        client
            .send_signal(&run.run_id, "approve", false, None)
            .await
            .unwrap();
        worker.process_job(job("j2", &run.run_id, "wait")).await.unwrap();

        assert_eq!(recorder.suspended.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.failed.load(Ordering::SeqCst), 1);
        assert_eq!(backend.run(&run.run_id).unwrap().status, RunStatus::Failed);
        worker.stop().await;
    }
}
