//! In-memory Run/Event service and job queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rocketflow_core::{
    workflow_queue_name, CoreError, CoreResult, EventType, JobKind, JobMessage, JobQueue,
    NewEvent, NewRun, PaginatedList, QueueOptions, RunFilter, RunStatus, RunUpdate, Subscription,
    WorkflowEvent, WorkflowJob, WorkflowOptions, WorkflowRun, WorkflowService,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

const SUBSCRIPTION_BUFFER: usize = 1024;

/// Delivery state of a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    /// Waiting for a subscriber, or handed back with a nack.
    Pending,
    /// Pushed to a subscriber, not yet settled.
    Delivered,
    Acked,
}

/// A message as recorded by the in-memory queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    pub id: String,
    pub queue_name: String,
    pub message: JobMessage,
    pub options: QueueOptions,
    pub state: MessageState,
}

impl QueuedMessage {
    fn job(&self) -> WorkflowJob {
        WorkflowJob {
            id: self.id.clone(),
            data: self.message.clone(),
        }
    }
}

#[derive(Default)]
struct QueueState {
    messages: Vec<QueuedMessage>,
    subscribers: HashMap<String, mpsc::Sender<WorkflowJob>>,
    acked: Vec<String>,
    nacked: Vec<String>,
}

impl QueueState {
    /// Push every pending message of `queue_name` to its subscriber.
    fn flush(&mut self, queue_name: &str) -> usize {
        let Some(sender) = self.subscribers.get(queue_name).cloned() else {
            return 0;
        };
        let mut delivered = 0;
        for message in self
            .messages
            .iter_mut()
            .filter(|m| m.queue_name == queue_name && m.state == MessageState::Pending)
        {
            if sender.try_send(message.job()).is_err() {
                break;
            }
            message.state = MessageState::Delivered;
            delivered += 1;
        }
        delivered
    }
}

#[derive(Default)]
struct BackendInner {
    runs: RwLock<HashMap<String, WorkflowRun>>,
    run_order: RwLock<Vec<String>>,
    events: RwLock<HashMap<String, Vec<WorkflowEvent>>>,
    sequence: AtomicU64,
    queue: Mutex<QueueState>,
    touches: Mutex<HashMap<String, usize>>,
    fail_touches: AtomicBool,
}

/// In-memory implementation of [`WorkflowService`] and [`JobQueue`].
///
/// Events get a global sequence number as id, so each run's history is
/// totally ordered. Queued messages are pushed to subscribers as they
/// arrive; a message whose idempotency key matches an unacknowledged one is
/// dropped. Nacked messages stay pending until
/// [`redeliver_pending`](Self::redeliver_pending).
///
/// # Example
///
/// ```ignore
/// let backend = InMemoryBackend::new();
/// let client = WorkflowClient::builder()
///     .backend(Arc::new(backend.clone()))
///     .register_workflow(my_workflow)
///     .build()?;
///
/// client.trigger("my-workflow", vec![], WorkflowOptions::default()).await?;
/// let job = backend.next_job("__wkf_workflow_my-workflow").unwrap();
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<BackendInner>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(&self) -> Arc<dyn WorkflowService> {
        Arc::new(self.clone())
    }

    pub fn queue(&self) -> Arc<dyn JobQueue> {
        Arc::new(self.clone())
    }

    /// Create a pending run with default options.
    pub async fn seed_run(&self, workflow_name: &str, input: Vec<Value>) -> WorkflowRun {
        self.insert_run(NewRun::new(workflow_name, input, &WorkflowOptions::default()))
    }

    /// Append an event directly, as the wake scheduler would.
    pub async fn append(
        &self,
        run_id: &str,
        event_type: EventType,
        correlation_id: &str,
        payload: Value,
    ) -> WorkflowEvent {
        let mut event = NewEvent::new(event_type, correlation_id);
        event.payload = payload.as_object().cloned().unwrap_or_default();
        self.insert_event(run_id, event)
    }

    pub fn run(&self, run_id: &str) -> Option<WorkflowRun> {
        self.inner.runs.read().get(run_id).cloned()
    }

    /// History of a run in append order.
    pub fn events(&self, run_id: &str) -> Vec<WorkflowEvent> {
        self.inner
            .events
            .read()
            .get(run_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every message ever queued on `queue_name`, in queue order.
    pub fn messages(&self, queue_name: &str) -> Vec<QueuedMessage> {
        self.inner
            .queue
            .lock()
            .messages
            .iter()
            .filter(|m| m.queue_name == queue_name)
            .cloned()
            .collect()
    }

    /// Take the oldest pending job of `queue_name` for manual processing.
    pub fn next_job(&self, queue_name: &str) -> Option<WorkflowJob> {
        let mut queue = self.inner.queue.lock();
        let message = queue
            .messages
            .iter_mut()
            .find(|m| m.queue_name == queue_name && m.state == MessageState::Pending)?;
        message.state = MessageState::Delivered;
        Some(message.job())
    }

    /// Push pending messages to current subscribers. Returns how many were
    /// delivered.
    pub fn redeliver_pending(&self) -> usize {
        let mut queue = self.inner.queue.lock();
        let names: Vec<String> = queue.subscribers.keys().cloned().collect();
        names.iter().map(|name| queue.flush(name)).sum()
    }

    /// Ids of acked jobs, in ack order.
    pub fn acked(&self) -> Vec<String> {
        self.inner.queue.lock().acked.clone()
    }

    /// Ids of nacked jobs, in nack order.
    pub fn nacked(&self) -> Vec<String> {
        self.inner.queue.lock().nacked.clone()
    }

    pub fn subscriber_count(&self, queue_name: &str) -> usize {
        usize::from(self.inner.queue.lock().subscribers.contains_key(queue_name))
    }

    /// Number of successful touches of a job.
    pub fn touches(&self, job_id: &str) -> usize {
        self.inner
            .touches
            .lock()
            .get(job_id)
            .copied()
            .unwrap_or_default()
    }

    /// Make every touch fail until switched back.
    pub fn fail_touches(&self, fail: bool) {
        self.inner.fail_touches.store(fail, Ordering::SeqCst);
    }

    /// Wake scheduler: complete every open wait whose `resumeAt` has passed
    /// and queue a resume job for its run.
    pub fn fire_due_waits(&self) -> usize {
        self.fire_due_waits_at(Utc::now())
    }

    /// [`fire_due_waits`](Self::fire_due_waits) as of `now`.
    pub fn fire_due_waits_at(&self, now: DateTime<Utc>) -> usize {
        let due: Vec<(String, String)> = {
            let events = self.inner.events.read();
            events
                .iter()
                .flat_map(|(run_id, history)| {
                    let completed: HashSet<&str> = history
                        .iter()
                        .filter(|e| e.event_type == EventType::WaitCompleted)
                        .map(|e| e.correlation())
                        .collect();
                    history
                        .iter()
                        .filter(|e| e.event_type == EventType::WaitCreated)
                        .filter(|e| !completed.contains(e.correlation()))
                        .filter(|e| {
                            e.payload_field("resumeAt")
                                .and_then(Value::as_str)
                                .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
                                .map_or(true, |at| at <= now)
                        })
                        .map(|e| (run_id.clone(), e.correlation().to_string()))
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        for (run_id, correlation_id) in &due {
            self.insert_event(run_id, NewEvent::new(EventType::WaitCompleted, correlation_id.as_str()));
            let Some(run) = self.run(run_id) else {
                continue;
            };
            let message = JobMessage::new(JobKind::Resume, &run.run_id, &run.workflow_name)
                .with_input(run.input.clone());
            self.enqueue(
                &workflow_queue_name(&run.workflow_name),
                message,
                QueueOptions::for_run(&run.run_id, format!("{}-{}", run.run_id, correlation_id)),
            );
            debug!(run_id = %run_id, correlation_id = %correlation_id, "Wait completed");
        }
        due.len()
    }

    fn insert_run(&self, new_run: NewRun) -> WorkflowRun {
        let now = Utc::now();
        let run = WorkflowRun {
            run_id: Uuid::new_v4().to_string(),
            deployment_id: Some(new_run.deployment_id),
            workflow_name: new_run.workflow_name,
            status: RunStatus::Pending,
            input: new_run.input,
            output: None,
            error: None,
            event_count: Some(0),
            max_events: new_run.max_events,
            execution_timeout: new_run.execution_timeout,
            started_at: None,
            completed_at: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.inner
            .runs
            .write()
            .insert(run.run_id.clone(), run.clone());
        self.inner.run_order.write().push(run.run_id.clone());
        run
    }

    fn insert_event(&self, run_id: &str, event: NewEvent) -> WorkflowEvent {
        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst);
        let stored = WorkflowEvent {
            event_id: sequence.to_string(),
            run_id: run_id.to_string(),
            step_id: None,
            event_type: event.event_type,
            correlation_id: event.correlation_id,
            payload: event.payload,
            created_at: Utc::now(),
        };
        self.inner
            .events
            .write()
            .entry(run_id.to_string())
            .or_default()
            .push(stored.clone());
        if let Some(run) = self.inner.runs.write().get_mut(run_id) {
            run.event_count = Some(run.event_count.unwrap_or_default() + 1);
        }
        stored
    }

    fn enqueue(&self, queue_name: &str, message: JobMessage, options: QueueOptions) {
        let mut queue = self.inner.queue.lock();
        if let Some(key) = &options.idempotency_key {
            let outstanding = queue.messages.iter().any(|m| {
                m.queue_name == queue_name
                    && m.state != MessageState::Acked
                    && m.options.idempotency_key.as_ref() == Some(key)
            });
            if outstanding {
                debug!(queue = %queue_name, idempotency_key = %key, "Duplicate message dropped");
                return;
            }
        }
        queue.messages.push(QueuedMessage {
            id: Uuid::new_v4().to_string(),
            queue_name: queue_name.to_string(),
            message,
            options,
            state: MessageState::Pending,
        });
        queue.flush(queue_name);
    }

    fn not_found(run_id: &str) -> CoreError {
        CoreError::NotFound(format!("run {}", run_id))
    }
}

#[async_trait]
impl WorkflowService for InMemoryBackend {
    async fn create_run(&self, run: NewRun) -> CoreResult<WorkflowRun> {
        Ok(self.insert_run(run))
    }

    async fn get_run(&self, run_id: &str) -> CoreResult<WorkflowRun> {
        self.run(run_id).ok_or_else(|| Self::not_found(run_id))
    }

    async fn update_run(&self, run_id: &str, update: RunUpdate) -> CoreResult<WorkflowRun> {
        let mut runs = self.inner.runs.write();
        let run = runs.get_mut(run_id).ok_or_else(|| Self::not_found(run_id))?;
        let now = Utc::now();
        if let Some(status) = update.status {
            run.status = status;
            if status == RunStatus::Running && run.started_at.is_none() {
                run.started_at = Some(now);
            }
            if status.is_terminal() {
                run.completed_at = Some(now);
            }
        }
        if update.output.is_some() {
            run.output = update.output;
        }
        if update.error.is_some() {
            run.error = update.error;
        }
        run.updated_at = Some(now);
        Ok(run.clone())
    }

    async fn cancel_run(&self, run_id: &str, _reason: Option<&str>) -> CoreResult<()> {
        self.update_run(run_id, RunUpdate {
            status: Some(RunStatus::Cancelled),
            ..Default::default()
        })
        .await?;
        Ok(())
    }

    async fn list_runs(&self, filter: &RunFilter) -> CoreResult<PaginatedList<WorkflowRun>> {
        let runs = self.inner.runs.read();
        let order = self.inner.run_order.read();
        let start = filter
            .cursor
            .as_ref()
            .and_then(|cursor| order.iter().position(|id| id == cursor))
            .map_or(0, |position| position + 1);
        let limit = filter.limit.map_or(usize::MAX, |limit| limit as usize);

        let items = order[start..]
            .iter()
            .filter_map(|id| runs.get(id))
            .filter(|run| filter.matches(run))
            .take(limit)
            .cloned()
            .collect();
        Ok(PaginatedList::single_page(items))
    }

    async fn create_event(&self, run_id: &str, event: NewEvent) -> CoreResult<WorkflowEvent> {
        if !self.inner.runs.read().contains_key(run_id) {
            return Err(Self::not_found(run_id));
        }
        Ok(self.insert_event(run_id, event))
    }

    async fn list_events(&self, run_id: &str) -> CoreResult<Vec<WorkflowEvent>> {
        if !self.inner.runs.read().contains_key(run_id) {
            return Err(Self::not_found(run_id));
        }
        Ok(self.events(run_id))
    }
}

#[async_trait]
impl JobQueue for InMemoryBackend {
    async fn queue_message(
        &self,
        queue_name: &str,
        message: JobMessage,
        options: QueueOptions,
    ) -> CoreResult<()> {
        self.enqueue(queue_name, message, options);
        Ok(())
    }

    async fn ack(&self, job_id: &str) -> CoreResult<()> {
        let mut queue = self.inner.queue.lock();
        if let Some(message) = queue.messages.iter_mut().find(|m| m.id == job_id) {
            message.state = MessageState::Acked;
        }
        queue.acked.push(job_id.to_string());
        Ok(())
    }

    async fn nack(&self, job_id: &str) -> CoreResult<()> {
        let mut queue = self.inner.queue.lock();
        if let Some(message) = queue.messages.iter_mut().find(|m| m.id == job_id) {
            message.state = MessageState::Pending;
        }
        queue.nacked.push(job_id.to_string());
        Ok(())
    }

    async fn touch(&self, job_id: &str) -> CoreResult<()> {
        if self.inner.fail_touches.load(Ordering::SeqCst) {
            return Err(CoreError::Other(format!("touch of {} rejected", job_id)));
        }
        *self
            .inner
            .touches
            .lock()
            .entry(job_id.to_string())
            .or_default() += 1;
        Ok(())
    }

    async fn subscribe(&self, queue_name: &str) -> CoreResult<Subscription> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut queue = self.inner.queue.lock();
        queue.subscribers.insert(queue_name.to_string(), tx);
        queue.flush(queue_name);
        Ok(Subscription::new(queue_name, rx))
    }

    async fn unsubscribe(&self, queue_name: &str) -> CoreResult<()> {
        self.inner.queue.lock().subscribers.remove(queue_name);
        Ok(())
    }
}
