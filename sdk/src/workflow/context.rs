//! WorkflowContext - the replay engine workflow code calls into
//!
//! Every durable operation derives a deterministic correlation id from a
//! per-attempt call counter, consults the state rebuilt from history, and
//! only touches the outside world (and appends an event) when history has
//! no answer yet.

use super::compensation::{CompensationFn, CompensationInput, CompensationRegistry};
use super::duration::SleepDuration;
use super::state::{rollback_correlation_id, started_marker, ReplayState};
use super::step::StepOptions;
use crate::error::{Result, WorkflowError};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rocketflow_core::{EventType, NewEvent, WorkflowEvent, WorkflowService};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default unit of the linear step retry backoff.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(1000);

/// Execution context of one attempt of one run.
///
/// Parallel branches share a single context; all replay state sits behind
/// one lock that is never held across an await point.
pub struct WorkflowContext {
    workflow_name: String,
    run_id: RwLock<Option<String>>,
    service: Arc<dyn WorkflowService>,
    compensations: Arc<CompensationRegistry>,
    /// Step-level compensation functions attached during this attempt
    attached: Mutex<HashMap<String, CompensationFn>>,
    state: Mutex<ReplayState>,
    retry_backoff: Duration,
}

impl WorkflowContext {
    pub fn new(workflow_name: impl Into<String>, service: Arc<dyn WorkflowService>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            run_id: RwLock::new(None),
            service,
            compensations: Arc::new(CompensationRegistry::new()),
            attached: Mutex::new(HashMap::new()),
            state: Mutex::new(ReplayState::new()),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_run_id(self, run_id: impl Into<String>) -> Self {
        *self.run_id.write() = Some(run_id.into());
        self
    }

    pub fn with_compensations(mut self, compensations: Arc<CompensationRegistry>) -> Self {
        self.compensations = compensations;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    pub fn run_id(&self) -> Option<String> {
        self.run_id.read().clone()
    }

    /// Bind the context to a run.
    pub fn attach_run(&self, run_id: impl Into<String>) {
        *self.run_id.write() = Some(run_id.into());
    }

    pub(crate) fn service(&self) -> &Arc<dyn WorkflowService> {
        &self.service
    }

    /// Whether a suspension was raised during this attempt.
    pub fn is_suspended(&self) -> bool {
        self.state.lock().suspended
    }

    /// Copy of the current replay state.
    pub fn snapshot(&self) -> ReplayState {
        self.state.lock().clone()
    }

    /// `"{prefix}-{n}"`, n being the post-incremented call counter.
    pub fn sequential_id(&self, prefix: &str) -> String {
        self.state.lock().next_id(prefix)
    }

    /// Replace the replay state with one folded from `events`.
    pub fn rebuild_state(&self, events: &[WorkflowEvent]) {
        let rebuilt = ReplayState::from_events(events);
        debug!(
            workflow = %self.workflow_name,
            events = events.len(),
            completed = rebuilt.completed.len(),
            "Rebuilt replay state"
        );
        *self.state.lock() = rebuilt;
    }

    async fn append(&self, run_id: &str, event: NewEvent) -> Result<()> {
        self.service.create_event(run_id, event).await?;
        Ok(())
    }

    /// Run a step with an auto-generated `step-N` id.
    pub async fn step_auto<T, F, Fut>(&self, options: StepOptions, f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let id = self.sequential_id("step");
        self.execute_step(&id, options, f).await
    }

    /// Execute `f` at most once per logical step.
    ///
    /// A completed step returns its recorded output without calling `f`.
    /// Otherwise `f` runs under the retry policy of `options` and its output
    /// is recorded before it is returned. Without a run attached, `f` is
    /// simply called.
    pub async fn execute_step<T, F, Fut>(&self, id: &str, options: StepOptions, mut f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(run_id) = self.run_id() else {
            return f().await;
        };

        let first_call = self.state.lock().invoked.insert(id.to_string());
        if !first_call {
            return Err(WorkflowError::DuplicateStepId(id.to_string()));
        }

        if let Some(handler) = &options.rollback_fn {
            self.attached.lock().insert(id.to_string(), handler.clone());
        }

        let recorded = {
            let state = self.state.lock();
            state
                .is_completed(id)
                .then(|| state.history.get(id).cloned().unwrap_or(Value::Null))
        };
        if let Some(output) = recorded {
            debug!(run_id = %run_id, correlation_id = %id, "Replaying completed step");
            return Ok(serde_json::from_value(output)?);
        }

        let mut identifiers = options.rollback.clone();
        if options.rollback_fn.is_some() {
            identifiers.push(id.to_string());
        }
        for identifier in identifiers {
            let cid = rollback_correlation_id(id, &identifier);
            let registered = self.state.lock().is_emitted(&cid);
            if registered {
                continue;
            }
            self.append(
                &run_id,
                NewEvent::new(EventType::RollbackRegistered, cid.clone())
                    .with("method", identifier.clone()),
            )
            .await?;
            let mut state = self.state.lock();
            state.rollback_stack.push(identifier);
            state.emitted.insert(cid);
        }

        let mut attempt = self.state.lock().attempt(id);
        loop {
            let marker = started_marker(id, attempt);
            let started = self.state.lock().is_emitted(&marker);
            if !started {
                self.append(
                    &run_id,
                    NewEvent::new(EventType::StepStarted, id).with("attempt", attempt),
                )
                .await?;
                self.state.lock().emitted.insert(marker);
            }

            match f().await {
                Ok(output) => {
                    let value = serde_json::to_value(&output)?;
                    self.append(
                        &run_id,
                        NewEvent::new(EventType::StepCompleted, id).with("output", value.clone()),
                    )
                    .await?;
                    let mut state = self.state.lock();
                    state.completed.insert(id.to_string());
                    state.history.insert(id.to_string(), value);
                    return Ok(output);
                }
                Err(e) if e.is_suspension() => return Err(e),
                Err(e) if attempt < options.retries => {
                    attempt += 1;
                    warn!(
                        run_id = %run_id,
                        correlation_id = %id,
                        attempt,
                        error = %e,
                        "Step failed, retrying"
                    );
                    self.state.lock().attempts.insert(id.to_string(), attempt);
                    self.append(
                        &run_id,
                        NewEvent::new(EventType::StepRetrying, id)
                            .with("error", e.to_string())
                            .with("attempt", attempt),
                    )
                    .await?;
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => {
                    error!(
                        run_id = %run_id,
                        correlation_id = %id,
                        attempt,
                        error = %e,
                        "Step failed"
                    );
                    self.append(
                        &run_id,
                        NewEvent::new(EventType::StepFailed, id)
                            .with("error", e.to_string())
                            .with("attempt", attempt),
                    )
                    .await?;
                    return Err(e);
                }
            }
        }
    }

    /// Durable sleep. Suspends the run until the wake scheduler records
    /// `wait_completed` for this call.
    pub async fn sleep(&self, duration: impl Into<SleepDuration>) -> Result<()> {
        let id = self.sequential_id("sleep");
        let ms = duration.into().to_millis()?;

        let completed = self.state.lock().is_completed(&id);
        if completed {
            return Ok(());
        }

        let Some(run_id) = self.run_id() else {
            return Err(WorkflowError::NotInWorkflow("sleep"));
        };
        let reason = format!("Waiting for timer: {}", id);

        let waiting = self.state.lock().is_emitted(&id);
        if !waiting {
            let resume_at = i64::try_from(ms)
                .ok()
                .and_then(chrono::Duration::try_milliseconds)
                .and_then(|delay| Utc::now().checked_add_signed(delay))
                .ok_or_else(|| WorkflowError::InvalidDuration(format!("{}ms", ms)))?;
            self.append(
                &run_id,
                NewEvent::new(EventType::WaitCreated, id.clone())
                    .with("duration", ms)
                    .with("resumeAt", resume_at.to_rfc3339()),
            )
            .await?;
            self.state.lock().emitted.insert(id.clone());
            debug!(run_id = %run_id, correlation_id = %id, duration_ms = ms, "Wait created");
        }

        self.state.lock().suspended = true;
        Err(WorkflowError::Suspended { reason })
    }

    /// Wait for the next payload of signal `name`.
    ///
    /// Answers from history first, then from payloads already delivered
    /// for `name` but not yet consumed; suspends otherwise.
    pub async fn wait_for_signal<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let id = self.sequential_id(&format!("signal-{}", name));

        let found = {
            let mut state = self.state.lock();
            let cursor = state.signal_cursor(name);
            if let Some(data) = state.history.get(&id).cloned() {
                let head_matches = state.signal_queue(name).get(cursor) == Some(&data);
                if head_matches {
                    state.signal_cursors.insert(name.to_string(), cursor + 1);
                }
                Some(data)
            } else if let Some(data) = state.signal_queue(name).get(cursor).cloned() {
                state.signal_cursors.insert(name.to_string(), cursor + 1);
                Some(data)
            } else {
                None
            }
        };
        if let Some(data) = found {
            return Ok(serde_json::from_value(data)?);
        }

        let Some(run_id) = self.run_id() else {
            return Err(WorkflowError::NotInWorkflow("wait for a signal"));
        };

        let waiting = self.state.lock().is_emitted(&id);
        if !waiting {
            self.append(
                &run_id,
                NewEvent::new(EventType::SignalWaiting, id.clone()).with("name", name),
            )
            .await?;
            self.state.lock().emitted.insert(id.clone());
            debug!(run_id = %run_id, correlation_id = %id, signal = %name, "Waiting for signal");
        }

        self.state.lock().suspended = true;
        Err(WorkflowError::Suspended {
            reason: format!("Waiting for signal: {}", name),
        })
    }

    /// Run branches concurrently and wait for all of them to settle.
    ///
    /// A genuine failure takes precedence over a suspension, which takes
    /// precedence over success. Results keep branch order.
    pub async fn parallel<T, Fut>(&self, branches: Vec<Fut>) -> Result<Vec<T>>
    where
        Fut: Future<Output = Result<T>>,
    {
        let results = futures::future::join_all(branches).await;

        let mut outputs = Vec::with_capacity(results.len());
        let mut suspension = None;
        let mut failure = None;
        for result in results {
            match result {
                Ok(output) => outputs.push(output),
                Err(e) if e.is_suspension() => {
                    suspension.get_or_insert(e);
                }
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }
        if let Some(e) = suspension {
            self.state.lock().suspended = true;
            return Err(e);
        }
        Ok(outputs)
    }

    /// Unwind registered compensations, most recent first.
    ///
    /// Returns the accumulated handler results keyed by identifier.
    pub async fn run_rollback(&self, error: &WorkflowError) -> Map<String, Value> {
        let run_id = self.run_id();
        let mut accumulator = Map::new();

        loop {
            let next = self.state.lock().rollback_stack.pop();
            let Some(identifier) = next else {
                break;
            };

            let attached = self.attached.lock().get(&identifier).cloned();
            let Some(handler) = attached.or_else(|| self.compensations.get(&identifier)) else {
                warn!(
                    workflow = %self.workflow_name,
                    compensation = %identifier,
                    "No compensation handler registered, skipping"
                );
                continue;
            };

            let input = CompensationInput {
                run_id: run_id.clone(),
                identifier: identifier.clone(),
                error: error.to_string(),
                error_kind: error.kind(),
                accumulator: accumulator.clone(),
            };
            match handler(input).await {
                Ok(result) => {
                    accumulator.insert(identifier, result);
                }
                Err(e) if e.is_rollback_stop() => {
                    debug!(compensation = %identifier, reason = %e, "Rollback stopped");
                    break;
                }
                Err(e) => {
                    warn!(
                        workflow = %self.workflow_name,
                        compensation = %identifier,
                        error = %e,
                        "Compensation failed, continuing rollback"
                    );
                }
            }
        }

        accumulator
    }
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("workflow_name", &self.workflow_name)
            .field("run_id", &self.run_id())
            .field("compensations", &self.compensations)
            .field("retry_backoff", &self.retry_backoff)
            .finish_non_exhaustive()
    }
}
