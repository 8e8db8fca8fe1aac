//! In-memory replay state of one execution attempt
//!
//! Rebuilt from the run's event log on every job delivery and discarded
//! when the attempt ends.

use rocketflow_core::{EventType, WorkflowEvent};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Emitted-set key for the `step_started` event of one attempt.
pub(crate) fn started_marker(correlation_id: &str, attempt: u32) -> String {
    format!("{}#started-{}", correlation_id, attempt)
}

/// Correlation id of a rollback registration.
pub(crate) fn rollback_correlation_id(step_id: &str, identifier: &str) -> String {
    format!("{}-rb-{}", step_id, identifier)
}

/// Replay state folded from history plus what the current attempt adds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayState {
    /// Step outputs and signal payloads by correlation id
    pub(crate) history: HashMap<String, Value>,
    pub(crate) completed: HashSet<String>,
    /// Correlation ids invoked during this attempt
    pub(crate) invoked: HashSet<String>,
    /// Start/wait events already durably recorded
    pub(crate) emitted: HashSet<String>,
    /// Compensation identifiers, most recent last
    pub(crate) rollback_stack: Vec<String>,
    pub(crate) attempts: HashMap<String, u32>,
    pub(crate) signal_queues: HashMap<String, Vec<Value>>,
    pub(crate) signal_cursors: HashMap<String, usize>,
    pub(crate) counter: u64,
    pub(crate) suspended: bool,
}

impl ReplayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an ordered event list into a fresh state.
    pub fn from_events(events: &[WorkflowEvent]) -> Self {
        let mut state = Self::new();
        for event in events {
            state.apply(event);
        }
        state
    }

    /// Apply one event. Events of other shapes are ignored.
    pub fn apply(&mut self, event: &WorkflowEvent) {
        let cid = event.correlation();
        match event.event_type {
            EventType::StepStarted => {
                let attempt = event
                    .payload_field("attempt")
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(0);
                self.emitted.insert(started_marker(cid, attempt));
            }
            EventType::StepCompleted => {
                self.completed.insert(cid.to_string());
                let output = event.payload_field("output").cloned().unwrap_or(Value::Null);
                self.history.insert(cid.to_string(), output);
            }
            EventType::StepRetrying => {
                if let Some(attempt) = event
                    .payload_field("attempt")
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                {
                    self.attempts.insert(cid.to_string(), attempt);
                }
            }
            EventType::StepFailed => {}
            EventType::WaitCreated | EventType::SignalWaiting => {
                self.emitted.insert(cid.to_string());
            }
            EventType::WaitCompleted => {
                self.completed.insert(cid.to_string());
            }
            EventType::SignalReceived => {
                let data = event.payload_field("data").cloned().unwrap_or(Value::Null);
                if !cid.is_empty() {
                    self.history.insert(cid.to_string(), data.clone());
                }
                match event.payload_field("name").and_then(Value::as_str) {
                    Some(name) => self.signal_queues.entry(name.to_string()).or_default().push(data),
                    None => debug!(correlation_id = %cid, "Signal event without a name"),
                }
            }
            EventType::RollbackRegistered => {
                if let Some(method) = event.payload_field("method").and_then(Value::as_str) {
                    self.rollback_stack.push(method.to_string());
                    self.emitted.insert(cid.to_string());
                }
            }
        }
    }

    /// `"{prefix}-{n}"` with n the post-incremented call counter.
    pub(crate) fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, self.counter);
        self.counter += 1;
        id
    }

    pub fn history(&self) -> &HashMap<String, Value> {
        &self.history
    }

    pub fn is_completed(&self, correlation_id: &str) -> bool {
        self.completed.contains(correlation_id)
    }

    pub fn is_emitted(&self, key: &str) -> bool {
        self.emitted.contains(key)
    }

    pub fn attempt(&self, correlation_id: &str) -> u32 {
        self.attempts.get(correlation_id).copied().unwrap_or(0)
    }

    pub fn rollback_stack(&self) -> &[String] {
        &self.rollback_stack
    }

    /// Buffered payloads of a signal name in delivery order.
    pub fn signal_queue(&self, name: &str) -> &[Value] {
        self.signal_queues.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn signal_cursor(&self, name: &str) -> usize {
        self.signal_cursors.get(name).copied().unwrap_or(0)
    }

    pub fn call_counter(&self) -> u64 {
        self.counter
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }
}
