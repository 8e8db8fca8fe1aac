//! Event types for workflow history
//!
//! The event log is append-only and totally ordered per run. It is the only
//! input to replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of fact recorded in a run's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    StepStarted,
    StepCompleted,
    StepFailed,
    StepRetrying,
    WaitCreated,
    WaitCompleted,
    SignalWaiting,
    SignalReceived,
    RollbackRegistered,
}

impl EventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::StepStarted => "step_started",
            EventType::StepCompleted => "step_completed",
            EventType::StepFailed => "step_failed",
            EventType::StepRetrying => "step_retrying",
            EventType::WaitCreated => "wait_created",
            EventType::WaitCompleted => "wait_completed",
            EventType::SignalWaiting => "signal_waiting",
            EventType::SignalReceived => "signal_received",
            EventType::RollbackRegistered => "rollback_registered",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "step_started" => Some(EventType::StepStarted),
            "step_completed" => Some(EventType::StepCompleted),
            "step_failed" => Some(EventType::StepFailed),
            "step_retrying" => Some(EventType::StepRetrying),
            "wait_created" => Some(EventType::WaitCreated),
            "wait_completed" => Some(EventType::WaitCompleted),
            "signal_waiting" => Some(EventType::SignalWaiting),
            "signal_received" => Some(EventType::SignalReceived),
            "rollback_registered" => Some(EventType::RollbackRegistered),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as stored by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEvent {
    pub event_id: String,
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub event_type: EventType,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl WorkflowEvent {
    /// Read a payload field.
    pub fn payload_field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Correlation id, or an empty string when the event carries none.
    pub fn correlation(&self) -> &str {
        self.correlation_id.as_deref().unwrap_or_default()
    }
}

/// Body of an event append request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub event_type: EventType,
    pub correlation_id: Option<String>,
    pub payload: Map<String, Value>,
}

impl NewEvent {
    pub fn new(event_type: EventType, correlation_id: impl Into<String>) -> Self {
        Self {
            event_type,
            correlation_id: Some(correlation_id.into()),
            payload: Map::new(),
        }
    }

    /// Add a payload field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }
}
