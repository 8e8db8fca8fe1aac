//! Sleep duration parsing

use crate::error::{Result, WorkflowError};
use std::time::Duration;

/// Duration accepted by [`WorkflowContext::sleep`](super::context::WorkflowContext::sleep).
///
/// Numbers are milliseconds. Strings take an optional unit suffix:
/// `ms`, `s` or `m`; unsuffixed strings are milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub enum SleepDuration {
    Millis(u64),
    Text(String),
}

impl SleepDuration {
    /// Resolve to whole milliseconds.
    pub fn to_millis(&self) -> Result<u64> {
        match self {
            SleepDuration::Millis(ms) if *ms > MAX_MILLIS => {
                Err(WorkflowError::InvalidDuration(format!("{}ms", ms)))
            }
            SleepDuration::Millis(ms) => Ok(*ms),
            SleepDuration::Text(text) => parse_duration(text),
        }
    }
}

impl From<u64> for SleepDuration {
    fn from(ms: u64) -> Self {
        SleepDuration::Millis(ms)
    }
}

impl From<u32> for SleepDuration {
    fn from(ms: u32) -> Self {
        SleepDuration::Millis(ms as u64)
    }
}

impl From<i32> for SleepDuration {
    fn from(ms: i32) -> Self {
        SleepDuration::Text(ms.to_string())
    }
}

impl From<Duration> for SleepDuration {
    fn from(duration: Duration) -> Self {
        SleepDuration::Millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

impl From<&str> for SleepDuration {
    fn from(text: &str) -> Self {
        SleepDuration::Text(text.to_string())
    }
}

impl From<String> for SleepDuration {
    fn from(text: String) -> Self {
        SleepDuration::Text(text)
    }
}

/// Parse `"500ms"`, `"2s"`, `"1.5m"` or `"250"` into milliseconds.
pub fn parse_duration(input: &str) -> Result<u64> {
    let text = input.trim();
    let (number, factor) = if let Some(n) = text.strip_suffix("ms") {
        (n, 1.0)
    } else if let Some(n) = text.strip_suffix('s') {
        (n, 1_000.0)
    } else if let Some(n) = text.strip_suffix('m') {
        (n, 60_000.0)
    } else {
        (text, 1.0)
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| WorkflowError::InvalidDuration(input.to_string()))?;
    let ms = (value * factor).round();
    if !ms.is_finite() || ms < 0.0 || ms > MAX_MILLIS as f64 {
        return Err(WorkflowError::InvalidDuration(input.to_string()));
    }
    Ok(ms as u64)
}

/// Longest sleep a wake time can be computed for.
pub const MAX_MILLIS: u64 = i64::MAX as u64;
