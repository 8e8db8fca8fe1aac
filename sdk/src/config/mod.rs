//! Configuration presets
//!
//! Worker settings with sensible defaults and presets for common use cases.
//! Connection settings live in [`ClientConfig`].

use std::time::Duration;

pub use rocketflow_core::ClientConfig;

/// Configuration for a workflow worker
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Maximum number of jobs processed concurrently
    pub max_concurrent_jobs: usize,
    /// Interval between lease-extending touches of a job in progress
    pub heartbeat_interval: Duration,
    /// Execution timeout for runs that do not carry one
    pub default_execution_timeout: Duration,
    /// Unit of the linear step retry backoff (attempt x unit)
    pub retry_backoff: Duration,
    /// Resubmit pending and running runs when the worker starts
    pub resume_on_start: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl WorkerConfig {
    /// Default configuration suitable for most use cases
    pub const DEFAULT: Self = Self {
        max_concurrent_jobs: 10,
        heartbeat_interval: Duration::from_secs(15),
        default_execution_timeout: Duration::from_secs(30),
        retry_backoff: Duration::from_secs(1),
        resume_on_start: true,
    };

    /// High-throughput configuration for heavy workloads
    pub const HIGH_THROUGHPUT: Self = Self {
        max_concurrent_jobs: 100,
        heartbeat_interval: Duration::from_secs(10),
        default_execution_timeout: Duration::from_secs(30),
        retry_backoff: Duration::from_secs(1),
        resume_on_start: true,
    };

    /// Low-resource configuration for constrained environments
    pub const LOW_RESOURCE: Self = Self {
        max_concurrent_jobs: 2,
        heartbeat_interval: Duration::from_secs(15),
        default_execution_timeout: Duration::from_secs(60),
        retry_backoff: Duration::from_secs(1),
        resume_on_start: true,
    };

    /// Create a new configuration with validation
    pub fn new(
        max_concurrent_jobs: usize,
        heartbeat_interval: Duration,
        default_execution_timeout: Duration,
        retry_backoff: Duration,
    ) -> Result<Self, ConfigError> {
        if max_concurrent_jobs == 0 {
            return Err(ConfigError::InvalidValue(
                "max_concurrent_jobs must be positive".to_string(),
            ));
        }
        if heartbeat_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "heartbeat_interval must be positive".to_string(),
            ));
        }
        if default_execution_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "default_execution_timeout must be positive".to_string(),
            ));
        }

        Ok(Self {
            max_concurrent_jobs,
            heartbeat_interval,
            default_execution_timeout,
            retry_backoff,
            resume_on_start: true,
        })
    }

    pub fn with_resume_on_start(mut self, resume: bool) -> Self {
        self.resume_on_start = resume;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_default_execution_timeout(mut self, timeout: Duration) -> Self {
        self.default_execution_timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
