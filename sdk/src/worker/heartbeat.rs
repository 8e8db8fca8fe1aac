//! Job lease heartbeat

use rocketflow_core::JobQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Periodically touches a job to extend its delivery lease.
///
/// The touch loop runs until the guard is dropped. Touch failures are
/// logged and never escalated.
pub struct Heartbeat {
    job_id: String,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    pub fn start(queue: Arc<dyn JobQueue>, job_id: impl Into<String>, interval: Duration) -> Self {
        let job_id = job_id.into();
        let touched = job_id.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match queue.touch(&touched).await {
                    Ok(()) => debug!(job_id = %touched, "Job lease extended"),
                    Err(e) => warn!(job_id = %touched, error = %e, "Failed to touch job"),
                }
            }
        });
        Self { job_id, handle }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
