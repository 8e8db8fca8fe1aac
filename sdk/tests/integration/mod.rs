//! Integration tests for rocketflow-sdk
//!
//! These tests drive clients and workers end to end against the in-memory
//! backend, which also plays the wake scheduler. No server is needed.
//!
//! ```bash
//! RUST_LOG=rocketflow_sdk=debug cargo test --test integration -p rocketflow-sdk
//! ```

mod authoring_tests;
mod fixtures;
mod replay_props;
mod worker_flow_tests;

use rocketflow_sdk::testing::InMemoryBackend;
use rocketflow_sdk::{EventType, RunStatus};
use std::future::Future;
use std::time::Duration;

/// Default timeout for integration tests
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize tracing once for all tests
static TRACING_INITIALIZED: std::sync::Once = std::sync::Once::new();

fn init_tracing() {
    TRACING_INITIALIZED.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_test_writer()
            .init();
    });
}

/// Run a test body with a timeout, panicking if it takes too long.
pub async fn with_timeout<F, T>(timeout: Duration, test_name: &str, f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(result) => result,
        Err(_) => panic!("Test '{}' timed out after {:?}", test_name, timeout),
    }
}

/// Poll until `condition` holds. Callers bound the wait with [`with_timeout`].
pub async fn wait_for<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    while !condition() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn has_event(backend: &InMemoryBackend, run_id: &str, event_type: EventType) -> bool {
    backend
        .events(run_id)
        .iter()
        .any(|e| e.event_type == event_type)
}

pub fn count_events(backend: &InMemoryBackend, run_id: &str, event_type: EventType) -> usize {
    backend
        .events(run_id)
        .iter()
        .filter(|e| e.event_type == event_type)
        .count()
}

pub fn run_status(backend: &InMemoryBackend, run_id: &str) -> Option<RunStatus> {
    backend.run(run_id).map(|run| run.status)
}
