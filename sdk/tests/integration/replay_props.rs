//! Property-based tests for replay
//!
//! A random script of steps, sleeps and signal waits is driven to completion
//! one attempt at a time, the way redelivered jobs would drive it. Whatever
//! the interleaving, the result must match an uninterrupted run and every
//! step body must run exactly once.

use proptest::prelude::*;
use rocketflow_sdk::testing::InMemoryBackend;
use rocketflow_sdk::{EventType, Result, StepOptions, WorkflowContext};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Op {
    Step(i64),
    Sleep(u64),
    Signal(i64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (-1000i64..1000).prop_map(Op::Step),
        1 => (1u64..120_000).prop_map(Op::Sleep),
        1 => (-1000i64..1000).prop_map(Op::Signal),
    ]
}

/// What an uninterrupted run returns.
fn expected_output(ops: &[Op]) -> Vec<i64> {
    ops.iter()
        .filter_map(|op| match op {
            Op::Step(v) => Some(v * 2),
            Op::Signal(v) => Some(*v),
            Op::Sleep(_) => None,
        })
        .collect()
}

async fn run_script(ctx: &WorkflowContext, ops: &[Op], calls: &AtomicUsize) -> Result<Vec<i64>> {
    let mut output = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        match op {
            Op::Step(v) => {
                let v = *v;
                let doubled: i64 = ctx
                    .step_auto(StepOptions::new(), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(v * 2)
                    })
                    .await?;
                output.push(doubled);
            }
            // Alternate numeric and textual durations
            Op::Sleep(ms) if i % 2 == 0 => ctx.sleep(*ms).await?,
            Op::Sleep(ms) => ctx.sleep(format!("{}ms", ms)).await?,
            Op::Signal(_) => {
                let value: i64 = ctx.wait_for_signal("value").await?;
                output.push(value);
            }
        }
    }
    Ok(output)
}

struct Driven {
    output: Vec<i64>,
    attempts: usize,
    calls: usize,
}

/// Re-execute the script from the top until it completes, playing the wake
/// scheduler and the signal sender between attempts.
async fn drive(backend: &InMemoryBackend, run_id: &str, ops: &[Op]) -> Driven {
    let calls = AtomicUsize::new(0);
    let signals: Vec<i64> = ops
        .iter()
        .filter_map(|op| match op {
            Op::Signal(v) => Some(*v),
            _ => None,
        })
        .collect();
    let mut sent = 0;
    let mut attempts = 0;

    loop {
        attempts += 1;
        let ctx = WorkflowContext::new("script", backend.service()).with_run_id(run_id);
        ctx.rebuild_state(&backend.events(run_id));

        match run_script(&ctx, ops, &calls).await {
            Ok(output) => {
                return Driven {
                    output,
                    attempts,
                    calls: calls.load(Ordering::SeqCst),
                }
            }
            Err(e) => assert!(e.is_suspension(), "unexpected failure: {}", e),
        }

        let last = backend.events(run_id).pop().expect("suspension leaves an event");
        match last.event_type {
            EventType::WaitCreated => {
                backend
                    .append(run_id, EventType::WaitCompleted, last.correlation(), json!({}))
                    .await;
            }
            EventType::SignalWaiting => {
                let cid = format!("external-{}", sent);
                backend
                    .append(
                        run_id,
                        EventType::SignalReceived,
                        &cid,
                        json!({"name": "value", "data": signals[sent]}),
                    )
                    .await;
                sent += 1;
            }
            other => panic!("suspended after {:?}", other),
        }
    }
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: attempt-by-attempt replay matches an uninterrupted run
    #[test]
    fn replay_matches_uninterrupted_run(ops in prop::collection::vec(arb_op(), 0..12)) {
        let driven = block_on(async {
            let backend = InMemoryBackend::new();
            let run = backend.seed_run("script", vec![]).await;
            drive(&backend, &run.run_id, &ops).await
        });

        let waits = ops.iter().filter(|op| !matches!(op, Op::Step(_))).count();
        let steps = ops.len() - waits;

        prop_assert_eq!(driven.output, expected_output(&ops));
        prop_assert_eq!(driven.calls, steps, "each step body runs once");
        prop_assert_eq!(driven.attempts, waits + 1, "one suspension per wait");
    }

    /// Property: re-executing a finished history appends nothing and runs no step
    #[test]
    fn replaying_finished_history_is_read_only(ops in prop::collection::vec(arb_op(), 1..10)) {
        let (first, second, before, after, calls) = block_on(async {
            let backend = InMemoryBackend::new();
            let run = backend.seed_run("script", vec![]).await;
            let first = drive(&backend, &run.run_id, &ops).await;
            let before = backend.events(&run.run_id).len();

            let calls = AtomicUsize::new(0);
            let ctx = WorkflowContext::new("script", backend.service()).with_run_id(&run.run_id);
            ctx.rebuild_state(&backend.events(&run.run_id));
            let second = run_script(&ctx, &ops, &calls).await.unwrap();

            (
                first.output,
                second,
                before,
                backend.events(&run.run_id).len(),
                calls.load(Ordering::SeqCst),
            )
        });

        prop_assert_eq!(first, second);
        prop_assert_eq!(before, after);
        prop_assert_eq!(calls, 0);
    }
}
