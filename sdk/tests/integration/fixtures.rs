//! Workflow fixtures shared by the integration tests.

use parking_lot::Mutex;
use rocketflow_sdk::prelude::*;
use rocketflow_sdk::RegisteredWorkflow;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub item: String,
    pub quantity: u32,
}

/// Reserve stock, wait a second, then wait for an approval signal.
/// A rejection fails the run and releases the reservation.
#[derive(Clone, Default)]
pub struct OrderWorkflow {
    pub reservations: Arc<AtomicU32>,
    pub released: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl WorkflowDefinition for OrderWorkflow {
    fn name(&self) -> &str {
        "order"
    }

    fn options(&self) -> WorkflowOptions {
        WorkflowOptions::default().with_execution_timeout(10_000)
    }

    fn compensations(&self, registry: &mut CompensationRegistry) {
        let released = self.released.clone();
        registry.register("release-stock", move |input: CompensationInput| {
            let released = released.clone();
            async move {
                released.lock().push(input.error.clone());
                Ok(json!("released"))
            }
        });
    }

    async fn run(&self, ctx: &WorkflowContext, input: Vec<Value>) -> Result<Value> {
        let request: OrderRequest = input_arg(&input, 0)?;

        let reservation: String = ctx
            .execute_step(
                "reserve",
                StepOptions::new().rollback("release-stock"),
                || {
                    let reservations = self.reservations.clone();
                    let item = request.item.clone();
                    async move {
                        reservations.fetch_add(1, Ordering::SeqCst);
                        Ok(format!("res-{}", item))
                    }
                },
            )
            .await?;

        ctx.sleep("1s").await?;

        let approved: bool = ctx.wait_for_signal("approve").await?;
        if !approved {
            return Err(WorkflowError::step("order rejected"));
        }

        Ok(json!({
            "reservation": reservation,
            "quantity": request.quantity,
        }))
    }
}

/// Closure workflow whose steps go through the ambient context.
pub fn greeting_workflow() -> RegisteredWorkflow {
    workflow("greeting")
        .description("Greets through ambient steps")
        .run(|_ctx, input| async move {
            let name: String = input_arg(&input, 0)?;
            let upper: String = step(None, StepOptions::new(), || {
                let name = name.clone();
                async move { Ok(name.to_uppercase()) }
            })
            .await?;
            let greeting: String = step(Some("greet"), StepOptions::new(), || {
                let upper = upper.clone();
                async move { Ok(format!("Hello, {}!", upper)) }
            })
            .await?;
            Ok(greeting)
        })
}

pub fn echo_workflow() -> RegisteredWorkflow {
    workflow("echo").run(|_ctx, input| async move { Ok(input) })
}

type Branch<'a> = Pin<Box<dyn Future<Output = Result<i32>> + Send + 'a>>;

/// One branch completes right away, the other sleeps first.
pub fn fan_out_workflow() -> RegisteredWorkflow {
    workflow("fan-out").run(|ctx, _input| async move {
        let fast: Branch<'_> = Box::pin(ctx.execute_step("fast", StepOptions::new(), || async {
            Ok(1)
        }));
        let slow: Branch<'_> = Box::pin(async {
            ctx.sleep("10s").await?;
            ctx.execute_step("slow", StepOptions::new(), || async { Ok(2) })
                .await
        });
        let results = ctx.parallel(vec![fast, slow]).await?;
        Ok(results.iter().sum::<i32>())
    })
}

/// A step that takes a while in real time.
pub fn slow_step_workflow() -> RegisteredWorkflow {
    workflow("slow-step").run(|ctx, _input| async move {
        ctx.execute_step("work", StepOptions::new(), || async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok("done".to_string())
        })
        .await
    })
}
