//! Basic usage example for stepqueue.
//!
//! This example demonstrates:
//! - Sharing a fixed scope with every step
//! - Mixing closure steps with types implementing the Step trait
//! - Steps that resume the queue later, from a spawned task
//! - Awaiting the outcome with `finish`, and the callback form with `end`
//!
//! Run with `RUST_LOG=debug cargo run --example basic` to see dispatch events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stepqueue::{Next, Queue, Step};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Shared context every step receives.
#[derive(Clone, Debug)]
struct Deploy {
    service: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

/// Step that "builds" an artifact.
struct Build;

#[async_trait]
impl Step<Deploy, anyhow::Error> for Build {
    fn name(&self) -> &'static str {
        "build"
    }

    async fn execute(&self, scope: Deploy) -> Result<(), anyhow::Error> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        scope.log.lock().await.push(format!("built {}", scope.service));
        Ok(())
    }
}

/// Step that rejects a service name it does not know.
struct Verify;

#[async_trait]
impl Step<Deploy, anyhow::Error> for Verify {
    fn name(&self) -> &'static str {
        "verify"
    }

    async fn execute(&self, scope: Deploy) -> Result<(), anyhow::Error> {
        if scope.service.is_empty() {
            anyhow::bail!("no service name given");
        }
        scope.log.lock().await.push("verified".to_string());
        Ok(())
    }
}

fn queue_for(service: &'static str) -> Queue<Deploy, anyhow::Error> {
    let scope = Deploy {
        service,
        log: Arc::new(Mutex::new(Vec::new())),
    };

    Queue::with_scope(scope)
        .named("deploy")
        .step(Verify)
        .step(Build)
        .add(|scope: Deploy, next: Next<Deploy, anyhow::Error>| {
            // Plain closures resume the queue whenever they are ready.
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                scope.log.lock().await.push("released".to_string());
                next.done();
            });
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    println!("=== Stepqueue Basic Example ===\n");

    println!("--- Example 1: Successful run ---");
    let scope = queue_for("api").finish().await?;
    for line in scope.log.lock().await.iter() {
        println!("  {}", line);
    }

    println!("\n--- Example 2: Failing step skips the rest ---");
    match queue_for("").finish().await {
        Ok(_) => println!("unexpected success"),
        Err(e) => println!("  stopped: {}", e),
    }

    println!("\n--- Example 3: Callback form ---");
    let (tx, rx) = tokio::sync::oneshot::channel();
    Queue::<_, String>::with_scope("ctx")
        .add(|scope, next| {
            println!("  step sees scope {:?}", scope);
            next.done();
        })
        .end(move |result| {
            let _ = tx.send(result);
        });
    println!("  completion: {:?}", rx.await?);

    println!("\n=== Example completed ===");
    Ok(())
}
