//! Order-service example: paginated listing through a throttled dispatcher.
//!
//! The remote service is simulated by a scripted invoker that throttles the
//! first two requests. Bucket refills and backoff sleeps run on a paused
//! tokio clock, so the minutes of quota waiting finish instantly.
//!
//! Run with: `cargo run --example orders --features test-helpers`

use call_throttle::infrastructure::mocks::{RequestParams, ScriptedInvoker};
use call_throttle::infrastructure::presets::{self, LIST_ORDERS, LIST_ORDERS_BY_NEXT_TOKEN};
use call_throttle::{BackoffConfig, PolicyRegistry, RemoteError, SystemClock, ThrottledDispatcher};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread", start_paused = true)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    println!("=== Order Listing Example ===\n");

    let registry =
        PolicyRegistry::from_entries(presets::order_policies(), Arc::new(SystemClock::new()))?;
    let backoff = BackoffConfig::new(Duration::from_secs(1), Duration::from_secs(8), 3);
    let dispatcher = ThrottledDispatcher::new(Arc::new(registry), backoff);

    let invoker: ScriptedInvoker<String, String> =
        ScriptedInvoker::new(Ok("<ListOrdersResult/>".to_string()))
            .then(Err(RemoteError::Throttled))
            .then(Err(RemoteError::Throttled));

    let start = tokio::time::Instant::now();
    let mut params = RequestParams::from([(
        "CreatedAfter".to_string(),
        "2024-01-01T00:00:00Z".to_string(),
    )]);

    println!("Fetching 10 pages (burst of 6 shared by both actions):");
    for page in 1..=10 {
        let action = if page == 1 { LIST_ORDERS } else { LIST_ORDERS_BY_NEXT_TOKEN };
        let body = dispatcher.call(&invoker, action, &params, None).await?;
        println!(
            "  page {:>2} via {:<22} at +{:>4}s: {}",
            page,
            action,
            start.elapsed().as_secs(),
            body
        );
        params = RequestParams::from([("NextToken".to_string(), format!("token-{}", page))]);
    }

    println!("\nBuckets:");
    for bucket in dispatcher.registry().snapshot() {
        println!(
            "  {:<16} {:>5.2}/{} (restores {}/s)",
            bucket.action, bucket.capacity, bucket.burst_capacity, bucket.restore_rate_per_second
        );
    }

    let metrics = dispatcher.metrics().snapshot();
    println!("\nMetrics:");
    println!("  calls admitted:    {}", metrics.calls_admitted);
    println!("  admission waits:   {}", metrics.admission_waits);
    println!("  remote rejections: {}", metrics.remote_rejections);
    println!("  rejection rate:    {:.1}%", metrics.rejection_rate() * 100.0);

    println!("\n=== Example Complete ===");
    Ok(())
}
