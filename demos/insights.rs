//! Prints workflow insights for a project.
//!
//! This example shows how to:
//! - Create a client from a token
//! - Bound calls with a context deadline
//! - Derive a variant of the client without touching the original
//! - Fall back to the raw response for status inspection
//!
//! Run with: `CIRCLECI_TOKEN=... cargo run --example insights -- gh/org/repo [branch]`

use circleci_v2::{Client, Context, Error, RawResponse};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("circleci_v2=debug,insights=info")
        .init();

    let token = std::env::var("CIRCLECI_TOKEN")
        .map_err(|_| Error::ConfigurationError("CIRCLECI_TOKEN is not set".to_string()))?;
    let mut args = std::env::args().skip(1);
    let project = args
        .next()
        .ok_or_else(|| Error::ConfigurationError("usage: insights <project-slug> [branch]".to_string()))?;
    let branch = args.next();

    let client = Client::new(token);
    let ctx = Context::with_timeout(Duration::from_secs(30));

    println!("=== Workflows ===");
    let summaries = client
        .workflow_summaries(&ctx, &project, branch.as_deref())
        .await?;
    for summary in &summaries.items {
        println!(
            "{:<20} runs={:<5} success={:>5.1}% p95={}s",
            summary.name,
            summary.metrics.total_runs,
            summary.metrics.success_rate * 100.0,
            summary.metrics.duration_metrics.p95
        );
    }
    println!("Request latency: {:?}", summaries.latency);
    println!();

    println!("=== Recent runs ===");
    for summary in summaries.items.iter().take(3) {
        let runs = client
            .workflow_runs(&ctx, &project, &summary.name, branch.as_deref())
            .await?;
        for run in runs.items.iter().take(5) {
            println!("{} {:<8} {:>5}s {}", summary.name, run.status, run.duration, run.created_at);
        }
    }
    println!();

    println!("=== Lenient variant ===");
    // Treat 404 as an empty result instead of an error for this call only.
    let lenient = client.with_error_classifier(Some(Arc::new(|raw: &RawResponse| {
        raw.status.as_u16() >= 400 && raw.status.as_u16() != 404
    })));
    match lenient
        .workflow_runs(&ctx, &project, "does-not-exist", branch.as_deref())
        .await
    {
        Ok(runs) => println!("status {} with {} runs", runs.status, runs.items.len()),
        Err(e) => println!("status {:?}: {}", e.status(), e),
    }

    Ok(())
}
