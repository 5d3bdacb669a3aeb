//! # circleci-v2 - a typed client for the CircleCI v2 API
//!
//! Builds authenticated requests against the CircleCI v2 REST API, decodes
//! responses into typed structures, and lets callers swap out the transport
//! and each stage of response handling.
//!
//! ## Quick Start
//!
//! ```no_run
//! use circleci_v2::{Client, Context};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), circleci_v2::Error> {
//!     let client = Client::new("my-token");
//!     let ctx = Context::with_timeout(Duration::from_secs(30));
//!
//!     let runs = client
//!         .workflow_runs(&ctx, "gh/org/repo", "build", Some("main"))
//!         .await?;
//!     for run in &runs.items {
//!         println!("{} {} in {}s", run.id, run.status, run.duration);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Typed endpoints** - Insights for workflows and jobs, each with a `*_raw` variant returning the unread response
//! - **Pluggable response handling** - Replace the error classifier, success parser or error parser independently
//! - **Copy-on-write configuration** - `with_*` derives variants from a shared client without touching it
//! - **Caller-driven deadlines** - Every call takes a [`Context`]; the client sets no timeout of its own
//! - **Automatic logging** - Structured logging with `tracing`, with the API token redacted
//!
//! ## Custom response handling
//!
//! ```no_run
//! use circleci_v2::{Client, Context, Error, RawResponse};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Error> {
//! let template = Client::new("my-token");
//!
//! // Only treat server errors as failures for this call site.
//! let lenient = template.with_error_classifier(Some(Arc::new(|raw: &RawResponse| {
//!     raw.status.is_server_error()
//! })));
//!
//! let summaries = lenient
//!     .workflow_summaries(&Context::background(), "gh/org/repo", None)
//!     .await?;
//! println!("{} workflows", summaries.items.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use circleci_v2::{Client, Context, Error};
//!
//! # async fn example(client: Client) {
//! match client.workflow_summaries(&Context::background(), "gh/org/repo", None).await {
//!     Ok(response) => println!("Success: {} workflows", response.items.len()),
//!     // Failures after a response arrived are wrapped in `Error::Response`;
//!     // `inner()` gives the error the response stages returned.
//!     Err(e) => match e.inner() {
//!         Error::Api { status, source, .. } => eprintln!("API error {}: {}", status, source),
//!         Error::DeserializationFailed { raw_response, serde_error, status } => {
//!             eprintln!("Failed to deserialize (status {}): {}", status, serde_error);
//!             eprintln!("  Raw response: {}", raw_response);
//!         }
//!         other => eprintln!("Other error (status {:?}): {}", e.status(), other),
//!     },
//! }
//! # }
//! ```

mod client;
mod configure;
mod context;
mod error;
pub mod insights;
pub mod metadata;
pub mod pipeline;
mod response;
pub mod transport;

pub use client::{Client, ClientBuilder, DEFAULT_ENDPOINT, TOKEN_QUERY_KEY};
pub use context::Context;
pub use error::{ApiError, Error, Result};
pub use insights::{
    DurationMetrics, JobMetrics, JobRun, JobRuns, JobSummaries, JobSummary, WorkflowMetrics,
    WorkflowRun, WorkflowRuns, WorkflowSummaries, WorkflowSummary,
};
pub use pipeline::{
    ErrorClassifier, ErrorParser, JsonErrorParser, JsonSuccessParser, JsonTarget, RawResponse,
    StatusClassifier, SuccessParser,
};
pub use response::Response;
pub use transport::{default_transport, Transport};
