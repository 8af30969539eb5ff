//! Top-level ingest operations
//!
//! - [`coordinator`] - composes fetch, report, normalize and persistence into operations
//! - [`endpoints`] - known listing endpoints and their shaping
//! - [`outcome`] - structured outcomes and exit codes
//!
//! [`guard`] is the outermost boundary: nothing an operation does, including panicking,
//! escapes it as anything other than an [`IngestOutcome`].

pub mod coordinator;
pub mod endpoints;
pub mod outcome;

pub use coordinator::{parse_identifiers, IngestCoordinator, ListingRequest, ReportIngest};
pub use endpoints::Endpoint;
pub use outcome::{FailureKind, IngestOutcome};

use crate::domain::Result;
use std::future::Future;
use std::time::Instant;

/// Run `task` to completion and convert every result into an [`IngestOutcome`]
///
/// The task runs on its own Tokio task so a panic is caught and reported as a fatal
/// internal error.
pub async fn guard<F>(operation: &str, task: F) -> IngestOutcome
where
    F: Future<Output = Result<IngestOutcome>> + Send + 'static,
{
    let started = Instant::now();

    match tokio::spawn(task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::error!(operation = operation, error = %e, "Ingest failed");
            IngestOutcome::from_error(operation, &e).with_duration(started.elapsed())
        }
        Err(join_error) => {
            tracing::error!(operation = operation, error = %join_error, "Ingest task did not complete");
            let mut outcome = IngestOutcome::new(operation);
            let message = if join_error.is_panic() {
                "Internal error: operation panicked"
            } else {
                "Internal error: operation was aborted"
            };
            outcome.fail(FailureKind::Fatal, message);
            outcome.with_duration(started.elapsed())
        }
    }
}
