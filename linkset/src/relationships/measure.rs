//! Timing spans around provider operations

use std::future::Future;
use std::time::Instant;
use tracing::{Instrument, debug, warn};

use crate::Result;

/// Run `operation` inside `span` and log its duration and outcome
pub(crate) async fn measured<F, T>(
    span: tracing::Span,
    name: &'static str,
    resource_id: &str,
    operation: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    async move {
        let start = Instant::now();
        let result = operation.await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => debug!(
                duration_ms = %duration.as_millis(),
                "{} for {} completed", name, resource_id
            ),
            Err(e) => warn!(
                duration_ms = %duration.as_millis(),
                error = %e,
                "{} for {} failed", name, resource_id
            ),
        }
        result
    }
    .instrument(span)
    .await
}
