//! Activity logging of client-visible relationship operations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::Result;
use crate::context::RequestContext;

/// Outcome recorded with an activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    Success,
    Failure,
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityStatus::Success => write!(f, "SUCCESS"),
            ActivityStatus::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Receives an entry for every operation a client performs on a
/// relationship field. Internal requests are never reported.
#[async_trait]
pub trait ActivityLogger: Send + Sync {
    async fn log(
        &self,
        context: &RequestContext,
        operation: &str,
        resource_path: &str,
        status: ActivityStatus,
    ) -> Result<()>;
}

/// Emits each activity entry as a structured `tracing` event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivityLogger;

#[async_trait]
impl ActivityLogger for TracingActivityLogger {
    async fn log(
        &self,
        context: &RequestContext,
        operation: &str,
        resource_path: &str,
        status: ActivityStatus,
    ) -> Result<()> {
        info!(
            target: "linkset::activity",
            transaction_id = %context.transaction_id,
            caller = context.caller.as_deref().unwrap_or("anonymous"),
            operation,
            resource_path,
            status = %status,
            "relationship activity"
        );
        Ok(())
    }
}

/// Discards every entry
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActivityLogger;

#[async_trait]
impl ActivityLogger for NoopActivityLogger {
    async fn log(
        &self,
        _context: &RequestContext,
        _operation: &str,
        _resource_path: &str,
        _status: ActivityStatus,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builtin_loggers_accept_entries() {
        let context = RequestContext::new();
        assert!(
            TracingActivityLogger
                .log(&context, "query", "managed/user/1", ActivityStatus::Success)
                .await
                .is_ok()
        );
        assert!(
            NoopActivityLogger
                .log(&context, "query", "managed/user/1", ActivityStatus::Failure)
                .await
                .is_ok()
        );
        assert_eq!(ActivityStatus::Failure.to_string(), "FAILURE");
    }
}
