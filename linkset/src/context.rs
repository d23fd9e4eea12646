//! Per-request context passed through every provider call

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context of one field-level request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Correlates every store call and log line of a request
    pub transaction_id: String,
    /// Authenticated caller, if known
    pub caller: Option<String>,
    /// Set for requests issued by the engine itself; these are never
    /// reported to the activity logger
    pub internal: bool,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// A new external request context with a fresh transaction id
    pub fn new() -> Self {
        Self {
            transaction_id: Uuid::new_v4().to_string(),
            caller: None,
            internal: false,
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// A copy of this context marked internal, keeping the transaction id
    pub fn as_internal(&self) -> Self {
        Self {
            internal: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_copy_keeps_transaction() {
        let context = RequestContext::new().with_caller("admin");
        let internal = context.as_internal();
        assert!(!context.internal);
        assert!(internal.internal);
        assert_eq!(internal.transaction_id, context.transaction_id);
        assert_eq!(internal.caller.as_deref(), Some("admin"));
        assert_ne!(RequestContext::new().transaction_id, context.transaction_id);
    }
}
