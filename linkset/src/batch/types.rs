//! Batch operation types for concurrent edge writes
//!
//! A batch is a set of independent single-record store operations issued
//! together. There is no transaction around them: every operation runs to
//! completion and those that succeeded stay persisted even when a sibling
//! fails.

use serde::{Deserialize, Serialize};

use crate::storage::StorageError;
use crate::storage::models::{EdgeRecord, ResourceRecord};

/// A single operation in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data")]
pub enum BatchOperation {
    /// Create a new edge with a store-assigned id
    CreateEdge {
        edge: EdgeRecord,
    },

    /// Replace an existing edge
    UpdateEdge {
        /// Edge id within the relationship container
        id: String,
        /// Revision the edge must still have, if any
        expected_revision: Option<String>,
        edge: EdgeRecord,
    },

    /// Delete an existing edge
    DeleteEdge {
        id: String,
        expected_revision: Option<String>,
    },
}

impl BatchOperation {
    /// Short name used in log messages
    pub fn kind(&self) -> &'static str {
        match self {
            BatchOperation::CreateEdge { .. } => "create",
            BatchOperation::UpdateEdge { .. } => "update",
            BatchOperation::DeleteEdge { .. } => "delete",
        }
    }
}

/// Error from batch execution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchError {
    /// Batch exceeds the configured size limit
    #[error("Batch too large: {submitted} operations submitted, maximum is {max_size}")]
    TooLarge { submitted: usize, max_size: usize },

    /// An operation failed; siblings were still run to completion
    #[error("Batch operation {index} ({kind}) failed: {source}")]
    OperationFailed {
        index: usize,
        kind: &'static str,
        source: StorageError,
    },
}

/// Outcome of running every operation of a batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Successful results as `(operation index, record)`, in completion order
    pub completed: Vec<(usize, ResourceRecord)>,
    /// Failures as `(operation index, kind, error)`, in completion order
    pub failures: Vec<(usize, &'static str, StorageError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// The records in completion order, or the first failure
    pub fn into_result(mut self) -> Result<Vec<ResourceRecord>, BatchError> {
        if self.failures.is_empty() {
            return Ok(self.completed.into_iter().map(|(_, record)| record).collect());
        }
        let (index, kind, source) = self.failures.swap_remove(0);
        Err(BatchError::OperationFailed {
            index,
            kind,
            source,
        })
    }
}

// Failed operations surface with the error class of the store error
impl From<BatchError> for crate::LinksetError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::TooLarge {
                submitted,
                max_size,
            } => crate::LinksetError::BadRequest(format!(
                "Too many relationships in one request: {} submitted, maximum is {}",
                submitted, max_size
            )),
            BatchError::OperationFailed { source, .. } => source.into(),
        }
    }
}
