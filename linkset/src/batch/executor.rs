//! Batch executor running edge operations concurrently

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{BatchError, BatchOperation, BatchReport};
use crate::storage::StorageError;
use crate::storage::models::ResourceRecord;
use crate::storage::traits::ResourceStore;

/// Configuration for batch execution
#[derive(Debug, Clone)]
pub struct BatchExecutorConfig {
    /// Maximum number of operations in flight at once
    pub max_concurrency: usize,
    /// Maximum number of operations allowed in a single batch
    pub max_batch_size: Option<usize>,
}

impl Default for BatchExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            max_batch_size: None,
        }
    }
}

/// Executor for batches of edge operations against one container
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    store: Arc<dyn ResourceStore>,
    container: String,
    config: BatchExecutorConfig,
}

impl BatchExecutor {
    /// Create a new batch executor writing into `container`
    pub fn new(
        store: Arc<dyn ResourceStore>,
        container: impl Into<String>,
        config: BatchExecutorConfig,
    ) -> Self {
        Self {
            store,
            container: container.into(),
            config,
        }
    }

    pub fn config(&self) -> &BatchExecutorConfig {
        &self.config
    }

    /// Run every operation, at most `max_concurrency` at a time, and wait
    /// for all of them.
    ///
    /// A failing operation never cancels its siblings and nothing is rolled
    /// back; the report lists what completed and what failed.
    pub async fn run(&self, operations: Vec<BatchOperation>) -> Result<BatchReport, BatchError> {
        if let Some(max_size) = self.config.max_batch_size {
            if operations.len() > max_size {
                return Err(BatchError::TooLarge {
                    submitted: operations.len(),
                    max_size,
                });
            }
        }

        let mut report = BatchReport::default();
        if operations.is_empty() {
            return Ok(report);
        }

        debug!(
            "Executing batch of {} operations (max concurrency {})",
            operations.len(),
            self.config.max_concurrency
        );

        let mut outcomes = stream::iter(operations.into_iter().enumerate().map(
            |(index, operation)| async move {
                let kind = operation.kind();
                (index, kind, self.execute_operation(operation).await)
            },
        ))
        .buffer_unordered(self.config.max_concurrency.max(1));

        while let Some((index, kind, outcome)) = outcomes.next().await {
            match outcome {
                Ok(record) => report.completed.push((index, record)),
                Err(e) => {
                    warn!("Batch operation {} ({}) failed: {}", index, kind, e);
                    report.failures.push((index, kind, e));
                }
            }
        }

        if !report.is_success() {
            warn!(
                "Batch finished with {} failures; {} completed operations are kept",
                report.failures.len(),
                report.completed.len()
            );
        }

        Ok(report)
    }

    /// Run every operation and return the records in completion order, or
    /// the first failure once all operations have finished
    pub async fn execute(
        &self,
        operations: Vec<BatchOperation>,
    ) -> Result<Vec<ResourceRecord>, BatchError> {
        self.run(operations).await?.into_result()
    }

    async fn execute_operation(
        &self,
        operation: BatchOperation,
    ) -> Result<ResourceRecord, StorageError> {
        match operation {
            BatchOperation::CreateEdge { edge } => {
                self.store
                    .create(&self.container, None, edge.to_content())
                    .await
            }
            BatchOperation::UpdateEdge {
                id,
                expected_revision,
                edge,
            } => {
                let path = format!("{}/{}", self.container, id);
                self.store
                    .update(&path, expected_revision.as_deref(), edge.to_content())
                    .await
            }
            BatchOperation::DeleteEdge {
                id,
                expected_revision,
            } => {
                let path = format!("{}/{}", self.container, id);
                self.store.delete(&path, expected_revision.as_deref()).await
            }
        }
    }
}
