//! Trait definitions for the store collaborator

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

use crate::query::QueryRequest;
use crate::storage::errors::StorageError;
use crate::storage::models::{QueryResults, ResourceRecord};

/// Record store used to persist edges and to read the resources they join.
///
/// Paths have the form `<container>/<id>`; containers may be nested
/// (`managed/user`, `repo/relationships`).
#[async_trait]
pub trait ResourceStore: Send + Sync + Debug {
    /// Create a record in `container`; the store assigns an id when `id` is `None`
    async fn create(
        &self,
        container: &str,
        id: Option<&str>,
        content: Value,
    ) -> std::result::Result<ResourceRecord, StorageError>;

    /// Read the record at `path`
    async fn read(&self, path: &str) -> std::result::Result<ResourceRecord, StorageError>;

    /// Replace the content of the record at `path`.
    ///
    /// Fails with [`StorageError::PreconditionFailed`] when `expected_revision`
    /// is given and does not match the stored revision.
    async fn update(
        &self,
        path: &str,
        expected_revision: Option<&str>,
        content: Value,
    ) -> std::result::Result<ResourceRecord, StorageError>;

    /// Delete the record at `path`, returning its last state
    async fn delete(
        &self,
        path: &str,
        expected_revision: Option<&str>,
    ) -> std::result::Result<ResourceRecord, StorageError>;

    /// Query the records of `container`
    async fn query(
        &self,
        container: &str,
        request: &QueryRequest,
    ) -> std::result::Result<QueryResults, StorageError>;
}
