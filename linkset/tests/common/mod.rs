//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use linkset::config::RelationshipConfig;
use linkset::query::QueryRequest;
use linkset::relationships::{
    ActivityLogger, CollectionRelationshipProvider, NoopActivityLogger, RelationshipReference,
    RelationshipValidator,
};
use linkset::schema::SchemaField;
use linkset::storage::{
    MemoryResourceStore, QueryResults, ResourceRecord, ResourceStore, StorageError,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const REPO: &str = "repo/relationships";

/// Users 1..=3 and roles 1..=4
pub async fn seed(store: &dyn ResourceStore) {
    for (id, name) in [("1", "alice"), ("2", "bob"), ("3", "carol")] {
        store
            .create("managed/user", Some(id), json!({"userName": name}))
            .await
            .unwrap();
    }
    for (id, name) in [("1", "admin"), ("2", "auditor"), ("3", "viewer"), ("4", "operator")] {
        store
            .create("managed/role", Some(id), json!({"name": name}))
            .await
            .unwrap();
    }
}

/// `managed/user` field `roles`, mirrored by `managed/role` field `members`
pub fn roles_field() -> SchemaField {
    SchemaField::collection("roles")
        .with_reverse_property_name("members")
        .with_resource_collection("managed/role")
}

pub fn members_field() -> SchemaField {
    SchemaField::collection("members")
        .reverse()
        .with_reverse_property_name("roles")
        .with_resource_collection("managed/user")
}

pub fn collection(
    container: &str,
    field: SchemaField,
    store: Arc<dyn ResourceStore>,
    config: &RelationshipConfig,
) -> CollectionRelationshipProvider {
    collection_with_activity(container, field, store, config, Arc::new(NoopActivityLogger))
}

pub fn collection_with_activity(
    container: &str,
    field: SchemaField,
    store: Arc<dyn ResourceStore>,
    config: &RelationshipConfig,
    activity: Arc<dyn ActivityLogger>,
) -> CollectionRelationshipProvider {
    let validator = RelationshipValidator::new(store.clone(), config.repository_path.clone());
    CollectionRelationshipProvider::new(container, field, store, validator, config, activity)
}

/// Sorted `_ref` values of `references`
pub fn targets(references: &[RelationshipReference]) -> Vec<String> {
    let mut targets: Vec<String> = references
        .iter()
        .filter_map(|reference| reference.reference.clone())
        .collect();
    targets.sort();
    targets
}

/// Wraps a memory store and counts every call made through the trait
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: MemoryResourceStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceStore for CountingStore {
    async fn create(
        &self,
        container: &str,
        id: Option<&str>,
        content: Value,
    ) -> Result<ResourceRecord, StorageError> {
        self.count();
        self.inner.create(container, id, content).await
    }

    async fn read(&self, path: &str) -> Result<ResourceRecord, StorageError> {
        self.count();
        self.inner.read(path).await
    }

    async fn update(
        &self,
        path: &str,
        expected_revision: Option<&str>,
        content: Value,
    ) -> Result<ResourceRecord, StorageError> {
        self.count();
        self.inner.update(path, expected_revision, content).await
    }

    async fn delete(
        &self,
        path: &str,
        expected_revision: Option<&str>,
    ) -> Result<ResourceRecord, StorageError> {
        self.count();
        self.inner.delete(path, expected_revision).await
    }

    async fn query(
        &self,
        container: &str,
        request: &QueryRequest,
    ) -> Result<QueryResults, StorageError> {
        self.count();
        self.inner.query(container, request).await
    }
}

/// Memory store whose edge creates fail when they point at `failing_target`
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryResourceStore,
    pub failing_target: String,
}

impl FlakyStore {
    pub fn failing_on(target: &str) -> Self {
        Self {
            inner: MemoryResourceStore::new(),
            failing_target: target.to_string(),
        }
    }
}

#[async_trait]
impl ResourceStore for FlakyStore {
    async fn create(
        &self,
        container: &str,
        id: Option<&str>,
        content: Value,
    ) -> Result<ResourceRecord, StorageError> {
        if container == REPO && content.get("secondId") == Some(&json!(self.failing_target)) {
            return Err(StorageError::Internal(format!(
                "Simulated failure creating edge to {}",
                self.failing_target
            )));
        }
        self.inner.create(container, id, content).await
    }

    async fn read(&self, path: &str) -> Result<ResourceRecord, StorageError> {
        self.inner.read(path).await
    }

    async fn update(
        &self,
        path: &str,
        expected_revision: Option<&str>,
        content: Value,
    ) -> Result<ResourceRecord, StorageError> {
        self.inner.update(path, expected_revision, content).await
    }

    async fn delete(
        &self,
        path: &str,
        expected_revision: Option<&str>,
    ) -> Result<ResourceRecord, StorageError> {
        self.inner.delete(path, expected_revision).await
    }

    async fn query(
        &self,
        container: &str,
        request: &QueryRequest,
    ) -> Result<QueryResults, StorageError> {
        self.inner.query(container, request).await
    }
}
