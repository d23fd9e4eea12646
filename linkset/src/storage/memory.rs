//! Simple in-memory record store for testing and embedding

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::query::request::sort_by_keys;
use crate::query::{JsonPointer, QUERY_ALL, QUERY_ALL_IDS, QueryFilter, QueryRequest, QueryResponse, TotalPagedResultsPolicy};
use crate::storage::errors::StorageError;
use crate::storage::models::{
    FIELD_CONTENT_ID, FIELD_CONTENT_REVISION, QUERY_FIELD_FIELD_NAME, QUERY_FIELD_RESOURCE_PATH,
    QueryResults, RELATIONSHIP_QUERY_ID, REPO_FIELD_FIRST_ID, REPO_FIELD_FIRST_PROPERTY_NAME,
    REPO_FIELD_SECOND_ID, REPO_FIELD_SECOND_PROPERTY_NAME, ResourceRecord,
};
use crate::storage::traits::ResourceStore;

#[derive(Debug, Clone)]
struct StoredRecord {
    revision: String,
    fields: Map<String, Value>,
}

/// Record store keeping everything in a map keyed by path.
///
/// Revisions come from a single counter shared by all records, so every
/// write yields a revision never seen before.
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    records: RwLock<BTreeMap<String, StoredRecord>>,
    revisions: AtomicU64,
}

fn split_path(path: &str) -> Result<(&str, &str), StorageError> {
    match path.trim_matches('/').rsplit_once('/') {
        Some((container, id)) if !container.is_empty() && !id.is_empty() => Ok((container, id)),
        _ => Err(StorageError::NotFound(format!("Invalid resource path {}", path))),
    }
}

fn strip_aliases(content: Value) -> Result<Map<String, Value>, StorageError> {
    match content {
        Value::Object(mut map) => {
            map.remove(FIELD_CONTENT_ID);
            map.remove(FIELD_CONTENT_REVISION);
            Ok(map)
        }
        other => Err(StorageError::Serialization(format!(
            "Record content must be an object, got {}",
            other
        ))),
    }
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_revision(&self) -> String {
        (self.revisions.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Number of records stored under `container`
    pub async fn count(&self, container: &str) -> usize {
        let records = self.records.read().await;
        records
            .keys()
            .filter(|path| matches!(split_path(path), Ok((c, _)) if c == container))
            .count()
    }

    /// Whether a record exists at `path`
    pub async fn contains(&self, path: &str) -> bool {
        self.records.read().await.contains_key(path.trim_matches('/'))
    }

    fn check_revision(
        path: &str,
        stored: &StoredRecord,
        expected_revision: Option<&str>,
    ) -> Result<(), StorageError> {
        match expected_revision {
            Some(expected) if expected != stored.revision => {
                Err(StorageError::PreconditionFailed(format!(
                    "Expected revision {} of {} but found {}",
                    expected, path, stored.revision
                )))
            }
            _ => Ok(()),
        }
    }

    fn relationship_filter(request: &QueryRequest) -> Result<QueryFilter<JsonPointer>, StorageError> {
        let resource_path = request.parameter(QUERY_FIELD_RESOURCE_PATH).ok_or_else(|| {
            StorageError::Query(format!("Missing parameter {}", QUERY_FIELD_RESOURCE_PATH))
        })?;
        let field_name = request.parameter(QUERY_FIELD_FIELD_NAME).ok_or_else(|| {
            StorageError::Query(format!("Missing parameter {}", QUERY_FIELD_FIELD_NAME))
        })?;

        Ok(QueryFilter::or(vec![
            QueryFilter::and(vec![
                QueryFilter::equal_to(JsonPointer::new(REPO_FIELD_FIRST_ID), resource_path),
                QueryFilter::equal_to(JsonPointer::new(REPO_FIELD_FIRST_PROPERTY_NAME), field_name),
            ]),
            QueryFilter::and(vec![
                QueryFilter::equal_to(JsonPointer::new(REPO_FIELD_SECOND_ID), resource_path),
                QueryFilter::equal_to(JsonPointer::new(REPO_FIELD_SECOND_PROPERTY_NAME), field_name),
            ]),
        ]))
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn create(
        &self,
        container: &str,
        id: Option<&str>,
        content: Value,
    ) -> Result<ResourceRecord, StorageError> {
        let container = container.trim_matches('/');
        if container.is_empty() {
            return Err(StorageError::Query("Container must not be empty".to_string()));
        }
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let path = format!("{}/{}", container, id);
        let fields = strip_aliases(content)?;

        let mut records = self.records.write().await;
        if records.contains_key(&path) {
            return Err(StorageError::AlreadyExists(format!(
                "Record {} already exists",
                path
            )));
        }
        let revision = self.next_revision();
        records.insert(
            path,
            StoredRecord {
                revision: revision.clone(),
                fields: fields.clone(),
            },
        );
        Ok(ResourceRecord::new(id, revision, Value::Object(fields)))
    }

    async fn read(&self, path: &str) -> Result<ResourceRecord, StorageError> {
        let (_, id) = split_path(path)?;
        let records = self.records.read().await;
        let stored = records
            .get(path.trim_matches('/'))
            .ok_or_else(|| StorageError::NotFound(format!("Record {} not found", path)))?;
        Ok(ResourceRecord::new(
            id,
            stored.revision.clone(),
            Value::Object(stored.fields.clone()),
        ))
    }

    async fn update(
        &self,
        path: &str,
        expected_revision: Option<&str>,
        content: Value,
    ) -> Result<ResourceRecord, StorageError> {
        let (_, id) = split_path(path)?;
        let fields = strip_aliases(content)?;

        let mut records = self.records.write().await;
        let stored = records
            .get_mut(path.trim_matches('/'))
            .ok_or_else(|| StorageError::NotFound(format!("Record {} not found", path)))?;
        Self::check_revision(path, stored, expected_revision)?;

        stored.revision = self.next_revision();
        stored.fields = fields.clone();
        Ok(ResourceRecord::new(
            id,
            stored.revision.clone(),
            Value::Object(fields),
        ))
    }

    async fn delete(
        &self,
        path: &str,
        expected_revision: Option<&str>,
    ) -> Result<ResourceRecord, StorageError> {
        let (_, id) = split_path(path)?;
        let key = path.trim_matches('/');

        let mut records = self.records.write().await;
        let stored = records
            .get(key)
            .ok_or_else(|| StorageError::NotFound(format!("Record {} not found", path)))?;
        Self::check_revision(path, stored, expected_revision)?;

        match records.remove(key) {
            Some(stored) => Ok(ResourceRecord::new(
                id,
                stored.revision,
                Value::Object(stored.fields),
            )),
            None => Err(StorageError::NotFound(format!("Record {} not found", path))),
        }
    }

    async fn query(
        &self,
        container: &str,
        request: &QueryRequest,
    ) -> Result<QueryResults, StorageError> {
        if request.query_expression.is_some() {
            return Err(StorageError::Query(
                "Native query expressions are not supported".to_string(),
            ));
        }

        let mut filters = Vec::new();
        let mut ids_only = false;
        match request.query_id.as_deref() {
            None | Some(QUERY_ALL) => {}
            Some(QUERY_ALL_IDS) => ids_only = true,
            Some(RELATIONSHIP_QUERY_ID) => filters.push(Self::relationship_filter(request)?),
            Some(other) => {
                return Err(StorageError::Query(format!("Unknown query id {}", other)));
            }
        }
        if let Some(filter) = &request.query_filter {
            filters.push(filter.clone());
        }
        let filter = QueryFilter::and(filters);

        let container = container.trim_matches('/');
        let mut matched: Vec<ResourceRecord> = {
            let records = self.records.read().await;
            records
                .iter()
                .filter_map(|(path, stored)| match split_path(path) {
                    Ok((c, id)) if c == container => Some(ResourceRecord::new(
                        id,
                        stored.revision.clone(),
                        Value::Object(stored.fields.clone()),
                    )),
                    _ => None,
                })
                .filter(|record| filter.matches(&record.content))
                .collect()
        };

        sort_by_keys(&mut matched, &request.sort_keys, |record| &record.content);

        let total = matched.len();
        let offset = match &request.paged_results_cookie {
            Some(cookie) => cookie.parse::<usize>().map_err(|_| {
                StorageError::Query(format!("Invalid paged results cookie {}", cookie))
            })?,
            None => request.paged_results_offset,
        };

        let mut response = QueryResponse::default();
        let page: Vec<ResourceRecord> = if request.page_size > 0 {
            let page: Vec<ResourceRecord> = matched
                .into_iter()
                .skip(offset)
                .take(request.page_size)
                .collect();
            let consumed = offset.saturating_add(page.len());
            let remaining = total.saturating_sub(consumed);
            if remaining > 0 {
                response.paged_results_cookie = Some(consumed.to_string());
            }
            response.remaining_paged_results = Some(remaining);
            page
        } else {
            matched.into_iter().skip(offset).collect()
        };

        if request.total_paged_results_policy != TotalPagedResultsPolicy::None {
            response.total_paged_results = Some(total);
        }

        let records = if ids_only {
            page.into_iter()
                .map(|record| ResourceRecord::new(record.id, record.revision, Value::Object(Map::new())))
                .collect()
        } else {
            page
        };

        Ok(QueryResults { records, response })
    }
}
