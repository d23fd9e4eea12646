//! Edge primitives shared by the single and collection providers

use std::sync::Arc;
use tracing::{debug, error};

use crate::batch::{BatchExecutor, BatchExecutorConfig, BatchOperation};
use crate::config::RelationshipConfig;
use crate::query::{JsonPointer, QueryFilter, QueryRequest};
use crate::schema::SchemaField;
use crate::storage::models::{
    EdgeRecord, QUERY_FIELD_FIELD_NAME, QUERY_FIELD_RESOURCE_PATH, RELATIONSHIP_QUERY_ID,
    REPO_FIELD_FIRST_ID, REPO_FIELD_FIRST_PROPERTY_NAME, REPO_FIELD_SECOND_ID,
    REPO_FIELD_SECOND_PROPERTY_NAME, ResourceRecord,
};
use crate::storage::traits::ResourceStore;
use crate::{LinksetError, Result};

use super::filter::as_relationship_query_filter;
use super::reference::RelationshipReference;

/// Store-level operations on the edges of one relationship field
#[derive(Debug, Clone)]
pub struct EdgeOperations {
    store: Arc<dyn ResourceStore>,
    field: SchemaField,
    resource_container: String,
    repository_path: String,
    batch: BatchExecutor,
}

impl EdgeOperations {
    /// Edges of `field` on resources under `resource_container`
    /// (e.g. `managed/user`)
    pub fn new(
        store: Arc<dyn ResourceStore>,
        resource_container: impl Into<String>,
        field: SchemaField,
        config: &RelationshipConfig,
    ) -> Self {
        let batch = BatchExecutor::new(
            store.clone(),
            config.repository_path.clone(),
            BatchExecutorConfig {
                max_concurrency: config.max_concurrent_operations,
                max_batch_size: None,
            },
        );
        Self {
            store,
            field,
            resource_container: resource_container.into().trim_end_matches('/').to_string(),
            repository_path: config.repository_path.clone(),
            batch,
        }
    }

    pub fn field(&self) -> &SchemaField {
        &self.field
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    pub fn repository_path(&self) -> &str {
        &self.repository_path
    }

    /// Full path of the owning resource
    pub fn owner_path(&self, resource_id: &str) -> String {
        format!("{}/{}", self.resource_container, resource_id)
    }

    /// A new edge from `owner`'s field to the reference's target
    pub fn new_edge(&self, owner: &str, reference: &RelationshipReference) -> Result<EdgeRecord> {
        let target = reference.reference.as_deref().ok_or_else(|| {
            LinksetError::BadRequest(format!("Reference in field '{}' is missing _ref", self.field.name))
        })?;
        Ok(EdgeRecord::new(
            owner,
            self.field.name.as_str(),
            target,
            self.field.reverse_property_name.clone(),
            reference.property_fields(),
        ))
    }

    /// Operation creating the edge for `reference`
    pub fn create_operation(&self, owner: &str, reference: &RelationshipReference) -> Result<BatchOperation> {
        Ok(BatchOperation::CreateEdge {
            edge: self.new_edge(owner, reference)?,
        })
    }

    /// Operation updating `existing` to match `reference`.
    ///
    /// The edge keeps its orientation; only the endpoint opposite to the
    /// owner is moved and the properties replaced. The echoed `_rev` is not a
    /// precondition, so replaying a value read earlier still applies.
    pub fn update_operation(
        &self,
        owner: &str,
        existing: &EdgeRecord,
        reference: &RelationshipReference,
    ) -> Result<BatchOperation> {
        let id = existing.id.clone().ok_or_else(|| {
            LinksetError::Internal("Stored relationship has no id".to_string())
        })?;
        if !existing.involves(owner, &self.field.name) {
            return Err(LinksetError::NotFound(format!(
                "Relationship {} does not belong to {} field {}",
                id, owner, self.field.name
            )));
        }
        let target = reference.reference.as_deref().ok_or_else(|| {
            LinksetError::BadRequest(format!("Reference in field '{}' is missing _ref", self.field.name))
        })?;

        let mut edge = existing.clone();
        edge.retarget(owner, &self.field.name, target);
        edge.properties = reference.property_fields();
        edge.id = None;
        edge.revision = None;

        Ok(BatchOperation::UpdateEdge {
            id,
            expected_revision: None,
            edge,
        })
    }

    /// Operation deleting `existing`
    pub fn delete_operation(&self, existing: &EdgeRecord) -> Result<BatchOperation> {
        let id = existing.id.clone().ok_or_else(|| {
            LinksetError::Internal("Stored relationship has no id".to_string())
        })?;
        Ok(BatchOperation::DeleteEdge {
            id,
            expected_revision: existing.revision.clone(),
        })
    }

    /// Run operations concurrently and reshape the results for `owner`
    pub async fn execute(
        &self,
        owner: &str,
        operations: Vec<BatchOperation>,
    ) -> Result<Vec<RelationshipReference>> {
        if operations.is_empty() {
            return Ok(Vec::new());
        }
        let records = self.batch.execute(operations).await?;
        records
            .iter()
            .map(|record| self.to_reference(owner, record))
            .collect()
    }

    /// Every edge of the owner's field, from either endpoint, unexpanded
    pub async fn existing_edges(&self, owner: &str) -> Result<Vec<EdgeRecord>> {
        let request = self.relationship_query(owner);
        let results = self.store.query(&self.repository_path, &request).await?;
        let edges = results
            .records
            .iter()
            .map(EdgeRecord::from_record)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(
            "Found {} existing {} relationships for {}",
            edges.len(),
            self.field.name,
            owner
        );
        Ok(edges)
    }

    /// The store-native query for every edge of the owner's field
    pub fn relationship_query(&self, owner: &str) -> QueryRequest {
        QueryRequest::new()
            .with_query_id(RELATIONSHIP_QUERY_ID)
            .with_parameter(QUERY_FIELD_RESOURCE_PATH, owner)
            .with_parameter(QUERY_FIELD_FIELD_NAME, self.field.name.as_str())
    }

    /// Store filter selecting the owner's edges, AND-ed with the rewritten
    /// client filter if one is given.
    ///
    /// Reverse fields match both orientations, since their edges may have
    /// been created from either side.
    pub fn owner_filter(
        &self,
        owner: &str,
        client_filter: Option<&QueryFilter<JsonPointer>>,
    ) -> QueryFilter<JsonPointer> {
        let branch = |is_reverse: bool| {
            let (id_field, name_field) = if is_reverse {
                (REPO_FIELD_SECOND_ID, REPO_FIELD_SECOND_PROPERTY_NAME)
            } else {
                (REPO_FIELD_FIRST_ID, REPO_FIELD_FIRST_PROPERTY_NAME)
            };
            let mut filters = vec![
                QueryFilter::equal_to(JsonPointer::new(id_field), owner),
                QueryFilter::equal_to(JsonPointer::new(name_field), self.field.name.as_str()),
            ];
            if let Some(filter) = client_filter {
                filters.push(as_relationship_query_filter(is_reverse, filter));
            }
            QueryFilter::and(filters)
        };

        if self.field.is_reverse_relationship {
            QueryFilter::or(vec![branch(false), branch(true)])
        } else {
            branch(false)
        }
    }

    /// Reshape a stored edge record into the owner's client form
    pub fn to_reference(&self, owner: &str, record: &ResourceRecord) -> Result<RelationshipReference> {
        let edge = EdgeRecord::from_record(record)?;
        Ok(RelationshipReference::from_edge(&edge, owner, &self.field.name))
    }

    /// Merge the referenced resource into `reference`
    pub async fn expand(&self, mut reference: RelationshipReference) -> Result<RelationshipReference> {
        let target = reference.reference.clone().ok_or_else(|| {
            LinksetError::Internal("Stored relationship has no target".to_string())
        })?;
        let referent = self.store.read(&target).await?;
        reference.expand(&referent.content);
        Ok(reference)
    }

    /// Expand `reference`, falling back to the unexpanded form on failure
    pub async fn expand_or_keep(&self, reference: RelationshipReference) -> RelationshipReference {
        match self.expand(reference.clone()).await {
            Ok(expanded) => expanded,
            Err(e) => {
                error!(
                    "Error expanding relationship {:?} to {:?}: {}",
                    reference.id, reference.reference, e
                );
                reference
            }
        }
    }
}
