//! Provider for relationship fields holding an array of references

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

use crate::config::RelationshipConfig;
use crate::context::RequestContext;
use crate::query::{QUERY_ALL, QUERY_ALL_IDS, QueryRequest, QueryResponse};
use crate::schema::SchemaField;
use crate::storage::models::{
    EdgeRecord, QUERY_FIELD_FIELD_NAME, QUERY_FIELD_RESOURCE_PATH, RELATIONSHIP_QUERY_ID,
};
use crate::storage::traits::ResourceStore;
use crate::{LinksetError, Result};

use super::activity::{ActivityLogger, ActivityStatus};
use super::edges::EdgeOperations;
use super::filter::unrecognized_fields;
use super::locks::OwnerLocks;
use super::measure::measured;
use super::reference::RelationshipReference;
use super::validator::RelationshipValidator;

/// Reads, queries and replaces the edges of a collection relationship field
pub struct CollectionRelationshipProvider {
    edges: EdgeOperations,
    validator: RelationshipValidator,
    expand_references: bool,
    strict_filter_fields: bool,
    activity: Arc<dyn ActivityLogger>,
    locks: Option<OwnerLocks>,
}

impl fmt::Debug for CollectionRelationshipProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionRelationshipProvider")
            .field("edges", &self.edges)
            .field("expand_references", &self.expand_references)
            .field("strict_filter_fields", &self.strict_filter_fields)
            .field("serialize_owner_replaces", &self.locks.is_some())
            .finish_non_exhaustive()
    }
}

impl CollectionRelationshipProvider {
    pub fn new(
        resource_container: impl Into<String>,
        field: SchemaField,
        store: Arc<dyn ResourceStore>,
        validator: RelationshipValidator,
        config: &RelationshipConfig,
        activity: Arc<dyn ActivityLogger>,
    ) -> Self {
        Self {
            edges: EdgeOperations::new(store, resource_container, field, config),
            validator,
            expand_references: config.expand_references,
            strict_filter_fields: config.strict_filter_fields,
            activity,
            locks: config.serialize_owner_replaces.then(OwnerLocks::new),
        }
    }

    pub fn field(&self) -> &SchemaField {
        self.edges.field()
    }

    /// Every reference of the field on `resource_id`, expanded.
    ///
    /// Runs as an internal request and returns once the whole result set has
    /// been collected.
    pub async fn get_relationship_value_for_resource(
        &self,
        context: &RequestContext,
        resource_id: &str,
    ) -> Result<Vec<RelationshipReference>> {
        let span = info_span!("relationship.collection.get", resource_id = %resource_id);
        measured(span, "get", resource_id, async {
            let request = QueryRequest::new().with_query_id(RELATIONSHIP_QUERY_ID);
            let mut references = Vec::new();
            self.query_collection(&context.as_internal(), resource_id, &request, &mut |reference| {
                references.push(reference);
                true
            })
            .await?;
            Ok(references)
        })
        .await
    }

    /// Query the field's references on `resource_id`, passing each one to
    /// `handler` until it returns `false`.
    pub async fn query_collection(
        &self,
        context: &RequestContext,
        resource_id: &str,
        request: &QueryRequest,
        handler: &mut (dyn FnMut(RelationshipReference) -> bool + Send),
    ) -> Result<QueryResponse> {
        let owner = self.edges.owner_path(resource_id);
        let span = info_span!(
            "relationship.collection.query",
            resource_id = %resource_id,
            transaction_id = %context.transaction_id
        );
        let response = measured(span, "query", resource_id, self.query_owner(&owner, request, handler)).await?;

        if !context.internal {
            if let Err(e) = self
                .activity
                .log(context, "query", &owner, ActivityStatus::Success)
                .await
            {
                warn!("Failed to record query activity for {}: {}", owner, e);
            }
        }
        Ok(response)
    }

    async fn query_owner(
        &self,
        owner: &str,
        request: &QueryRequest,
        handler: &mut (dyn FnMut(RelationshipReference) -> bool + Send),
    ) -> Result<QueryResponse> {
        if let Some(expression) = &request.query_expression {
            return Err(LinksetError::BadRequest(format!(
                "Query expressions are not supported on relationship field '{}': {}",
                self.field().name, expression
            )));
        }

        let mut store_request = QueryRequest::new().with_paging_from(request);
        let ids_only = request.query_id.as_deref() == Some(QUERY_ALL_IDS);

        match request.query_id.as_deref() {
            None | Some(QUERY_ALL) | Some(QUERY_ALL_IDS) => {
                if let Some(filter) = &request.query_filter {
                    let unknown = unrecognized_fields(filter);
                    if !unknown.is_empty() {
                        let names = unknown
                            .iter()
                            .map(|field| field.to_string())
                            .collect::<Vec<_>>()
                            .join(", ");
                        if self.strict_filter_fields {
                            return Err(LinksetError::BadRequest(format!(
                                "Unsupported fields in relationship filter: {}",
                                names
                            )));
                        }
                        warn!("Passing unrecognized relationship filter fields through: {}", names);
                    }
                }
                store_request.query_filter =
                    Some(self.edges.owner_filter(owner, request.query_filter.as_ref()));
            }
            Some(RELATIONSHIP_QUERY_ID) => {
                store_request = store_request
                    .with_query_id(RELATIONSHIP_QUERY_ID)
                    .with_parameter(QUERY_FIELD_RESOURCE_PATH, owner)
                    .with_parameter(QUERY_FIELD_FIELD_NAME, self.field().name.as_str());
            }
            Some(other) => {
                return Err(LinksetError::BadRequest(format!(
                    "Query id '{}' is not supported on relationship field '{}'",
                    other,
                    self.field().name
                )));
            }
        }

        // the owner binding above always wins over caller parameters
        for (name, value) in &request.additional_parameters {
            store_request
                .additional_parameters
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }

        let results = self
            .edges
            .store()
            .query(self.edges.repository_path(), &store_request)
            .await?;
        debug!("Relationship query for {} returned {} edges", owner, results.records.len());

        for record in &results.records {
            let mut reference = self.edges.to_reference(owner, record)?;
            if !ids_only && self.expand_references {
                reference = self.edges.expand_or_keep(reference).await;
            }
            if !handler(reference) {
                break;
            }
        }
        Ok(results.response)
    }

    /// Replace or extend the field's references on `resource_id`.
    ///
    /// References carrying an edge id update that edge, the others create
    /// new edges. With `clear_existing`, edges not named by the new value are
    /// deleted first. Returns the written references in completion order.
    /// Operations already completed when one fails stay persisted.
    pub async fn set_relationship_value_for_resource(
        &self,
        clear_existing: bool,
        context: &RequestContext,
        resource_id: &str,
        value: Vec<RelationshipReference>,
    ) -> Result<Vec<RelationshipReference>> {
        let owner = self.edges.owner_path(resource_id);
        let span = info_span!(
            "relationship.collection.replace",
            resource_id = %resource_id,
            clear_existing,
            references = value.len()
        );
        measured(span, "replace", resource_id, async {
            RelationshipValidator::check_for_duplicate_relationships_in_invocation_state(&value)?;
            for reference in &value {
                self.validator.check_shape(self.field(), reference)?;
            }

            if value.is_empty() && !clear_existing {
                return Ok(Vec::new());
            }

            let _guard = match &self.locks {
                Some(locks) => Some(locks.acquire(&owner).await),
                None => None,
            };

            if value.is_empty() {
                self.clear_owner(&owner).await?;
                return Ok(Vec::new());
            }

            self.validator.validate_referrer(&owner).await?;
            let existing = self.edges.existing_edges(&owner).await?;
            let old_value: Vec<RelationshipReference> = existing
                .iter()
                .map(|edge| RelationshipReference::from_edge(edge, &owner, &self.field().name))
                .collect();
            self.validator
                .validate_relationship_field(
                    self.field(),
                    context,
                    &old_value,
                    &value,
                    &owner,
                    !clear_existing,
                )
                .await?;

            let by_id: HashMap<&str, &EdgeRecord> = existing
                .iter()
                .filter_map(|edge| edge.id.as_deref().map(|id| (id, edge)))
                .collect();
            let mut kept = HashSet::new();
            let mut updates = Vec::new();
            let mut creates = Vec::new();
            for reference in &value {
                match reference.edge_id() {
                    Some(id) => {
                        let edge = by_id.get(id).ok_or_else(|| {
                            LinksetError::NotFound(format!(
                                "Relationship {} not found on {} field {}",
                                id,
                                owner,
                                self.field().name
                            ))
                        })?;
                        kept.insert(id);
                        updates.push(self.edges.update_operation(&owner, edge, reference)?);
                    }
                    None => creates.push(self.edges.create_operation(&owner, reference)?),
                }
            }

            if clear_existing {
                let deletes = existing
                    .iter()
                    .filter(|edge| edge.id.as_deref().is_some_and(|id| !kept.contains(id)))
                    .map(|edge| self.edges.delete_operation(edge))
                    .collect::<Result<Vec<_>>>()?;
                let deleted = self.edges.execute(&owner, deletes).await?;
                debug!("Deleted {} relationships of {} not in the new value", deleted.len(), owner);
            }

            debug!(
                "Applying {} updates and {} creates to {} field {}",
                updates.len(),
                creates.len(),
                owner,
                self.field().name
            );
            let mut operations = updates;
            operations.extend(creates);
            self.edges.execute(&owner, operations).await
        })
        .await
    }

    /// Delete every edge of the field on `resource_id`, returning them
    pub async fn clear(
        &self,
        _context: &RequestContext,
        resource_id: &str,
    ) -> Result<Vec<RelationshipReference>> {
        let owner = self.edges.owner_path(resource_id);
        let span = info_span!("relationship.collection.clear", resource_id = %resource_id);
        measured(span, "clear", resource_id, async {
            let _guard = match &self.locks {
                Some(locks) => Some(locks.acquire(&owner).await),
                None => None,
            };
            self.clear_owner(&owner).await
        })
        .await
    }

    // callers hold the owner lock when one is configured
    async fn clear_owner(&self, owner: &str) -> Result<Vec<RelationshipReference>> {
        let existing = self.edges.existing_edges(owner).await?;
        let deletes = existing
            .iter()
            .map(|edge| self.edges.delete_operation(edge))
            .collect::<Result<Vec<_>>>()?;
        self.edges.execute(owner, deletes).await
    }

    /// Validate `new_value` against the field's current `old_value` for
    /// the resource `referrer_id`
    pub async fn validate_relationship_field(
        &self,
        context: &RequestContext,
        old_value: &[RelationshipReference],
        new_value: &[RelationshipReference],
        referrer_id: &str,
        perform_duplicate_assignment_check: bool,
    ) -> Result<()> {
        let referrer = self.edges.owner_path(referrer_id);
        let span = info_span!("relationship.collection.validate", resource_id = %referrer_id);
        measured(span, "validate", referrer_id, async {
            self.validator
                .validate_relationship_field(
                    self.field(),
                    context,
                    old_value,
                    new_value,
                    &referrer,
                    perform_duplicate_assignment_check,
                )
                .await
        })
        .await
    }

    /// Actions are not defined on relationship fields
    pub async fn action_collection(
        &self,
        _context: &RequestContext,
        _resource_id: &str,
        action: &str,
        _content: &Value,
    ) -> Result<Value> {
        Err(LinksetError::NotSupported(format!(
            "Action '{}' is not supported on relationship field '{}'",
            action,
            self.field().name
        )))
    }
}
