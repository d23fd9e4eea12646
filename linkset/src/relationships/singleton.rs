//! Provider for relationship fields holding at most one reference

use std::sync::Arc;
use tracing::{debug, info_span};

use crate::config::RelationshipConfig;
use crate::context::RequestContext;
use crate::schema::SchemaField;
use crate::storage::traits::ResourceStore;
use crate::{LinksetError, Result};

use super::edges::EdgeOperations;
use super::identity::RelationshipIdentity;
use super::locks::OwnerLocks;
use super::measure::measured;
use super::reference::RelationshipReference;
use super::validator::RelationshipValidator;

/// Reads and replaces the single edge of a singleton relationship field
#[derive(Debug)]
pub struct SingletonRelationshipProvider {
    edges: EdgeOperations,
    validator: RelationshipValidator,
    expand_references: bool,
    locks: Option<OwnerLocks>,
}

impl SingletonRelationshipProvider {
    pub fn new(
        resource_container: impl Into<String>,
        field: SchemaField,
        store: Arc<dyn ResourceStore>,
        validator: RelationshipValidator,
        config: &RelationshipConfig,
    ) -> Self {
        Self {
            edges: EdgeOperations::new(store, resource_container, field, config),
            validator,
            expand_references: config.expand_references,
            locks: config.serialize_owner_replaces.then(OwnerLocks::new),
        }
    }

    pub fn field(&self) -> &SchemaField {
        self.edges.field()
    }

    /// The field's reference on `resource_id`, if any
    pub async fn get_relationship_value_for_resource(
        &self,
        _context: &RequestContext,
        resource_id: &str,
    ) -> Result<Option<RelationshipReference>> {
        let owner = self.edges.owner_path(resource_id);
        let span = info_span!("relationship.singleton.get", resource_id = %resource_id);
        measured(span, "get", resource_id, async {
            let Some(reference) = self.current(&owner).await? else {
                return Ok(None);
            };
            if self.expand_references {
                Ok(Some(self.edges.expand_or_keep(reference).await))
            } else {
                Ok(Some(reference))
            }
        })
        .await
    }

    /// Set the field's reference on `resource_id`.
    ///
    /// `None` clears the field when `clear_existing` is set. A reference with
    /// an edge id updates that edge; one without always replaces the current
    /// edge, so the field never holds more than one.
    pub async fn set_relationship_value_for_resource(
        &self,
        clear_existing: bool,
        context: &RequestContext,
        resource_id: &str,
        value: Option<RelationshipReference>,
    ) -> Result<Option<RelationshipReference>> {
        let owner = self.edges.owner_path(resource_id);
        let span = info_span!(
            "relationship.singleton.replace",
            resource_id = %resource_id,
            clear_existing
        );
        measured(span, "replace", resource_id, async {
            if let Some(reference) = &value {
                self.validator.check_shape(self.field(), reference)?;
            }

            let _guard = match &self.locks {
                Some(locks) => Some(locks.acquire(&owner).await),
                None => None,
            };

            let Some(reference) = value else {
                if clear_existing {
                    self.clear_owner(&owner).await?;
                }
                return Ok(None);
            };

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
                    std::slice::from_ref(&reference),
                    &owner,
                    // the current edge is updated or replaced, never joined
                    false,
                )
                .await?;

            let operation = match reference.edge_id() {
                Some(id) => {
                    let edge = existing
                        .iter()
                        .find(|edge| edge.id.as_deref() == Some(id))
                        .ok_or_else(|| {
                            LinksetError::NotFound(format!(
                                "Relationship {} not found on {} field {}",
                                id,
                                owner,
                                self.field().name
                            ))
                        })?;
                    self.edges.update_operation(&owner, edge, &reference)?
                }
                None => {
                    let deletes = existing
                        .iter()
                        .map(|edge| self.edges.delete_operation(edge))
                        .collect::<Result<Vec<_>>>()?;
                    let deleted = self.edges.execute(&owner, deletes).await?;
                    debug!("Replaced {} previous relationships of {}", deleted.len(), owner);
                    self.edges.create_operation(&owner, &reference)?
                }
            };

            let mut written = self.edges.execute(&owner, vec![operation]).await?;
            Ok(written.pop())
        })
        .await
    }

    /// Delete the field's edge on `resource_id`, returning it if present
    pub async fn clear(
        &self,
        _context: &RequestContext,
        resource_id: &str,
    ) -> Result<Option<RelationshipReference>> {
        let owner = self.edges.owner_path(resource_id);
        let span = info_span!("relationship.singleton.clear", resource_id = %resource_id);
        measured(span, "clear", resource_id, async {
            let _guard = match &self.locks {
                Some(locks) => Some(locks.acquire(&owner).await),
                None => None,
            };
            self.clear_owner(&owner).await
        })
        .await
    }

    async fn clear_owner(&self, owner: &str) -> Result<Option<RelationshipReference>> {
        let existing = self.edges.existing_edges(owner).await?;
        let deletes = existing
            .iter()
            .map(|edge| self.edges.delete_operation(edge))
            .collect::<Result<Vec<_>>>()?;
        let mut deleted = self.edges.execute(owner, deletes).await?;
        Ok(deleted.pop())
    }

    /// Validate `new_value` when it differs from `old_value`
    pub async fn validate_relationship_field(
        &self,
        context: &RequestContext,
        old_value: Option<&RelationshipReference>,
        new_value: Option<&RelationshipReference>,
        referrer_id: &str,
        perform_duplicate_assignment_check: bool,
    ) -> Result<()> {
        let Some(new_value) = new_value else {
            return Ok(());
        };
        if old_value.map(RelationshipIdentity::of) == Some(RelationshipIdentity::of(new_value)) {
            debug!("Skipping validation of unchanged reference to {:?}", new_value.reference);
            return Ok(());
        }
        let referrer = self.edges.owner_path(referrer_id);
        let span = info_span!("relationship.singleton.validate", resource_id = %referrer_id);
        measured(span, "validate", referrer_id, async {
            self.validator
                .validate_relationship(
                    self.field(),
                    new_value,
                    &referrer,
                    context,
                    perform_duplicate_assignment_check,
                )
                .await
        })
        .await
    }

    // the single stored edge, unexpanded
    async fn current(&self, owner: &str) -> Result<Option<RelationshipReference>> {
        let mut edges = self.edges.existing_edges(owner).await?;
        if edges.len() > 1 {
            return Err(LinksetError::Internal(format!(
                "Singleton field {} of {} has {} relationships",
                self.field().name,
                owner,
                edges.len()
            )));
        }
        Ok(edges
            .pop()
            .map(|edge| RelationshipReference::from_edge(&edge, owner, &self.field().name)))
    }
}
