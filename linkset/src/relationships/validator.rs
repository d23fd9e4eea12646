//! Referential and duplication checks for relationship writes

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::context::RequestContext;
use crate::query::{JsonPointer, QueryFilter, QueryRequest};
use crate::schema::{PropertiesValidator, SchemaField};
use crate::storage::StorageError;
use crate::storage::models::{
    FIELD_CONTENT_ID, REPO_FIELD_FIRST_ID, REPO_FIELD_FIRST_PROPERTY_NAME, REPO_FIELD_SECOND_ID,
    REPO_FIELD_SECOND_PROPERTY_NAME,
};
use crate::storage::traits::ResourceStore;
use crate::{LinksetError, Result};

use super::identity::{RelationshipIdentity, identities};
use super::reference::RelationshipReference;

/// Validates references before they are persisted as edges
#[derive(Debug, Clone)]
pub struct RelationshipValidator {
    store: Arc<dyn ResourceStore>,
    repository_path: String,
}

impl RelationshipValidator {
    pub fn new(store: Arc<dyn ResourceStore>, repository_path: impl Into<String>) -> Self {
        Self {
            store,
            repository_path: repository_path.into(),
        }
    }

    /// Structural checks that need no store access
    pub fn check_shape(&self, field: &SchemaField, reference: &RelationshipReference) -> Result<()> {
        let target = reference.reference.as_deref().ok_or_else(|| {
            LinksetError::BadRequest(format!(
                "Reference in field '{}' is missing _ref",
                field.name
            ))
        })?;

        let segments: Vec<&str> = target.trim_start_matches('/').split('/').collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(LinksetError::BadRequest(format!(
                "Malformed _ref '{}' in field '{}'",
                target, field.name
            )));
        }

        if !field.accepts_reference(target) {
            return Err(LinksetError::BadRequest(format!(
                "_ref '{}' is not allowed in field '{}'; allowed collections: {}",
                target,
                field.name,
                field.resource_collections.join(", ")
            )));
        }

        if let Some(schema) = &field.properties {
            PropertiesValidator::validate(schema, &reference.properties).map_err(|e| {
                LinksetError::BadRequest(format!(
                    "Invalid _refProperties in field '{}': {}",
                    field.name, e
                ))
            })?;
        }

        Ok(())
    }

    /// Validate one reference from `referrer`.
    ///
    /// Fails with a validation error when the referenced resource does not
    /// exist or, when `perform_duplicate_assignment_check` is set, when an
    /// edge between the referrer's field and the target already exists. The
    /// edge named by the reference's own id is not counted.
    pub async fn validate_relationship(
        &self,
        field: &SchemaField,
        reference: &RelationshipReference,
        referrer: &str,
        context: &RequestContext,
        perform_duplicate_assignment_check: bool,
    ) -> Result<()> {
        self.check_shape(field, reference)?;
        let target = reference.reference.as_deref().unwrap_or_default();

        if field.validates_referents() {
            match self.store.read(target).await {
                Ok(_) => {}
                Err(StorageError::NotFound(_)) => {
                    return Err(LinksetError::Validation(format!(
                        "Referenced resource '{}' does not exist",
                        target
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }

        if perform_duplicate_assignment_check {
            let mut filter = self.existing_edge_filter(field, referrer, target);
            // an update by id may keep its target; its own edge is no duplicate
            if let Some(id) = reference.edge_id() {
                filter = QueryFilter::and(vec![
                    filter,
                    QueryFilter::not(QueryFilter::equal_to(JsonPointer::new(FIELD_CONTENT_ID), id)),
                ]);
            }
            let request = QueryRequest::new().with_filter(filter).with_page_size(1);
            let existing = self.store.query(&self.repository_path, &request).await?;
            if !existing.records.is_empty() {
                return Err(LinksetError::Validation(format!(
                    "Relationship from '{}' field '{}' to '{}' already exists",
                    referrer, field.name, target
                )));
            }
        }

        debug!(
            transaction_id = %context.transaction_id,
            "Validated reference from {} field {} to {}", referrer, field.name, target
        );
        Ok(())
    }

    /// Fail when two references in one write share an identity. Issues no
    /// store call.
    pub fn check_for_duplicate_relationships_in_invocation_state(
        references: &[RelationshipReference],
    ) -> Result<()> {
        let mut seen = HashSet::with_capacity(references.len());
        for reference in references {
            let identity = RelationshipIdentity::of(reference);
            if !seen.insert(identity) {
                return Err(LinksetError::Validation(format!(
                    "Duplicate reference to '{}' in request",
                    reference.reference.as_deref().unwrap_or_default()
                )));
            }
        }
        Ok(())
    }

    /// Fail with not-found when the owning resource does not exist
    pub async fn validate_referrer(&self, referrer: &str) -> Result<()> {
        match self.store.read(referrer).await {
            Ok(_) => Ok(()),
            Err(StorageError::NotFound(_)) => Err(LinksetError::NotFound(format!(
                "Resource '{}' does not exist",
                referrer
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Validate the references of `new_value` that are not already part of
    /// `old_value`, after rejecting duplicates within `new_value`.
    ///
    /// References whose identity is present in the old value describe edges
    /// that already exist and are never re-validated.
    pub async fn validate_relationship_field(
        &self,
        field: &SchemaField,
        context: &RequestContext,
        old_value: &[RelationshipReference],
        new_value: &[RelationshipReference],
        referrer: &str,
        perform_duplicate_assignment_check: bool,
    ) -> Result<()> {
        Self::check_for_duplicate_relationships_in_invocation_state(new_value)?;

        let existing = identities(old_value);
        for reference in new_value {
            if existing.contains(&RelationshipIdentity::of(reference)) {
                debug!(
                    "Skipping validation of unchanged reference to {:?}",
                    reference.reference
                );
                continue;
            }
            self.validate_relationship(
                field,
                reference,
                referrer,
                context,
                perform_duplicate_assignment_check,
            )
            .await?;
        }
        Ok(())
    }

    fn existing_edge_filter(
        &self,
        field: &SchemaField,
        referrer: &str,
        target: &str,
    ) -> QueryFilter<JsonPointer> {
        let forward = QueryFilter::and(vec![
            QueryFilter::equal_to(JsonPointer::new(REPO_FIELD_FIRST_ID), referrer),
            QueryFilter::equal_to(JsonPointer::new(REPO_FIELD_FIRST_PROPERTY_NAME), field.name.as_str()),
            QueryFilter::equal_to(JsonPointer::new(REPO_FIELD_SECOND_ID), target),
        ]);
        if !field.is_reverse_relationship {
            return forward;
        }
        QueryFilter::or(vec![
            forward,
            QueryFilter::and(vec![
                QueryFilter::equal_to(JsonPointer::new(REPO_FIELD_SECOND_ID), referrer),
                QueryFilter::equal_to(JsonPointer::new(REPO_FIELD_SECOND_PROPERTY_NAME), field.name.as_str()),
                QueryFilter::equal_to(JsonPointer::new(REPO_FIELD_FIRST_ID), target),
            ]),
        ])
    }
}
