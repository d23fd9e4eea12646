//! Cardinality-independent interface over relationship providers

use async_trait::async_trait;
use serde_json::Value;

use crate::context::RequestContext;
use crate::query::{QueryRequest, QueryResponse};
use crate::schema::SchemaField;
use crate::{LinksetError, Result};

use super::collection::CollectionRelationshipProvider;
use super::reference::RelationshipReference;
use super::singleton::SingletonRelationshipProvider;

/// Relationship field operations on client JSON values.
///
/// A collection field's value is an array of references, a singleton
/// field's value a single reference object or `null`.
#[async_trait]
pub trait RelationshipProvider: Send + Sync + std::fmt::Debug {
    /// Descriptor of the managed field
    fn field(&self) -> &SchemaField;

    /// Current value of the field on `resource_id`
    async fn get_relationship_value(&self, context: &RequestContext, resource_id: &str) -> Result<Value>;

    /// Write the field on `resource_id`, returning the written value
    async fn set_relationship_value(
        &self,
        clear_existing: bool,
        context: &RequestContext,
        resource_id: &str,
        value: &Value,
    ) -> Result<Value>;

    /// Remove every reference of the field on `resource_id`, returning what
    /// was removed
    async fn clear(&self, context: &RequestContext, resource_id: &str) -> Result<Value>;

    /// Validate a new field value against the current one
    async fn validate_relationship_field(
        &self,
        context: &RequestContext,
        old_value: &Value,
        new_value: &Value,
        referrer_id: &str,
        perform_duplicate_assignment_check: bool,
    ) -> Result<()>;

    /// Query the field's references on `resource_id`
    async fn query(
        &self,
        context: &RequestContext,
        resource_id: &str,
        request: &QueryRequest,
    ) -> Result<(Vec<Value>, QueryResponse)>;
}

fn list_to_value(references: &[RelationshipReference]) -> Value {
    Value::Array(references.iter().map(RelationshipReference::to_value).collect())
}

fn optional_from_value(value: &Value) -> Result<Option<RelationshipReference>> {
    match value {
        Value::Null => Ok(None),
        other => RelationshipReference::from_value(other).map(Some),
    }
}

fn optional_to_value(reference: Option<RelationshipReference>) -> Value {
    reference.map_or(Value::Null, |r| r.to_value())
}

#[async_trait]
impl RelationshipProvider for CollectionRelationshipProvider {
    fn field(&self) -> &SchemaField {
        CollectionRelationshipProvider::field(self)
    }

    async fn get_relationship_value(&self, context: &RequestContext, resource_id: &str) -> Result<Value> {
        let references = self
            .get_relationship_value_for_resource(context, resource_id)
            .await?;
        Ok(list_to_value(&references))
    }

    async fn set_relationship_value(
        &self,
        clear_existing: bool,
        context: &RequestContext,
        resource_id: &str,
        value: &Value,
    ) -> Result<Value> {
        let references = RelationshipReference::list_from_value(value)?;
        let written = self
            .set_relationship_value_for_resource(clear_existing, context, resource_id, references)
            .await?;
        Ok(list_to_value(&written))
    }

    async fn clear(&self, context: &RequestContext, resource_id: &str) -> Result<Value> {
        let deleted = CollectionRelationshipProvider::clear(self, context, resource_id).await?;
        Ok(list_to_value(&deleted))
    }

    async fn validate_relationship_field(
        &self,
        context: &RequestContext,
        old_value: &Value,
        new_value: &Value,
        referrer_id: &str,
        perform_duplicate_assignment_check: bool,
    ) -> Result<()> {
        let old_value = RelationshipReference::list_from_value(old_value)?;
        let new_value = RelationshipReference::list_from_value(new_value)?;
        CollectionRelationshipProvider::validate_relationship_field(
            self,
            context,
            &old_value,
            &new_value,
            referrer_id,
            perform_duplicate_assignment_check,
        )
        .await
    }

    async fn query(
        &self,
        context: &RequestContext,
        resource_id: &str,
        request: &QueryRequest,
    ) -> Result<(Vec<Value>, QueryResponse)> {
        let mut values = Vec::new();
        let response = self
            .query_collection(context, resource_id, request, &mut |reference| {
                values.push(reference.to_value());
                true
            })
            .await?;
        Ok((values, response))
    }
}

#[async_trait]
impl RelationshipProvider for SingletonRelationshipProvider {
    fn field(&self) -> &SchemaField {
        SingletonRelationshipProvider::field(self)
    }

    async fn get_relationship_value(&self, context: &RequestContext, resource_id: &str) -> Result<Value> {
        let reference = self
            .get_relationship_value_for_resource(context, resource_id)
            .await?;
        Ok(optional_to_value(reference))
    }

    async fn set_relationship_value(
        &self,
        clear_existing: bool,
        context: &RequestContext,
        resource_id: &str,
        value: &Value,
    ) -> Result<Value> {
        let reference = optional_from_value(value)?;
        let written = self
            .set_relationship_value_for_resource(clear_existing, context, resource_id, reference)
            .await?;
        Ok(optional_to_value(written))
    }

    async fn clear(&self, context: &RequestContext, resource_id: &str) -> Result<Value> {
        let deleted = SingletonRelationshipProvider::clear(self, context, resource_id).await?;
        Ok(optional_to_value(deleted))
    }

    async fn validate_relationship_field(
        &self,
        context: &RequestContext,
        old_value: &Value,
        new_value: &Value,
        referrer_id: &str,
        perform_duplicate_assignment_check: bool,
    ) -> Result<()> {
        let old_value = optional_from_value(old_value)?;
        let new_value = optional_from_value(new_value)?;
        SingletonRelationshipProvider::validate_relationship_field(
            self,
            context,
            old_value.as_ref(),
            new_value.as_ref(),
            referrer_id,
            perform_duplicate_assignment_check,
        )
        .await
    }

    async fn query(
        &self,
        _context: &RequestContext,
        _resource_id: &str,
        _request: &QueryRequest,
    ) -> Result<(Vec<Value>, QueryResponse)> {
        Err(LinksetError::NotSupported(format!(
            "Queries are not supported on singleton relationship field '{}'",
            SingletonRelationshipProvider::field(self).name
        )))
    }
}
