//! Records exchanged with the store collaborator

use crate::query::QueryResponse;
use crate::storage::errors::StorageError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content field holding a record's id
pub const FIELD_CONTENT_ID: &str = "_id";
/// Content field holding a record's revision
pub const FIELD_CONTENT_REVISION: &str = "_rev";

/// Edge record field names as stored
pub const REPO_FIELD_FIRST_ID: &str = "firstId";
pub const REPO_FIELD_FIRST_PROPERTY_NAME: &str = "firstPropertyName";
pub const REPO_FIELD_SECOND_ID: &str = "secondId";
pub const REPO_FIELD_SECOND_PROPERTY_NAME: &str = "secondPropertyName";
pub const REPO_FIELD_PROPERTIES: &str = "properties";

/// Store-native query returning every edge attached to a resource field,
/// from either endpoint
pub const RELATIONSHIP_QUERY_ID: &str = "find-relationships-for-resource";
/// Parameter of [`RELATIONSHIP_QUERY_ID`]: the owner resource path
pub const QUERY_FIELD_RESOURCE_PATH: &str = "resourcePath";
/// Parameter of [`RELATIONSHIP_QUERY_ID`]: the owner field name
pub const QUERY_FIELD_FIELD_NAME: &str = "fieldName";

/// A record as returned by the store.
///
/// `content` always carries `_id` and `_rev` alongside the stored fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Id of the record within its container
    pub id: String,
    pub revision: String,
    pub content: Value,
}

impl ResourceRecord {
    pub fn new(id: impl Into<String>, revision: impl Into<String>, mut content: Value) -> Self {
        let id = id.into();
        let revision = revision.into();
        if let Value::Object(map) = &mut content {
            map.insert(FIELD_CONTENT_ID.to_string(), Value::String(id.clone()));
            map.insert(
                FIELD_CONTENT_REVISION.to_string(),
                Value::String(revision.clone()),
            );
        }
        Self {
            id,
            revision,
            content,
        }
    }

    /// Stored fields without the `_id`/`_rev` aliases
    pub fn fields(&self) -> Map<String, Value> {
        let mut fields = match &self.content {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        fields.remove(FIELD_CONTENT_ID);
        fields.remove(FIELD_CONTENT_REVISION);
        fields
    }
}

/// Results of a store query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    pub records: Vec<ResourceRecord>,
    pub response: QueryResponse,
}

/// A stored relationship edge.
///
/// `first_*` is always the endpoint the edge was created from and
/// `second_*` the endpoint it points at. The orientation never changes
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub first_id: String,
    pub first_property_name: String,
    pub second_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_property_name: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl EdgeRecord {
    /// A new, not yet persisted edge from `first_id`'s `first_property_name`
    /// to `second_id`
    pub fn new(
        first_id: impl Into<String>,
        first_property_name: impl Into<String>,
        second_id: impl Into<String>,
        second_property_name: Option<String>,
        properties: Map<String, Value>,
    ) -> Self {
        Self {
            id: None,
            revision: None,
            first_id: first_id.into(),
            first_property_name: first_property_name.into(),
            second_id: second_id.into(),
            second_property_name,
            properties,
        }
    }

    /// Decode an edge from a store record
    pub fn from_record(record: &ResourceRecord) -> Result<Self, StorageError> {
        let mut edge: EdgeRecord = serde_json::from_value(record.content.clone())?;
        edge.id = Some(record.id.clone());
        edge.revision = Some(record.revision.clone());
        Ok(edge)
    }

    /// The content to persist, without `_id`/`_rev`
    pub fn to_content(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            REPO_FIELD_FIRST_ID.to_string(),
            Value::String(self.first_id.clone()),
        );
        map.insert(
            REPO_FIELD_FIRST_PROPERTY_NAME.to_string(),
            Value::String(self.first_property_name.clone()),
        );
        map.insert(
            REPO_FIELD_SECOND_ID.to_string(),
            Value::String(self.second_id.clone()),
        );
        if let Some(name) = &self.second_property_name {
            map.insert(
                REPO_FIELD_SECOND_PROPERTY_NAME.to_string(),
                Value::String(name.clone()),
            );
        }
        map.insert(
            REPO_FIELD_PROPERTIES.to_string(),
            Value::Object(self.properties.clone()),
        );
        Value::Object(map)
    }

    /// Whether `owner`'s `field` is the first endpoint
    pub fn is_forward_for(&self, owner: &str, field: &str) -> bool {
        self.first_id == owner && self.first_property_name == field
    }

    /// Whether `owner`'s `field` is the second endpoint
    pub fn is_reverse_for(&self, owner: &str, field: &str) -> bool {
        self.second_id == owner && self.second_property_name.as_deref() == Some(field)
    }

    pub fn involves(&self, owner: &str, field: &str) -> bool {
        self.is_forward_for(owner, field) || self.is_reverse_for(owner, field)
    }

    /// The endpoint opposite to `owner`'s `field`
    pub fn other_endpoint(&self, owner: &str, field: &str) -> &str {
        if self.is_forward_for(owner, field) {
            &self.second_id
        } else {
            &self.first_id
        }
    }

    /// Point the endpoint opposite to `owner`'s `field` at `target`
    pub fn retarget(&mut self, owner: &str, field: &str, target: impl Into<String>) {
        if self.is_forward_for(owner, field) {
            self.second_id = target.into();
        } else {
            self.first_id = target.into();
        }
    }
}
