//! Client representation of a relationship

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::models::EdgeRecord;
use crate::{LinksetError, Result};

/// Edge id, on the reference and inside `_refProperties`
pub const FIELD_ID: &str = "_id";
/// Edge revision, on the reference and inside `_refProperties`
pub const FIELD_REV: &str = "_rev";
/// Path of the referenced resource
pub const FIELD_REFERENCE: &str = "_ref";
/// Properties stored on the edge
pub const FIELD_PROPERTIES: &str = "_refProperties";

/// One reference as clients send and receive it.
///
/// ```json
/// {"_ref": "managed/role/1", "_refProperties": {"_id": "e1", "_rev": "3", "grantType": "direct"}}
/// ```
///
/// Fields of the referenced resource merged in by expansion are kept in
/// `expanded` and serialized at the top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipReference {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(rename = "_ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "_refProperties", default)]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub expanded: Map<String, Value>,
}

impl RelationshipReference {
    /// A new reference to `target`, without an edge id
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Decode a client value
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(LinksetError::BadRequest(format!(
                "Relationship reference must be an object, got {}",
                value
            )));
        }
        serde_json::from_value(value.clone()).map_err(|e| {
            LinksetError::BadRequest(format!("Malformed relationship reference: {}", e))
        })
    }

    /// Decode a client array; null decodes as empty
    pub fn list_from_value(value: &Value) -> Result<Vec<Self>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items.iter().map(Self::from_value).collect(),
            other => Err(LinksetError::BadRequest(format!(
                "Relationship collection must be an array, got {}",
                other
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Edge id from `_id`, falling back to `_refProperties/_id`
    pub fn edge_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.properties.get(FIELD_ID).and_then(Value::as_str))
    }

    /// Edge properties without the `_id`/`_rev` bookkeeping entries
    pub fn property_fields(&self) -> Map<String, Value> {
        let mut fields = self.properties.clone();
        fields.remove(FIELD_ID);
        fields.remove(FIELD_REV);
        fields
    }

    /// Reshape a stored edge for the owner on `field`.
    ///
    /// `_ref` is the endpoint opposite to the owner, whichever side of the
    /// edge the owner is on.
    pub fn from_edge(edge: &EdgeRecord, owner: &str, field: &str) -> Self {
        let mut properties = edge.properties.clone();
        if let Some(id) = &edge.id {
            properties.insert(FIELD_ID.to_string(), Value::String(id.clone()));
        }
        if let Some(revision) = &edge.revision {
            properties.insert(FIELD_REV.to_string(), Value::String(revision.clone()));
        }
        Self {
            id: edge.id.clone(),
            revision: edge.revision.clone(),
            reference: Some(edge.other_endpoint(owner, field).to_string()),
            properties,
            expanded: Map::new(),
        }
    }

    /// Merge the fields of the referenced resource into this reference
    pub fn expand(&mut self, referent: &Value) {
        if let Value::Object(fields) = referent {
            for (name, value) in fields {
                if matches!(
                    name.as_str(),
                    FIELD_ID | FIELD_REV | FIELD_REFERENCE | FIELD_PROPERTIES
                ) {
                    continue;
                }
                self.expanded.insert(name.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let reference = RelationshipReference::from_value(&json!({
            "_ref": "managed/role/1",
            "_refProperties": {"_id": "e1", "_rev": "2", "grantType": "direct"}
        }))
        .unwrap();

        assert_eq!(reference.reference.as_deref(), Some("managed/role/1"));
        assert_eq!(reference.id, None);
        assert_eq!(reference.edge_id(), Some("e1"));
        assert_eq!(reference.properties["_rev"], json!("2"));
        assert_eq!(reference.property_fields().len(), 1);
    }

    #[test]
    fn test_malformed_values() {
        assert!(matches!(
            RelationshipReference::from_value(&json!("managed/role/1")),
            Err(LinksetError::BadRequest(_))
        ));
        assert!(matches!(
            RelationshipReference::from_value(&json!({"_ref": 7})),
            Err(LinksetError::BadRequest(_))
        ));
        assert!(matches!(
            RelationshipReference::list_from_value(&json!({"_ref": "managed/role/1"})),
            Err(LinksetError::BadRequest(_))
        ));
        assert!(RelationshipReference::list_from_value(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_from_edge_picks_other_endpoint() {
        let mut edge = EdgeRecord::new(
            "managed/user/1",
            "roles",
            "managed/role/1",
            Some("members".to_string()),
            Map::new(),
        );
        edge.id = Some("e1".to_string());
        edge.revision = Some("4".to_string());

        let forward = RelationshipReference::from_edge(&edge, "managed/user/1", "roles");
        assert_eq!(forward.reference.as_deref(), Some("managed/role/1"));
        assert_eq!(forward.id.as_deref(), Some("e1"));
        assert_eq!(forward.properties["_rev"], json!("4"));

        let reverse = RelationshipReference::from_edge(&edge, "managed/role/1", "members");
        assert_eq!(reverse.reference.as_deref(), Some("managed/user/1"));
    }

    #[test]
    fn test_expand_and_serialize() {
        let mut reference = RelationshipReference::to("managed/role/1").with_id("e1");
        reference.expand(&json!({"_id": "1", "_rev": "9", "name": "admin"}));

        let value = reference.to_value();
        assert_eq!(value["name"], json!("admin"));
        assert_eq!(value["_id"], json!("e1"));
        assert_eq!(value["_ref"], json!("managed/role/1"));
        assert!(value.get("_rev").is_none());
    }
}
