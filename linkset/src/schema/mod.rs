//! Relationship field descriptors
//!
//! A [`SchemaField`] describes one relationship-valued field of an object
//! type. Descriptors are loaded once with the object type and never change
//! afterwards; providers only read them.

pub mod properties;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use properties::{PropertiesError, PropertiesValidator};

/// How many references a field holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// At most one reference
    #[default]
    Single,
    /// Any number of references
    Collection,
}

/// Validation applied to references assigned to a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Check that the referenced resource exists
    #[serde(default = "default_validate")]
    pub validate: bool,
}

fn default_validate() -> bool {
    true
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self { validate: true }
    }
}

/// Static descriptor of a relationship field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub name: String,
    /// The field is the second endpoint of edges created from the other side
    #[serde(default)]
    pub is_reverse_relationship: bool,
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Name of the matching field on the referenced resource, when the
    /// relationship is bidirectional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_property_name: Option<String>,
    /// Allowed referent containers, e.g. `managed/role`; empty allows any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_collections: Vec<String>,
    /// Schema for `_refProperties`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationPolicy>,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            is_reverse_relationship: false,
            cardinality,
            reverse_property_name: None,
            resource_collections: Vec::new(),
            properties: None,
            validation: None,
        }
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self::new(name, Cardinality::Single)
    }

    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(name, Cardinality::Collection)
    }

    /// Mark the field as the reverse side of its relationship
    pub fn reverse(mut self) -> Self {
        self.is_reverse_relationship = true;
        self
    }

    pub fn with_reverse_property_name(mut self, name: impl Into<String>) -> Self {
        self.reverse_property_name = Some(name.into());
        self
    }

    pub fn with_resource_collection(mut self, container: impl Into<String>) -> Self {
        self.resource_collections.push(container.into());
        self
    }

    pub fn with_properties_schema(mut self, schema: Value) -> Self {
        self.properties = Some(schema);
        self
    }

    pub fn with_validation(mut self, policy: ValidationPolicy) -> Self {
        self.validation = Some(policy);
        self
    }

    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Collection
    }

    /// Whether referenced resources must exist
    pub fn validates_referents(&self) -> bool {
        self.validation.as_ref().is_none_or(|policy| policy.validate)
    }

    /// Whether `reference` points into one of the allowed containers
    pub fn accepts_reference(&self, reference: &str) -> bool {
        self.resource_collections.is_empty()
            || self.resource_collections.iter().any(|container| {
                reference
                    .strip_prefix(container.trim_end_matches('/'))
                    .and_then(|rest| rest.strip_prefix('/'))
                    .is_some_and(|id| !id.is_empty() && !id.contains('/'))
            })
    }

    /// Check the descriptor itself
    pub fn check(&self) -> Result<(), PropertiesError> {
        if self.name.is_empty() || self.name.contains('/') {
            return Err(PropertiesError::InvalidSchema(format!(
                "Invalid relationship field name '{}'",
                self.name
            )));
        }
        match &self.properties {
            Some(schema) => PropertiesValidator::parse_schema(schema),
            None => Ok(()),
        }
    }
}
