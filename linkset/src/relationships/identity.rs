//! Store-independent identity of a relationship

use serde_json::Value;
use std::collections::HashSet;

use super::reference::RelationshipReference;

/// Identity of a reference: its target plus the edge properties that
/// distinguish it, ignoring the edge's own `_id`/`_rev`.
///
/// Two references with equal identities describe the same edge whether or
/// not either has been persisted yet. The properties are kept in canonical
/// JSON form (object keys sorted) so equality and hashing are computed once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipIdentity {
    reference: Option<String>,
    properties: String,
}

impl RelationshipIdentity {
    pub fn of(reference: &RelationshipReference) -> Self {
        Self {
            reference: reference.reference.clone(),
            properties: Value::Object(reference.property_fields()).to_string(),
        }
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

impl From<&RelationshipReference> for RelationshipIdentity {
    fn from(reference: &RelationshipReference) -> Self {
        Self::of(reference)
    }
}

/// Identities of every reference in `references`
pub fn identities<'a, I>(references: I) -> HashSet<RelationshipIdentity>
where
    I: IntoIterator<Item = &'a RelationshipReference>,
{
    references.into_iter().map(RelationshipIdentity::of).collect()
}
