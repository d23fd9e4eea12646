//! Rewriting of client query filters into edge-record filters
//!
//! | client pointer           | store field                                |
//! |--------------------------|--------------------------------------------|
//! | `/_id`                   | `/_id`                                     |
//! | `/_rev`                  | `/_rev`                                    |
//! | `/_ref`                  | `/secondId`, or `/firstId` on reverse fields |
//! | `/_refProperties/<rest>` | `/properties/<rest>`                       |
//!
//! Any other pointer is carried over unchanged.

use crate::query::{JsonPointer, QueryFilter};
use crate::storage::models::{
    FIELD_CONTENT_ID, FIELD_CONTENT_REVISION, REPO_FIELD_FIRST_ID, REPO_FIELD_PROPERTIES,
    REPO_FIELD_SECOND_ID,
};

use super::reference::{FIELD_ID, FIELD_PROPERTIES, FIELD_REFERENCE, FIELD_REV};

/// Rewrite a client filter for a field whose direction is given by
/// `is_reverse`. Only leaves change; the tree shape is preserved.
pub fn as_relationship_query_filter(
    is_reverse: bool,
    filter: &QueryFilter<JsonPointer>,
) -> QueryFilter<JsonPointer> {
    filter.map_fields(&mut |field| transform_field(is_reverse, field))
}

/// Map one client pointer to the edge-record pointer it reads
pub fn transform_field(is_reverse: bool, field: &JsonPointer) -> JsonPointer {
    match field.first() {
        Some(FIELD_ID) if field.len() == 1 => JsonPointer::new(FIELD_CONTENT_ID),
        Some(FIELD_REV) if field.len() == 1 => JsonPointer::new(FIELD_CONTENT_REVISION),
        Some(FIELD_REFERENCE) if field.len() == 1 => {
            // the referenced resource is the endpoint opposite to the owner
            if is_reverse {
                JsonPointer::new(REPO_FIELD_FIRST_ID)
            } else {
                JsonPointer::new(REPO_FIELD_SECOND_ID)
            }
        }
        Some(FIELD_PROPERTIES) => {
            let mut segments = vec![REPO_FIELD_PROPERTIES.to_string()];
            segments.extend(field.relative(1).segments().iter().cloned());
            JsonPointer::from_segments(segments)
        }
        _ => field.clone(),
    }
}

/// Whether `field` is one of the client pointers the rewriter maps
pub fn is_recognized_field(field: &JsonPointer) -> bool {
    match field.first() {
        Some(FIELD_ID | FIELD_REV | FIELD_REFERENCE) => field.len() == 1,
        Some(FIELD_PROPERTIES) => true,
        _ => false,
    }
}

/// Leaf pointers of `filter` that the rewriter would pass through unchanged
pub fn unrecognized_fields(filter: &QueryFilter<JsonPointer>) -> Vec<&JsonPointer> {
    filter
        .fields()
        .into_iter()
        .filter(|field| !is_recognized_field(field))
        .collect()
}
