//! Relationship fields persisted as edge records
//!
//! Each relationship between two managed resources is one edge record in
//! the relationship container. The providers in this module translate
//! between the edges and the field values clients read and write:
//!
//! - [`CollectionRelationshipProvider`] for fields holding an array of
//!   references
//! - [`SingletonRelationshipProvider`] for fields holding at most one
//!
//! [`new_provider`] picks the right one for a field descriptor.

pub mod activity;
pub mod collection;
pub mod edges;
pub mod filter;
pub mod identity;
pub mod locks;
pub(crate) mod measure;
pub mod provider;
pub mod reference;
pub mod singleton;
pub mod validator;

pub use activity::{ActivityLogger, ActivityStatus, NoopActivityLogger, TracingActivityLogger};
pub use collection::CollectionRelationshipProvider;
pub use edges::EdgeOperations;
pub use filter::{as_relationship_query_filter, transform_field};
pub use identity::RelationshipIdentity;
pub use locks::OwnerLocks;
pub use provider::RelationshipProvider;
pub use reference::RelationshipReference;
pub use singleton::SingletonRelationshipProvider;
pub use validator::RelationshipValidator;

use std::sync::Arc;
use tracing::info;

use crate::config::RelationshipConfig;
use crate::schema::{Cardinality, SchemaField};
use crate::storage::traits::ResourceStore;
use crate::{LinksetError, Result};

/// Build the provider for `field` on resources under `resource_container`
pub fn new_provider(
    resource_container: &str,
    field: SchemaField,
    store: Arc<dyn ResourceStore>,
    validator: RelationshipValidator,
    config: &RelationshipConfig,
    activity: Arc<dyn ActivityLogger>,
) -> Result<Arc<dyn RelationshipProvider>> {
    field.check().map_err(|e| {
        LinksetError::Configuration(format!(
            "Invalid relationship field '{}' on {}: {}",
            field.name, resource_container, e
        ))
    })?;

    info!(
        "Creating {:?} relationship provider for {} field {} (reverse: {})",
        field.cardinality, resource_container, field.name, field.is_reverse_relationship
    );

    let provider: Arc<dyn RelationshipProvider> = match field.cardinality {
        Cardinality::Collection => Arc::new(CollectionRelationshipProvider::new(
            resource_container,
            field,
            store,
            validator,
            config,
            activity,
        )),
        Cardinality::Single => Arc::new(SingletonRelationshipProvider::new(
            resource_container,
            field,
            store,
            validator,
            config,
        )),
    };
    Ok(provider)
}
