//! # Linkset
//!
//! Relationship fields for managed-object stores. A relationship between two
//! resources is persisted as a directional edge record in a dedicated
//! container, and the field on either resource is computed from those edges.
//!
//! ## Quick Start
//!
//! ```rust
//! use linkset::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let store = Arc::new(MemoryResourceStore::new());
//! let config = ConfigBuilder::new().build()?;
//! let validator = RelationshipValidator::new(store.clone(), config.relationships.repository_path.clone());
//!
//! let roles = new_provider(
//!     "managed/user",
//!     SchemaField::collection("roles").with_reverse_property_name("members"),
//!     store,
//!     validator,
//!     &config.relationships,
//!     Arc::new(TracingActivityLogger),
//! )?;
//!
//! let context = RequestContext::new();
//! let _roles = roles.get_relationship_value(&context, "alice").await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **storage**: the [`ResourceStore`](storage::ResourceStore) collaborator
//!   and an in-memory implementation
//! - **query**: filters, pointers and paged query requests
//! - **relationships**: the collection and singleton providers, reference
//!   validation and client filter rewriting
//! - **batch**: bounded concurrent fan-out of edge writes

pub mod batch;
pub mod config;
pub mod context;
pub mod logging;
pub mod query;
pub mod relationships;
pub mod schema;
pub mod storage;

/// The prelude re-exports commonly used types for convenience
pub mod prelude {
    pub use crate::config::{ConfigBuilder, ConfigLoader, LinksetConfig, RelationshipConfig};
    pub use crate::context::RequestContext;
    pub use crate::query::{JsonPointer, QueryFilter, QueryRequest, QueryResponse, SortKey};
    pub use crate::relationships::{
        ActivityLogger, CollectionRelationshipProvider, NoopActivityLogger, RelationshipProvider,
        RelationshipReference, RelationshipValidator, SingletonRelationshipProvider,
        TracingActivityLogger, new_provider,
    };
    pub use crate::schema::{Cardinality, SchemaField};
    pub use crate::storage::{MemoryResourceStore, ResourceStore, StorageError};

    pub use crate::{LinksetError, Result};
}

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for Linkset operations
#[derive(Debug, thiserror::Error)]
pub enum LinksetError {
    /// Malformed input: bad shape, unsupported query id or filter field
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Owner resource or edge does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Revision mismatch on an edge write
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Missing referent, duplicate assignment or duplicate in one request
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation not defined for this kind of field
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Unexpected store or engine failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Logging error
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LogError),
}

impl From<crate::config::ConfigError> for LinksetError {
    fn from(err: crate::config::ConfigError) -> Self {
        LinksetError::Configuration(err.to_string())
    }
}

impl From<crate::query::FilterParseError> for LinksetError {
    fn from(err: crate::query::FilterParseError) -> Self {
        LinksetError::BadRequest(err.to_string())
    }
}

/// Result type for Linkset operations
pub type Result<T> = std::result::Result<T, LinksetError>;

/// Load the configuration from default files and the environment, then
/// initialize logging from it.
///
/// Returns the configuration and the guard of the log file writer, if any.
pub fn init() -> Result<(config::LinksetConfig, Option<tracing_appender::non_blocking::WorkerGuard>)> {
    let config = config::ConfigLoader::new()
        .load_default_files()
        .load_env()
        .extract()?;
    let guard = logging::init(&config.logging)?;
    tracing::info!("Linkset {} initialized", VERSION);
    Ok((config, guard))
}
