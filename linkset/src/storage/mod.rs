//! Store collaborator abstractions
//!
//! Edges and the resources they join live in a record store reached through
//! the [`ResourceStore`] trait. This module defines that trait, the records
//! it exchanges and its error type.
//!
//! ## Implementations
//!
//! - **Memory**: [`MemoryResourceStore`], an in-memory store for testing and
//!   embedding. It has no persistence and no indexes.

pub mod errors;
pub mod memory;
pub mod models;
pub mod traits;

pub use errors::{StorageError, StorageResult};
pub use memory::MemoryResourceStore;
pub use models::{EdgeRecord, QueryResults, ResourceRecord};
pub use traits::ResourceStore;
