//! Concurrent fan-out of edge writes

pub mod executor;
pub mod types;

pub use executor::{BatchExecutor, BatchExecutorConfig};
pub use types::{BatchError, BatchOperation, BatchReport};
