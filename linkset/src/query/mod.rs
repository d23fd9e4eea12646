//! Query model shared by clients and the store collaborator
//!
//! - [`JsonPointer`]: field addresses in client and store documents
//! - [`QueryFilter`]: filter trees, generic over their field type
//! - [`QueryRequest`] / [`QueryResponse`]: paging, sorting and query ids

pub mod filter;
pub mod parser;
pub mod pointer;
pub mod request;

pub use filter::{ComparisonOperator, QueryFilter};
pub use parser::FilterParseError;
pub use pointer::JsonPointer;
pub use request::{
    QUERY_ALL, QUERY_ALL_IDS, QueryRequest, QueryResponse, SortKey, TotalPagedResultsPolicy,
};
