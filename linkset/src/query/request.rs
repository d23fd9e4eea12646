//! Query requests and paged responses

use super::filter::QueryFilter;
use super::pointer::JsonPointer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Query id returning only identifiers of matching records
pub const QUERY_ALL_IDS: &str = "query-all-ids";

/// Query id returning every record, equivalent to no filter
pub const QUERY_ALL: &str = "query-all";

/// Sort order on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: JsonPointer,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

fn default_ascending() -> bool {
    true
}

impl SortKey {
    pub fn ascending(field: impl Into<JsonPointer>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn descending(field: impl Into<JsonPointer>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// How the total number of paged results is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalPagedResultsPolicy {
    /// No total is computed
    #[default]
    None,
    /// An estimate is acceptable
    Estimate,
    /// The exact total is computed
    Exact,
}

/// A query over a container of records.
///
/// The same type carries both client-side requests (filters over client
/// field names) and the store-side requests they are translated into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query_id: Option<String>,
    pub query_filter: Option<QueryFilter<JsonPointer>>,
    /// Native store query text; never accepted on relationship fields
    pub query_expression: Option<String>,
    /// Zero means unpaged
    pub page_size: usize,
    pub paged_results_offset: usize,
    pub paged_results_cookie: Option<String>,
    pub total_paged_results_policy: TotalPagedResultsPolicy,
    pub sort_keys: Vec<SortKey>,
    pub additional_parameters: BTreeMap<String, String>,
    /// Fields to return; empty means all
    pub fields: Vec<JsonPointer>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    pub fn with_filter(mut self, filter: QueryFilter<JsonPointer>) -> Self {
        self.query_filter = Some(filter);
        self
    }

    pub fn with_query_expression(mut self, expression: impl Into<String>) -> Self {
        self.query_expression = Some(expression.into());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.paged_results_offset = offset;
        self
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.paged_results_cookie = Some(cookie.into());
        self
    }

    pub fn with_total_paged_results_policy(mut self, policy: TotalPagedResultsPolicy) -> Self {
        self.total_paged_results_policy = policy;
        self
    }

    pub fn with_sort_key(mut self, key: SortKey) -> Self {
        self.sort_keys.push(key);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<JsonPointer>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Parse a filter expression and set it as this request's filter
    pub fn with_filter_expression(
        self,
        expression: &str,
    ) -> Result<Self, super::parser::FilterParseError> {
        Ok(self.with_filter(QueryFilter::parse(expression)?))
    }

    /// Copy paging and sorting from another request.
    ///
    /// Field selection is left out; it applies to the reshaped client records,
    /// not to the store records they are built from.
    pub fn with_paging_from(mut self, other: &QueryRequest) -> Self {
        self.page_size = other.page_size;
        self.paged_results_offset = other.paged_results_offset;
        self.paged_results_cookie = other.paged_results_cookie.clone();
        self.total_paged_results_policy = other.total_paged_results_policy;
        self.sort_keys = other.sort_keys.clone();
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.additional_parameters.get(name).map(String::as_str)
    }
}

/// Paging information returned alongside query results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Cookie for the next page, absent on the last page
    pub paged_results_cookie: Option<String>,
    /// Total number of matching records, when requested
    pub total_paged_results: Option<usize>,
    pub remaining_paged_results: Option<usize>,
}

/// Sort items in place by the given keys, reading each item's document
/// through `document`
pub(crate) fn sort_by_keys<T, D>(items: &mut [T], keys: &[SortKey], document: D)
where
    D: Fn(&T) -> &Value,
{
    if keys.is_empty() {
        return;
    }
    items.sort_by(|a, b| {
        let (a, b) = (document(a), document(b));
        for key in keys {
            let left = key.field.resolve(a).unwrap_or(&Value::Null);
            let right = key.field.resolve(b).unwrap_or(&Value::Null);
            let ordering = super::filter::compare_values(left, right)
                .unwrap_or_else(|| left.to_string().cmp(&right.to_string()));
            let ordering = if key.ascending {
                ordering
            } else {
                ordering.reverse()
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}
