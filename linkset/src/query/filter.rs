//! Query filter trees
//!
//! A [`QueryFilter`] is generic over the type naming its fields so the same
//! tree shape can describe client-side filters and the store-side filters
//! they are rewritten into. Rewriting only ever touches leaves; composite
//! nodes are carried over unchanged by [`QueryFilter::map_fields`].

use super::pointer::JsonPointer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operators supported in filter leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    /// Equal to
    Equals,
    /// Contains (substring or element in array)
    Contains,
    /// Starts with (for strings)
    StartsWith,
    /// Greater than
    GreaterThan,
    /// Greater than or equal to
    GreaterThanOrEqual,
    /// Less than
    LessThan,
    /// Less than or equal to
    LessThanOrEqual,
}

impl ComparisonOperator {
    /// Keyword used for this operator in filter expressions
    pub fn keyword(self) -> &'static str {
        match self {
            ComparisonOperator::Equals => "eq",
            ComparisonOperator::Contains => "co",
            ComparisonOperator::StartsWith => "sw",
            ComparisonOperator::GreaterThan => "gt",
            ComparisonOperator::GreaterThanOrEqual => "ge",
            ComparisonOperator::LessThan => "lt",
            ComparisonOperator::LessThanOrEqual => "le",
        }
    }

    /// Operator for a filter-expression keyword (case-insensitive)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "eq" => Some(ComparisonOperator::Equals),
            "co" => Some(ComparisonOperator::Contains),
            "sw" => Some(ComparisonOperator::StartsWith),
            "gt" => Some(ComparisonOperator::GreaterThan),
            "ge" => Some(ComparisonOperator::GreaterThanOrEqual),
            "lt" => Some(ComparisonOperator::LessThan),
            "le" => Some(ComparisonOperator::LessThanOrEqual),
            _ => None,
        }
    }
}

/// A query filter over fields named by `F`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFilter<F> {
    /// Literal `true` / `false`
    Boolean(bool),
    /// All sub-filters must match
    And(Vec<QueryFilter<F>>),
    /// At least one sub-filter must match
    Or(Vec<QueryFilter<F>>),
    /// Negation
    Not(Box<QueryFilter<F>>),
    /// `field <operator> value`
    Comparison {
        field: F,
        operator: ComparisonOperator,
        value: Value,
    },
    /// The field is present and not null
    Present { field: F },
}

impl<F> QueryFilter<F> {
    pub fn equal_to(field: impl Into<F>, value: impl Into<Value>) -> Self {
        Self::comparison(field, ComparisonOperator::Equals, value)
    }

    pub fn comparison(
        field: impl Into<F>,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Self {
        QueryFilter::Comparison {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn present(field: impl Into<F>) -> Self {
        QueryFilter::Present {
            field: field.into(),
        }
    }

    pub fn and(filters: Vec<QueryFilter<F>>) -> Self {
        QueryFilter::And(filters)
    }

    pub fn or(filters: Vec<QueryFilter<F>>) -> Self {
        QueryFilter::Or(filters)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: QueryFilter<F>) -> Self {
        QueryFilter::Not(Box::new(filter))
    }

    /// Rebuild the tree with every leaf field passed through `transform`.
    ///
    /// The shape of the tree (and every comparison operator and value) is
    /// preserved exactly.
    pub fn map_fields<G, T>(&self, transform: &mut T) -> QueryFilter<G>
    where
        T: FnMut(&F) -> G,
    {
        match self {
            QueryFilter::Boolean(value) => QueryFilter::Boolean(*value),
            QueryFilter::And(filters) => {
                QueryFilter::And(filters.iter().map(|f| f.map_fields(transform)).collect())
            }
            QueryFilter::Or(filters) => {
                QueryFilter::Or(filters.iter().map(|f| f.map_fields(transform)).collect())
            }
            QueryFilter::Not(filter) => QueryFilter::Not(Box::new(filter.map_fields(transform))),
            QueryFilter::Comparison {
                field,
                operator,
                value,
            } => QueryFilter::Comparison {
                field: transform(field),
                operator: *operator,
                value: value.clone(),
            },
            QueryFilter::Present { field } => QueryFilter::Present {
                field: transform(field),
            },
        }
    }

    /// Every field referenced by a leaf, in tree order
    pub fn fields(&self) -> Vec<&F> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut Vec<&'a F>) {
        match self {
            QueryFilter::Boolean(_) => {}
            QueryFilter::And(filters) | QueryFilter::Or(filters) => {
                for filter in filters {
                    filter.collect_fields(fields);
                }
            }
            QueryFilter::Not(filter) => filter.collect_fields(fields),
            QueryFilter::Comparison { field, .. } | QueryFilter::Present { field } => {
                fields.push(field)
            }
        }
    }
}

impl QueryFilter<JsonPointer> {
    /// Evaluate this filter against a JSON document
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            QueryFilter::Boolean(value) => *value,
            QueryFilter::And(filters) => filters.iter().all(|f| f.matches(document)),
            QueryFilter::Or(filters) => filters.iter().any(|f| f.matches(document)),
            QueryFilter::Not(filter) => !filter.matches(document),
            QueryFilter::Present { field } => {
                field.resolve(document).is_some_and(|value| !value.is_null())
            }
            QueryFilter::Comparison {
                field,
                operator,
                value,
            } => match field.resolve(document) {
                // multi-valued fields match when any element matches
                Some(actual @ Value::Array(items)) if *operator != ComparisonOperator::Contains => {
                    compare_leaf(actual, *operator, value)
                        || items.iter().any(|item| compare_leaf(item, *operator, value))
                }
                Some(actual) => compare_leaf(actual, *operator, value),
                None => false,
            },
        }
    }
}

fn compare_leaf(actual: &Value, operator: ComparisonOperator, expected: &Value) -> bool {
    match operator {
        ComparisonOperator::Equals => {
            compare_values(actual, expected).is_some_and(|ord| ord == Ordering::Equal)
        }
        ComparisonOperator::Contains => match (actual, expected) {
            (Value::String(a), Value::String(e)) => a.contains(e.as_str()),
            (Value::Array(items), e) => items.iter().any(|item| item == e),
            _ => false,
        },
        ComparisonOperator::StartsWith => match (actual, expected) {
            (Value::String(a), Value::String(e)) => a.starts_with(e.as_str()),
            _ => false,
        },
        ComparisonOperator::GreaterThan => {
            compare_values(actual, expected).is_some_and(|ord| ord == Ordering::Greater)
        }
        ComparisonOperator::GreaterThanOrEqual => {
            compare_values(actual, expected).is_some_and(|ord| ord != Ordering::Less)
        }
        ComparisonOperator::LessThan => {
            compare_values(actual, expected).is_some_and(|ord| ord == Ordering::Less)
        }
        ComparisonOperator::LessThanOrEqual => {
            compare_values(actual, expected).is_some_and(|ord| ord != Ordering::Greater)
        }
    }
}

/// Ordering between two scalar JSON values of the same kind.
///
/// Numbers compare numerically, strings lexically, booleans false < true.
/// Values of different kinds are incomparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

impl<F: fmt::Display> fmt::Display for QueryFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFilter::Boolean(value) => write!(f, "{}", value),
            QueryFilter::And(filters) => write_composite(f, "and", filters),
            QueryFilter::Or(filters) => write_composite(f, "or", filters),
            QueryFilter::Not(filter) => write!(f, "!({})", filter),
            QueryFilter::Comparison {
                field,
                operator,
                value,
            } => write!(f, "{} {} {}", field, operator.keyword(), value),
            QueryFilter::Present { field } => write!(f, "{} pr", field),
        }
    }
}

fn write_composite<F: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    keyword: &str,
    filters: &[QueryFilter<F>],
) -> fmt::Result {
    if filters.is_empty() {
        // empty conjunction is true, empty disjunction is false
        return write!(f, "{}", keyword == "and");
    }
    write!(f, "(")?;
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", keyword)?;
        }
        write!(f, "{}", filter)?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ptr(path: &str) -> JsonPointer {
        JsonPointer::new(path)
    }

    #[test]
    fn test_map_fields_preserves_shape() {
        let filter: QueryFilter<JsonPointer> = QueryFilter::and(vec![
            QueryFilter::equal_to(ptr("/a"), "x"),
            QueryFilter::not(QueryFilter::or(vec![
                QueryFilter::present(ptr("/b")),
                QueryFilter::Boolean(false),
            ])),
        ]);

        let mapped: QueryFilter<String> = filter.map_fields(&mut |field| format!("mapped{}", field));

        let expected: QueryFilter<String> = QueryFilter::and(vec![
            QueryFilter::equal_to("mapped/a".to_string(), "x"),
            QueryFilter::not(QueryFilter::or(vec![
                QueryFilter::present("mapped/b".to_string()),
                QueryFilter::Boolean(false),
            ])),
        ]);
        assert_eq!(mapped, expected);
    }

    #[test]
    fn test_fields_in_tree_order() {
        let filter: QueryFilter<JsonPointer> = QueryFilter::or(vec![
            QueryFilter::equal_to(ptr("/one"), 1),
            QueryFilter::and(vec![
                QueryFilter::present(ptr("/two")),
                QueryFilter::Boolean(true),
            ]),
        ]);
        let fields: Vec<String> = filter.fields().iter().map(|f| f.to_string()).collect();
        assert_eq!(fields, vec!["/one", "/two"]);
    }

    #[test]
    fn test_matches() {
        let document = json!({
            "firstId": "managed/user/1",
            "properties": {"level": 3, "tags": ["a", "b"], "note": "hello world"},
        });

        assert!(QueryFilter::equal_to(ptr("/firstId"), "managed/user/1").matches(&document));
        assert!(!QueryFilter::equal_to(ptr("/firstId"), "managed/user/2").matches(&document));
        assert!(
            QueryFilter::comparison(ptr("/properties/level"), ComparisonOperator::GreaterThan, 2)
                .matches(&document)
        );
        assert!(
            QueryFilter::comparison(ptr("/properties/note"), ComparisonOperator::Contains, "world")
                .matches(&document)
        );
        assert!(
            QueryFilter::comparison(ptr("/properties/tags"), ComparisonOperator::Contains, "b")
                .matches(&document)
        );
        assert!(QueryFilter::equal_to(ptr("/properties/tags"), "a").matches(&document));
        assert!(QueryFilter::present(ptr("/properties/level")).matches(&document));
        assert!(!QueryFilter::present(ptr("/secondPropertyName")).matches(&document));
        assert!(QueryFilter::<JsonPointer>::and(vec![]).matches(&document));
        assert!(!QueryFilter::<JsonPointer>::or(vec![]).matches(&document));
    }

    #[test]
    fn test_display() {
        let filter: QueryFilter<JsonPointer> = QueryFilter::and(vec![
            QueryFilter::equal_to(ptr("/_ref"), "managed/role/1"),
            QueryFilter::not(QueryFilter::present(ptr("/_refProperties/temporal"))),
        ]);
        assert_eq!(
            filter.to_string(),
            "(/_ref eq \"managed/role/1\" and !(/_refProperties/temporal pr))"
        );
    }
}
