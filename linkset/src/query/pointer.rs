//! JSON pointers addressing fields of client and store documents

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A parsed JSON pointer (`/a/b/c`).
///
/// Both the leading slash and RFC 6901 escapes (`~0`, `~1`) are optional on
/// input; [`fmt::Display`] always renders the canonical, escaped form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    /// Parse a pointer from its string form
    pub fn new(path: &str) -> Self {
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
            .collect();
        Self { segments }
    }

    /// Build a pointer from already-unescaped segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Pointer to the root of a document
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First segment, if any
    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Last segment, if any
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// A new pointer with `segment` appended
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// The pointer that remains after dropping the first `count` segments
    pub fn relative(&self, count: usize) -> Self {
        Self {
            segments: self.segments.iter().skip(count).cloned().collect(),
        }
    }

    /// Whether this pointer starts with every segment of `prefix`
    pub fn starts_with(&self, prefix: &JsonPointer) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self
                .segments
                .iter()
                .zip(prefix.segments.iter())
                .all(|(a, b)| a == b)
    }

    /// Resolve the pointer against a JSON document.
    ///
    /// Object members are looked up by name and array elements by index.
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl From<&str> for JsonPointer {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for JsonPointer {
    fn from(path: String) -> Self {
        Self::new(&path)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let path = String::deserialize(deserializer)?;
        Ok(Self::new(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_display() {
        let pointer = JsonPointer::new("/_refProperties/grantType");
        assert_eq!(pointer.len(), 2);
        assert_eq!(pointer.first(), Some("_refProperties"));
        assert_eq!(pointer.leaf(), Some("grantType"));
        assert_eq!(pointer.to_string(), "/_refProperties/grantType");

        // leading slash is optional
        assert_eq!(JsonPointer::new("_ref"), JsonPointer::new("/_ref"));
    }

    #[test]
    fn test_escaped_segments() {
        let pointer = JsonPointer::new("/a~1b/c~0d");
        assert_eq!(pointer.segments(), &["a/b".to_string(), "c~d".to_string()]);
        assert_eq!(pointer.to_string(), "/a~1b/c~0d");
    }

    #[test]
    fn test_relative_and_child() {
        let pointer = JsonPointer::new("/_refProperties/nested/value");
        assert_eq!(pointer.relative(1), JsonPointer::new("/nested/value"));
        assert_eq!(
            JsonPointer::new("/properties").child("nested"),
            JsonPointer::new("/properties/nested")
        );
        assert!(pointer.starts_with(&JsonPointer::new("/_refProperties")));
        assert!(!pointer.starts_with(&JsonPointer::new("/_ref")));
    }

    #[test]
    fn test_resolve() {
        let document = json!({
            "properties": {"roles": ["admin", "user"], "since": 2020},
        });
        assert_eq!(
            JsonPointer::new("/properties/since").resolve(&document),
            Some(&json!(2020))
        );
        assert_eq!(
            JsonPointer::new("/properties/roles/1").resolve(&document),
            Some(&json!("user"))
        );
        assert!(JsonPointer::new("/missing").resolve(&document).is_none());
        assert_eq!(JsonPointer::root().resolve(&document), Some(&document));
    }
}
