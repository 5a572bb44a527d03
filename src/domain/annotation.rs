//! The learner-facing annotation entity.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StatementId;

/// Client-assigned annotation identifier, stable for the annotation's
/// whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    /// Wraps a client-chosen identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A highlight plus note attached to some activity.
///
/// `statement_id` points at the latest non-voided statement describing
/// this annotation and stays `None` until the first submission succeeds.
/// Anything else the UI attaches (author, ranges, tags) lives in `metadata`
/// and is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Stable client-assigned id.
    pub id: AnnotationId,
    /// The highlighted source text.
    #[serde(default)]
    pub quote: String,
    /// The learner's note.
    #[serde(default)]
    pub text: String,
    /// Most recent statement describing this annotation.
    #[serde(
        rename = "statementId",
        alias = "statement_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub statement_id: Option<StatementId>,
    /// Opaque UI metadata.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Annotation {
    /// Creates a fresh, never-submitted annotation.
    #[must_use]
    pub fn new(id: impl Into<AnnotationId>, quote: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            quote: quote.into(),
            text: text.into(),
            statement_id: None,
            metadata: Map::new(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Overwrites every field except `id` with the values from `other`.
    ///
    /// Used when a remote copy is authoritative for an id already known
    /// locally.
    pub fn overwrite_from(&mut self, other: &Self) {
        self.quote.clone_from(&other.quote);
        self.text.clone_from(&other.text);
        self.statement_id = other.statement_id;
        self.metadata.clone_from(&other.metadata);
    }

    /// Returns the copy that goes into a snapshot document.
    ///
    /// An author descriptor stored as a JSON-encoded string is decoded so
    /// the document carries structured data; anything that fails to parse
    /// is kept as-is.
    #[must_use]
    pub fn for_snapshot(&self) -> Self {
        let mut copy = self.clone();
        if let Some(Value::String(raw)) = copy.metadata.get("user")
            && let Ok(parsed @ Value::Object(_)) = serde_json::from_str::<Value>(raw)
        {
            copy.metadata.insert("user".to_string(), parsed);
        }
        copy
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn accepts_legacy_statement_id_field() {
        let json = serde_json::json!({
            "id": "a1",
            "quote": "X",
            "text": "note",
            "statement_id": "6690b0a4-1b9c-4b0e-9a3e-5f1d0f4c2a11",
        });
        let Ok(annotation) = serde_json::from_value::<Annotation>(json) else {
            panic!("annotation should deserialize");
        };
        assert!(annotation.statement_id.is_some());
        assert!(annotation.metadata.is_empty());
    }

    #[test]
    fn carries_unknown_fields_opaquely() {
        let json = serde_json::json!({
            "id": "a1",
            "quote": "X",
            "text": "note",
            "ranges": [{"start": "/p[1]", "end": "/p[1]"}],
        });
        let Ok(annotation) = serde_json::from_value::<Annotation>(json.clone()) else {
            panic!("annotation should deserialize");
        };
        assert!(annotation.metadata.contains_key("ranges"));
        let back = serde_json::to_value(&annotation).unwrap_or_default();
        assert_eq!(back, json);
    }

    #[test]
    fn overwrite_keeps_id() {
        let mut local = Annotation::new("a1", "X", "old");
        let mut remote = Annotation::new("a1", "X", "new");
        remote.statement_id = Some(StatementId::new());
        local.overwrite_from(&remote);
        assert_eq!(local, remote);
    }

    #[test]
    fn snapshot_copy_decodes_string_user() {
        let annotation = Annotation::new("a1", "X", "note")
            .with_metadata("user", Value::String(r#"{"name":"A"}"#.to_string()));
        let copy = annotation.for_snapshot();
        assert_eq!(copy.metadata.get("user").and_then(|u| u.get("name")).and_then(|v| v.as_str()), Some("A"));
        assert!(annotation.metadata.get("user").is_some_and(serde_json::Value::is_string));
    }

    #[test]
    fn snapshot_copy_keeps_plain_string_user() {
        let annotation =
            Annotation::new("a1", "X", "note").with_metadata("user", Value::from("alice"));
        assert_eq!(annotation.for_snapshot().metadata.get("user").and_then(|v| v.as_str()), Some("alice"));
    }
}
