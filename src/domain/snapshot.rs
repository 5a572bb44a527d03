//! Snapshot Document: the mutable, de-duplicated projection of one
//! learner's annotations on one activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Activity, Actor, Annotation, AnnotationId, StatementId};

/// Default document id under which annotations are stored.
pub const DEFAULT_STATE_ID: &str = "annotations";

/// Addresses one snapshot document in the LRS state API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotKey {
    /// Activity IRI the annotations belong to.
    pub activity_id: String,
    /// Owner of the document.
    pub actor: Actor,
    /// Document id within the (activity, actor) pair.
    pub state_id: String,
}

impl SnapshotKey {
    /// Key for the default `annotations` document.
    #[must_use]
    pub fn new(activity_id: impl Into<String>, actor: Actor) -> Self {
        Self::with_state_id(activity_id, actor, DEFAULT_STATE_ID)
    }

    /// Key for an explicit document id.
    #[must_use]
    pub fn with_state_id(
        activity_id: impl Into<String>,
        actor: Actor,
        state_id: impl Into<String>,
    ) -> Self {
        Self {
            activity_id: activity_id.into(),
            actor,
            state_id: state_id.into(),
        }
    }

    /// Identity of the key for mutual exclusion.
    ///
    /// Built from the actor's canonical id so two spellings of the same
    /// agent serialize on the same lock. An actor without an IFI falls back
    /// to its JSON form.
    #[must_use]
    pub fn lock_id(&self) -> String {
        let actor = self.actor.canonical_id().map_or_else(
            || serde_json::to_string(&self.actor).unwrap_or_default(),
            |id| id.to_string(),
        );
        format!("{}\u{1f}{}\u{1f}{}", self.activity_id, actor, self.state_id)
    }
}

/// Current set of annotations for one [`SnapshotKey`].
///
/// Holds at most one entry per annotation id. Unknown top-level fields
/// written by other clients survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Annotations, unique by id.
    #[serde(alias = "highlights", default)]
    pub annotations: Vec<Annotation>,
    /// When the document was last written.
    #[serde(
        rename = "lastModified",
        alias = "date_created",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<DateTime<Utc>>,
    /// The activity the document describes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Activity>,
    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SnapshotDocument {
    /// Builds a document from a local collection, stamped with `now`.
    ///
    /// Later entries win over earlier ones with the same id.
    #[must_use]
    pub fn from_annotations<'a>(
        annotations: impl IntoIterator<Item = &'a Annotation>,
        object: Option<Activity>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut doc = Self {
            annotations: annotations.into_iter().map(Annotation::for_snapshot).collect(),
            last_modified: Some(now),
            object,
            extra: Map::new(),
        };
        doc.dedup();
        doc
    }

    /// Parses a stored JSON value.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the value does not have the document
    /// shape.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut doc: Self = serde_json::from_value(value)?;
        doc.dedup();
        Ok(doc)
    }

    /// Serializes the document.
    ///
    /// # Errors
    ///
    /// Returns the serde error if a metadata value cannot be represented.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Looks up an annotation by id.
    #[must_use]
    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| &a.id == id)
    }

    /// Removes every annotation whose `statement_id` equals `statement_id`.
    ///
    /// Returns the number of removed entries. Entries without a statement id
    /// are kept.
    pub fn remove_statement(&mut self, statement_id: StatementId) -> usize {
        let before = self.annotations.len();
        self.annotations
            .retain(|a| a.statement_id != Some(statement_id));
        before - self.annotations.len()
    }

    /// Collapses duplicate ids, keeping the last occurrence in the
    /// position of the first.
    fn dedup(&mut self) {
        let mut out: Vec<Annotation> = Vec::with_capacity(self.annotations.len());
        for annotation in self.annotations.drain(..) {
            match out.iter_mut().find(|a| a.id == annotation.id) {
                Some(existing) => *existing = annotation,
                None => out.push(annotation),
            }
        }
        self.annotations = out;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn annotated(id: &str, statement: Option<StatementId>) -> Annotation {
        let mut a = Annotation::new(id, "X", "note");
        a.statement_id = statement;
        a
    }

    #[test]
    fn reads_legacy_layout() {
        let json = serde_json::json!({
            "highlights": [{"id": "a1", "quote": "X", "text": "note"}],
            "date_created": "2024-03-01T10:00:00Z",
            "object": {"id": "https://example.org/node/1"},
        });
        let Ok(doc) = SnapshotDocument::from_value(json) else {
            panic!("legacy document should parse");
        };
        assert_eq!(doc.annotations.len(), 1);
        assert!(doc.last_modified.is_some());
        assert!(doc.extra.is_empty());
    }

    #[test]
    fn parse_collapses_duplicate_ids() {
        let json = serde_json::json!({
            "annotations": [
                {"id": "a1", "text": "first"},
                {"id": "a2", "text": "other"},
                {"id": "a1", "text": "second"},
            ],
        });
        let Ok(doc) = SnapshotDocument::from_value(json) else {
            panic!("document should parse");
        };
        assert_eq!(doc.annotations.len(), 2);
        assert_eq!(doc.annotations.first().map(|a| a.text.as_str()), Some("second"));
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(SnapshotDocument::from_value(serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn remove_statement_only_touches_matching_entries() {
        let target = StatementId::new();
        let mut doc = SnapshotDocument::from_annotations(
            &[
                annotated("a1", Some(target)),
                annotated("a2", Some(StatementId::new())),
                annotated("a3", None),
            ],
            None,
            Utc::now(),
        );
        assert_eq!(doc.remove_statement(target), 1);
        assert_eq!(doc.remove_statement(target), 0);
        assert_eq!(doc.annotations.len(), 2);
        assert!(doc.get(&AnnotationId::new("a3")).is_some());
    }

    #[test]
    fn unknown_fields_survive_rewrite() {
        let json = serde_json::json!({"annotations": [], "owner_note": "keep me"});
        let Ok(doc) = SnapshotDocument::from_value(json) else {
            panic!("document should parse");
        };
        let back = doc.to_value().unwrap_or_default();
        assert_eq!(back.get("owner_note").and_then(|v| v.as_str()), Some("keep me"));
    }

    #[test]
    fn lock_id_ignores_display_name() {
        let a = SnapshotKey::new("act-1", Actor::with_email("a@example.org").named("A"));
        let b = SnapshotKey::new("act-1", Actor::with_email("a@example.org"));
        assert_eq!(a.lock_id(), b.lock_id());
        let c = SnapshotKey::new("act-2", Actor::with_email("a@example.org"));
        assert_ne!(a.lock_id(), c.lock_id());
    }
}
