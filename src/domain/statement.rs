//! Event Records: immutable xAPI statements appended to the LRS.
//!
//! Only the parts of the xAPI statement model this crate reasons about are
//! typed. Everything else (`context`, `authority`, `stored`, ...) is kept in
//! `extra` fields so a statement fetched from the store round-trips intact.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Actor, StatementId};

/// Verb IRI for creating or updating an annotation.
pub const ANNOTATED_VERB_ID: &str = "https://w3id.org/xapi/adb/verbs/annotated";

/// Verb IRI for voiding a prior statement.
pub const VOIDED_VERB_ID: &str = "http://adlnet.gov/expapi/verbs/voided";

/// Builds the extension key under which the highlighted quote is stored.
#[must_use]
pub fn highlight_extension_key(activity_id: &str) -> String {
    format!("{activity_id}/highlight/value")
}

/// Discriminant of the verbs this crate cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbKind {
    /// An annotation was created or updated.
    Annotated,
    /// A prior statement was voided.
    Voided,
    /// Any other verb.
    Other,
}

/// xAPI verb: an IRI plus an optional language map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verb {
    /// Verb IRI.
    pub id: String,
    /// Human-readable display, keyed by language tag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub display: BTreeMap<String, String>,
}

impl Verb {
    fn with_display(id: &str, display: &str) -> Self {
        Self {
            id: id.to_string(),
            display: BTreeMap::from([("en-US".to_string(), display.to_string())]),
        }
    }

    /// The `annotated` verb.
    #[must_use]
    pub fn annotated() -> Self {
        Self::with_display(ANNOTATED_VERB_ID, "annotated")
    }

    /// The `voided` verb.
    #[must_use]
    pub fn voided() -> Self {
        Self::with_display(VOIDED_VERB_ID, "voided")
    }

    /// Classifies the verb IRI.
    #[must_use]
    pub fn kind(&self) -> VerbKind {
        match self.id.as_str() {
            ANNOTATED_VERB_ID => VerbKind::Annotated,
            VOIDED_VERB_ID => VerbKind::Voided,
            _ => VerbKind::Other,
        }
    }
}

/// Definition block of an activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityDefinition {
    /// Activity name keyed by language tag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub name: BTreeMap<String, String>,
    /// Extension values keyed by IRI.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
    /// Remaining definition fields (`type`, `description`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The piece of content an annotation is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity IRI.
    pub id: String,
    /// Optional definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<ActivityDefinition>,
}

impl Activity {
    /// An activity with no definition.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            definition: None,
        }
    }

    /// Sets the activity name for one language.
    #[must_use]
    pub fn named(mut self, language: &str, name: &str) -> Self {
        self.definition
            .get_or_insert_with(ActivityDefinition::default)
            .name
            .insert(language.to_string(), name.to_string());
        self
    }
}

/// Statement target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObject", into = "RawObject")]
pub enum StatementObject {
    /// An activity (annotation statements).
    Activity(Activity),
    /// A reference to another statement (void statements).
    StatementRef(StatementId),
}

#[derive(Serialize, Deserialize)]
struct RawObject {
    #[serde(rename = "objectType", default, skip_serializing_if = "Option::is_none")]
    object_type: Option<String>,
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    definition: Option<ActivityDefinition>,
}

impl TryFrom<RawObject> for StatementObject {
    type Error = String;

    fn try_from(raw: RawObject) -> Result<Self, Self::Error> {
        match raw.object_type.as_deref() {
            None | Some("Activity") => Ok(Self::Activity(Activity {
                id: raw.id,
                definition: raw.definition,
            })),
            Some("StatementRef") => raw
                .id
                .parse()
                .map(Self::StatementRef)
                .map_err(|e| format!("invalid StatementRef id {}: {e}", raw.id)),
            Some(other) => Err(format!("unsupported object type: {other}")),
        }
    }
}

impl From<StatementObject> for RawObject {
    fn from(object: StatementObject) -> Self {
        match object {
            StatementObject::Activity(activity) => Self {
                object_type: Some("Activity".to_string()),
                id: activity.id,
                definition: activity.definition,
            },
            StatementObject::StatementRef(id) => Self {
                object_type: Some("StatementRef".to_string()),
                id: id.to_string(),
                definition: None,
            },
        }
    }
}

/// Statement result block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    /// Free-text response; carries the annotation note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Remaining result fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An immutable fact in the LRS log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Globally unique id, chosen by the client.
    pub id: StatementId,
    /// Who made the statement.
    pub actor: Actor,
    /// What happened.
    pub verb: Verb,
    /// What it happened to.
    pub object: StatementObject,
    /// Outcome (the annotation note).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StatementResult>,
    /// When it happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Fields set by the store or other producers.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Statement {
    /// Classifies the statement by verb.
    #[must_use]
    pub fn kind(&self) -> VerbKind {
        self.verb.kind()
    }

    /// Returns the voided statement id if this is a well-formed void.
    #[must_use]
    pub fn voided_target(&self) -> Option<StatementId> {
        match (self.verb.kind(), &self.object) {
            (VerbKind::Voided, StatementObject::StatementRef(target)) => Some(*target),
            _ => None,
        }
    }

    /// Returns the activity this statement targets, if any.
    #[must_use]
    pub fn activity(&self) -> Option<&Activity> {
        match &self.object {
            StatementObject::Activity(activity) => Some(activity),
            StatementObject::StatementRef(_) => None,
        }
    }

    /// Returns the highlighted quote embedded in the activity extension.
    #[must_use]
    pub fn quote(&self) -> Option<&str> {
        let activity = self.activity()?;
        activity
            .definition
            .as_ref()?
            .extensions
            .get(&highlight_extension_key(&activity.id))?
            .as_str()
    }

    /// Returns the annotation note from the result block.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.result.as_ref()?.response.as_deref()
    }
}
