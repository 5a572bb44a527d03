//! Event Record Builder: turns annotations into statements.
//!
//! Construction is pure; submitting the result is the caller's job.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::domain::{
    Activity, ActivityDefinition, Actor, Annotation, Statement, StatementId, StatementObject,
    StatementResult, Verb, highlight_extension_key,
};
use crate::error::SyncError;

/// Which statement to build for an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOperation {
    /// First submission of an annotation.
    Create,
    /// Re-submission carrying new text.
    Update,
    /// Logical delete of the annotation's current statement.
    Void,
}

/// Builds statements for one (actor, activity) pair.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    actor: Actor,
    activity: Activity,
}

impl RecordBuilder {
    /// Creates a builder; the actor and activity are stamped on every
    /// statement it produces.
    #[must_use]
    pub fn new(actor: Actor, activity: Activity) -> Self {
        Self { actor, activity }
    }

    /// The actor statements are attributed to.
    #[must_use]
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// The activity annotations attach to.
    #[must_use]
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Builds the statement for `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NothingToVoid`] for [`RecordOperation::Void`]
    /// when the annotation has no `statement_id`.
    pub fn build(
        &self,
        annotation: &Annotation,
        operation: RecordOperation,
    ) -> Result<Statement, SyncError> {
        match operation {
            RecordOperation::Create | RecordOperation::Update => Ok(self.annotated(annotation)),
            RecordOperation::Void => self.voided(annotation),
        }
    }

    /// Builds an `annotated` statement with a fresh id.
    ///
    /// The quote goes into the activity extension
    /// `<activity-id>/highlight/value`, the note into `result.response`.
    /// Any extensions already on the activity are replaced.
    #[must_use]
    pub fn annotated(&self, annotation: &Annotation) -> Statement {
        let mut activity = self.activity.clone();
        let definition = activity
            .definition
            .get_or_insert_with(ActivityDefinition::default);
        definition.extensions = Map::from_iter([(
            highlight_extension_key(&activity.id),
            Value::String(annotation.quote.clone()),
        )]);

        Statement {
            id: StatementId::new(),
            actor: self.actor.clone(),
            verb: Verb::annotated(),
            object: StatementObject::Activity(activity),
            result: Some(StatementResult {
                response: Some(annotation.text.clone()),
                extra: Map::new(),
            }),
            timestamp: Some(Utc::now()),
            extra: Map::new(),
        }
    }

    /// Builds a void of the annotation's current statement.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NothingToVoid`] if the annotation was never
    /// submitted.
    pub fn voided(&self, annotation: &Annotation) -> Result<Statement, SyncError> {
        let target = annotation
            .statement_id
            .ok_or_else(|| SyncError::NothingToVoid(annotation.id.clone()))?;
        Ok(self.void_of(target))
    }

    /// Builds a void referencing `target` by id only.
    #[must_use]
    pub fn void_of(&self, target: StatementId) -> Statement {
        Statement {
            id: StatementId::new(),
            actor: self.actor.clone(),
            verb: Verb::voided(),
            object: StatementObject::StatementRef(target),
            result: None,
            timestamp: Some(Utc::now()),
            extra: Map::new(),
        }
    }
}
