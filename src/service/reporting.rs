//! Read-side listing of a learner's annotations across activities.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{ANNOTATED_VERB_ID, Actor, Statement, StatementId};
use crate::error::SyncError;
use crate::lrs::EventLog;

/// Languages tried after the caller's preferences.
const FALLBACK_LANGUAGES: [&str; 2] = ["en", "en-US"];

/// One annotation as shown in a learner's notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationSummary {
    /// Statement that recorded the annotation.
    pub statement_id: StatementId,
    /// Statement date as `MM/DD/YYYY`, empty when the statement has none.
    pub date: String,
    /// Annotated activity IRI.
    pub activity_id: String,
    /// Activity name in the best matching language, empty if none matches.
    pub activity_title: String,
    /// The learner's note.
    pub text: String,
    /// The highlighted passage.
    pub quote: String,
}

impl AnnotationSummary {
    /// Summarizes an `annotated` statement; `None` when it does not target
    /// a described activity.
    fn from_statement(statement: &Statement, languages: &[String]) -> Option<Self> {
        let activity = statement.activity()?;
        let definition = activity.definition.as_ref()?;
        let activity_title = languages
            .iter()
            .map(String::as_str)
            .chain(FALLBACK_LANGUAGES)
            .find_map(|lang| definition.name.get(lang))
            .cloned()
            .unwrap_or_default();

        Some(Self {
            statement_id: statement.id,
            date: statement
                .timestamp
                .map(|ts| ts.format("%m/%d/%Y").to_string())
                .unwrap_or_default(),
            activity_id: activity.id.clone(),
            activity_title,
            text: statement.text().unwrap_or_default().to_string(),
            quote: statement.quote().unwrap_or_default().to_string(),
        })
    }
}

/// Lists annotations straight from the statement log.
#[derive(Debug, Clone)]
pub struct AnnotationReport {
    events: Arc<dyn EventLog>,
}

impl AnnotationReport {
    /// Creates a report over `events`.
    #[must_use]
    pub fn new(events: Arc<dyn EventLog>) -> Self {
        Self { events }
    }

    /// Returns every live annotation of `actor`, in log order.
    ///
    /// Activity titles are picked from `languages` first, then `en`, then
    /// `en-US`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Lrs`] if the log cannot be queried.
    pub async fn list(
        &self,
        actor: &Actor,
        languages: &[String],
    ) -> Result<Vec<AnnotationSummary>, SyncError> {
        let statements = self
            .events
            .fetch_by_actor_and_verb(actor, ANNOTATED_VERB_ID)
            .await?;
        let summaries: Vec<_> = statements
            .iter()
            .filter_map(|s| AnnotationSummary::from_statement(s, languages))
            .collect();
        tracing::debug!(
            fetched = statements.len(),
            listed = summaries.len(),
            "annotation report built"
        );
        Ok(summaries)
    }
}

/// Parses an `Accept-Language` header into language tags by descending
/// quality. Wildcards and malformed entries are dropped.
#[must_use]
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut tagged: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .map_or(Some(1.0), |q| q.trim().parse::<f32>().ok())?;
            (quality > 0.0).then(|| (tag.to_string(), quality))
        })
        .collect();
    tagged.sort_by(|a, b| b.1.total_cmp(&a.1));
    tagged.into_iter().map(|(tag, _)| tag).collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{Activity, Annotation};
    use crate::lrs::InMemoryLrs;
    use crate::service::record_builder::RecordBuilder;

    fn alice() -> Actor {
        Actor::with_email("alice@example.org")
    }

    #[tokio::test]
    async fn lists_live_annotations_with_titles() {
        let lrs = Arc::new(InMemoryLrs::new());
        let activity = Activity::new("https://example.org/node/7")
            .named("en-US", "Seven")
            .named("fr", "Sept");
        let builder = RecordBuilder::new(alice(), activity);
        let mut kept = builder.annotated(&Annotation::new("a1", "quoted", "my note"));
        kept.timestamp = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).single();
        let gone = builder.annotated(&Annotation::new("a2", "other", "old"));
        let _ = lrs.submit_batch(&[kept.clone(), gone.clone()]).await;
        let _ = lrs.submit(&builder.void_of(gone.id)).await;

        let report = AnnotationReport::new(Arc::clone(&lrs) as Arc<dyn EventLog>);
        let Ok(list) = report.list(&alice(), &[]).await else {
            panic!("listing failed");
        };

        assert_eq!(
            list,
            vec![AnnotationSummary {
                statement_id: kept.id,
                date: "03/09/2024".to_string(),
                activity_id: "https://example.org/node/7".to_string(),
                activity_title: "Seven".to_string(),
                text: "my note".to_string(),
                quote: "quoted".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn preferred_language_wins() {
        let lrs = Arc::new(InMemoryLrs::new());
        let activity = Activity::new("act-1").named("en", "One").named("fr", "Un");
        let builder = RecordBuilder::new(alice(), activity);
        let _ = lrs.submit(&builder.annotated(&Annotation::new("a1", "q", "t"))).await;

        let report = AnnotationReport::new(Arc::clone(&lrs) as Arc<dyn EventLog>);
        let Ok(list) = report.list(&alice(), &["fr".to_string()]).await else {
            panic!("listing failed");
        };
        assert_eq!(list.first().map(|s| s.activity_title.as_str()), Some("Un"));
    }

    #[test]
    fn accept_language_orders_by_quality() {
        assert_eq!(
            parse_accept_language("fr;q=0.5, de, *;q=0.1, es;q=0"),
            vec!["de".to_string(), "fr".to_string()]
        );
        assert!(parse_accept_language("").is_empty());
    }
}
