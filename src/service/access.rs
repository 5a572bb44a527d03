//! Access Verifier: only the original actor may void their own statement.

use crate::domain::Actor;

/// Result of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The actors match.
    Allowed,
    /// The actors differ, or one of them has no canonical identifier.
    Denied,
}

impl AccessDecision {
    /// Returns `true` for [`AccessDecision::Allowed`].
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Compares actor identities.
///
/// Equality is exact equality of [`Actor::canonical_id`]; display names and
/// other descriptive fields are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessVerifier;

impl AccessVerifier {
    /// Creates a verifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Allows `incoming` to act on something owned by `original`.
    #[must_use]
    pub fn authorize(&self, original: &Actor, incoming: &Actor) -> AccessDecision {
        match (original.canonical_id(), incoming.canonical_id()) {
            (Some(owner), Some(requester)) if owner == requester => AccessDecision::Allowed,
            (owner, requester) => {
                tracing::debug!(
                    owner = owner.as_ref().map(|id| id.as_str()),
                    requester = requester.as_ref().map(|id| id.as_str()),
                    "actor mismatch"
                );
                AccessDecision::Denied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_actor_is_allowed() {
        let verifier = AccessVerifier::new();
        let a = Actor::with_email("a@example.org");
        assert_eq!(verifier.authorize(&a, &a.clone().named("Alice")), AccessDecision::Allowed);
    }

    #[test]
    fn different_actor_is_denied() {
        let verifier = AccessVerifier::new();
        let a = Actor::with_email("a@example.org");
        let b = Actor::with_email("b@example.org");
        assert!(!verifier.authorize(&a, &b).is_allowed());
    }

    #[test]
    fn same_display_name_is_not_enough() {
        let verifier = AccessVerifier::new();
        let a = Actor::with_email("a@example.org").named("Sam");
        let b = Actor::with_email("b@example.org").named("Sam");
        assert_eq!(verifier.authorize(&a, &b), AccessDecision::Denied);
    }

    #[test]
    fn anonymous_actors_never_match() {
        let verifier = AccessVerifier::new();
        let mut anonymous = Actor::with_email("x@example.org");
        anonymous.mbox = None;
        assert_eq!(verifier.authorize(&anonymous, &anonymous), AccessDecision::Denied);
    }
}
