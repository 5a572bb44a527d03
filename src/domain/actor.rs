//! xAPI actor (Agent) and its canonical identity.
//!
//! An [`Actor`] is identified by exactly one inverse functional identifier
//! (IFI). Display names are informational only and never take part in
//! equality; [`Actor::canonical_id`] is the only thing authorization looks at.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Account-based IFI (`{"homePage": ..., "name": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentAccount {
    /// Home page of the system the account belongs to.
    #[serde(rename = "homePage")]
    pub home_page: String,
    /// Account name (login or unique id) on that system.
    pub name: String,
}

/// The person who creates or voids an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Always `"Agent"` for the actors this crate produces.
    #[serde(rename = "objectType", default = "default_object_type")]
    pub object_type: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `mailto:` IRI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbox: Option<String>,
    /// Hex SHA-1 of the `mailto:` IRI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbox_sha1sum: Option<String>,
    /// OpenID URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openid: Option<String>,
    /// Account on some system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AgentAccount>,
}

fn default_object_type() -> String {
    "Agent".to_string()
}

/// Stable canonical identifier of an actor, derived from its IFI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(String);

impl ActorId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Actor {
    /// Agent identified by e-mail address.
    #[must_use]
    pub fn with_email(email: &str) -> Self {
        Self::with_mbox(format!("mailto:{email}"))
    }

    /// Agent identified by a full `mailto:` IRI.
    #[must_use]
    pub fn with_mbox(mbox: impl Into<String>) -> Self {
        Self {
            object_type: default_object_type(),
            name: None,
            mbox: Some(mbox.into()),
            mbox_sha1sum: None,
            openid: None,
            account: None,
        }
    }

    /// Agent identified by an account on `home_page`.
    #[must_use]
    pub fn with_account(home_page: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            object_type: default_object_type(),
            name: None,
            mbox: None,
            mbox_sha1sum: None,
            openid: None,
            account: Some(AgentAccount {
                home_page: home_page.into(),
                name: name.into(),
            }),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Canonical identifier used for equality and lock keys.
    ///
    /// IFIs are consulted in the order `mbox`, `mbox_sha1sum`, `openid`,
    /// `account`. Returns `None` for an actor that carries none of them.
    #[must_use]
    pub fn canonical_id(&self) -> Option<ActorId> {
        if let Some(mbox) = non_empty(self.mbox.as_deref()) {
            return Some(ActorId(format!("mbox:{}", mbox.to_ascii_lowercase())));
        }
        if let Some(sha) = non_empty(self.mbox_sha1sum.as_deref()) {
            return Some(ActorId(format!("mbox_sha1sum:{}", sha.to_ascii_lowercase())));
        }
        if let Some(openid) = non_empty(self.openid.as_deref()) {
            return Some(ActorId(format!("openid:{openid}")));
        }
        self.account
            .as_ref()
            .filter(|a| !a.home_page.is_empty() && !a.name.is_empty())
            .map(|a| ActorId(format!("account:{}|{}", a.home_page, a.name)))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
