//! xAPI 1.0.3 client for a remote LRS.
//!
//! Wraps the `statements` and `activities/state` resources using
//! [`reqwest`]. Every request carries the `X-Experience-API-Version` header
//! and, when configured, HTTP basic auth.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

use super::{EventLog, LrsError, SnapshotStore};
use crate::config::LrsConfig;
use crate::domain::{Actor, SnapshotKey, Statement, StatementId};

/// Upper bound on `more` pages followed by one listing call.
const MAX_PAGES: usize = 100;

/// HTTP client for a single LRS.
#[derive(Debug, Clone)]
pub struct LrsClient {
    client: reqwest::Client,
    endpoint: String,
    credentials: Option<(String, Option<String>)>,
    xapi_version: String,
}

/// Body of `GET /statements` when listing.
#[derive(Debug, Deserialize)]
struct StatementPage {
    #[serde(default)]
    statements: Vec<Statement>,
    #[serde(default)]
    more: Option<String>,
}

impl LrsClient {
    /// Creates a client with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`LrsError::Request`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &LrsConfig) -> Result<Self, LrsError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a client reusing an existing [`reqwest::Client`].
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &LrsConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
            xapi_version: config.xapi_version.clone(),
        }
    }

    fn request(&self, method: Method, resource: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{resource}", self.endpoint))
            .header("X-Experience-API-Version", &self.xapi_version);
        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, password.as_deref()),
            None => builder,
        }
    }

    fn state_query(key: &SnapshotKey) -> Result<[(&'static str, String); 3], LrsError> {
        Ok([
            ("activityId", key.activity_id.clone()),
            ("agent", serde_json::to_string(&key.actor)?),
            ("stateId", key.state_id.clone()),
        ])
    }

    /// Resolves a `more` link, which the LRS may return relative to its
    /// host root.
    fn resolve_more(&self, more: &str) -> Result<Url, LrsError> {
        let base = Url::parse(&self.endpoint)
            .map_err(|e| LrsError::Unavailable(format!("invalid endpoint {}: {e}", self.endpoint)))?;
        base.join(more)
            .map_err(|e| LrsError::Unavailable(format!("invalid more link {more}: {e}")))
    }

    /// Ensures the response has a success status code.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, LrsError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LrsError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Reads an optional JSON body: 404 and empty bodies are `None`.
    async fn optional_json(response: reqwest::Response) -> Result<Option<Value>, LrsError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[async_trait]
impl EventLog for LrsClient {
    async fn submit(&self, statement: &Statement) -> Result<StatementId, LrsError> {
        let response = self
            .request(Method::PUT, "statements")
            .query(&[("statementId", statement.id.to_string())])
            .json(statement)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        tracing::debug!(statement_id = %statement.id, verb = %statement.verb.id, "statement submitted");
        Ok(statement.id)
    }

    async fn submit_batch(&self, statements: &[Statement]) -> Result<Vec<StatementId>, LrsError> {
        let response = self
            .request(Method::POST, "statements")
            .json(statements)
            .send()
            .await?;
        let ids: Vec<StatementId> = Self::ensure_success(response).await?.json().await?;
        tracing::debug!(count = ids.len(), "statement batch submitted");
        Ok(ids)
    }

    async fn fetch(
        &self,
        id: StatementId,
        include_voided: bool,
    ) -> Result<Option<Statement>, LrsError> {
        let param = if include_voided {
            "voidedStatementId"
        } else {
            "statementId"
        };
        let response = self
            .request(Method::GET, "statements")
            .query(&[(param, id.to_string())])
            .send()
            .await?;
        match Self::optional_json(response).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn fetch_by_actor_and_verb(
        &self,
        actor: &Actor,
        verb_id: &str,
    ) -> Result<Vec<Statement>, LrsError> {
        let agent = serde_json::to_string(actor)?;
        let response = self
            .request(Method::GET, "statements")
            .query(&[("agent", agent.as_str()), ("verb", verb_id)])
            .send()
            .await?;
        let mut page: StatementPage = Self::ensure_success(response).await?.json().await?;
        let mut statements = std::mem::take(&mut page.statements);

        let mut pages = 1;
        while let Some(more) = page.more.take().filter(|m| !m.is_empty()) {
            if pages >= MAX_PAGES {
                tracing::warn!(pages, "statement listing truncated");
                break;
            }
            let url = self.resolve_more(&more)?;
            let mut builder = self
                .client
                .get(url)
                .header("X-Experience-API-Version", &self.xapi_version);
            if let Some((user, password)) = &self.credentials {
                builder = builder.basic_auth(user, password.as_deref());
            }
            let response = builder.send().await?;
            page = Self::ensure_success(response).await?.json().await?;
            statements.append(&mut page.statements);
            pages += 1;
        }

        Ok(statements)
    }
}

#[async_trait]
impl SnapshotStore for LrsClient {
    async fn get_document(&self, key: &SnapshotKey) -> Result<Option<Value>, LrsError> {
        let response = self
            .request(Method::GET, "activities/state")
            .query(&Self::state_query(key)?)
            .send()
            .await?;
        Self::optional_json(response).await
    }

    async fn put_document(&self, key: &SnapshotKey, document: &Value) -> Result<(), LrsError> {
        let response = self
            .request(Method::PUT, "activities/state")
            .query(&Self::state_query(key)?)
            .json(document)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}
