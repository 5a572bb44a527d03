//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::DEFAULT_STATE_ID;

/// How an annotation update is written to the statement log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Submit one fresh `annotated` statement.
    #[default]
    Resubmit,
    /// Submit a void of the prior statement and a fresh `annotated`
    /// statement as one batch.
    VoidAndRecreate,
}

impl FromStr for UpdatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "resubmit" => Ok(Self::Resubmit),
            "void_and_recreate" | "void-and-recreate" => Ok(Self::VoidAndRecreate),
            other => Err(format!("unknown update policy: {other}")),
        }
    }
}

/// Which LRS implementation the server talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LrsBackend {
    /// A remote LRS over HTTP.
    #[default]
    Http,
    /// The in-process store (local development).
    Memory,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Connection settings for the remote LRS.
#[derive(Debug, Clone)]
pub struct LrsConfig {
    /// Base xAPI endpoint, e.g. `https://lrs.example.org/xapi`.
    pub endpoint: String,
    /// Basic-auth user name.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Value of the `X-Experience-API-Version` header.
    pub xapi_version: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for LrsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/xapi".to_string(),
            username: None,
            password: None,
            xapi_version: "1.0.3".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Top-level service configuration.
///
/// Loaded once at startup via [`SyncConfig::from_env`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Socket address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
    /// Which store implementation to use.
    pub lrs_backend: LrsBackend,
    /// Remote LRS settings.
    pub lrs: LrsConfig,
    /// Document id of the snapshot in the state API.
    pub state_id: String,
    /// Update policy for mirrors created by this process.
    pub update_policy: UpdatePolicy,
    /// Capacity of the `EventBus` broadcast channel.
    pub event_bus_capacity: usize,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            lrs_backend: LrsBackend::default(),
            lrs: LrsConfig::default(),
            state_id: DEFAULT_STATE_ID.to_string(),
            update_policy: UpdatePolicy::default(),
            event_bus_capacity: 1024,
            log_format: LogFormat::default(),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` or `UPDATE_POLICY` is set but
    /// cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let lrs_backend = match std::env::var("LRS_BACKEND").ok().as_deref() {
            Some("memory") | Some("MEMORY") => LrsBackend::Memory,
            _ => LrsBackend::Http,
        };

        let defaults = LrsConfig::default();
        let lrs = LrsConfig {
            endpoint: std::env::var("LRS_ENDPOINT").unwrap_or(defaults.endpoint),
            username: std::env::var("LRS_USERNAME").ok(),
            password: std::env::var("LRS_PASSWORD").ok(),
            xapi_version: std::env::var("LRS_XAPI_VERSION").unwrap_or(defaults.xapi_version),
            timeout: Duration::from_secs(parse_env("LRS_TIMEOUT_SECS", 30)),
        };

        let state_id =
            std::env::var("SNAPSHOT_STATE_ID").unwrap_or_else(|_| DEFAULT_STATE_ID.to_string());

        let update_policy = match std::env::var("UPDATE_POLICY") {
            Ok(raw) => raw.parse::<UpdatePolicy>().map_err(anyhow::Error::msg)?,
            Err(_) => UpdatePolicy::default(),
        };

        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 1024);

        let log_format = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            lrs_backend,
            lrs,
            state_id,
            update_policy,
            event_bus_capacity,
            log_format,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
