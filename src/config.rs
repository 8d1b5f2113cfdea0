//! Listener configuration loaded from environment variables.
//!
//! Read once when the host loads the listener (or a `.env` file via
//! `dotenvy`). Project and topic are required; everything else has a
//! default. Invalid values fail startup rather than the first event.
//!
//! | Variable                  | Default                          |
//! |---------------------------|----------------------------------|
//! | `DATACATALOG_PROJECT_ID`  | required                         |
//! | `DATACATALOG_TOPIC_ID`    | required                         |
//! | `METASTORE_HOST_NAME`     | local host name                  |
//! | `LISTENER_FAILURE_POLICY` | `fail_closed`                    |
//! | `PUBLISH_MAX_ATTEMPTS`    | `3`                              |
//! | `PUBLISH_RETRY_BASE_MS`   | `200`                            |
//! | `PUBLISH_RETRY_MAX_MS`    | `5000`                           |
//! | `PUBSUB_ENDPOINT`         | `https://pubsub.googleapis.com`  |
//! | `PUBSUB_EMULATOR_HOST`    | unset                            |
//! | `PUBSUB_ACCESS_TOKEN`     | unset                            |
//! | `PUBSUB_TIMEOUT_SECS`     | `30`                             |
//! | `GCE_METADATA_HOST`       | `metadata.google.internal`       |
//!
//! Without `METASTORE_HOST_NAME` the origin host is taken from `$HOSTNAME`,
//! `%COMPUTERNAME%` or `/etc/hostname`, whichever is found first. Shells
//! rarely export `HOSTNAME` and `/etc/hostname` only exists on Linux, so on
//! macOS and other platforms the envelope says `localhost` unless the
//! override is set.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::gateway::pubsub::{DEFAULT_ENDPOINT, DEFAULT_METADATA_HOST};
use crate::gateway::{Credentials, PubSubSettings};
use crate::service::RetryPolicy;

/// What the listener does when an event cannot be published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Fail the catalog operation that fired the hook.
    #[default]
    FailClosed,
    /// Log the failure and let the catalog operation succeed.
    FailOpen,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_closed" | "fail-closed" | "closed" => Ok(Self::FailClosed),
            "fail_open" | "fail-open" | "open" => Ok(Self::FailOpen),
            other => Err(format!(
                "unknown failure policy {other:?}; expected fail_closed or fail_open"
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailClosed => f.write_str("fail_closed"),
            Self::FailOpen => f.write_str("fail_open"),
        }
    }
}

/// Top-level listener configuration.
///
/// Loaded once via [`ListenerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Project owning the topic.
    pub project_id: String,

    /// Topic id (or fully-qualified topic path).
    pub topic_id: String,

    /// Origin host stamped on every envelope.
    pub host_name: String,

    /// Behaviour on publish failure.
    pub failure_policy: FailurePolicy,

    /// Call-site retry bound for transient failures.
    pub retry: RetryPolicy,

    /// Pub/Sub REST endpoint root.
    pub pubsub_endpoint: String,

    /// Emulator `host:port`; disables authentication when set.
    pub emulator_host: Option<String>,

    /// Static bearer token.
    pub access_token: Option<String>,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,

    /// Metadata server root used to fetch access tokens.
    pub metadata_host: String,
}

impl ListenerConfig {
    /// Loads configuration from the process environment.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required variable is missing or any
    /// variable holds an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ListenerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let project_id = var("DATACATALOG_PROJECT_ID")
            .ok_or(ConfigError::Missing("DATACATALOG_PROJECT_ID"))?;
        let topic_id =
            var("DATACATALOG_TOPIC_ID").ok_or(ConfigError::Missing("DATACATALOG_TOPIC_ID"))?;

        let host_name = var("METASTORE_HOST_NAME").unwrap_or_else(|| local_host_name(&var));

        let failure_policy = match var("LISTENER_FAILURE_POLICY") {
            Some(raw) => raw.parse::<FailurePolicy>().map_err(|reason| ConfigError::Invalid {
                key: "LISTENER_FAILURE_POLICY",
                value: raw.clone(),
                reason,
            })?,
            None => FailurePolicy::default(),
        };

        let max_attempts: u32 = parse_var(&var, "PUBLISH_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "PUBLISH_MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        let base_ms: u64 = parse_var(&var, "PUBLISH_RETRY_BASE_MS", 200)?;
        let max_ms: u64 = parse_var(&var, "PUBLISH_RETRY_MAX_MS", 5_000)?;
        let retry = RetryPolicy::new(
            max_attempts,
            Duration::from_millis(base_ms),
            Duration::from_millis(max_ms),
        );

        let pubsub_endpoint =
            var("PUBSUB_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let emulator_host = var("PUBSUB_EMULATOR_HOST");
        let access_token = var("PUBSUB_ACCESS_TOKEN");
        let timeout_secs: u64 = parse_var(&var, "PUBSUB_TIMEOUT_SECS", 30)?;
        let metadata_host = var("GCE_METADATA_HOST")
            .map(|h| with_scheme(&h))
            .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());

        Ok(Self {
            project_id,
            topic_id,
            host_name,
            failure_policy,
            retry,
            pubsub_endpoint,
            emulator_host,
            access_token,
            request_timeout: Duration::from_secs(timeout_secs),
            metadata_host,
        })
    }

    /// Derives Pub/Sub client settings.
    ///
    /// An emulator host overrides the endpoint and disables authentication;
    /// otherwise a static token wins over the metadata server.
    #[must_use]
    pub fn pubsub_settings(&self) -> PubSubSettings {
        let (endpoint, credentials) = match (&self.emulator_host, &self.access_token) {
            (Some(host), _) => (with_scheme(host), Credentials::None),
            (None, Some(token)) => (
                self.pubsub_endpoint.clone(),
                Credentials::Static(token.clone()),
            ),
            (None, None) => (
                self.pubsub_endpoint.clone(),
                Credentials::MetadataServer(self.metadata_host.clone()),
            ),
        };
        PubSubSettings {
            project_id: self.project_id.clone(),
            endpoint,
            credentials,
            timeout: self.request_timeout,
        }
    }
}

/// Parses a variable as `T`, returning `default` when unset.
fn parse_var<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Prefixes `http://` to a bare `host:port`.
fn with_scheme(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}

/// Best-effort local host name: `$HOSTNAME`, then `%COMPUTERNAME%`
/// (Windows), then `/etc/hostname` (Linux), then `localhost`.
fn local_host_name<F>(var: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    var("HOSTNAME")
        .or_else(|| var("COMPUTERNAME"))
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}
