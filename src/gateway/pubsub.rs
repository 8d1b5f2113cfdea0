//! Google Cloud Pub/Sub over its REST API.
//!
//! Publishes go to `POST {endpoint}/v1/projects/{project}/topics/{topic}:publish`
//! with a JSON body of base64-encoded messages. Status codes are mapped onto
//! [`BusError`] so callers can tell retryable failures apart:
//!
//! | Status                    | Mapped to                    |
//! |---------------------------|------------------------------|
//! | 401, 403                  | [`BusError::Authentication`] |
//! | 408, 429, 5xx, I/O errors | [`BusError::Transport`]      |
//! | any other non-2xx         | [`BusError::Rejected`]       |
//!
//! Access tokens from the metadata server carry their lifetime; the client
//! reports the resulting expiry so [`super::LazyClient`] can replace it in
//! time.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::{ClientFactory, MessageBusClient, OutboundMessage};
use crate::error::BusError;

/// Public Pub/Sub REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// GCE metadata server root.
pub const DEFAULT_METADATA_HOST: &str = "http://metadata.google.internal";

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// How the client authenticates its requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// No `Authorization` header (emulator).
    None,
    /// A fixed bearer token.
    Static(String),
    /// Fetch an access token from the metadata server at the given root.
    MetadataServer(String),
}

/// Settings for [`PubSubClientFactory`].
#[derive(Debug, Clone)]
pub struct PubSubSettings {
    /// Project that owns the topic.
    pub project_id: String,
    /// REST endpoint root, without trailing path.
    pub endpoint: String,
    /// Authentication mode.
    pub credentials: Credentials,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl PubSubSettings {
    /// Settings for `project_id` against the public endpoint, authenticating
    /// through the metadata server.
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: Credentials::MetadataServer(DEFAULT_METADATA_HOST.to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Pub/Sub REST client bound to one project.
#[derive(Debug, Clone)]
pub struct PubSubClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    access_token: Option<String>,
    expires_at: Option<Instant>,
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    messages: [PubsubMessage<'a>; 1],
}

#[derive(Serialize)]
struct PubsubMessage<'a> {
    data: String,
    attributes: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    expires_in: Option<u64>,
}

impl PubSubClient {
    /// Creates a client from a prepared HTTP client.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            access_token,
            expires_at: None,
        }
    }

    /// Marks the access token as valid until `expires_at`.
    #[must_use]
    pub const fn with_expiry(mut self, expires_at: Instant) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Expands a short topic id to `projects/{project}/topics/{topic}`.
    /// Fully-qualified paths are returned unchanged.
    #[must_use]
    pub fn topic_path(&self, topic: &str) -> String {
        if topic.starts_with("projects/") {
            topic.to_string()
        } else {
            format!("projects/{}/topics/{}", self.project_id, topic)
        }
    }
}

#[async_trait]
impl MessageBusClient for PubSubClient {
    async fn publish(
        &self,
        topic: &str,
        message: OutboundMessage,
    ) -> Result<Vec<String>, BusError> {
        let url = format!("{}/v1/{}:publish", self.endpoint, self.topic_path(topic));
        let body = PublishRequest {
            messages: [PubsubMessage {
                data: STANDARD.encode(&message.data),
                attributes: &message.attributes,
            }],
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), text));
        }

        let parsed: PublishResponse = response.json().await.map_err(|e| BusError::Rejected {
            status: status.as_u16(),
            message: format!("undecodable publish response: {e}"),
        })?;

        tracing::debug!(%url, ids = parsed.message_ids.len(), "pubsub publish accepted");
        Ok(parsed.message_ids)
    }

    fn credentials_expire_at(&self) -> Option<Instant> {
        self.expires_at
    }
}

/// Maps a non-success HTTP status onto a [`BusError`].
#[must_use]
pub fn classify_status(status: u16, body: String) -> BusError {
    match status {
        401 | 403 => BusError::Authentication(format!("status {status}: {body}")),
        408 | 429 | 500..=599 => BusError::Transport(format!("status {status}: {body}")),
        _ => BusError::Rejected {
            status,
            message: body,
        },
    }
}

/// Builds [`PubSubClient`]s, resolving an access token for each build.
#[derive(Debug, Clone)]
pub struct PubSubClientFactory {
    settings: PubSubSettings,
}

impl PubSubClientFactory {
    /// Creates a factory for the given settings.
    #[must_use]
    pub const fn new(settings: PubSubSettings) -> Self {
        Self { settings }
    }

    async fn fetch_metadata_token(
        http: &reqwest::Client,
        metadata_host: &str,
    ) -> Result<TokenResponse, BusError> {
        let url = format!("{}{}", metadata_host.trim_end_matches('/'), METADATA_TOKEN_PATH);
        let response = http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| {
                BusError::ClientConstruction(format!("metadata server unreachable: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_metadata_status(status.as_u16()));
        }

        response.json().await.map_err(|e| {
            BusError::Authentication(format!("undecodable metadata token response: {e}"))
        })
    }
}

/// Maps a non-success metadata-server status onto a [`BusError`]. Outages
/// are retryable; a refusal to issue a token is not.
fn classify_metadata_status(status: u16) -> BusError {
    match status {
        408 | 429 | 500..=599 => BusError::ClientConstruction(format!(
            "metadata server unavailable: status {status}"
        )),
        _ => BusError::Authentication(format!("metadata server returned status {status}")),
    }
}

#[async_trait]
impl ClientFactory for PubSubClientFactory {
    type Client = PubSubClient;

    async fn build(&self) -> Result<PubSubClient, BusError> {
        let http = reqwest::Client::builder()
            .timeout(self.settings.timeout)
            .build()
            .map_err(|e| BusError::ClientConstruction(e.to_string()))?;

        let (access_token, expires_at) = match &self.settings.credentials {
            Credentials::None => (None, None),
            Credentials::Static(token) => (Some(token.clone()), None),
            Credentials::MetadataServer(host) => {
                let token = Self::fetch_metadata_token(&http, host).await?;
                let expires_at = token
                    .expires_in
                    .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));
                (Some(token.access_token), expires_at)
            }
        };

        tracing::debug!(
            endpoint = %self.settings.endpoint,
            project = %self.settings.project_id,
            authenticated = access_token.is_some(),
            expires_in_secs = expires_at
                .map(|at| at.saturating_duration_since(Instant::now()).as_secs()),
            "building pubsub client"
        );

        let client = PubSubClient::new(
            http,
            self.settings.endpoint.clone(),
            self.settings.project_id.clone(),
            access_token,
        );
        Ok(match expires_at {
            Some(at) => client.with_expiry(at),
            None => client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PubSubClient {
        PubSubClient::new(reqwest::Client::new(), "http://localhost:8085/", "proj", None)
    }

    #[test]
    fn short_topic_is_qualified() {
        assert_eq!(client().topic_path("events"), "projects/proj/topics/events");
    }

    #[test]
    fn qualified_topic_is_kept() {
        assert_eq!(
            client().topic_path("projects/other/topics/events"),
            "projects/other/topics/events"
        );
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(client().endpoint, "http://localhost:8085");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            classify_status(401, String::new()),
            BusError::Authentication(_)
        ));
        assert!(matches!(
            classify_status(403, String::new()),
            BusError::Authentication(_)
        ));
        assert!(classify_status(503, String::new()).is_transient());
        assert!(classify_status(429, String::new()).is_transient());
        assert!(matches!(
            classify_status(404, "NOT_FOUND".to_string()),
            BusError::Rejected { status: 404, .. }
        ));
    }

    #[test]
    fn request_body_shape() {
        let attributes = BTreeMap::from([("event".to_string(), "DROP_TABLE".to_string())]);
        let body = PublishRequest {
            messages: [PubsubMessage {
                data: STANDARD.encode(b"{}"),
                attributes: &attributes,
            }],
        };
        let value = serde_json::to_value(&body).ok();
        assert_eq!(
            value
                .as_ref()
                .and_then(|v| v.pointer("/messages/0/data"))
                .and_then(serde_json::Value::as_str),
            Some("e30=")
        );
        assert_eq!(
            value
                .as_ref()
                .and_then(|v| v.pointer("/messages/0/attributes/event"))
                .and_then(serde_json::Value::as_str),
            Some("DROP_TABLE")
        );
    }

    #[test]
    fn metadata_outage_is_retryable_refusal_is_not() {
        assert!(matches!(
            classify_metadata_status(503),
            BusError::ClientConstruction(_)
        ));
        assert!(classify_metadata_status(429).is_transient());
        assert!(matches!(
            classify_metadata_status(404),
            BusError::Authentication(_)
        ));
        assert!(!classify_metadata_status(403).is_transient());
    }

    #[test]
    fn token_lifetime_is_optional() {
        let with: Result<TokenResponse, _> =
            serde_json::from_str(r#"{"access_token":"a","expires_in":3599,"token_type":"Bearer"}"#);
        assert_eq!(with.ok().and_then(|t| t.expires_in), Some(3599));
        let without: Result<TokenResponse, _> = serde_json::from_str(r#"{"access_token":"a"}"#);
        assert_eq!(without.ok().map(|t| t.expires_in), Some(None));
    }

    #[test]
    fn static_clients_never_expire() {
        assert_eq!(client().credentials_expire_at(), None);
        let at = Instant::now();
        assert_eq!(client().with_expiry(at).credentials_expire_at(), Some(at));
    }

    #[test]
    fn default_settings_use_metadata_server() {
        let settings = PubSubSettings::new("proj");
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(
            settings.credentials,
            Credentials::MetadataServer(DEFAULT_METADATA_HOST.to_string())
        );
    }
}
