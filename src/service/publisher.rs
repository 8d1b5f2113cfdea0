//! Envelope publisher: serialize, attach attributes, hand to the bus.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::domain::{ChangeEnvelope, SCHEMA_VERSION};
use crate::error::PublishError;
use crate::gateway::{MessageBusClient, OutboundMessage};

/// Attribute carrying the event-kind tag.
pub const ATTR_EVENT: &str = "event";
/// Attribute carrying [`SCHEMA_VERSION`].
pub const ATTR_SCHEMA_VERSION: &str = "schemaVersion";
/// Attribute carrying the per-event id used for consumer-side dedupe.
pub const ATTR_EVENT_ID: &str = "eventId";
/// Attribute carrying the RFC 3339 publish timestamp.
pub const ATTR_PUBLISH_TIME: &str = "publishTime";

/// Publishes [`ChangeEnvelope`]s through an injected [`MessageBusClient`].
///
/// Makes exactly one delivery attempt per call; retry decisions belong to
/// the caller.
#[derive(Debug, Clone)]
pub struct Publisher {
    client: Arc<dyn MessageBusClient>,
}

impl Publisher {
    /// Creates a publisher over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn MessageBusClient>) -> Self {
        Self { client }
    }

    /// Publishes `envelope` to `topic` under a fresh event id.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::SerializationFailure`] if the envelope cannot
    /// be serialized, or [`PublishError::PublishFailure`] if the client
    /// reports any failure.
    pub async fn publish(
        &self,
        topic: &str,
        envelope: &ChangeEnvelope,
    ) -> Result<Vec<String>, PublishError> {
        self.publish_with_id(topic, envelope, Uuid::new_v4()).await
    }

    /// Publishes `envelope` to `topic` under `event_id`. Retries of the same
    /// event should reuse the id so consumers can drop duplicates.
    ///
    /// # Errors
    ///
    /// Same as [`Publisher::publish`].
    pub async fn publish_with_id(
        &self,
        topic: &str,
        envelope: &ChangeEnvelope,
        event_id: Uuid,
    ) -> Result<Vec<String>, PublishError> {
        let event = envelope.event_kind();
        let data = envelope
            .to_json_bytes()
            .map_err(|source| PublishError::SerializationFailure { event, source })?;

        let message = OutboundMessage::new(data)
            .with_attribute(ATTR_EVENT, event.as_str())
            .with_attribute(ATTR_SCHEMA_VERSION, SCHEMA_VERSION.to_string())
            .with_attribute(ATTR_EVENT_ID, event_id.to_string())
            .with_attribute(
                ATTR_PUBLISH_TIME,
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            );

        let ids = self
            .client
            .publish(topic, message)
            .await
            .map_err(|source| PublishError::PublishFailure {
                topic: topic.to_string(),
                source,
            })?;

        tracing::debug!(%event, %event_id, topic, count = ids.len(), "envelope published");
        Ok(ids)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::domain::{DatabaseSnapshot, EventKind, TableSnapshot};
    use crate::error::BusError;

    #[derive(Debug, Default)]
    struct RecordingClient {
        sent: Mutex<Vec<(String, OutboundMessage)>>,
        fail_with: Option<fn() -> BusError>,
    }

    impl RecordingClient {
        fn failing(make_err: fn() -> BusError) -> Self {
            Self {
                fail_with: Some(make_err),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl MessageBusClient for RecordingClient {
        async fn publish(
            &self,
            topic: &str,
            message: OutboundMessage,
        ) -> Result<Vec<String>, BusError> {
            if let Some(make_err) = self.fail_with {
                return Err(make_err());
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((topic.to_string(), message));
            }
            Ok(vec!["abc123".to_string()])
        }
    }

    fn envelope() -> ChangeEnvelope {
        ChangeEnvelope::create_database(
            DatabaseSnapshot {
                name: "sales".to_string(),
                ..DatabaseSnapshot::default()
            },
            "host-a",
        )
    }

    #[tokio::test]
    async fn success_returns_client_ids() {
        let client = Arc::new(RecordingClient::default());
        let publisher = Publisher::new(Arc::clone(&client) as Arc<dyn MessageBusClient>);

        let ids = assert_ok!(publisher.publish("metadata", &envelope()).await);
        assert_eq!(ids, vec!["abc123".to_string()]);
    }

    #[tokio::test]
    async fn message_body_and_attributes() {
        let client = Arc::new(RecordingClient::default());
        let publisher = Publisher::new(Arc::clone(&client) as Arc<dyn MessageBusClient>);
        let event_id = Uuid::new_v4();

        assert_ok!(publisher.publish_with_id("metadata", &envelope(), event_id).await);

        let Ok(sent) = client.sent.lock() else {
            panic!("lock poisoned");
        };
        let Some((topic, message)) = sent.first() else {
            panic!("nothing published");
        };
        assert_eq!(topic, "metadata");

        let Ok(body) = serde_json::from_slice::<serde_json::Value>(&message.data) else {
            panic!("body is not JSON");
        };
        assert_eq!(
            body.get("event").and_then(serde_json::Value::as_str),
            Some("CREATE_DATABASE")
        );
        assert_eq!(
            body.pointer("/database/name").and_then(serde_json::Value::as_str),
            Some("sales")
        );

        let attr = |k: &str| message.attributes.get(k).map(String::as_str);
        assert_eq!(attr(ATTR_EVENT), Some("CREATE_DATABASE"));
        assert_eq!(attr(ATTR_SCHEMA_VERSION), Some("1"));
        assert_eq!(attr(ATTR_EVENT_ID), Some(event_id.to_string().as_str()));
        assert!(attr(ATTR_PUBLISH_TIME).is_some_and(|t| t.ends_with('Z')));
    }

    #[tokio::test]
    async fn client_failure_is_publish_failure() {
        let client =
            RecordingClient::failing(|| BusError::Transport("connection refused".to_string()));
        let publisher = Publisher::new(Arc::new(client));

        let err = assert_err!(publisher.publish("metadata", &envelope()).await);
        let PublishError::PublishFailure { topic, source } = err else {
            panic!("expected publish failure");
        };
        assert_eq!(topic, "metadata");
        assert!(matches!(source, BusError::Transport(_)));
    }

    #[tokio::test]
    async fn authentication_failure_is_publish_failure() {
        let client =
            RecordingClient::failing(|| BusError::Authentication("invalid_grant".to_string()));
        let publisher = Publisher::new(Arc::new(client));
        let table = ChangeEnvelope::drop_table(TableSnapshot::default(), "h");

        let err = assert_err!(publisher.publish("metadata", &table).await);
        assert!(!err.is_transient());
        assert_eq!(err.error_code(), 2002);
        assert!(err.to_string().contains("metadata"));
        assert_eq!(table.event_kind(), EventKind::DropTable);
    }

    #[tokio::test]
    async fn each_call_gets_fresh_event_id() {
        let client = Arc::new(RecordingClient::default());
        let publisher = Publisher::new(Arc::clone(&client) as Arc<dyn MessageBusClient>);

        assert_ok!(publisher.publish("metadata", &envelope()).await);
        assert_ok!(publisher.publish("metadata", &envelope()).await);

        let Ok(sent) = client.sent.lock() else {
            panic!("lock poisoned");
        };
        let ids: Vec<Option<&String>> = sent
            .iter()
            .map(|(_, m)| m.attributes.get(ATTR_EVENT_ID))
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids.first(), ids.get(1));
    }
}
