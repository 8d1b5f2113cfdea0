//! Listener that normalizes, wraps, and publishes every catalog mutation.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::hook::MetastoreEventListener;
use crate::catalog::entity::{RawDatabase, RawTable};
use crate::config::{FailurePolicy, ListenerConfig};
use crate::domain::ChangeEnvelope;
use crate::domain::normalizer::{normalize_database, normalize_table};
use crate::error::{BusError, HookError, PublishError};
use crate::gateway::{LazyClient, MessageBusClient, PubSubClientFactory};
use crate::service::{Publisher, RetryPolicy};

/// Pipeline driver behind the catalog hooks.
///
/// Every hook follows the same steps: normalize the raw entities, build the
/// envelope, publish it (retrying transient failures per the
/// [`RetryPolicy`]), and finally apply the [`FailurePolicy`] to whatever
/// error remains. Holds no per-event state, so concurrent hook calls for
/// unrelated entities do not interact.
#[derive(Debug, Clone)]
pub struct MetastoreListener {
    publisher: Publisher,
    topic: String,
    host_name: String,
    failure_policy: FailurePolicy,
    retry: RetryPolicy,
}

impl MetastoreListener {
    /// Creates a listener publishing through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn MessageBusClient>, config: &ListenerConfig) -> Self {
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            topic = %config.topic_id,
            host = %config.host_name,
            failure_policy = %config.failure_policy,
            max_attempts = config.retry.max_attempts,
            "metastore listener created"
        );
        Self {
            publisher: Publisher::new(client),
            topic: config.topic_id.clone(),
            host_name: config.host_name.clone(),
            failure_policy: config.failure_policy,
            retry: config.retry,
        }
    }

    /// Creates a listener publishing to Cloud Pub/Sub. The client is built
    /// lazily on the first event.
    #[must_use]
    pub fn from_config(config: &ListenerConfig) -> Self {
        let client = LazyClient::new(PubSubClientFactory::new(config.pubsub_settings()));
        Self::new(Arc::new(client), config)
    }

    /// Overrides the failure policy.
    #[must_use]
    pub const fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the active failure policy.
    #[must_use]
    pub const fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Returns the origin host stamped on envelopes.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Publishes one envelope and applies retry and failure policy.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] when delivery fails and the listener fails
    /// closed.
    pub async fn dispatch(&self, envelope: ChangeEnvelope) -> Result<(), HookError> {
        let event = envelope.event_kind();
        let subject = envelope.payload().subject();
        let event_id = Uuid::new_v4();
        let mut attempt: u32 = 1;
        let mut refreshed = false;

        loop {
            match self
                .publisher
                .publish_with_id(&self.topic, &envelope, event_id)
                .await
            {
                Ok(ids) => {
                    for message_id in &ids {
                        tracing::info!(
                            %event,
                            %subject,
                            %message_id,
                            "published with a message id"
                        );
                    }
                    return Ok(());
                }
                // One immediate resend with rebuilt credentials, outside the
                // retry budget.
                Err(err) if !refreshed && is_stale_credentials(&err) => {
                    tracing::info!(
                        %event,
                        %subject,
                        attempt,
                        error = %err,
                        "cached credentials refused; resending with fresh credentials"
                    );
                    refreshed = true;
                    attempt = attempt.saturating_add(1);
                }
                Err(err) if err.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        %event,
                        %subject,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "publish failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(err) => return self.on_failure(HookError::new(event, attempt, err), &subject),
            }
        }
    }

    fn on_failure(&self, err: HookError, subject: &str) -> Result<(), HookError> {
        match self.failure_policy {
            FailurePolicy::FailClosed => {
                tracing::error!(
                    event = %err.event,
                    subject,
                    code = err.error_code(),
                    error = %err,
                    "publish failed; failing catalog operation"
                );
                Err(err)
            }
            FailurePolicy::FailOpen => {
                tracing::error!(
                    event = %err.event,
                    subject,
                    code = err.error_code(),
                    error = %err,
                    "publish failed; event dropped (fail-open)"
                );
                Ok(())
            }
        }
    }
}

fn is_stale_credentials(err: &PublishError) -> bool {
    matches!(err.bus_error(), Some(BusError::StaleCredentials(_)))
}

#[async_trait]
impl MetastoreEventListener for MetastoreListener {
    async fn on_create_database(&self, database: &dyn RawDatabase) -> Result<(), HookError> {
        let snapshot = normalize_database(database);
        self.dispatch(ChangeEnvelope::create_database(snapshot, self.host_name.as_str()))
            .await
    }

    async fn on_drop_database(&self, database: &dyn RawDatabase) -> Result<(), HookError> {
        let snapshot = normalize_database(database);
        self.dispatch(ChangeEnvelope::drop_database(snapshot, self.host_name.as_str()))
            .await
    }

    async fn on_create_table(&self, table: &dyn RawTable) -> Result<(), HookError> {
        let snapshot = normalize_table(table);
        self.dispatch(ChangeEnvelope::create_table(snapshot, self.host_name.as_str()))
            .await
    }

    async fn on_drop_table(&self, table: &dyn RawTable) -> Result<(), HookError> {
        let snapshot = normalize_table(table);
        self.dispatch(ChangeEnvelope::drop_table(snapshot, self.host_name.as_str()))
            .await
    }

    async fn on_alter_table(
        &self,
        old_table: &dyn RawTable,
        new_table: &dyn RawTable,
    ) -> Result<(), HookError> {
        let old_snapshot = normalize_table(old_table);
        let new_snapshot = normalize_table(new_table);
        self.dispatch(ChangeEnvelope::alter_table(
            old_snapshot,
            new_snapshot,
            self.host_name.as_str(),
        ))
        .await
    }
}
