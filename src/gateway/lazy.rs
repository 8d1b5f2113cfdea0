//! Lazily constructed, self-healing client cache.
//!
//! The client is built on the first publish and shared afterwards. A failed
//! construction is never cached. A client whose credentials are about to
//! expire is replaced before use, and an authentication failure evicts the
//! cached client so the next publish rebuilds it with fresh credentials.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ClientFactory, MessageBusClient, OutboundMessage};
use crate::error::BusError;

/// Cached clients are rebuilt once their credentials are this close to
/// expiry.
pub const EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// [`MessageBusClient`] that delegates to a lazily built client.
#[derive(Debug)]
pub struct LazyClient<F: ClientFactory> {
    factory: F,
    cached: RwLock<Option<Arc<F::Client>>>,
}

fn still_valid<C: MessageBusClient>(client: &C) -> bool {
    client.credentials_expire_at().is_none_or(|expires_at| {
        Instant::now()
            .checked_add(EXPIRY_SKEW)
            .is_some_and(|deadline| deadline < expires_at)
    })
}

impl<F: ClientFactory> LazyClient<F> {
    /// Creates an empty cache around `factory`. Nothing is built yet.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            cached: RwLock::new(None),
        }
    }

    /// Returns `true` if a client is currently cached.
    pub async fn is_connected(&self) -> bool {
        self.cached.read().await.is_some()
    }

    /// Returns the client to use and whether it was already cached.
    async fn client(&self) -> Result<(Arc<F::Client>, bool), BusError> {
        if let Some(client) = self
            .cached
            .read()
            .await
            .as_ref()
            .filter(|c| still_valid::<F::Client>(c))
        {
            return Ok((Arc::clone(client), true));
        }

        let mut slot = self.cached.write().await;
        // Another caller may have built it while we waited for the lock.
        if let Some(client) = slot.as_ref() {
            if still_valid::<F::Client>(client) {
                return Ok((Arc::clone(client), true));
            }
            tracing::info!("message bus credentials near expiry; rebuilding client");
        }

        let client = Arc::new(self.factory.build().await.inspect_err(|err| {
            tracing::warn!(error = %err, "message bus client construction failed");
        })?);
        *slot = Some(Arc::clone(&client));
        tracing::debug!("message bus client constructed");
        Ok((client, false))
    }

    async fn evict(&self, stale: &Arc<F::Client>) {
        let mut slot = self.cached.write().await;
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, stale)) {
            *slot = None;
            tracing::info!("evicted message bus client after authentication failure");
        }
    }
}

#[async_trait]
impl<F: ClientFactory> MessageBusClient for LazyClient<F> {
    async fn publish(
        &self,
        topic: &str,
        message: OutboundMessage,
    ) -> Result<Vec<String>, BusError> {
        let (client, reused) = self.client().await?;
        match client.publish(topic, message).await {
            // Credentials that used to work were revoked or expired early.
            Err(BusError::Authentication(reason)) if reused => {
                self.evict(&client).await;
                Err(BusError::StaleCredentials(reason))
            }
            Err(BusError::Authentication(reason)) => {
                self.evict(&client).await;
                Err(BusError::Authentication(reason))
            }
            other => other,
        }
    }
}
