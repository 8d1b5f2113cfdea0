//! Message-bus gateways.
//!
//! The publisher only sees the narrow [`MessageBusClient`] capability:
//! publish bytes (plus string attributes) to a topic, get back message ids.
//! [`LazyClient`] builds a client on first use and rebuilds it before its
//! credentials expire or after an authentication failure; [`pubsub`] provides the Google
//! Cloud Pub/Sub REST implementation.

pub mod lazy;
pub mod pubsub;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::BusError;

pub use lazy::LazyClient;
pub use pubsub::{Credentials, PubSubClient, PubSubClientFactory, PubSubSettings};

/// A single message ready to hand to a message bus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Message body.
    pub data: Vec<u8>,
    /// String attributes carried next to the body.
    pub attributes: BTreeMap<String, String>,
}

impl OutboundMessage {
    /// Creates a message with the given body and no attributes.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute, replacing any previous value for `key`.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Publish capability of a message-bus client.
#[async_trait]
pub trait MessageBusClient: Send + Sync + fmt::Debug {
    /// Publishes `message` to `topic`, returning the ids assigned by the bus.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] describing why the message was not accepted.
    async fn publish(&self, topic: &str, message: OutboundMessage)
    -> Result<Vec<String>, BusError>;

    /// Instant at which the client's credentials stop being valid, if they
    /// expire at all.
    fn credentials_expire_at(&self) -> Option<Instant> {
        None
    }
}

/// Builds message-bus clients on demand.
#[async_trait]
pub trait ClientFactory: Send + Sync + fmt::Debug {
    /// Client type produced by this factory.
    type Client: MessageBusClient;

    /// Constructs a new client, resolving credentials as needed.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the client cannot be built.
    async fn build(&self) -> Result<Self::Client, BusError>;
}
