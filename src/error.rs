//! Listener error types.
//!
//! Errors are layered the way they propagate:
//!
//! | Type            | Raised by                   | Code range |
//! |-----------------|-----------------------------|------------|
//! | [`BusError`]    | message-bus clients         | 1000–1999  |
//! | [`PublishError`]| [`crate::service::Publisher`] | 2000–2999  |
//! | [`HookError`]   | the listener, to the catalog | 3000       |
//! | [`ConfigError`] | startup configuration       | 4000–4999  |
//!
//! Each error exposes a stable numeric code so log lines can be correlated
//! without parsing messages.

use crate::domain::EventKind;

/// Failure reported by a message-bus client.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Credentials were missing, expired, or refused.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network-level failure or a retryable server response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The message bus refused the publish request.
    #[error("publish rejected with status {status}: {message}")]
    Rejected {
        /// HTTP (or equivalent) status code.
        status: u16,
        /// Server-provided reason.
        message: String,
    },

    /// The client could not be constructed.
    #[error("client construction failed: {0}")]
    ClientConstruction(String),

    /// A previously working client was refused; it has been dropped and the
    /// next attempt runs with freshly fetched credentials.
    #[error("cached credentials refused: {0}")]
    StaleCredentials(String),
}

impl BusError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Authentication(_) => 1001,
            Self::Transport(_) => 1002,
            Self::Rejected { .. } => 1003,
            Self::ClientConstruction(_) => 1004,
            Self::StaleCredentials(_) => 1005,
        }
    }

    /// Returns `true` if the same request may succeed when retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ClientConstruction(_) | Self::StaleCredentials(_)
        )
    }
}

/// Failure of a single publish call.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The envelope could not be serialized.
    #[error("failed to serialize {event} envelope: {source}")]
    SerializationFailure {
        /// Kind of the envelope being serialized.
        event: EventKind,
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The message bus did not accept the message.
    #[error("failed to publish to topic {topic}: {source}")]
    PublishFailure {
        /// Target topic.
        topic: String,
        /// Underlying client error.
        #[source]
        source: BusError,
    },
}

impl PublishError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::SerializationFailure { .. } => 2001,
            Self::PublishFailure { .. } => 2002,
        }
    }

    /// Returns `true` if retrying the publish may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::SerializationFailure { .. } => false,
            Self::PublishFailure { source, .. } => source.is_transient(),
        }
    }

    /// Returns the client-side cause, if the failure came from the bus.
    #[must_use]
    pub const fn bus_error(&self) -> Option<&BusError> {
        match self {
            Self::SerializationFailure { .. } => None,
            Self::PublishFailure { source, .. } => Some(source),
        }
    }
}

/// Failure surfaced to the catalog operation that fired a hook.
#[derive(Debug, thiserror::Error)]
#[error("{event} hook failed after {attempts} attempt(s): {source}")]
pub struct HookError {
    /// Kind of the event being delivered.
    pub event: EventKind,
    /// Number of publish attempts made.
    pub attempts: u32,
    /// Last publish failure.
    #[source]
    pub source: PublishError,
}

impl HookError {
    /// Creates a hook error from the last publish failure.
    #[must_use]
    pub const fn new(event: EventKind, attempts: u32, source: PublishError) -> Self {
        Self {
            event,
            attempts,
            source,
        }
    }

    /// Returns the numeric error code.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        3000
    }
}

/// Invalid or missing startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set to a value that cannot be used.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Missing(_) => 4001,
            Self::Invalid { .. } => 4002,
        }
    }
}
