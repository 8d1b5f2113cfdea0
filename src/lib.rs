//! # metastore-listener
//!
//! Catalog change-event listener for Data Catalog synchronization.
//!
//! The catalog service (e.g. a Hive metastore) calls into this crate
//! whenever a database or table is created, dropped, or altered. Each event
//! is normalized into an owned snapshot, wrapped in a tagged envelope, and
//! published to a Pub/Sub topic. A downstream indexer consumes the topic to
//! keep its search index in sync without querying the catalog.
//!
//! ## Architecture
//!
//! ```text
//! Catalog service hooks
//!     │
//!     ├── MetastoreEventListener (listener/)
//!     │       └── MetastoreListener ── failure policy, call-site retry
//!     │
//!     ├── normalizer → snapshots → ChangeEnvelope (domain/)
//!     │
//!     ├── Publisher (service/)
//!     │
//!     └── MessageBusClient (gateway/)
//!             └── LazyClient → PubSubClient (REST)
//! ```
//!
//! Delivery is at-least-once. A publish failure fails the triggering catalog
//! operation unless the listener is configured to fail open.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod listener;
pub mod service;
pub mod telemetry;
