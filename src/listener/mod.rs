//! Listener adapter: the boundary with the catalog service.
//!
//! [`MetastoreEventListener`] is the hook capability the catalog service
//! calls into; [`MetastoreListener`] implements it by driving the
//! normalize → envelope → publish pipeline. [`BlockingListener`] adapts it
//! for hosts that call hooks from synchronous threads.

pub mod blocking;
pub mod hook;
pub mod metastore_listener;

pub use blocking::BlockingListener;
pub use hook::MetastoreEventListener;
pub use metastore_listener::MetastoreListener;
