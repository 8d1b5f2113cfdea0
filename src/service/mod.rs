//! Service layer: publishing and retry policy.
//!
//! [`Publisher`] turns envelopes into bus messages; [`RetryPolicy`] is the
//! explicit, caller-owned retry bound used by the listener.

pub mod publisher;
pub mod retry;

pub use publisher::Publisher;
pub use retry::RetryPolicy;
