//! ABOUTME: Core types, errors, IDs, retry policy, and tracing utilities
//! ABOUTME: Foundation crate used by every tierlab service component

pub mod error;
pub mod id;
pub mod identity;
pub mod retry;
pub mod service;
pub mod telemetry;
pub mod time;

pub use error::{Error, Result};
pub use id::Id;
pub use identity::ReplicaIdentity;
pub use retry::{retry_until, Backoff, RetryError, RetryPolicy, Succeeded};
pub use service::ServiceKind;
pub use time::{now_iso8601, unix_timestamp, MonotonicTimer};
