//! Pluggable key-value store used by the alert throttle.
//!
//! The throttle counter must be shared by every gateway instance, so the
//! production backend is an external store reached over an authenticated
//! request-response protocol. The in-memory backend serves single-instance
//! deployments and tests.
//!
//! Implementations must make `incr` atomic: concurrent requests for the same
//! dead destination may arrive at different instances at the same time, and
//! the alert ceiling only holds if every increment observes a distinct value.

mod memory;
mod rest;

use std::time::Duration;

use async_trait::async_trait;

pub use crate::error_handling::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use rest::RestStore;

/// Minimal command set the gateway needs from a key-value store.
///
/// Keys are short ASCII strings, values are UTF-8 text, TTLs have second
/// granularity.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically increments the integer at `key` (missing keys start at 0)
    /// and returns the new value.
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// Sets a time-to-live on an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()>;

    /// Stores `value` under `key`, replacing any previous value, optionally
    /// with a time-to-live.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Reads the value at `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}
