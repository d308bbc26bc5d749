//! Storage abstractions for cached provider responses.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A named bucket of byte keys and values with optional expiry.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>);
    async fn remove(&self, key: &[u8]);
    async fn clear(&self);
}

/// Hands out named collections, persisted when the backend allows it.
pub trait Store: Send + Sync {
    fn get_collection(&self, name: &str) -> Arc<dyn KeyValueCollection>;
}
