use crate::core::cache::KeyValueCollection;
use crate::core::quote::{DateRange, QuoteProvider, QuoteSeries};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Wraps a raw provider and keeps successful series in a collection keyed by
/// symbol and date range. Failures are never cached.
pub struct CachingQuoteProvider<T: QuoteProvider> {
    inner: T,
    cache: Arc<dyn KeyValueCollection>,
    ttl: Option<Duration>,
}

impl<T: QuoteProvider> CachingQuoteProvider<T> {
    pub fn new(inner: T, cache: Arc<dyn KeyValueCollection>, ttl: Option<Duration>) -> Self {
        Self { inner, cache, ttl }
    }
}

fn cache_key(symbol: &str, range: &DateRange) -> String {
    format!("{symbol}|{}|{}", range.start(), range.end())
}

#[async_trait]
impl<T: QuoteProvider> QuoteProvider for CachingQuoteProvider<T> {
    async fn fetch_raw(&self, symbol: &str, range: &DateRange) -> Result<QuoteSeries> {
        let key = cache_key(symbol, range);
        if let Some(cached) = self.cache.get(key.as_bytes()).await {
            match serde_json::from_slice(&cached) {
                Ok(series) => return Ok(series),
                Err(e) => {
                    debug!("Discarding unreadable cache entry for {}: {}", key, e);
                    self.cache.remove(key.as_bytes()).await;
                }
            }
        }

        let series = self.inner.fetch_raw(symbol, range).await?;
        match serde_json::to_vec(&series) {
            Ok(bytes) => self.cache.put(key.as_bytes(), &bytes, self.ttl).await,
            Err(e) => debug!("Failed to encode series for {}: {}", key, e),
        }
        Ok(series)
    }
}
