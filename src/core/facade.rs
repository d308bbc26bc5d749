//! Resolves symbols to normalized quote series.

use crate::core::error::CalcError;
use crate::core::normalize::{align_to_reference, synthetic_fixed_income};
use crate::core::quote::{DateRange, QuoteProvider, QuoteSeries};
use crate::core::symbol::{Symbol, currency_pair_symbol};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, instrument};

/// Dispatches a symbol to the raw provider, the currency aligner or the
/// synthetic generator depending on its shape.
///
/// Currency pairs are always fetched straight from the raw provider and
/// never go back through [`QuoteService::resolve`]. Each pair is fetched at
/// most once per date range for the lifetime of the service; different pairs
/// load concurrently.
pub struct QuoteService<'a> {
    provider: &'a dyn QuoteProvider,
    markets: HashMap<String, String>,
    pairs: Mutex<HashMap<(String, DateRange), Arc<OnceCell<QuoteSeries>>>>,
}

impl<'a> QuoteService<'a> {
    /// `markets` maps a listing suffix (e.g. `SA`) to its quote currency.
    pub fn new(provider: &'a dyn QuoteProvider, markets: &HashMap<String, String>) -> Self {
        let markets = markets
            .iter()
            .map(|(market, currency)| (market.to_uppercase(), currency.to_uppercase()))
            .collect();
        QuoteService {
            provider,
            markets,
            pairs: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the series for `symbol` over `range`. With `native` set,
    /// values stay in the instrument's own currency.
    #[instrument(name = "ResolveQuotes", skip(self, range), fields(range = %range))]
    pub async fn resolve(
        &self,
        symbol: &str,
        range: &DateRange,
        native: bool,
    ) -> Result<QuoteSeries> {
        match Symbol::parse(symbol, &self.markets)? {
            Symbol::Synthetic {
                currency,
                annual_rate,
            } => {
                let pair = self.currency_pair(&currency, range).await?;
                if pair.is_empty() {
                    return Err(CalcError::NoCurrencyData {
                        pair: currency_pair_symbol(&currency),
                    }
                    .into());
                }
                debug!(annual_rate, %currency, native, "Generating synthetic fixed income");
                Ok(synthetic_fixed_income(annual_rate, &pair, !native)?)
            }
            Symbol::Foreign { symbol, currency } => {
                let foreign = self.fetch_raw(symbol, range).await?;
                if native {
                    return Ok(foreign);
                }
                let pair = self.currency_pair(&currency, range).await?;
                debug!(%currency, samples = foreign.len(), "Aligning foreign series");
                Ok(align_to_reference(&foreign, &pair))
            }
            Symbol::Plain(raw) => self.fetch_raw(raw, range).await,
        }
    }

    async fn fetch_raw(&self, symbol: &str, range: &DateRange) -> Result<QuoteSeries> {
        self.provider
            .fetch_raw(symbol, range)
            .await
            .with_context(|| format!("Failed to fetch quotes for {symbol}"))
    }

    async fn currency_pair(&self, currency: &str, range: &DateRange) -> Result<QuoteSeries> {
        let pair_symbol = currency_pair_symbol(currency);

        // The map lock only guards the lookup; each pair fetches on its own cell.
        let cell = {
            let mut pairs = self.pairs.lock().await;
            Arc::clone(pairs.entry((pair_symbol.clone(), *range)).or_default())
        };
        if let Some(series) = cell.get() {
            debug!(pair = %pair_symbol, "Reusing currency pair series");
            return Ok(series.clone());
        }

        let provider = self.provider;
        let pair = pair_symbol.as_str();
        let series = cell
            .get_or_try_init(|| async move {
                provider
                    .fetch_raw(pair, range)
                    .await
                    .with_context(|| format!("Failed to fetch currency pair {pair}"))
            })
            .await?;
        Ok(series.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quote::Quote;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;
    use tokio::time::timeout;

    /// Raw provider serving canned series and recording every request.
    struct MockProvider {
        series: HashMap<String, QuoteSeries>,
        calls: StdMutex<Vec<String>>,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                series: HashMap::new(),
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn with(mut self, symbol: &str, closes: &[(u32, f64)]) -> Self {
            let series = closes
                .iter()
                .map(|(day, close)| {
                    Quote::new(Utc.with_ymd_and_hms(2024, 1, *day, 12, 0, 0).unwrap(), *close)
                })
                .collect();
            self.series.insert(symbol.to_string(), series);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuoteProvider for MockProvider {
        async fn fetch_raw(&self, symbol: &str, _range: &DateRange) -> Result<QuoteSeries> {
            self.calls.lock().unwrap().push(symbol.to_string());
            self.series
                .get(symbol)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown symbol {symbol}"))
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    fn markets() -> HashMap<String, String> {
        HashMap::from([("sa".to_string(), "brl".to_string())])
    }

    fn closes(series: &QuoteSeries) -> Vec<f64> {
        series.iter().map(|q| q.close).collect()
    }

    #[tokio::test]
    async fn test_plain_symbol_is_passed_through() {
        let provider = MockProvider::new().with("BTC-USD", &[(2, 100.0), (3, 110.0)]);
        let service = QuoteService::new(&provider, &markets());

        let series = service.resolve("BTC-USD", &range(), false).await.unwrap();
        assert_eq!(closes(&series), vec![100.0, 110.0]);
        assert_eq!(provider.calls(), vec!["BTC-USD"]);
    }

    #[tokio::test]
    async fn test_foreign_symbol_is_aligned() {
        let provider = MockProvider::new()
            .with("PETR4.SA", &[(2, 50.0), (3, 60.0), (4, 70.0)])
            .with("BRL=X", &[(2, 5.0), (4, 7.0)]);
        let service = QuoteService::new(&provider, &markets());

        let series = service.resolve("PETR4.SA", &range(), false).await.unwrap();
        assert_eq!(closes(&series), vec![10.0, 10.0]);
        assert_eq!(provider.calls(), vec!["PETR4.SA", "BRL=X"]);
    }

    #[tokio::test]
    async fn test_foreign_symbol_native_mode_skips_pair() {
        let provider = MockProvider::new().with("PETR4.SA", &[(2, 50.0), (3, 60.0)]);
        let service = QuoteService::new(&provider, &markets());

        let series = service.resolve("PETR4.SA", &range(), true).await.unwrap();
        assert_eq!(closes(&series), vec![50.0, 60.0]);
        assert_eq!(provider.calls(), vec!["PETR4.SA"]);
    }

    #[tokio::test]
    async fn test_synthetic_symbol_uses_pair_calendar() {
        let provider = MockProvider::new().with("BRL=X", &[(2, 5.0), (3, 4.0), (4, 5.0)]);
        let service = QuoteService::new(&provider, &markets());

        let converted = service.resolve("FIXED-BRL-0", &range(), false).await.unwrap();
        assert_eq!(closes(&converted), vec![20.0, 25.0, 20.0]);

        let native = service.resolve("FIXED-BRL-0", &range(), true).await.unwrap();
        assert_eq!(closes(&native), vec![100.0, 100.0, 100.0]);

        // The pair series is fetched once and reused.
        assert_eq!(provider.calls(), vec!["BRL=X"]);
    }

    #[tokio::test]
    async fn test_synthetic_accrues_between_samples() {
        let provider = MockProvider::new().with("BRL=X", &[(1, 1.0), (31, 1.0)]);
        let service = QuoteService::new(&provider, &markets());

        let series = service.resolve("FIXED-BRL-12", &range(), true).await.unwrap();
        let expected = 100.0 * 1.12_f64.powf(30.0 / 365.0);
        assert!((series.last().unwrap().close - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_synthetic_without_currency_data_fails() {
        let provider = MockProvider::new().with("BRL=X", &[]);
        let service = QuoteService::new(&provider, &markets());

        let err = service
            .resolve("FIXED-BRL-10", &range(), false)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CalcError>(),
            Some(&CalcError::NoCurrencyData {
                pair: "BRL=X".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported() {
        let provider = MockProvider::new();
        let service = QuoteService::new(&provider, &markets());

        let err = service.resolve("NOPE", &range(), false).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch quotes for NOPE");
        assert_eq!(err.root_cause().to_string(), "Unknown symbol NOPE");
    }

    /// Every fetch waits until `gate` has seen all concurrent callers.
    struct GatedProvider {
        gate: Barrier,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteProvider for GatedProvider {
        async fn fetch_raw(&self, _symbol: &str, _range: &DateRange) -> Result<QuoteSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.wait().await;
            Ok(QuoteSeries::from_samples(vec![Quote::new(
                Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap(),
                5.0,
            )]))
        }
    }

    #[tokio::test]
    async fn test_different_pairs_load_concurrently() {
        let provider = GatedProvider {
            gate: Barrier::new(2),
            calls: AtomicUsize::new(0),
        };
        let service = QuoteService::new(&provider, &markets());
        let range = range();

        let both = async {
            tokio::join!(
                service.resolve("FIXED-BRL-10", &range, false),
                service.resolve("FIXED-MXN-10", &range, false),
            )
        };
        let (brl, mxn) = timeout(Duration::from_secs(5), both)
            .await
            .expect("pair fetches were serialized");
        assert_eq!(brl.unwrap().len(), 1);
        assert_eq!(mxn.unwrap().len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_same_pair_is_fetched_once_under_concurrency() {
        let provider = MockProvider::new().with("BRL=X", &[(2, 5.0), (3, 4.0)]);
        let service = QuoteService::new(&provider, &markets());
        let range = range();

        let (a, b) = tokio::join!(
            service.resolve("FIXED-BRL-10", &range, false),
            service.resolve("FIXED-BRL-12", &range, false),
        );
        assert_eq!(a.unwrap().len(), 2);
        assert_eq!(b.unwrap().len(), 2);
        assert_eq!(provider.calls(), vec!["BRL=X"]);
    }

    #[tokio::test]
    async fn test_failed_pair_is_retried() {
        let provider = MockProvider::new();
        let service = QuoteService::new(&provider, &markets());

        assert!(service.resolve("FIXED-BRL-10", &range(), false).await.is_err());
        assert!(service.resolve("FIXED-BRL-10", &range(), false).await.is_err());
        assert_eq!(provider.calls(), vec!["BRL=X", "BRL=X"]);
    }

    #[tokio::test]
    async fn test_malformed_synthetic_symbol() {
        let provider = MockProvider::new();
        let service = QuoteService::new(&provider, &markets());

        let err = service
            .resolve("FIXED-BRL-x", &range(), false)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<CalcError>().is_some());
        assert!(provider.calls().is_empty());
    }
}
